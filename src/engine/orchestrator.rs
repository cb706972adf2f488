// ==========================================
// 期末考试排考系统 - 排考编排器
// ==========================================
// 主流程:
//   加载快照 → (追加模式) 回放已有场次 → 模块排序
//   → 逐模块 {时段搜索 → 考场分配 → 监考分配 → 名单切分 → 提交状态}
//   → 单事务落库
// 红线: 单线程顺序执行; 同一库上并发运行两次排考不安全, 需由调用方串行化
// ==========================================

use crate::config::SchedulerConfig;
use crate::domain::report::{GenerationReport, GenerationRequest, UnscheduledModule};
use crate::domain::session::{ExamSession, RoomAssignment};
use crate::domain::types::{FormationId, ModuleId, PersistMode, ProctorId, RoomId, TimeSlot};
use crate::engine::audit::{AuditViolation, ScheduleAuditor};
use crate::engine::constraint_state::ConstraintState;
use crate::engine::dataset::{Dataset, DatasetLoader};
use crate::engine::error::{SchedulerError, SchedulerResult};
use crate::engine::ordering::ModuleSorter;
use crate::engine::roster_splitter::split_roster;
use crate::engine::slot_search::SlotSearch;
use crate::repository::{CatalogRepository, GenerationRunEntity, SessionRepository};
use chrono::{NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// PlanOutcome - 纯计算阶段结果 (未落库)
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct PlanOutcome {
    pub sessions: Vec<ExamSession>,
    pub unscheduled: Vec<UnscheduledModule>,
    pub skipped_already_placed: usize,
    pub skipped_empty: usize,
}

impl PlanOutcome {
    /// 新建场次行数（每考场一行）
    pub fn session_rows(&self) -> usize {
        self.sessions.iter().map(|s| s.assignments.len()).sum()
    }
}

/// 逐模块贪心排考（无 I/O）
///
/// 约束状态按值传入、按值返回: 读候选 → 决策 → 提交, 严格顺序执行
///
/// # 参数
/// - `dataset`: 基础数据快照
/// - `state`: 初始约束状态（追加模式下已回放历史场次）
/// - `formation_ids`: 专业过滤（为空表示全部）
/// - `start_date` / `end_date`: 闭区间窗口
/// - `config`: 引擎参数
/// - `rng`: 名单打乱的随机源
pub fn plan_sessions<R: Rng + ?Sized>(
    dataset: &Dataset,
    mut state: ConstraintState,
    formation_ids: &[FormationId],
    start_date: NaiveDate,
    end_date: NaiveDate,
    config: &SchedulerConfig,
    rng: &mut R,
) -> (ConstraintState, PlanOutcome) {
    let order = ModuleSorter::new().order(dataset, formation_ids, &state);
    let search = SlotSearch::new(config);

    let mut outcome = PlanOutcome {
        skipped_already_placed: order.skipped_already_placed,
        skipped_empty: order.skipped_empty,
        ..PlanOutcome::default()
    };

    for module in order.modules {
        let students = dataset.students_of(module.module_id);

        match search.search(module, students, dataset, &state, start_date, end_date) {
            Ok(placement) => {
                let rosters = split_roster(students, &placement.rooms, rng);
                let assignments = placement
                    .rooms
                    .iter()
                    .zip(placement.proctors.iter())
                    .zip(rosters)
                    .map(|((room, &proctor_id), students)| RoomAssignment {
                        session_id: None,
                        room_id: room.room_id,
                        proctor_id,
                        students,
                    })
                    .collect();

                let session = ExamSession {
                    module_id: module.module_id,
                    date: placement.date,
                    slot: placement.slot,
                    assignments,
                };
                state.commit(&session, students);

                debug!(
                    module_id = module.module_id,
                    enrolled = module.enrolled_count,
                    date = %session.date,
                    slot = %session.slot,
                    rooms = session.assignments.len(),
                    "模块已排入"
                );
                outcome.sessions.push(session);
            }
            Err(miss) => {
                warn!(
                    module_id = miss.module_id,
                    enrolled = miss.enrolled,
                    days_blocked = miss.days_blocked_by_students,
                    short_of_rooms = miss.slots_short_of_rooms,
                    short_of_proctors = miss.slots_short_of_proctors,
                    "模块在排考窗口内无可行时段"
                );
                outcome.unscheduled.push(miss);
            }
        }
    }

    (state, outcome)
}

// ==========================================
// ManualSessionRequest - 人工排考请求
// ==========================================
#[derive(Debug, Clone)]
pub struct ManualSessionRequest {
    pub module_id: ModuleId,
    pub room_id: RoomId,
    pub proctor_id: ProctorId,
    pub date: NaiveDate,
    pub slot: TimeSlot,
}

// ==========================================
// ExamScheduler - 排考编排器
// ==========================================
pub struct ExamScheduler {
    catalog_repo: Arc<CatalogRepository>,
    session_repo: Arc<SessionRepository>,
    config: SchedulerConfig,
}

impl ExamScheduler {
    pub fn new(
        catalog_repo: Arc<CatalogRepository>,
        session_repo: Arc<SessionRepository>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            catalog_repo,
            session_repo,
            config,
        }
    }

    /// 从共享连接创建
    pub fn from_connection(conn: Arc<Mutex<Connection>>, config: SchedulerConfig) -> Self {
        Self::new(
            Arc::new(CatalogRepository::new(conn.clone())),
            Arc::new(SessionRepository::new(conn)),
            config,
        )
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    fn make_rng(&self, seed: Option<u64>) -> StdRng {
        match seed.or(self.config.shuffle_seed) {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }

    /// 执行一次排考
    ///
    /// # 返回
    /// - Ok(report): 新建场次行数 + 未能排入的模块
    /// - Err(InvalidRequest): 窗口起止颠倒
    /// - Err(DataIntegrity / Load): 排考前中止, 未写库
    /// - Err(Persistence): 事务已回滚, 库内状态不变
    #[instrument(skip(self, request), fields(
        start_date = %request.start_date,
        end_date = %request.end_date,
        mode = %request.mode,
        formations = request.formation_ids.len()
    ))]
    pub fn generate(&self, request: &GenerationRequest) -> SchedulerResult<GenerationReport> {
        if request.start_date > request.end_date {
            return Err(SchedulerError::InvalidRequest(format!(
                "开始日期 {} 晚于结束日期 {}",
                request.start_date, request.end_date
            )));
        }

        info!("开始执行排考");

        let dataset = DatasetLoader::new(&self.catalog_repo).load()?;

        let initial_state = match request.mode {
            PersistMode::Append => {
                let existing = self.session_repo.load_sessions().map_err(SchedulerError::Load)?;
                debug!(existing_sessions = existing.len(), "追加模式: 回放已有场次");
                ConstraintState::seeded(&existing, &dataset)
            }
            PersistMode::Overwrite => ConstraintState::new(),
        };

        let mut rng = self.make_rng(request.seed);
        let (_, outcome) = plan_sessions(
            &dataset,
            initial_state,
            &request.formation_ids,
            request.start_date,
            request.end_date,
            &self.config,
            &mut rng,
        );

        let run_id = Uuid::new_v4().to_string();
        let run = GenerationRunEntity {
            run_id: run_id.clone(),
            mode: request.mode,
            start_date: request.start_date,
            end_date: request.end_date,
            sessions_created: outcome.session_rows(),
            modules_placed: outcome.sessions.len(),
            unscheduled_count: outcome.unscheduled.len(),
            created_at: Utc::now().naive_utc(),
        };

        let written = self
            .session_repo
            .persist(&outcome.sessions, request.mode, Some(&run))
            .map_err(SchedulerError::Persistence)?;

        let report = GenerationReport {
            run_id,
            mode: request.mode,
            start_date: request.start_date,
            end_date: request.end_date,
            sessions_created: written,
            modules_placed: outcome.sessions.len(),
            skipped_already_placed: outcome.skipped_already_placed,
            skipped_empty: outcome.skipped_empty,
            unscheduled: outcome.unscheduled,
        };

        info!(
            run_id = %report.run_id,
            sessions_created = report.sessions_created,
            modules_placed = report.modules_placed,
            unscheduled = report.unscheduled.len(),
            "排考完成"
        );

        Ok(report)
    }

    /// 审计当前已落库的全部场次
    pub fn audit(&self) -> SchedulerResult<Vec<AuditViolation>> {
        let dataset = DatasetLoader::new(&self.catalog_repo).load()?;
        let sessions = self.session_repo.load_sessions().map_err(SchedulerError::Load)?;
        Ok(ScheduleAuditor::new(&self.config).audit(&dataset, &sessions))
    }

    /// 人工安排单个模块到指定考场/监考/时段（追加落库）
    ///
    /// # 错误
    /// - InvalidRequest: 时间段不在配置内
    /// - Conflict: 引用不存在, 或违反任一硬约束
    #[instrument(skip(self, request), fields(
        module_id = request.module_id,
        date = %request.date
    ))]
    pub fn add_manual_session(
        &self,
        request: &ManualSessionRequest,
    ) -> SchedulerResult<ExamSession> {
        if !self.config.time_slots.contains(&request.slot) {
            return Err(SchedulerError::InvalidRequest(format!(
                "时间段 {} 不在配置的时间段内",
                request.slot
            )));
        }

        let dataset = DatasetLoader::new(&self.catalog_repo).load()?;
        let existing = self.session_repo.load_sessions().map_err(SchedulerError::Load)?;
        let state = ConstraintState::seeded(&existing, &dataset);

        let module = dataset
            .module(request.module_id)
            .ok_or_else(|| {
                SchedulerError::Conflict(format!("模块不存在: {}", request.module_id))
            })?;
        let room = dataset
            .room(request.room_id)
            .ok_or_else(|| {
                SchedulerError::Conflict(format!("考场不存在: {}", request.room_id))
            })?;
        if dataset.proctor(request.proctor_id).is_none() {
            return Err(SchedulerError::Conflict(format!(
                "监考不存在: {}",
                request.proctor_id
            )));
        }

        let students = dataset.students_of(module.module_id);
        let (date, slot) = (request.date, &request.slot);

        if state.is_module_placed(module.module_id) {
            return Err(SchedulerError::Conflict(format!(
                "模块 {} 已有场次",
                module.module_id
            )));
        }
        if !state.is_room_free(room.room_id, date, slot) {
            return Err(SchedulerError::Conflict(format!(
                "考场 {} 在 {} {} 已被占用",
                room.room_id, date, slot
            )));
        }
        if state.proctor_load(request.proctor_id, date) >= self.config.proctor_daily_cap {
            return Err(SchedulerError::Conflict(format!(
                "监考 {} 在 {} 已达每日上限 {}",
                request.proctor_id, date, self.config.proctor_daily_cap
            )));
        }
        if state.is_proctor_busy(request.proctor_id, date, slot) {
            return Err(SchedulerError::Conflict(format!(
                "监考 {} 在 {} {} 已在其他考场监考",
                request.proctor_id, date, slot
            )));
        }
        if state.any_student_busy(students, date) {
            return Err(SchedulerError::Conflict(format!(
                "模块 {} 有学生在 {} 已有考试",
                module.module_id, date
            )));
        }
        if room.capacity < students.len() {
            return Err(SchedulerError::Conflict(format!(
                "考场 {} 容量 {} 不足选课人数 {}",
                room.room_id,
                room.capacity,
                students.len()
            )));
        }

        let mut rng = self.make_rng(None);
        let roster = split_roster(students, &[room], &mut rng)
            .into_iter()
            .next()
            .unwrap_or_default();

        let session = ExamSession {
            module_id: module.module_id,
            date,
            slot: request.slot,
            assignments: vec![RoomAssignment {
                session_id: None,
                room_id: room.room_id,
                proctor_id: request.proctor_id,
                students: roster,
            }],
        };

        self.session_repo
            .persist(std::slice::from_ref(&session), PersistMode::Append, None)
            .map_err(SchedulerError::Persistence)?;

        info!(room_id = room.room_id, proctor_id = request.proctor_id, "人工场次已写入");
        Ok(session)
    }
}
