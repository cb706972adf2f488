// ==========================================
// 期末考试排考系统 - 基础数据快照
// ==========================================
// 职责: 运行开始时一次性加载模块/考场/监考/选课, 构建内存查找结构
// 红线: 完整性问题在排考前即报错, 不进入排考流程
// ==========================================

use crate::domain::catalog::{Module, Proctor, Room};
use crate::domain::types::{ModuleId, ProctorId, RoomId, RoomKind, StudentId};
use crate::engine::error::{SchedulerError, SchedulerResult};
use crate::repository::CatalogRepository;
use std::collections::{HashMap, HashSet};
use tracing::{info, instrument};

// ==========================================
// Dataset - 单次运行的只读快照
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    modules: Vec<Module>,
    rooms: Vec<Room>,
    proctors: Vec<Proctor>,
    enrollments: HashMap<ModuleId, Vec<StudentId>>,
    module_index: HashMap<ModuleId, usize>,
    room_index: HashMap<RoomId, usize>,
    proctor_index: HashMap<ProctorId, usize>,
}

impl Dataset {
    /// 构建快照
    ///
    /// 说明：
    /// - 模块的 enrolled_count 以选课名单长度为准（去重后）
    /// - 各列表保持传入顺序, 作为排序时的稳定次序
    pub fn new(
        mut modules: Vec<Module>,
        rooms: Vec<Room>,
        proctors: Vec<Proctor>,
        enrollments: HashMap<ModuleId, Vec<StudentId>>,
    ) -> Self {
        let enrollments: HashMap<ModuleId, Vec<StudentId>> = enrollments
            .into_iter()
            .map(|(module_id, students)| {
                let mut seen = HashSet::new();
                let unique: Vec<StudentId> =
                    students.into_iter().filter(|s| seen.insert(*s)).collect();
                (module_id, unique)
            })
            .collect();

        for module in &mut modules {
            module.enrolled_count = enrollments.get(&module.module_id).map_or(0, |s| s.len());
        }

        let module_index = modules.iter().enumerate().map(|(i, m)| (m.module_id, i)).collect();
        let room_index = rooms.iter().enumerate().map(|(i, r)| (r.room_id, i)).collect();
        let proctor_index = proctors.iter().enumerate().map(|(i, p)| (p.proctor_id, i)).collect();

        Self {
            modules,
            rooms,
            proctors,
            enrollments,
            module_index,
            room_index,
            proctor_index,
        }
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn proctors(&self) -> &[Proctor] {
        &self.proctors
    }

    pub fn module(&self, module_id: ModuleId) -> Option<&Module> {
        self.module_index.get(&module_id).map(|&i| &self.modules[i])
    }

    pub fn room(&self, room_id: RoomId) -> Option<&Room> {
        self.room_index.get(&room_id).map(|&i| &self.rooms[i])
    }

    pub fn proctor(&self, proctor_id: ProctorId) -> Option<&Proctor> {
        self.proctor_index.get(&proctor_id).map(|&i| &self.proctors[i])
    }

    /// 模块选课学生名单（无选课时为空切片）
    pub fn students_of(&self, module_id: ModuleId) -> &[StudentId] {
        self.enrollments.get(&module_id).map(|s| s.as_slice()).unwrap_or(&[])
    }
}

// ==========================================
// DatasetLoader - 快照加载器
// ==========================================
pub struct DatasetLoader<'a> {
    repo: &'a CatalogRepository,
}

impl<'a> DatasetLoader<'a> {
    pub fn new(repo: &'a CatalogRepository) -> Self {
        Self { repo }
    }

    /// 加载并校验基础数据
    ///
    /// # 错误
    /// - DataIntegrity: 模块引用的专业/院系不存在、考场容量非正、考场类型未知、
    ///   选课引用了不存在的模块
    /// - Load: 数据库读取失败
    #[instrument(skip(self))]
    pub fn load(&self) -> SchedulerResult<Dataset> {
        let module_rows = self.repo.list_modules().map_err(SchedulerError::Load)?;
        let room_rows = self.repo.list_rooms().map_err(SchedulerError::Load)?;
        let proctor_rows = self.repo.list_proctors().map_err(SchedulerError::Load)?;
        let enrollment_rows = self.repo.list_enrollments().map_err(SchedulerError::Load)?;

        let mut modules = Vec::with_capacity(module_rows.len());
        for row in module_rows {
            let formation_id = match (row.formation_ref, row.formation_id) {
                (Some(_), Some(id)) => id,
                (None, _) => {
                    return Err(SchedulerError::integrity(
                        "module",
                        row.module_id,
                        "未关联专业",
                    ));
                }
                (Some(missing), None) => {
                    return Err(SchedulerError::integrity(
                        "module",
                        row.module_id,
                        format!("引用的专业不存在: formation_id={}", missing),
                    ));
                }
            };
            let department_id = row.department_id.ok_or_else(|| {
                SchedulerError::integrity(
                    "module",
                    row.module_id,
                    format!("专业 {} 未关联有效院系", formation_id),
                )
            })?;

            modules.push(Module {
                module_id: row.module_id,
                name: row.name,
                formation_id,
                department_id,
                enrolled_count: 0,
            });
        }

        let mut rooms = Vec::with_capacity(room_rows.len());
        for row in room_rows {
            if row.capacity <= 0 {
                return Err(SchedulerError::integrity(
                    "room",
                    row.room_id,
                    format!("容量必须为正: {}", row.capacity),
                ));
            }
            let kind = row
                .kind
                .parse::<RoomKind>()
                .map_err(|e| SchedulerError::integrity("room", row.room_id, e))?;
            rooms.push(Room {
                room_id: row.room_id,
                name: row.name,
                capacity: row.capacity as usize,
                kind,
            });
        }

        let proctors: Vec<Proctor> = proctor_rows
            .into_iter()
            .map(|row| Proctor {
                proctor_id: row.proctor_id,
                display_name: format!("{} {}", row.last_name, row.first_name).trim().to_string(),
                department_id: row.department_id,
            })
            .collect();

        let known: HashSet<ModuleId> = modules.iter().map(|m| m.module_id).collect();
        let mut enrollments: HashMap<ModuleId, Vec<StudentId>> = HashMap::new();
        for (module_id, student_id) in enrollment_rows {
            if !known.contains(&module_id) {
                return Err(SchedulerError::integrity(
                    "enrollment",
                    format!("{}/{}", module_id, student_id),
                    "选课引用的模块不存在",
                ));
            }
            enrollments.entry(module_id).or_default().push(student_id);
        }

        let dataset = Dataset::new(modules, rooms, proctors, enrollments);
        info!(
            modules = dataset.modules().len(),
            rooms = dataset.rooms().len(),
            proctors = dataset.proctors().len(),
            "基础数据快照加载完成"
        );
        Ok(dataset)
    }
}
