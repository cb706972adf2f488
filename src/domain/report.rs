// ==========================================
// 期末考试排考系统 - 排考运行报告
// ==========================================
// 用途: 向调用方返回新建场次数与未能排入的模块
// ==========================================

use crate::domain::types::{FormationId, ModuleId, PersistMode, RoomKind};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// GenerationRequest - 排考请求
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub formation_ids: Vec<FormationId>, // 为空表示全部模块
    pub mode: PersistMode,
    pub seed: Option<u64>, // 覆盖配置中的 shuffle_seed
}

impl GenerationRequest {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate, mode: PersistMode) -> Self {
        Self {
            start_date,
            end_date,
            formation_ids: Vec::new(),
            mode,
            seed: None,
        }
    }

    pub fn with_formations(mut self, formation_ids: Vec<FormationId>) -> Self {
        self.formation_ids = formation_ids;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

// ==========================================
// UnscheduledModule - 未能排入的模块
// ==========================================
// 非致命: 记录诊断计数后继续处理下一模块
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnscheduledModule {
    pub module_id: ModuleId,
    pub enrolled: usize,
    pub days_blocked_by_students: usize, // 因学生当日已有考试而跳过的天数
    pub slots_short_of_rooms: usize,     // 空闲考场容量不足的时间段数
    pub slots_short_of_proctors: usize,  // 可用监考不足的时间段数
}

// ==========================================
// GenerationReport - 排考运行结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationReport {
    pub run_id: String,
    pub mode: PersistMode,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub sessions_created: usize, // 新写入的场次行数 (每考场一行)
    pub modules_placed: usize,
    pub skipped_already_placed: usize,
    pub skipped_empty: usize,
    pub unscheduled: Vec<UnscheduledModule>,
}

impl GenerationReport {
    pub fn is_complete(&self) -> bool {
        self.unscheduled.is_empty()
    }
}

// ==========================================
// RoomKindUsage - 考场类型使用分布
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomKindUsage {
    pub kind: RoomKind,
    pub session_count: usize,
    pub avg_capacity: f64,
}
