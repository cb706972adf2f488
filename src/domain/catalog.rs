// ==========================================
// 期末考试排考系统 - 基础数据领域模型
// ==========================================
// 职责: 模块、考场、监考教师 (单次排考运行内不可变)
// ==========================================

use crate::domain::types::{DepartmentId, FormationId, ModuleId, ProctorId, RoomId, RoomKind};
use serde::{Deserialize, Serialize};

// ==========================================
// Module - 课程模块 (一门课程对应一场考试)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub module_id: ModuleId,
    pub name: String,
    pub formation_id: FormationId,  // 所属专业
    pub department_id: DepartmentId, // 所属院系 (经专业关联)
    pub enrolled_count: usize,      // 选课人数
}

// ==========================================
// Room - 考场
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub room_id: RoomId,
    pub name: String,
    pub capacity: usize,
    pub kind: RoomKind,
}

// ==========================================
// Proctor - 监考教师
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proctor {
    pub proctor_id: ProctorId,
    pub display_name: String,
    pub department_id: Option<DepartmentId>,
}
