// ==========================================
// 期末考试排考系统 - 考试场次领域模型
// ==========================================
// ExamSession: 一个模块在某日某时间段的一场考试, 可跨多个考场
// RoomAssignment: 考场 + 监考 + 座位名单
// 红线: 场次创建后不可修改, 仅在覆盖模式下整体删除
// ==========================================

use crate::domain::types::{ModuleId, ProctorId, RoomId, StudentId, TimeSlot};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// RoomAssignment - 考场分配
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomAssignment {
    pub session_id: Option<i64>, // 落库后的 exam_sessions.id (新建时为 None)
    pub room_id: RoomId,
    pub proctor_id: ProctorId,
    pub students: Vec<StudentId>, // 座位顺序即 seat_number - 1
}

// ==========================================
// ExamSession - 考试场次
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamSession {
    pub module_id: ModuleId,
    pub date: NaiveDate,
    pub slot: TimeSlot,
    pub assignments: Vec<RoomAssignment>,
}

impl ExamSession {
    /// 本场次入座学生总数
    pub fn seated_count(&self) -> usize {
        self.assignments.iter().map(|a| a.students.len()).sum()
    }

    /// 本场次全部入座学生
    pub fn seated_students(&self) -> impl Iterator<Item = StudentId> + '_ {
        self.assignments.iter().flat_map(|a| a.students.iter().copied())
    }
}
