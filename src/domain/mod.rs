// ==========================================
// 期末考试排考系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑, 不含引擎逻辑
// ==========================================

pub mod catalog;
pub mod report;
pub mod session;
pub mod types;

// 重导出核心类型
pub use catalog::{Module, Proctor, Room};
pub use report::{GenerationReport, GenerationRequest, RoomKindUsage, UnscheduledModule};
pub use session::{ExamSession, RoomAssignment};
pub use types::{
    DepartmentId, FormationId, ModuleId, PersistMode, ProctorId, RoomId, RoomKind, StudentId,
    TimeSlot,
};
