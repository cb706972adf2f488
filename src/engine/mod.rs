// ==========================================
// 期末考试排考系统 - 引擎层
// ==========================================
// 职责: 实现排考规则, 不拼 SQL
// 红线: Engine 不拼 SQL; 未能排入的模块必须输出诊断原因
// ==========================================

pub mod audit;
pub mod constraint_state;
pub mod dataset;
pub mod error;
pub mod ordering;
pub mod orchestrator;
pub mod proctor_assigner;
pub mod room_allocator;
pub mod roster_splitter;
pub mod slot_search;

// 重导出核心引擎
pub use audit::{AuditViolation, ScheduleAuditor};
pub use constraint_state::ConstraintState;
pub use dataset::{Dataset, DatasetLoader};
pub use error::{SchedulerError, SchedulerResult};
pub use ordering::{ModuleOrder, ModuleSorter};
pub use orchestrator::{plan_sessions, ExamScheduler, ManualSessionRequest, PlanOutcome};
pub use proctor_assigner::{ProctorAssigner, ProctorCandidate};
pub use room_allocator::RoomAllocator;
pub use roster_splitter::split_roster;
pub use slot_search::{Placement, SlotSearch};
