// ==========================================
// 期末考试排考系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 一次性批量排考 (贪心 first-fit, 人工复核结果)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 排考规则
pub mod engine;

// 配置层 - 排考参数
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{PersistMode, RoomKind, TimeSlot};

// 领域实体
pub use domain::{
    ExamSession, GenerationReport, GenerationRequest, Module, Proctor, Room, RoomAssignment,
    RoomKindUsage, UnscheduledModule,
};

// 配置
pub use config::{ConfigManager, SchedulerConfig};

// 引擎
pub use engine::{
    AuditViolation, ExamScheduler, ManualSessionRequest, ScheduleAuditor, SchedulerError,
    SchedulerResult,
};

// 仓储
pub use repository::{CatalogRepository, RepositoryError, SessionRepository};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "期末考试排考系统";
