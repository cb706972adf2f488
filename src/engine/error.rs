// ==========================================
// 期末考试排考系统 - 引擎层错误类型
// ==========================================
// 分类:
// - 数据完整性错误: 致命, 排考开始前即中止
// - 读取/持久化错误: 致命, 事务整体回滚
// - 模块无法排入: 非致命, 记入报告 (见 UnscheduledModule)
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 排考引擎错误
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("数据完整性错误: {entity} id={id}: {message}")]
    DataIntegrity {
        entity: String,
        id: String,
        message: String,
    },

    #[error("请求参数无效: {0}")]
    InvalidRequest(String),

    #[error("基础数据读取失败: {0}")]
    Load(#[source] RepositoryError),

    #[error("场次持久化失败: {0}")]
    Persistence(#[source] RepositoryError),

    #[error("人工排考冲突: {0}")]
    Conflict(String),
}

impl SchedulerError {
    pub fn integrity(entity: &str, id: impl ToString, message: impl Into<String>) -> Self {
        SchedulerError::DataIntegrity {
            entity: entity.to_string(),
            id: id.to_string(),
            message: message.into(),
        }
    }
}

/// Result 类型别名
pub type SchedulerResult<T> = Result<T, SchedulerError>;
