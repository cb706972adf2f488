// ==========================================
// 期末考试排考系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::scheduler_config::SchedulerConfig;
use crate::db::open_sqlite_connection;
use crate::domain::types::TimeSlot;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(format!("锁获取失败: {}", e)))
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在 (含 config_kv 表不存在)
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;

        let has_table: bool = conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type='table' AND name='config_kv' LIMIT 1",
                [],
                |_row| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        if !has_table {
            return Ok(None);
        }

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        Ok(value)
    }

    /// 写入 global scope 配置（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 读取并解析数值型配置
    fn get_parsed<T: FromStr>(&self, key: &str) -> RepositoryResult<Option<T>>
    where
        T::Err: std::fmt::Display,
    {
        match self.get_global_config_value(key)? {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse::<T>()
                .map(Some)
                .map_err(|e| RepositoryError::FieldValueError {
                    field: key.to_string(),
                    message: format!("无法解析 '{}': {}", raw, e),
                }),
        }
    }

    /// 读取时间段配置
    ///
    /// 格式为 JSON: [["08:30","10:00"],["10:30","12:00"]]
    fn get_time_slots(&self) -> RepositoryResult<Option<Vec<TimeSlot>>> {
        let raw = match self.get_global_config_value(config_keys::TIME_SLOTS)? {
            Some(v) => v,
            None => return Ok(None),
        };

        let field_error = |message: String| RepositoryError::FieldValueError {
            field: config_keys::TIME_SLOTS.to_string(),
            message,
        };

        let pairs: Vec<(String, String)> =
            serde_json::from_str(&raw).map_err(|e| field_error(e.to_string()))?;
        pairs
            .iter()
            .map(|(start, end)| {
                TimeSlot::parse(start, end)
                    .map_err(|e| field_error(format!("{}-{}: {}", start, end, e)))
            })
            .collect::<RepositoryResult<Vec<TimeSlot>>>()
            .map(Some)
    }

    /// 加载排考引擎参数（缺省值 + config_kv 覆写）
    pub fn load_scheduler_config(&self) -> RepositoryResult<SchedulerConfig> {
        let mut config = SchedulerConfig::default();

        if let Some(v) = self.get_parsed::<usize>(config_keys::LARGE_CLASS_THRESHOLD)? {
            config.large_class_threshold = v;
        }
        if let Some(v) = self.get_parsed::<u32>(config_keys::PROCTOR_DAILY_CAP)? {
            config.proctor_daily_cap = v;
        }
        if let Some(v) = self.get_parsed::<i64>(config_keys::DEPARTMENT_MATCH_BONUS)? {
            config.department_match_bonus = v;
        }
        if let Some(slots) = self.get_time_slots()? {
            config.time_slots = slots;
        }
        if let Some(v) = self.get_parsed::<u64>(config_keys::SHUFFLE_SEED)? {
            config.shuffle_seed = Some(v);
        }

        config.validate().map_err(RepositoryError::ValidationError)?;
        Ok(config)
    }

    /// 获取所有 global 配置的快照
    pub fn get_config_snapshot(&self) -> RepositoryResult<HashMap<String, String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut config_map = HashMap::new();
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }
        Ok(config_map)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    pub const LARGE_CLASS_THRESHOLD: &str = "exam.large_class_threshold";
    pub const PROCTOR_DAILY_CAP: &str = "exam.proctor_daily_cap";
    pub const DEPARTMENT_MATCH_BONUS: &str = "exam.department_match_bonus";
    pub const TIME_SLOTS: &str = "exam.time_slots"; // JSON
    pub const SHUFFLE_SEED: &str = "exam.shuffle_seed";
}
