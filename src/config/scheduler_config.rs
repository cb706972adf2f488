// ==========================================
// 期末考试排考系统 - 排考引擎参数
// ==========================================
// 缺省值即内置常量; config_kv 中的覆写由 ConfigManager 合并
// 校验: 时间段非空、起止有效、按时间升序且互不重叠; 每日上限 > 0
// ==========================================

use crate::domain::types::TimeSlot;
use serde::{Deserialize, Serialize};

/// 大班阈值: 选课人数超过该值时考场按容量降序挑选 (优先阶梯教室)
pub const DEFAULT_LARGE_CLASS_THRESHOLD: usize = 45;

/// 监考教师每日最多监考场次
pub const DEFAULT_PROCTOR_DAILY_CAP: u32 = 3;

/// 监考教师与模块同院系时的加分
pub const DEFAULT_DEPARTMENT_MATCH_BONUS: i64 = 10;

/// 排考引擎参数
///
/// 存储位置：config_kv（scope_id='global'，key 见 `config_keys`）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_large_class_threshold")]
    pub large_class_threshold: usize,

    #[serde(default = "default_proctor_daily_cap")]
    pub proctor_daily_cap: u32,

    #[serde(default = "default_department_match_bonus")]
    pub department_match_bonus: i64,

    /// 每日可用时间段（按时间先后, 首个可行时间段即被采用）
    #[serde(default = "TimeSlot::default_day")]
    pub time_slots: Vec<TimeSlot>,

    /// 座位打乱的随机种子（None 时每次运行随机）
    #[serde(default)]
    pub shuffle_seed: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            large_class_threshold: DEFAULT_LARGE_CLASS_THRESHOLD,
            proctor_daily_cap: DEFAULT_PROCTOR_DAILY_CAP,
            department_match_bonus: DEFAULT_DEPARTMENT_MATCH_BONUS,
            time_slots: TimeSlot::default_day(),
            shuffle_seed: None,
        }
    }
}

impl SchedulerConfig {
    /// 校验参数
    ///
    /// 时间段必须非空, 每段 start < end, 且按时间升序互不重叠
    pub fn validate(&self) -> Result<(), String> {
        if self.time_slots.is_empty() {
            return Err("time_slots 不能为空".to_string());
        }
        if let Some(slot) = self.time_slots.iter().find(|s| s.start >= s.end) {
            return Err(format!("时间段起止无效: {}", slot));
        }
        if self.time_slots.windows(2).any(|w| w[0].end > w[1].start) {
            return Err("time_slots 必须按时间升序且互不重叠".to_string());
        }
        if self.proctor_daily_cap == 0 {
            return Err("proctor_daily_cap 必须大于 0".to_string());
        }
        Ok(())
    }
}

fn default_large_class_threshold() -> usize {
    DEFAULT_LARGE_CLASS_THRESHOLD
}

fn default_proctor_daily_cap() -> u32 {
    DEFAULT_PROCTOR_DAILY_CAP
}

fn default_department_match_bonus() -> i64 {
    DEFAULT_DEPARTMENT_MATCH_BONUS
}
