// ==========================================
// 期末考试排考系统 - 领域类型定义
// ==========================================
// 职责: 标识符别名、考场类型、持久化模式、时间段
// ==========================================

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ===== 标识符 (与数据库 INTEGER 主键一致) =====
pub type ModuleId = i64;
pub type RoomId = i64;
pub type ProctorId = i64;
pub type StudentId = i64;
pub type DepartmentId = i64;
pub type FormationId = i64;

/// 时间段字符串格式 (HH:MM)
pub const SLOT_TIME_FORMAT: &str = "%H:%M";

// ==========================================
// 考场类型 (Room Kind)
// ==========================================
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomKind {
    Room,  // 普通教室
    Amphi, // 阶梯教室
}

impl fmt::Display for RoomKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomKind::Room => write!(f, "ROOM"),
            RoomKind::Amphi => write!(f, "AMPHI"),
        }
    }
}

impl FromStr for RoomKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ROOM" | "SALLE" => Ok(RoomKind::Room),
            "AMPHI" | "AMPHITHEATER" => Ok(RoomKind::Amphi),
            other => Err(format!("未知考场类型: {}", other)),
        }
    }
}

// ==========================================
// 持久化模式 (Persist Mode)
// ==========================================
// Overwrite: 清空已有考试后写入
// Append: 保留已有考试, 仅排未排模块
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PersistMode {
    Overwrite,
    Append,
}

impl PersistMode {
    pub fn from_append_flag(append: bool) -> Self {
        if append {
            PersistMode::Append
        } else {
            PersistMode::Overwrite
        }
    }

    pub fn is_append(&self) -> bool {
        matches!(self, PersistMode::Append)
    }
}

impl fmt::Display for PersistMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistMode::Overwrite => write!(f, "OVERWRITE"),
            PersistMode::Append => write!(f, "APPEND"),
        }
    }
}

// ==========================================
// 时间段 (Time Slot)
// ==========================================
// 以 start 作为同日内的唯一键
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeSlot {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// 由 "HH:MM" 字符串构造
    pub fn parse(start: &str, end: &str) -> Result<Self, chrono::ParseError> {
        Ok(Self {
            start: NaiveTime::parse_from_str(start.trim(), SLOT_TIME_FORMAT)?,
            end: NaiveTime::parse_from_str(end.trim(), SLOT_TIME_FORMAT)?,
        })
    }

    pub fn start_str(&self) -> String {
        self.start.format(SLOT_TIME_FORMAT).to_string()
    }

    pub fn end_str(&self) -> String {
        self.end.format(SLOT_TIME_FORMAT).to_string()
    }

    /// 默认四个时间段: 08:30-10:00, 10:30-12:00, 13:00-14:30, 15:00-16:30
    pub fn default_day() -> Vec<TimeSlot> {
        [(8, 30, 10, 0), (10, 30, 12, 0), (13, 0, 14, 30), (15, 0, 16, 30)]
            .iter()
            .filter_map(|&(sh, sm, eh, em)| {
                Some(TimeSlot::new(
                    NaiveTime::from_hms_opt(sh, sm, 0)?,
                    NaiveTime::from_hms_opt(eh, em, 0)?,
                ))
            })
            .collect()
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start_str(), self.end_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_day_has_four_ordered_slots() {
        let slots = TimeSlot::default_day();
        assert_eq!(slots.len(), 4);
        assert_eq!(slots[0].to_string(), "08:30-10:00");
        assert_eq!(slots[3].to_string(), "15:00-16:30");
        assert!(slots.windows(2).all(|w| w[0].end <= w[1].start));
    }

    #[test]
    fn test_room_kind_parse_accepts_legacy_labels() {
        assert_eq!("Salle".parse::<RoomKind>().unwrap(), RoomKind::Room);
        assert_eq!("amphi".parse::<RoomKind>().unwrap(), RoomKind::Amphi);
        assert!("LAB".parse::<RoomKind>().is_err());
    }

    #[test]
    fn test_persist_mode_from_flag() {
        assert_eq!(PersistMode::from_append_flag(true), PersistMode::Append);
        assert!(!PersistMode::from_append_flag(false).is_append());
    }
}
