// ==========================================
// 期末考试排考系统 - 排考结果审计
// ==========================================
// 职责: 对已落库 (历史 + 新建) 场次复核全部硬约束, 输出冲突清单
// 检查项:
// 1) 考场入座人数 ≤ 容量
// 2) 学生同日至多一场考试
// 3) 监考同日至多 N 场
// 4) 考场同日同时段至多一场
// 5) 模块至多一个场次
// 6) 监考同日同时段至多一个考场
// ==========================================

use crate::config::SchedulerConfig;
use crate::domain::session::ExamSession;
use crate::domain::types::{ModuleId, ProctorId, RoomId, StudentId};
use crate::engine::dataset::Dataset;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// 冲突项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditViolation {
    RoomOverCapacity {
        room_id: RoomId,
        module_id: ModuleId,
        seated: usize,
        capacity: usize,
    },
    UnknownRoom {
        room_id: RoomId,
        module_id: ModuleId,
    },
    StudentDoubleBooked {
        student_id: StudentId,
        date: NaiveDate,
        sessions: usize,
    },
    ProctorOverloaded {
        proctor_id: ProctorId,
        date: NaiveDate,
        assignments: u32,
        cap: u32,
    },
    ProctorDoubleBooked {
        proctor_id: ProctorId,
        date: NaiveDate,
        slot_start: NaiveTime,
    },
    RoomDoubleBooked {
        room_id: RoomId,
        date: NaiveDate,
        slot_start: NaiveTime,
    },
    ModuleScheduledTwice {
        module_id: ModuleId,
        sessions: usize,
    },
}

impl fmt::Display for AuditViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditViolation::RoomOverCapacity { room_id, module_id, seated, capacity } => write!(
                f,
                "ROOM_OVER_CAPACITY: room={} module={} seated={} capacity={}",
                room_id, module_id, seated, capacity
            ),
            AuditViolation::UnknownRoom { room_id, module_id } => {
                write!(f, "UNKNOWN_ROOM: room={} module={}", room_id, module_id)
            }
            AuditViolation::StudentDoubleBooked { student_id, date, sessions } => write!(
                f,
                "STUDENT_DOUBLE_BOOKED: student={} date={} sessions={}",
                student_id, date, sessions
            ),
            AuditViolation::ProctorOverloaded { proctor_id, date, assignments, cap } => write!(
                f,
                "PROCTOR_OVERLOADED: proctor={} date={} assignments={} cap={}",
                proctor_id, date, assignments, cap
            ),
            AuditViolation::ProctorDoubleBooked { proctor_id, date, slot_start } => write!(
                f,
                "PROCTOR_DOUBLE_BOOKED: proctor={} date={} slot={}",
                proctor_id, date, slot_start
            ),
            AuditViolation::RoomDoubleBooked { room_id, date, slot_start } => write!(
                f,
                "ROOM_DOUBLE_BOOKED: room={} date={} slot={}",
                room_id, date, slot_start
            ),
            AuditViolation::ModuleScheduledTwice { module_id, sessions } => {
                write!(f, "MODULE_SCHEDULED_TWICE: module={} sessions={}", module_id, sessions)
            }
        }
    }
}

// ==========================================
// ScheduleAuditor - 审计器
// ==========================================
pub struct ScheduleAuditor {
    proctor_daily_cap: u32,
}

impl ScheduleAuditor {
    pub fn new(config: &SchedulerConfig) -> Self {
        Self {
            proctor_daily_cap: config.proctor_daily_cap,
        }
    }

    /// 审计场次集合
    ///
    /// # 返回
    /// 冲突清单（空表示无冲突）, 按检查项分组、键有序
    pub fn audit(&self, dataset: &Dataset, sessions: &[ExamSession]) -> Vec<AuditViolation> {
        let mut violations = Vec::new();

        let mut module_sessions: BTreeMap<ModuleId, usize> = BTreeMap::new();
        let mut student_days: BTreeMap<(StudentId, NaiveDate), usize> = BTreeMap::new();
        let mut proctor_days: BTreeMap<(ProctorId, NaiveDate), u32> = BTreeMap::new();
        let mut proctor_slots: BTreeMap<(ProctorId, NaiveDate, NaiveTime), usize> = BTreeMap::new();
        let mut room_slots: BTreeMap<(RoomId, NaiveDate, NaiveTime), usize> = BTreeMap::new();

        for session in sessions {
            *module_sessions.entry(session.module_id).or_insert(0) += 1;

            // 同一场次内学生只计一次
            let students: HashSet<StudentId> = session.seated_students().collect();
            for student_id in students {
                *student_days.entry((student_id, session.date)).or_insert(0) += 1;
            }

            for assignment in &session.assignments {
                match dataset.room(assignment.room_id) {
                    Some(room) if assignment.students.len() > room.capacity => {
                        violations.push(AuditViolation::RoomOverCapacity {
                            room_id: room.room_id,
                            module_id: session.module_id,
                            seated: assignment.students.len(),
                            capacity: room.capacity,
                        });
                    }
                    Some(_) => {}
                    None => violations.push(AuditViolation::UnknownRoom {
                        room_id: assignment.room_id,
                        module_id: session.module_id,
                    }),
                }

                *proctor_days.entry((assignment.proctor_id, session.date)).or_insert(0) += 1;
                *proctor_slots
                    .entry((assignment.proctor_id, session.date, session.slot.start))
                    .or_insert(0) += 1;
                *room_slots
                    .entry((assignment.room_id, session.date, session.slot.start))
                    .or_insert(0) += 1;
            }
        }

        violations.extend(
            student_days
                .into_iter()
                .filter(|(_, n)| *n > 1)
                .map(|((student_id, date), sessions)| AuditViolation::StudentDoubleBooked {
                    student_id,
                    date,
                    sessions,
                }),
        );
        violations.extend(
            proctor_days
                .into_iter()
                .filter(|(_, n)| *n > self.proctor_daily_cap)
                .map(|((proctor_id, date), assignments)| AuditViolation::ProctorOverloaded {
                    proctor_id,
                    date,
                    assignments,
                    cap: self.proctor_daily_cap,
                }),
        );
        violations.extend(
            proctor_slots
                .into_iter()
                .filter(|(_, n)| *n > 1)
                .map(|((proctor_id, date, slot_start), _)| AuditViolation::ProctorDoubleBooked {
                    proctor_id,
                    date,
                    slot_start,
                }),
        );
        violations.extend(
            room_slots
                .into_iter()
                .filter(|(_, n)| *n > 1)
                .map(|((room_id, date, slot_start), _)| AuditViolation::RoomDoubleBooked {
                    room_id,
                    date,
                    slot_start,
                }),
        );
        violations.extend(
            module_sessions
                .into_iter()
                .filter(|(_, n)| *n > 1)
                .map(|(module_id, sessions)| AuditViolation::ModuleScheduledTwice {
                    module_id,
                    sessions,
                }),
        );

        violations
    }
}
