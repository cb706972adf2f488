// ==========================================
// 期末考试排考系统 - 时段搜索
// ==========================================
// 职责: 为单个模块在排考窗口内找第一个可行的 (日期, 时间段)
// 规则:
// 1) 日期按先后遍历; 任一选课学生当日已有考试则整天跳过
// 2) 时间段按配置顺序遍历; 考场分配 + 监考分配都成功才算可行
// 3) 首个可行即返回 (贪心 first-fit, 无回溯, 非全局最优)
// 4) 整个窗口无可行解: 返回诊断计数, 非致命
// ==========================================

use crate::config::SchedulerConfig;
use crate::domain::catalog::{Module, Room};
use crate::domain::report::UnscheduledModule;
use crate::domain::types::{ProctorId, StudentId, TimeSlot};
use crate::engine::constraint_state::ConstraintState;
use crate::engine::dataset::Dataset;
use crate::engine::proctor_assigner::ProctorAssigner;
use crate::engine::room_allocator::RoomAllocator;
use chrono::NaiveDate;
use tracing::trace;

/// 可行安排（尚未提交到约束状态）
#[derive(Debug, Clone)]
pub struct Placement<'a> {
    pub date: NaiveDate,
    pub slot: TimeSlot,
    pub rooms: Vec<&'a Room>,
    pub proctors: Vec<ProctorId>, // 与 rooms 一一对应
}

// ==========================================
// SlotSearch - 时段搜索
// ==========================================
pub struct SlotSearch<'c> {
    slots: &'c [TimeSlot],
    room_allocator: RoomAllocator,
    proctor_assigner: ProctorAssigner,
}

impl<'c> SlotSearch<'c> {
    pub fn new(config: &'c SchedulerConfig) -> Self {
        Self {
            slots: &config.time_slots,
            room_allocator: RoomAllocator::new(config.large_class_threshold),
            proctor_assigner: ProctorAssigner::new(
                config.proctor_daily_cap,
                config.department_match_bonus,
            ),
        }
    }

    /// 搜索第一个可行的 (日期, 时间段)
    ///
    /// # 参数
    /// - `module`: 待排模块
    /// - `students`: 模块选课学生
    /// - `dataset`: 考场与监考来源
    /// - `state`: 只读约束状态
    /// - `start_date` / `end_date`: 闭区间窗口
    pub fn search<'d>(
        &self,
        module: &Module,
        students: &[StudentId],
        dataset: &'d Dataset,
        state: &ConstraintState,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Placement<'d>, UnscheduledModule> {
        let mut miss = UnscheduledModule {
            module_id: module.module_id,
            enrolled: module.enrolled_count,
            days_blocked_by_students: 0,
            slots_short_of_rooms: 0,
            slots_short_of_proctors: 0,
        };

        for date in start_date.iter_days().take_while(|d| *d <= end_date) {
            if state.any_student_busy(students, date) {
                miss.days_blocked_by_students += 1;
                continue;
            }

            for slot in self.slots {
                let rooms = match self.room_allocator.allocate(
                    dataset.rooms(),
                    state,
                    date,
                    slot,
                    module.enrolled_count,
                ) {
                    Some(rooms) => rooms,
                    None => {
                        miss.slots_short_of_rooms += 1;
                        continue;
                    }
                };

                let proctors = match self.proctor_assigner.assign(
                    dataset.proctors(),
                    state,
                    date,
                    slot,
                    module.department_id,
                    rooms.len(),
                ) {
                    Some(proctors) => proctors,
                    None => {
                        miss.slots_short_of_proctors += 1;
                        continue;
                    }
                };

                trace!(
                    module_id = module.module_id,
                    %date,
                    %slot,
                    rooms = rooms.len(),
                    "找到可行时段"
                );
                return Ok(Placement {
                    date,
                    slot: *slot,
                    rooms,
                    proctors,
                });
            }
        }

        Err(miss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::Proctor;
    use crate::domain::session::{ExamSession, RoomAssignment};
    use crate::domain::types::RoomKind;
    use std::collections::HashMap;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, d).unwrap()
    }

    fn dataset(rooms: &[usize], proctors: usize, enrolled: usize) -> Dataset {
        let modules = vec![Module {
            module_id: 1,
            name: "Analyse 1".to_string(),
            formation_id: 1,
            department_id: 1,
            enrolled_count: 0,
        }];
        let rooms = rooms
            .iter()
            .enumerate()
            .map(|(i, &capacity)| Room {
                room_id: i as i64 + 1,
                name: format!("R{}", i + 1),
                capacity,
                kind: RoomKind::Room,
            })
            .collect();
        let proctors = (1..=proctors as i64)
            .map(|id| Proctor {
                proctor_id: id,
                display_name: format!("P{}", id),
                department_id: Some(1),
            })
            .collect();
        let mut enrollments = HashMap::new();
        enrollments.insert(1, (1..=enrolled as i64).collect());
        Dataset::new(modules, rooms, proctors, enrollments)
    }

    #[test]
    fn test_first_day_first_slot_when_free() {
        let ds = dataset(&[20, 20], 2, 30);
        let config = SchedulerConfig::default();
        let module = &ds.modules()[0];

        let placement = SlotSearch::new(&config)
            .search(module, ds.students_of(1), &ds, &ConstraintState::new(), day(1), day(3))
            .unwrap();

        assert_eq!(placement.date, day(1));
        assert_eq!(placement.slot, config.time_slots[0]);
        assert_eq!(placement.rooms.len(), 2);
        assert_eq!(placement.proctors.len(), 2);
    }

    #[test]
    fn test_student_conflict_skips_whole_day() {
        let ds = dataset(&[20], 1, 10);
        let config = SchedulerConfig::default();
        let mut state = ConstraintState::new();
        // 学生 3 在 6/1 已有其他考试 (不同考场, 不同时段)
        state.commit(
            &ExamSession {
                module_id: 99,
                date: day(1),
                slot: config.time_slots[3],
                assignments: vec![RoomAssignment {
                    session_id: None,
                    room_id: 50,
                    proctor_id: 50,
                    students: vec![3],
                }],
            },
            &[3],
        );

        let placement = SlotSearch::new(&config)
            .search(&ds.modules()[0], ds.students_of(1), &ds, &state, day(1), day(2))
            .unwrap();
        assert_eq!(placement.date, day(2));
        assert_eq!(placement.slot, config.time_slots[0]);
    }

    #[test]
    fn test_exhausted_horizon_reports_reasons() {
        let ds = dataset(&[20], 0, 10);
        let config = SchedulerConfig::default();

        let state = ConstraintState::new();
        let miss = SlotSearch::new(&config)
            .search(&ds.modules()[0], ds.students_of(1), &ds, &state, day(1), day(2))
            .unwrap_err();
        assert_eq!(miss.module_id, 1);
        assert_eq!(miss.slots_short_of_proctors, 8);
        assert_eq!(miss.slots_short_of_rooms, 0);
        assert_eq!(miss.days_blocked_by_students, 0);
    }

    #[test]
    fn test_single_day_horizon_is_inclusive() {
        let ds = dataset(&[20], 1, 5);
        let config = SchedulerConfig::default();
        let state = ConstraintState::new();
        let placement = SlotSearch::new(&config)
            .search(&ds.modules()[0], ds.students_of(1), &ds, &state, day(4), day(4))
            .unwrap();
        assert_eq!(placement.date, day(4));
    }
}
