// ==========================================
// 期末考试排考系统 - 约束状态
// ==========================================
// 跟踪三类资源的占用:
// - 监考: (proctor, date) → 当日监考数; (proctor, date, slot) → 是否已在该时段监考
// - 学生: (student, date) → 当日是否已有考试
// - 考场: (room, date, slot) → 是否占用
// 红线: 只在整场安排 (考场 + 监考 + 名单) 确定后一次性提交, 不留部分预占
// ==========================================

use crate::domain::session::ExamSession;
use crate::domain::types::{ModuleId, ProctorId, RoomId, StudentId, TimeSlot};
use crate::engine::dataset::Dataset;
use chrono::{NaiveDate, NaiveTime};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default)]
pub struct ConstraintState {
    proctor_daily_load: HashMap<(ProctorId, NaiveDate), u32>,
    proctor_slots: HashSet<(ProctorId, NaiveDate, NaiveTime)>,
    student_days: HashSet<(StudentId, NaiveDate)>,
    room_slots: HashSet<(RoomId, NaiveDate, NaiveTime)>,
    placed_modules: HashSet<ModuleId>,
}

impl ConstraintState {
    /// 空状态（覆盖模式）
    pub fn new() -> Self {
        Self::default()
    }

    /// 以已落库场次回放得到的状态（追加模式）
    ///
    /// 每个已有场次: 监考计数 +1、考场时段占用、
    /// 模块全部选课学生与实际入座学生当日标记为占用
    pub fn seeded(existing: &[ExamSession], dataset: &Dataset) -> Self {
        let mut state = Self::new();
        for session in existing {
            state.commit(session, dataset.students_of(session.module_id));
        }
        state
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn proctor_load(&self, proctor_id: ProctorId, date: NaiveDate) -> u32 {
        self.proctor_daily_load.get(&(proctor_id, date)).copied().unwrap_or(0)
    }

    pub fn is_proctor_busy(&self, proctor_id: ProctorId, date: NaiveDate, slot: &TimeSlot) -> bool {
        self.proctor_slots.contains(&(proctor_id, date, slot.start))
    }

    pub fn is_student_busy(&self, student_id: StudentId, date: NaiveDate) -> bool {
        self.student_days.contains(&(student_id, date))
    }

    /// 任一学生当日已有考试即返回 true（按天粒度, 与时间段无关）
    pub fn any_student_busy(&self, students: &[StudentId], date: NaiveDate) -> bool {
        students.iter().any(|&s| self.is_student_busy(s, date))
    }

    pub fn is_room_free(&self, room_id: RoomId, date: NaiveDate, slot: &TimeSlot) -> bool {
        !self.room_slots.contains(&(room_id, date, slot.start))
    }

    pub fn is_module_placed(&self, module_id: ModuleId) -> bool {
        self.placed_modules.contains(&module_id)
    }

    // ==========================================
    // 提交
    // ==========================================

    /// 提交一个完整场次
    ///
    /// # 参数
    /// - `session`: 已完成考场/监考/名单分配的场次
    /// - `enrolled`: 模块全部选课学生（当日标记为占用）
    pub fn commit(&mut self, session: &ExamSession, enrolled: &[StudentId]) {
        let date = session.date;
        let start = session.slot.start;

        for assignment in &session.assignments {
            *self
                .proctor_daily_load
                .entry((assignment.proctor_id, date))
                .or_insert(0) += 1;
            self.proctor_slots.insert((assignment.proctor_id, date, start));
            self.room_slots.insert((assignment.room_id, date, start));
        }

        for &student_id in enrolled {
            self.student_days.insert((student_id, date));
        }
        for student_id in session.seated_students() {
            self.student_days.insert((student_id, date));
        }

        self.placed_modules.insert(session.module_id);
    }
}
