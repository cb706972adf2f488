// ==========================================
// 期末考试排考系统 - 监考分配
// ==========================================
// 职责: 为每个选中考场分配一名监考
// 候选: 当日监考数 < 上限, 且该时段未在其他考场监考
// 打分: 同院系 +bonus, 再减去当日已监考数 (均衡负载)
// 排序: 分数降序, 同分保持输入顺序; 候选不足则该时段失败
// ==========================================

use crate::domain::catalog::Proctor;
use crate::domain::types::{DepartmentId, ProctorId, TimeSlot};
use crate::engine::constraint_state::ConstraintState;
use chrono::NaiveDate;

/// 监考候选
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProctorCandidate {
    pub proctor_id: ProctorId,
    pub score: i64,
    pub load: u32,
}

// ==========================================
// ProctorAssigner - 监考分配器
// ==========================================
pub struct ProctorAssigner {
    daily_cap: u32,
    department_match_bonus: i64,
}

impl ProctorAssigner {
    pub fn new(daily_cap: u32, department_match_bonus: i64) -> Self {
        Self {
            daily_cap,
            department_match_bonus,
        }
    }

    /// 生成排好序的候选列表
    pub fn rank_candidates(
        &self,
        proctors: &[Proctor],
        state: &ConstraintState,
        date: NaiveDate,
        slot: &TimeSlot,
        department_id: DepartmentId,
    ) -> Vec<ProctorCandidate> {
        let mut candidates: Vec<ProctorCandidate> = proctors
            .iter()
            .filter_map(|p| {
                let load = state.proctor_load(p.proctor_id, date);
                if load >= self.daily_cap || state.is_proctor_busy(p.proctor_id, date, slot) {
                    return None;
                }
                let bonus = if p.department_id == Some(department_id) {
                    self.department_match_bonus
                } else {
                    0
                };
                Some(ProctorCandidate {
                    proctor_id: p.proctor_id,
                    score: bonus - i64::from(load),
                    load,
                })
            })
            .collect();

        candidates.sort_by(|a, b| b.score.cmp(&a.score));
        candidates
    }

    /// 选出 `required` 名监考
    ///
    /// # 返回
    /// - Some(ids): 与考场一一对应的监考 (考场间可互换)
    /// - None: 候选不足
    pub fn assign(
        &self,
        proctors: &[Proctor],
        state: &ConstraintState,
        date: NaiveDate,
        slot: &TimeSlot,
        department_id: DepartmentId,
        required: usize,
    ) -> Option<Vec<ProctorId>> {
        let candidates = self.rank_candidates(proctors, state, date, slot, department_id);
        if candidates.len() < required {
            return None;
        }
        Some(candidates.iter().take(required).map(|c| c.proctor_id).collect())
    }
}
