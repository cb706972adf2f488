// ==========================================
// 期末考试排考系统 - 考场分配
// ==========================================
// 职责: 在给定日期+时间段内, 选出容量合计覆盖选课人数的最少空闲考场
// 规则:
// - 选课人数 > 大班阈值: 按容量降序 (优先阶梯教室)
// - 否则: 按容量升序 (先用小教室, 保留大教室)
// - 贪心累加, 覆盖即停; 空闲总容量不足则该时段失败
// ==========================================

use crate::domain::catalog::Room;
use crate::domain::types::TimeSlot;
use crate::engine::constraint_state::ConstraintState;
use chrono::NaiveDate;

// ==========================================
// RoomAllocator - 考场分配器
// ==========================================
pub struct RoomAllocator {
    large_class_threshold: usize,
}

impl RoomAllocator {
    pub fn new(large_class_threshold: usize) -> Self {
        Self {
            large_class_threshold,
        }
    }

    /// 为模块挑选考场
    ///
    /// # 返回
    /// - Some(rooms): 按挑选顺序排列的考场 (名单切分依此顺序)
    /// - None: 该时段空闲容量不足
    pub fn allocate<'r>(
        &self,
        rooms: &'r [Room],
        state: &ConstraintState,
        date: NaiveDate,
        slot: &TimeSlot,
        enrolled: usize,
    ) -> Option<Vec<&'r Room>> {
        let mut free: Vec<&Room> = rooms
            .iter()
            .filter(|r| state.is_room_free(r.room_id, date, slot))
            .collect();

        if enrolled > self.large_class_threshold {
            free.sort_by(|a, b| b.capacity.cmp(&a.capacity));
        } else {
            free.sort_by(|a, b| a.capacity.cmp(&b.capacity));
        }

        let mut selected = Vec::new();
        let mut covered = 0usize;
        for room in free {
            if covered >= enrolled {
                break;
            }
            covered += room.capacity;
            selected.push(room);
        }

        if selected.is_empty() || covered < enrolled {
            return None;
        }
        Some(selected)
    }
}
