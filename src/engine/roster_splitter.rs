// ==========================================
// 期末考试排考系统 - 座位名单切分
// ==========================================
// 职责: 打乱模块选课名单后, 按考场挑选顺序依次切成不超过容量的分段
// 随机源由调用方注入 (固定种子时切分结果可复现)
// ==========================================

use crate::domain::catalog::Room;
use crate::domain::types::StudentId;
use rand::seq::SliceRandom;
use rand::Rng;

/// 打乱并切分名单
///
/// # 返回
/// 与 `rooms` 一一对应的名单; 容量合计不足时尾部学生不入座
/// (调用方保证考场容量已覆盖选课人数)
pub fn split_roster<R: Rng + ?Sized>(
    students: &[StudentId],
    rooms: &[&Room],
    rng: &mut R,
) -> Vec<Vec<StudentId>> {
    let mut shuffled = students.to_vec();
    shuffled.shuffle(rng);

    let mut remaining = shuffled.as_slice();
    rooms
        .iter()
        .map(|room| {
            let take = room.capacity.min(remaining.len());
            let (chunk, rest) = remaining.split_at(take);
            remaining = rest;
            chunk.to_vec()
        })
        .collect()
}
