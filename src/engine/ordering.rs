// ==========================================
// 期末考试排考系统 - 模块排序
// ==========================================
// 职责: 生成模块处理顺序
// 规则: 选课人数降序 (大班可选组合最少, 先排), 同人数保持输入顺序
// 过滤: 专业子集 / 已排模块 / 零选课模块
// ==========================================

use crate::domain::catalog::Module;
use crate::domain::types::FormationId;
use crate::engine::constraint_state::ConstraintState;
use crate::engine::dataset::Dataset;

/// 排序结果
#[derive(Debug, Clone)]
pub struct ModuleOrder<'a> {
    pub modules: Vec<&'a Module>,
    pub skipped_already_placed: usize,
    pub skipped_empty: usize,
}

// ==========================================
// ModuleSorter - 模块排序器
// ==========================================
pub struct ModuleSorter {
    // 无状态
}

impl ModuleSorter {
    pub fn new() -> Self {
        Self {}
    }

    /// 生成处理顺序
    ///
    /// # 参数
    /// - `dataset`: 基础数据快照
    /// - `formation_ids`: 专业过滤（为空表示全部）
    /// - `state`: 约束状态（已排模块直接跳过, 不重复排）
    pub fn order<'a>(
        &self,
        dataset: &'a Dataset,
        formation_ids: &[FormationId],
        state: &ConstraintState,
    ) -> ModuleOrder<'a> {
        let mut skipped_already_placed = 0;
        let mut skipped_empty = 0;

        let mut modules: Vec<&Module> = Vec::new();
        for module in dataset.modules() {
            if !formation_ids.is_empty() && !formation_ids.contains(&module.formation_id) {
                continue;
            }
            if state.is_module_placed(module.module_id) {
                skipped_already_placed += 1;
                continue;
            }
            if module.enrolled_count == 0 {
                skipped_empty += 1;
                continue;
            }
            modules.push(module);
        }

        // sort_by 为稳定排序, 同人数保持输入顺序
        modules.sort_by(|a, b| b.enrolled_count.cmp(&a.enrolled_count));

        ModuleOrder {
            modules,
            skipped_already_placed,
            skipped_empty,
        }
    }
}

impl Default for ModuleSorter {
    fn default() -> Self {
        Self::new()
    }
}
