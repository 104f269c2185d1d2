//! 页面状态识别

use tracing::debug;

use crate::infrastructure::{best_effort, BrowserSession};
use crate::models::selectors;
use crate::models::ScreenState;

/// 页面状态识别器
///
/// 所有"当前在哪个页面"的判断都集中在这里，调用方只对枚举分支
pub struct ScreenStateClassifier;

impl ScreenStateClassifier {
    /// 识别当前页面
    ///
    /// - 部门下拉框存在且可见 → `SelectingUnit`（只存在不够，后续页面里可能隐藏着）
    /// - 任一列表标题存在 → `InsideUnit`
    /// - 否则 `Unknown`
    pub async fn classify(session: &dyn BrowserSession) -> ScreenState {
        let selector_visible = best_effort(
            session.is_visible(&selectors::unit_selector()).await,
            "检查部门下拉框",
        );
        if selector_visible {
            debug!("识别页面: 部门下拉框可见");
            return ScreenState::SelectingUnit;
        }

        for marker in [selectors::receive_header(), selectors::inside_header()] {
            let count = best_effort(session.count(&marker).await, "检查列表标题");
            if count > 0 {
                debug!("识别页面: 找到 {}", marker);
                return ScreenState::InsideUnit;
            }
        }

        debug!("识别页面: 未知");
        ScreenState::Unknown
    }
}
