//! 部门选择
//!
//! 点击"确认部门"之后不相信预期结果，而是重新识别页面：
//! 已经在部门内时确认按钮会静默无效。

use tracing::{info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::{best_effort, wait_until, BrowserSession, Locator};
use crate::models::selectors;
use crate::models::ScreenState;
use crate::services::{ScreenStateClassifier, StatusReporter};
use crate::utils::normalize;

/// 确保进入目标部门，返回最终识别到的页面状态
///
/// 选择部门后在限定时间内仍未进入部门时返回 `Navigation` 错误
pub async fn resolve_unit(
    session: &dyn BrowserSession,
    config: &Config,
    reporter: &StatusReporter,
) -> AppResult<ScreenState> {
    match ScreenStateClassifier::classify(session).await {
        ScreenState::InsideUnit => {
            info!("已经在部门内，跳过部门选择");
            reporter.status("🏢 部门已选择，继续…");
            Ok(ScreenState::InsideUnit)
        }
        ScreenState::Unknown => {
            warn!("⚠️ 无法识别工作队列页面状态，尽力继续");
            reporter.status("⚠️ 页面状态未识别，尽力继续…");
            Ok(ScreenState::Unknown)
        }
        ScreenState::SelectingUnit => {
            reporter.status(format!("🏢 选择部门 {}…", config.unit_label));
            select_unit(session, config).await;
            confirm_unit(session, config).await
        }
    }
}

/// 按 value 选择；value 不存在时按标签模糊匹配
async fn select_unit(session: &dyn BrowserSession, config: &Config) {
    let selector = selectors::unit_selector();
    if best_effort(
        session.select_value(&selector, &config.unit_value).await,
        "按值选择部门",
    ) {
        info!("已选择部门 (value={})", config.unit_value);
        return;
    }

    let wanted = normalize(&config.unit_label);
    let options = best_effort(session.options(&selector).await, "读取部门选项");
    let Some(option) = options.iter().find(|o| normalize(&o.label).contains(&wanted)) else {
        warn!("⚠️ 部门选项 '{}' 未找到", config.unit_label);
        return;
    };

    warn!(
        "部门选项 value={} 不存在，选择包含 '{}' 的选项: {}",
        config.unit_value, config.unit_label, option.label
    );
    if !best_effort(
        session.select_value(&selector, &option.value).await,
        "按标签选择部门",
    ) {
        warn!("⚠️ 选择部门 '{}' 失败", option.label);
    }
}

/// 点击确认，然后等待页面进入部门
async fn confirm_unit(session: &dyn BrowserSession, config: &Config) -> AppResult<ScreenState> {
    let confirm = Locator::id(selectors::UNIT_CONFIRM_ID);
    if !best_effort(session.click(&confirm, 0).await, "点击确认部门") {
        warn!("⚠️ 确认按钮未找到，重新识别页面");
    }

    let entered = wait_until(config.timings.unit_confirm(), move || async move {
        ScreenStateClassifier::classify(session).await == ScreenState::InsideUnit
    })
    .await;

    if entered {
        info!("✓ 已进入部门 {}", config.unit_label);
        return Ok(ScreenState::InsideUnit);
    }

    let state = ScreenStateClassifier::classify(session).await;
    Err(AppError::Navigation(format!(
        "确认部门后页面仍为 [{}]，未进入部门 {}",
        state, config.unit_label
    )))
}
