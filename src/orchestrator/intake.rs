//! 接收待接收列表中的条目
//!
//! 按"Setor Enviou"列的来源部门应用拦截规则，只勾选未被拦截的行，
//! 然后批量接收并吸收确认对话框。

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::infrastructure::{best_effort, wait_until, BrowserSession, Locator, TableRow};
use crate::models::selectors;
use crate::models::{BlockRule, WorkItem};
use crate::services::{absorb_dialog, StatusReporter};

/// 勾选之间的间隔
const CHECK_PAUSE: Duration = Duration::from_millis(100);

/// 接收结果
#[derive(Debug, Clone, Default)]
pub struct IntakeReport {
    pub found: usize,
    pub received: Vec<WorkItem>,
    pub skipped: Vec<WorkItem>,
    pub acknowledgement: Option<String>,
}

/// 来源部门所在列：表头同时包含 "setor" 和 "enviou"
pub fn origin_column(header: &[String]) -> Option<usize> {
    header.iter().position(|h| {
        let h = h.to_lowercase();
        h.contains("setor") && h.contains("enviou")
    })
}

/// 行的来源部门；列不存在或为空时用整行文本
pub fn origin_of(row: &TableRow, column: Option<usize>) -> String {
    column
        .and_then(|c| row.cells.get(c))
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .unwrap_or(row.text.trim())
        .to_string()
}

/// 展开待接收列表并接收未被拦截的条目
pub async fn receive_items(
    session: &dyn BrowserSession,
    config: &Config,
    rule: &BlockRule,
    reporter: &StatusReporter,
) -> IntakeReport {
    let mut report = IntakeReport::default();
    reporter.status("📦 检查待接收条目…");

    let header = selectors::receive_header();
    if !click_when_present(session, &header, config).await {
        warn!("⚠️ 待接收列表标题未找到，跳过接收");
        return report;
    }
    sleep(config.timings.list_expand_delay()).await;

    let boxes = selectors::receive_checkboxes();
    report.found = best_effort(session.count(&boxes).await, "统计待接收条目");
    if report.found == 0 {
        info!("没有待接收的条目");
        reporter.status("没有待接收的条目");
        return report;
    }
    reporter.status(format!("找到 {} 个待接收条目，按规则勾选…", report.found));

    let first = best_effort(session.table_row(&boxes, 0).await, "读取表头");
    let column = first.as_ref().and_then(|row| origin_column(&row.header));
    debug!("来源部门列: {:?}", column);

    for ordinal in 0..report.found {
        // 每次重新读取，列表可能已经变化
        let row = best_effort(session.table_row(&boxes, ordinal).await, "读取行");
        let origin = row
            .as_ref()
            .map(|r| origin_of(r, column))
            .unwrap_or_default();
        let item = WorkItem::new(ordinal, origin);

        if let Some(fragment) = rule.matching_fragment(&item.origin) {
            info!("[跳过] 不接收 (来源部门='{}', 规则='{}')", item.origin, fragment);
            report.skipped.push(item);
            continue;
        }

        if best_effort(session.click(&boxes, ordinal).await, "勾选条目") {
            report.received.push(item);
        } else {
            warn!("⚠️ 勾选第 {} 行失败", ordinal + 1);
        }
        sleep(CHECK_PAUSE).await;
    }

    if report.received.is_empty() {
        info!("没有可接收的条目 (跳过 {} 个)", report.skipped.len());
        return report;
    }

    let batch = Locator::id(selectors::RECEIVE_BATCH_ID);
    if !click_when_present(session, &batch, config).await {
        warn!("⚠️ 批量接收按钮未找到");
        reporter.status("⚠️ 无法点击批量接收按钮");
        return report;
    }
    reporter.status("等待接收确认…");

    let policy = config.timings.dialog(config.timings.intake_dialog_ms);
    report.acknowledgement = absorb_dialog(session, policy).await;
    match &report.acknowledgement {
        Some(_) => reporter.status("✓ 条目已接收"),
        None => reporter.status("接收后没有出现确认对话框"),
    }
    report
}

async fn click_when_present(session: &dyn BrowserSession, locator: &Locator, config: &Config) -> bool {
    let present = wait_until(config.timings.element(5_000), move || async move {
        best_effort(session.count(locator).await, "等待元素") > 0
    })
    .await;
    present && best_effort(session.click(locator, 0).await, "点击")
}
