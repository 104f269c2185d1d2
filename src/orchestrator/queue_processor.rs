//! 部门内条目队列处理器 - 编排层
//!
//! ## 游标规则
//!
//! 成功提交的条目会从列表中消失，失败的条目留在原位。
//! 因此每次打开的位置 = 已失败的条目数，循环次数不超过初始数量。
//!
//! ## 单个条目失败
//!
//! 记录错误，回到工作队列地址，暂停后重新展开列表，继续下一个。
//! 致命错误（见 `AppError::is_fatal`）不在这里吸收，直接终止整个队列。

use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::{best_effort, wait_until, BrowserSession, WaitPolicy};
use crate::models::selectors;
use crate::models::ScreenState;
use crate::orchestrator::unit_resolution::resolve_unit;
use crate::services::{ScreenStateClassifier, StatusReporter};
use crate::workflow::{ItemCtx, ItemFlow};

/// 队列处理统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// 展开列表时的条目数
    pub total: usize,
    pub processed: usize,
    pub failed: usize,
}

impl QueueStats {
    pub fn attempted(&self) -> usize {
        self.processed + self.failed
    }
}

/// 队列处理器
pub struct QueueProcessor<'a> {
    config: &'a Config,
    flow: &'a ItemFlow,
    reporter: &'a StatusReporter,
}

impl<'a> QueueProcessor<'a> {
    pub fn new(config: &'a Config, flow: &'a ItemFlow, reporter: &'a StatusReporter) -> Self {
        Self {
            config,
            flow,
            reporter,
        }
    }

    /// 依次处理部门内的所有条目
    pub async fn process(&self, session: &dyn BrowserSession) -> AppResult<QueueStats> {
        let mut stats = QueueStats::default();

        self.expand(session).await;
        let controls = selectors::item_open_controls();
        stats.total = best_effort(session.count(&controls).await, "统计部门内条目");
        if stats.total == 0 {
            info!("部门内没有待处理的条目");
            return Ok(stats);
        }

        info!("{}", "─".repeat(60));
        info!("📋 部门内共 {} 个条目", stats.total);
        info!("{}", "─".repeat(60));
        self.reporter
            .status(format!("开始转办 {} 个条目…", stats.total));

        for ordinal in 1..=stats.total {
            let ctx = ItemCtx::new(ordinal, stats.total, stats.failed);

            let available = best_effort(session.count(&controls).await, "统计部门内条目");
            if ctx.position >= available {
                info!("列表中剩余 {} 个条目，已全部尝试", available);
                break;
            }

            self.reporter.status(format!("{} 处理中…", ctx));
            match self.process_one(session, &ctx).await {
                Ok(()) => {
                    stats.processed += 1;
                    info!("{} ✅ 完成", ctx);
                }
                Err(e) if e.is_fatal() => {
                    error!("{} ❌ 致命错误，终止队列: {}", ctx, e);
                    return Err(e);
                }
                Err(e) => {
                    stats.failed += 1;
                    error!("{} ❌ 失败: {}", ctx, e);
                    self.reporter.status(format!("{} ❌ 失败: {}", ctx, e));
                    self.recover(session).await?;
                }
            }
            self.reporter.progress(0.5 + 0.5 * ctx.fraction());
        }

        Ok(stats)
    }

    /// 打开第 position 个条目，执行流程，然后回到列表
    async fn process_one(&self, session: &dyn BrowserSession, ctx: &ItemCtx) -> AppResult<()> {
        let controls = selectors::item_open_controls();
        if !session.click(&controls, ctx.position).await? {
            return Err(AppError::ElementNotFound(format!(
                "第 {} 个条目的打开按钮",
                ctx.position + 1
            )));
        }
        sleep(self.config.timings.item_open_delay()).await;

        self.flow.run(session, ctx).await?;

        self.return_to_queue(session).await?;
        self.expand(session).await;
        Ok(())
    }

    /// 列表标题仍在 → 后退 → 直接地址
    async fn return_to_queue(&self, session: &dyn BrowserSession) -> AppResult<()> {
        if self.inside_header_present(session, self.short_wait()).await {
            return Ok(());
        }

        match session.go_back().await {
            Ok(()) => sleep(self.config.timings.item_open_delay()).await,
            Err(e) => warn!("后退失败: {}", e),
        }
        if self.inside_header_present(session, self.short_wait()).await {
            info!("已通过后退回到工作队列");
            return Ok(());
        }

        warn!("后退未回到工作队列，重新打开 {}", self.config.queue_url());
        if let Err(e) = session.goto(&self.config.queue_url()).await {
            warn!("⚠️ 打开工作队列失败: {}", e);
        }
        self.ensure_inside_unit(session).await
    }

    /// 失败后的恢复：回到工作队列地址，暂停，重新展开
    async fn recover(&self, session: &dyn BrowserSession) -> AppResult<()> {
        if let Err(e) = session.goto(&self.config.queue_url()).await {
            warn!("⚠️ 恢复时打开工作队列失败: {}", e);
        }
        sleep(self.config.timings.item_recovery_pause()).await;
        self.ensure_inside_unit(session).await?;
        self.expand(session).await;
        Ok(())
    }

    /// 重新打开地址后页面可能回到部门选择；部门确认失败是致命错误
    async fn ensure_inside_unit(&self, session: &dyn BrowserSession) -> AppResult<()> {
        let settled = wait_until(self.config.timings.marker(), move || async move {
            ScreenStateClassifier::classify(session).await != ScreenState::Unknown
        })
        .await;
        if !settled {
            warn!("⚠️ 重新打开工作队列后页面状态未知");
            return Ok(());
        }
        if ScreenStateClassifier::classify(session).await == ScreenState::SelectingUnit {
            match resolve_unit(session, self.config, self.reporter).await {
                Ok(_) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => warn!("⚠️ 重新选择部门失败: {}", e),
            }
        }
        Ok(())
    }

    /// 展开部门内条目列表
    async fn expand(&self, session: &dyn BrowserSession) {
        let header = selectors::inside_header();
        if !self.inside_header_present(session, self.short_wait()).await {
            warn!("⚠️ 部门内列表标题未找到");
            return;
        }
        if best_effort(session.click(&header, 0).await, "展开部门内列表") {
            sleep(self.config.timings.list_expand_delay()).await;
        }
    }

    async fn inside_header_present(&self, session: &dyn BrowserSession, policy: WaitPolicy) -> bool {
        let header = selectors::inside_header();
        let header_ref = &header;
        wait_until(policy, move || async move {
            best_effort(session.count(header_ref).await, "查找列表标题") > 0
        })
        .await
    }

    fn short_wait(&self) -> WaitPolicy {
        self.config.timings.element(5_000)
    }
}
