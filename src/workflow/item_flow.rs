//! 条目处理流程 - 流程层
//!
//! 核心职责：定义"一个条目"的完整编辑和提交流程
//!
//! 流程顺序：
//! 1. 内控固定字段 → 保存
//! 2. 打开转办面板，选择转办类型和目标部门
//! 3. 写入并同步说明字段
//! 4. 定位提交按钮，记录窗口，最终确认，提交
//! 5. 关闭结果页

use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::{Config, Timings};
use crate::error::{AppError, AppResult};
use crate::infrastructure::{best_effort, wait_until, BrowserSession, Locator};
use crate::models::selectors;
use crate::models::ObservationPayload;
use crate::services::{
    CloseReport, ContentSynchronizer, InternalControlForm, ResultPageCloser, SubmissionDriver,
    SubmitOutcome, SyncLevel, SyncReport,
};
use crate::workflow::item_ctx::ItemCtx;

/// 单个条目的处理结果
#[derive(Debug, Clone)]
pub struct ItemOutcome {
    pub sync: SyncReport,
    pub level: SyncLevel,
    pub submit: SubmitOutcome,
    pub close: CloseReport,
}

/// 条目处理流程
///
/// - 编排一个条目的完整处理
/// - 不持有浏览器资源，只依赖 services
pub struct ItemFlow {
    form: InternalControlForm,
    synchronizer: ContentSynchronizer,
    submitter: SubmissionDriver,
    closer: ResultPageCloser,
    payload: ObservationPayload,
    despatch_type: String,
    destination_unit: String,
    timings: Timings,
}

impl ItemFlow {
    pub fn new(config: &Config, payload: ObservationPayload) -> Self {
        Self::with_synchronizer(config, payload, ContentSynchronizer::new(config))
    }

    pub fn with_synchronizer(
        config: &Config,
        payload: ObservationPayload,
        synchronizer: ContentSynchronizer,
    ) -> Self {
        let control_wait = config.timings.element(config.timings.close_control_wait_ms);
        Self {
            form: InternalControlForm::new(config),
            synchronizer,
            submitter: SubmissionDriver::new(&config.timings),
            closer: ResultPageCloser::new(config.queue_url(), control_wait),
            payload,
            despatch_type: config.despatch_type_value.clone(),
            destination_unit: config.destination_unit_value.clone(),
            timings: config.timings.clone(),
        }
    }

    pub fn payload(&self) -> &ObservationPayload {
        &self.payload
    }

    /// 处理当前已打开的条目
    pub async fn run(&self, session: &dyn BrowserSession, ctx: &ItemCtx) -> AppResult<ItemOutcome> {
        info!("{} 📝 填写内控信息", ctx);
        self.form.fill(session).await?;

        info!("{} 📤 打开转办面板", ctx);
        self.open_dispatch_panel(session).await?;

        let sync = self.synchronizer.synchronize(session, &self.payload).await;
        info!(
            "{} 说明同步: 策略={:?} 阈值={} 强制写入={}",
            ctx, sync.strategy, sync.threshold, sync.forced
        );

        let control = self.submitter.locate(session).await?;
        let prior = ResultPageCloser::snapshot(session).await;

        let level = self
            .synchronizer
            .verify_before_submit(session, &self.payload)
            .await;
        if level == SyncLevel::Unconfirmed {
            warn!("{} ⚠️ 说明字段未能确认，仍然提交", ctx);
        }

        let submit = self.submitter.trigger(session, &control).await?;
        info!("{} ✓ 已提交 (路径: {})", ctx, submit.path);

        let close = self
            .closer
            .close_result(session, &prior, self.timings.result_window())
            .await;
        if close.total_closed() > 0 || close.in_place.is_some() {
            info!(
                "{} 结果页已处理: 关闭 {} 个窗口, 当前窗口 {:?}",
                ctx,
                close.total_closed(),
                close.in_place
            );
        }

        Ok(ItemOutcome {
            sync,
            level,
            submit,
            close,
        })
    }

    /// 点击转办按钮，选择转办类型和目标部门
    async fn open_dispatch_panel(&self, session: &dyn BrowserSession) -> AppResult<()> {
        let panel = Locator::id(selectors::DISPATCH_PANEL_ID);
        if !self.wait_present(session, &panel, 5_000).await || !session.click(&panel, 0).await? {
            return Err(AppError::ElementNotFound(format!("转办按钮 {}", panel)));
        }
        sleep(self.timings.modal_open_delay()).await;

        self.select_in_panel(session, selectors::DESPATCH_TYPE_ID, &self.despatch_type)
            .await?;
        self.select_in_panel(session, selectors::DESTINATION_UNIT_ID, &self.destination_unit)
            .await?;
        Ok(())
    }

    async fn select_in_panel(
        &self,
        session: &dyn BrowserSession,
        id: &str,
        value: &str,
    ) -> AppResult<()> {
        let select = Locator::id(id);
        if !self.wait_present(session, &select, 10_000).await {
            return Err(AppError::ElementNotFound(format!("下拉框 {}", select)));
        }
        if !session.select_value(&select, value).await? {
            return Err(AppError::ElementNotFound(format!(
                "下拉框 {} 没有选项 '{}'",
                select, value
            )));
        }
        sleep(self.timings.after_select_delay()).await;
        Ok(())
    }

    async fn wait_present(
        &self,
        session: &dyn BrowserSession,
        locator: &Locator,
        timeout_ms: u64,
    ) -> bool {
        wait_until(self.timings.element(timeout_ms), move || async move {
            best_effort(session.count(locator).await, "等待元素") > 0
        })
        .await
    }
}
