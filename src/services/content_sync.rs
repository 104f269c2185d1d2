//! 转办说明字段同步
//!
//! 目标系统的说明编辑器实现不一致：可能是 contenteditable 区域、iframe 编辑器，
//! 或者文本框 + 隐藏字段。这里按顺序尝试多种写入策略，然后确认服务端
//! 实际会读到的字段里确实有内容，不够就强制同步，最后兜底注入隐藏字段。

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::{Config, Timings};
use crate::error::{AppError, AppResult};
use crate::infrastructure::{
    best_effort, wait_until, BrowserSession, EditableTarget, FieldInfo, Locator, Scope,
    WaitPolicy,
};
use crate::models::selectors;
use crate::models::ObservationPayload;

/// 确认阈值：`max(min_chars, round(fraction × expected_len))`
pub fn confirmation_threshold(expected_len: usize, fraction: f64, min_chars: usize) -> usize {
    let scaled = (expected_len as f64 * fraction).round() as usize;
    scaled.max(min_chars)
}

/// 写入策略
///
/// 返回写入后测得的文本长度，0 表示本策略不适用或没有生效
#[async_trait]
pub trait FillStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn attempt_fill(
        &self,
        session: &dyn BrowserSession,
        payload: &ObservationPayload,
    ) -> AppResult<usize>;
}

/// 把纯文本镜像到已知的隐藏字段
async fn mirror_hidden(session: &dyn BrowserSession, payload: &ObservationPayload) {
    let written = best_effort(
        session
            .write_fields(
                Scope::Document,
                &selectors::observation_field(),
                payload.plain_text(),
            )
            .await,
        "镜像隐藏字段",
    );
    debug!("镜像隐藏字段: {} 个", written);
}

/// 策略 1：页面上直接可编辑的区域
pub struct EditableRegionFill;

#[async_trait]
impl FillStrategy for EditableRegionFill {
    fn name(&self) -> &'static str {
        "可编辑区域"
    }

    async fn attempt_fill(
        &self,
        session: &dyn BrowserSession,
        payload: &ObservationPayload,
    ) -> AppResult<usize> {
        let lengths = session
            .fill_editables(Scope::Document, &payload.editor_html(), EditableTarget::First)
            .await?;
        let measured = lengths.first().copied().unwrap_or(0);
        if measured > 0 {
            mirror_hidden(session, payload).await;
        }
        Ok(measured)
    }
}

/// 策略 2：iframe 编辑器（按 id / name 提示词挑选候选）
pub struct FrameEditorFill {
    hints: Vec<String>,
}

impl FrameEditorFill {
    pub fn new<S: AsRef<str>>(hints: &[S]) -> Self {
        Self {
            hints: hints.iter().map(|h| h.as_ref().to_string()).collect(),
        }
    }
}

impl Default for FrameEditorFill {
    fn default() -> Self {
        Self::new(&selectors::EDITOR_FRAME_HINTS)
    }
}

#[async_trait]
impl FillStrategy for FrameEditorFill {
    fn name(&self) -> &'static str {
        "iframe 编辑器"
    }

    async fn attempt_fill(
        &self,
        session: &dyn BrowserSession,
        payload: &ObservationPayload,
    ) -> AppResult<usize> {
        let frames = session.editor_frames(&self.hints).await?;
        debug!("候选编辑器 iframe: {:?}", frames);
        let html = payload.editor_html();
        for frame in frames {
            match session.fill_frame_body(frame, &html).await {
                Ok(Some(len)) if len > 0 => {
                    mirror_hidden(session, payload).await;
                    return Ok(len);
                }
                Ok(_) => debug!("frame{} 没有可写入的 body", frame),
                Err(e) => debug!("frame{} 写入失败: {}", frame, e),
            }
        }
        Ok(0)
    }
}

/// 策略 3：直接写已知字段（模拟键入，不行再直接赋值）
pub struct HiddenFieldFill {
    wait: WaitPolicy,
}

impl HiddenFieldFill {
    pub fn new(wait: WaitPolicy) -> Self {
        Self { wait }
    }
}

#[async_trait]
impl FillStrategy for HiddenFieldFill {
    fn name(&self) -> &'static str {
        "已知字段"
    }

    async fn attempt_fill(
        &self,
        session: &dyn BrowserSession,
        payload: &ObservationPayload,
    ) -> AppResult<usize> {
        write_known_field(session, payload, self.wait).await
    }
}

/// 等待已知字段出现后键入；键入不适用时直接赋值
async fn write_known_field(
    session: &dyn BrowserSession,
    payload: &ObservationPayload,
    wait: WaitPolicy,
) -> AppResult<usize> {
    let field = selectors::observation_field();
    let field_ref = &field;
    let present = wait_until(wait, move || async move {
        best_effort(session.count(field_ref).await, "等待说明字段") > 0
    })
    .await;
    if !present {
        return Ok(0);
    }

    let typed = match session.type_text(&field, payload.plain_text()).await {
        Ok(typed) => typed,
        Err(e) => {
            debug!("模拟键入失败: {}", e);
            false
        }
    };
    if !typed {
        debug!("模拟键入不适用，直接赋值");
        session
            .write_fields(Scope::Document, &field, payload.plain_text())
            .await?;
    }
    session.field_text_len(Scope::Document, &field).await
}

/// 同步等级
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncLevel {
    /// 直接确认达到阈值
    Confirmed,
    /// 额外强制同步后达到阈值
    Forced,
    /// 注入了隐藏字段
    Injected,
    /// 所有手段之后仍未达到阈值
    Unconfirmed,
}

/// 同步阶段报告（只用于日志）
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub strategy: Option<&'static str>,
    pub primary_confirmed: bool,
    pub preclick_confirmed: bool,
    pub forced: usize,
    pub threshold: usize,
}

/// 说明字段同步器
pub struct ContentSynchronizer {
    strategies: Vec<Box<dyn FillStrategy>>,
    timings: Timings,
    min_fraction: f64,
    min_chars: usize,
}

impl ContentSynchronizer {
    /// 默认策略顺序：可编辑区域 → iframe 编辑器 → 已知字段
    pub fn new(config: &Config) -> Self {
        let strategies: Vec<Box<dyn FillStrategy>> = vec![
            Box::new(EditableRegionFill),
            Box::new(FrameEditorFill::default()),
            Box::new(HiddenFieldFill::new(config.timings.element(5_000))),
        ];
        Self::with_strategies(config, strategies)
    }

    pub fn with_strategies(config: &Config, strategies: Vec<Box<dyn FillStrategy>>) -> Self {
        Self {
            strategies,
            timings: config.timings.clone(),
            min_fraction: config.sync_min_fraction,
            min_chars: config.sync_min_chars,
        }
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn threshold(&self, payload: &ObservationPayload) -> usize {
        confirmation_threshold(payload.expected_len(), self.min_fraction, self.min_chars)
    }

    /// 依次尝试写入策略，第一个生效的策略短路其余策略
    ///
    /// 返回生效的策略名
    pub async fn fill(
        &self,
        session: &dyn BrowserSession,
        payload: &ObservationPayload,
    ) -> Option<&'static str> {
        for strategy in &self.strategies {
            match strategy.attempt_fill(session, payload).await {
                Ok(len) if len > 0 => {
                    info!("✓ 说明已通过 [{}] 写入 ({} 字符)", strategy.name(), len);
                    return Some(strategy.name());
                }
                Ok(_) => warn!("策略 [{}] 未生效，尝试下一个", strategy.name()),
                Err(e) => warn!("策略 [{}] 出错: {}，尝试下一个", strategy.name(), e),
            }
        }
        warn!("⚠️ 所有写入策略都未生效");
        None
    }

    /// 服务端可见的确认长度：可编辑区域与已知字段中较大者
    pub async fn confirmed_len(&self, session: &dyn BrowserSession) -> usize {
        let editable = best_effort(
            session.editable_text_len(Scope::Document).await,
            "测量可编辑区域",
        );
        let field = best_effort(
            session
                .field_text_len(Scope::Document, &selectors::observation_field())
                .await,
            "测量说明字段",
        );
        editable.max(field)
    }

    /// 在 timeout 内轮询，直到确认长度达到阈值
    ///
    /// 失败只记日志，不中断流程
    pub async fn await_sync(
        &self,
        session: &dyn BrowserSession,
        payload: &ObservationPayload,
        timeout: Duration,
    ) -> bool {
        let required = self.threshold(payload);
        let policy = WaitPolicy::new(timeout, Duration::from_millis(self.timings.sync_poll_ms));
        let ok = wait_until(policy, move || async move {
            self.confirmed_len(session).await >= required
        })
        .await;
        if !ok {
            let measured = self.confirmed_len(session).await;
            warn!("{}", AppError::SyncConfidenceLow { measured, required });
        }
        ok
    }

    /// 主文档 + 所有同源 iframe
    async fn scopes(&self, session: &dyn BrowserSession) -> Vec<Scope> {
        let frames = best_effort(session.frame_count().await, "统计 iframe");
        std::iter::once(Scope::Document)
            .chain((0..frames).map(Scope::Frame))
            .collect()
    }

    /// 强制把内容写入所有可编辑区域和所有说明相关字段，然后触发客户端校验
    ///
    /// 返回写入的元素数量，只用于诊断
    pub async fn force_sync(
        &self,
        session: &dyn BrowserSession,
        payload: &ObservationPayload,
    ) -> usize {
        let html = payload.editor_html();
        let fields = selectors::observation_fields();
        let mut touched = 0;
        for scope in self.scopes(session).await {
            let editables = best_effort(
                session
                    .fill_editables(scope, &html, EditableTarget::All)
                    .await,
                "强制写入可编辑区域",
            );
            let written = best_effort(
                session
                    .write_fields(scope, &fields, payload.plain_text())
                    .await,
                "强制写入说明字段",
            );
            debug!("强制同步 {}: 区域 {} 个, 字段 {} 个", scope, editables.len(), written);
            touched += editables.len() + written;
        }

        if best_effort(
            session.client_validate(selectors::VALIDATION_GROUP).await,
            "客户端校验",
        ) {
            debug!("已触发客户端校验 ({})", selectors::VALIDATION_GROUP);
        }
        touched
    }

    /// 记录所有说明相关字段的诊断信息
    pub async fn diagnostics(&self, session: &dyn BrowserSession, label: &str) -> Vec<FieldInfo> {
        let fields = selectors::observation_fields();
        let mut all = Vec::new();
        for scope in self.scopes(session).await {
            all.extend(best_effort(
                session.describe_fields(scope, &fields).await,
                "字段诊断",
            ));
        }
        if all.is_empty() {
            info!("[诊断] {}: 未发现说明字段", label);
        }
        for field in &all {
            info!("[诊断] {}: {}", label, field);
        }
        all
    }

    /// 写入并确认：写入策略 → 两次确认等待 → 诊断 → 强制同步 → 诊断
    pub async fn synchronize(
        &self,
        session: &dyn BrowserSession,
        payload: &ObservationPayload,
    ) -> SyncReport {
        let mut strategy = self.fill(session, payload).await;
        if strategy.is_none() {
            warn!("⚠️ 编辑器写入失败，直接在已知字段中键入");
            let wait = self.timings.element(10_000);
            match write_known_field(session, payload, wait).await {
                Ok(len) if len > 0 => strategy = Some("直接键入"),
                Ok(_) => warn!("直接键入也未生效"),
                Err(e) => warn!("直接键入失败: {}", e),
            }
        }

        let primary = Duration::from_millis(self.timings.sync_primary_ms);
        let primary_confirmed = self.await_sync(session, payload, primary).await;
        if !primary_confirmed {
            warn!("⚠️ 说明可能尚未完全同步，继续");
        }

        let preclick = Duration::from_millis(self.timings.sync_preclick_ms);
        let preclick_confirmed = self.await_sync(session, payload, preclick).await;
        if !preclick_confirmed {
            warn!("⚠️ 说明可能仍在同步，继续");
        }

        self.diagnostics(session, "强制同步前").await;
        let forced = self.force_sync(session, payload).await;
        info!("说明字段已强制同步 ({} 个)", forced);
        sleep(Duration::from_millis(self.timings.sync_poll_ms)).await;
        self.diagnostics(session, "强制同步后").await;

        SyncReport {
            strategy,
            primary_confirmed,
            preclick_confirmed,
            forced,
            threshold: self.threshold(payload),
        }
    }

    /// 提交前的最终确认
    ///
    /// 不足时再强制同步一次（前后各做一次字段诊断）；仍不足则注入隐藏字段，保证服务端读到的值不为空
    pub async fn verify_before_submit(
        &self,
        session: &dyn BrowserSession,
        payload: &ObservationPayload,
    ) -> SyncLevel {
        let required = self.threshold(payload);
        let measured = self.confirmed_len(session).await;
        if measured >= required {
            debug!("提交前确认: {} >= {}", measured, required);
            return SyncLevel::Confirmed;
        }

        warn!("⚠️ 说明仍然过短 (len={})，额外强制同步", measured);
        self.diagnostics(session, "额外强制同步前").await;
        let forced = self.force_sync(session, payload).await;
        info!("额外强制同步写入 {} 个元素", forced);
        sleep(Duration::from_millis(self.timings.sync_poll_ms)).await;
        self.diagnostics(session, "额外强制同步后").await;

        let measured = self.confirmed_len(session).await;
        if measured >= required {
            return SyncLevel::Forced;
        }

        warn!("{}，注入隐藏字段", AppError::SyncConfidenceLow { measured, required });
        if self.inject_hidden(session, payload).await {
            info!("✓ 已创建 / 填写隐藏字段 '{}'", selectors::OBSERVATION_ID);
            SyncLevel::Injected
        } else {
            warn!("⚠️ 无法定位或创建隐藏字段 '{}'", selectors::OBSERVATION_ID);
            SyncLevel::Unconfirmed
        }
    }

    /// 按 id → name → 新建 的顺序，在主文档和各 iframe 中找到第一个可写的位置
    async fn inject_hidden(&self, session: &dyn BrowserSession, payload: &ObservationPayload) -> bool {
        let plain = payload.plain_text();
        let by_id = Locator::id(selectors::OBSERVATION_ID);
        let by_name = Locator::name(selectors::OBSERVATION_NAME);

        for scope in self.scopes(session).await {
            for locator in [&by_id, &by_name] {
                if best_effort(session.write_fields(scope, locator, plain).await, "写入隐藏字段") > 0 {
                    debug!("隐藏字段写入 {} {}", scope, locator);
                    return true;
                }
            }
            let appended = best_effort(
                session
                    .append_hidden_field(scope, selectors::OBSERVATION_ID, selectors::OBSERVATION_NAME)
                    .await,
                "创建隐藏字段",
            );
            if appended
                && best_effort(session.write_fields(scope, &by_id, plain).await, "写入隐藏字段") > 0
            {
                debug!("隐藏字段创建于 {}", scope);
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_floor_and_rounding() {
        assert_eq!(confirmation_threshold(10, 0.3, 15), 15);
        assert_eq!(confirmation_threshold(100, 0.3, 15), 30);
        assert_eq!(confirmation_threshold(58, 0.3, 15), 17);
        assert_eq!(confirmation_threshold(60, 0.3, 15), 18);
        assert_eq!(confirmation_threshold(0, 0.3, 15), 15);
    }

    #[test]
    fn test_default_strategy_order() {
        let sync = ContentSynchronizer::new(&Config::default());
        assert_eq!(
            sync.strategy_names(),
            vec!["可编辑区域", "iframe 编辑器", "已知字段"]
        );
    }
}
