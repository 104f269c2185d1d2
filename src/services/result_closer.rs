//! 关闭提交后出现的结果页（报表 / PDF）
//!
//! 结果可能在新窗口打开，也可能在当前窗口内跳转。每一步都是尽力而为，
//! 结果页关不掉不能让已经成功的提交失败。

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::infrastructure::{best_effort, poll_for, wait_until, BrowserSession, WaitPolicy};
use crate::models::selectors;

/// 当前窗口内结果页的关闭方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InPlaceClose {
    Control,
    Postback,
    HistoryBack,
    QueueUrl,
    Failed,
}

/// 关闭结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloseReport {
    /// 关闭的新窗口
    pub new_windows: usize,
    /// 扫描时关闭的残留报表窗口
    pub residual_windows: usize,
    /// 当前窗口是结果页时的处理方式
    pub in_place: Option<InPlaceClose>,
}

impl CloseReport {
    pub fn total_closed(&self) -> usize {
        self.new_windows + self.residual_windows
    }
}

/// 结果页关闭器
pub struct ResultPageCloser {
    queue_url: String,
    control_wait: WaitPolicy,
}

impl ResultPageCloser {
    pub fn new(queue_url: impl Into<String>, control_wait: WaitPolicy) -> Self {
        Self {
            queue_url: queue_url.into(),
            control_wait,
        }
    }

    /// 提交前调用，记录现有窗口
    pub async fn snapshot(session: &dyn BrowserSession) -> HashSet<String> {
        best_effort(session.window_handles().await, "读取窗口列表")
            .into_iter()
            .collect()
    }

    /// 关闭结果页并把焦点还给主窗口
    ///
    /// `prior` 为提交前的窗口集合，`open_wait` 为等待新窗口出现的时间
    pub async fn close_result(
        &self,
        session: &dyn BrowserSession,
        prior: &HashSet<String>,
        open_wait: WaitPolicy,
    ) -> CloseReport {
        let mut report = CloseReport::default();
        let main = best_effort(session.current_window().await, "读取当前窗口");

        let mut base = prior.clone();
        if base.is_empty() && !main.is_empty() {
            base.insert(main.clone());
        }

        // 1) 等待新窗口
        let base_ref = &base;
        let fresh = poll_for(open_wait, move || async move {
            let handles = best_effort(session.window_handles().await, "读取窗口列表");
            let fresh: Vec<String> = handles
                .into_iter()
                .filter(|h| !base_ref.contains(h))
                .collect();
            (!fresh.is_empty()).then_some(fresh)
        })
        .await
        .unwrap_or_default();

        // 2) 关闭所有新窗口
        for handle in &fresh {
            if self.close_window(session, handle, &main, "新窗口").await {
                report.new_windows += 1;
            }
        }

        // 3) 扫描残留的报表窗口
        let handles = best_effort(session.window_handles().await, "读取窗口列表");
        for handle in handles.iter().filter(|h| **h != main) {
            if !best_effort(session.switch_window(handle).await, "切换窗口") {
                continue;
            }
            let url = best_effort(session.current_url().await, "读取窗口地址");
            if selectors::is_report_url(&url)
                && self.close_current(session, &url, "残留报表窗口").await
            {
                report.residual_windows += 1;
            }
        }
        self.focus_main(session, &main).await;

        // 4) 当前窗口自身跳转到了结果页
        if self.is_result_page(session).await {
            report.in_place = Some(self.leave_result_page(session).await);
        }

        debug!("结果页关闭: {:?}", report);
        report
    }

    async fn close_window(
        &self,
        session: &dyn BrowserSession,
        handle: &str,
        main: &str,
        what: &str,
    ) -> bool {
        let closed = if best_effort(session.switch_window(handle).await, "切换窗口") {
            let url = best_effort(session.current_url().await, "读取窗口地址");
            self.close_current(session, &url, what).await
        } else {
            false
        };
        self.focus_main(session, main).await;
        closed
    }

    async fn close_current(&self, session: &dyn BrowserSession, url: &str, what: &str) -> bool {
        info!(
            "[关闭] {} (url='{}')",
            what,
            crate::utils::truncate_text(url, 120)
        );
        match session.close_window().await {
            Ok(()) => true,
            Err(e) => {
                warn!("关闭{}失败: {}", what, e);
                false
            }
        }
    }

    async fn focus_main(&self, session: &dyn BrowserSession, main: &str) {
        if !main.is_empty() && !best_effort(session.switch_window(main).await, "切回主窗口") {
            warn!("⚠️ 无法切回主窗口 {}", main);
        }
    }

    /// 地址像报表，或页面上有"关闭"控件
    async fn is_result_page(&self, session: &dyn BrowserSession) -> bool {
        let url = best_effort(session.current_url().await, "读取当前地址");
        if selectors::is_report_url(&url) {
            return true;
        }
        for control in selectors::report_close_controls() {
            if best_effort(session.count(&control).await, "查找关闭控件") > 0 {
                return true;
            }
        }
        false
    }

    /// 关闭控件 → 关闭 postback → 浏览器后退 → 直接回到工作队列
    async fn leave_result_page(&self, session: &dyn BrowserSession) -> InPlaceClose {
        for control in selectors::report_close_controls() {
            let control_ref = &control;
            let present = wait_until(self.control_wait, move || async move {
                best_effort(session.count(control_ref).await, "等待关闭控件") > 0
            })
            .await;
            if present && best_effort(session.click(&control, 0).await, "点击关闭控件") {
                info!("[关闭] 结果页: 点击 {}", control);
                return InPlaceClose::Control;
            }
        }

        if best_effort(
            session.postback(selectors::REPORT_CLOSE_ID, None).await,
            "关闭 postback",
        ) {
            info!("[关闭] 结果页: postback '{}'", selectors::REPORT_CLOSE_ID);
            return InPlaceClose::Postback;
        }

        match session.go_back().await {
            Ok(()) => {
                info!("[关闭] 结果页: 浏览器后退");
                return InPlaceClose::HistoryBack;
            }
            Err(e) => warn!("后退失败: {}", e),
        }

        match session.goto(&self.queue_url).await {
            Ok(()) => {
                info!("[关闭] 结果页: 返回工作队列");
                InPlaceClose::QueueUrl
            }
            Err(e) => {
                warn!("⚠️ 无法离开结果页: {}", e);
                InPlaceClose::Failed
            }
        }
    }
}
