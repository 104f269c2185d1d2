//! 导航到工作队列（Benefício → Concessão）页面
//!
//! 顺序：直接地址（重试）→ 根地址 + 重新登录等待 → 直接地址 → 菜单

use std::time::Duration;

use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::config::{Config, Timings};
use crate::infrastructure::{best_effort, wait_until, BrowserSession, Locator, WaitPolicy};
use crate::models::selectors;
use crate::services::StatusReporter;

/// 加载根地址后的稳定时间
const BASE_SETTLE: Duration = Duration::from_millis(600);

/// 导航器
pub struct Navigator {
    base_url: String,
    queue_url: String,
    timings: Timings,
    reporter: StatusReporter,
}

impl Navigator {
    pub fn new(config: &Config, reporter: StatusReporter) -> Self {
        Self {
            base_url: config.base_url.clone(),
            queue_url: config.queue_url(),
            timings: config.timings.clone(),
            reporter,
        }
    }

    /// 打开工作队列页面
    ///
    /// 只有所有方式都失败，或重新登录等待超时时返回 false
    pub async fn open_target_screen(&self, session: &dyn BrowserSession) -> bool {
        for attempt in 0..self.timings.direct_attempts {
            if self.open_direct(session).await {
                info!("✓ 通过直接地址打开工作队列");
                return true;
            }
            warn!(
                "⚠️ 直接地址打开失败 (第 {}/{} 次)",
                attempt + 1,
                self.timings.direct_attempts
            );
            sleep(self.timings.direct_backoff(attempt)).await;
        }

        if !self.clear_reauthentication(session).await {
            return false;
        }

        if self.open_direct(session).await {
            info!("✓ 通过直接地址打开工作队列（根地址 / 登录之后）");
            return true;
        }
        warn!("⚠️ 根地址 / 登录之后直接地址仍然失败，改用菜单");

        if self.open_via_menu(session).await {
            info!("✓ 通过菜单打开工作队列");
            return true;
        }

        error!("❌ 直接地址和菜单都无法打开工作队列");
        false
    }

    async fn open_direct(&self, session: &dyn BrowserSession) -> bool {
        if let Err(e) = session.goto(&self.queue_url).await {
            warn!("导航到 {} 失败: {}", self.queue_url, e);
            return false;
        }
        self.wait_for_marker(session, self.timings.marker()).await
    }

    /// 部门下拉框或任一列表标题出现
    async fn wait_for_marker(&self, session: &dyn BrowserSession, policy: WaitPolicy) -> bool {
        wait_until(policy, move || async move {
            for marker in [
                selectors::unit_selector(),
                selectors::receive_header(),
                selectors::inside_header(),
            ] {
                if best_effort(session.count(&marker).await, "等待页面标记") > 0 {
                    return true;
                }
            }
            false
        })
        .await
    }

    /// 加载根地址；若落在登录页，点击"重新登录"链接并等待用户登录
    ///
    /// 等待超时返回 false
    async fn clear_reauthentication(&self, session: &dyn BrowserSession) -> bool {
        if let Err(e) = session.goto(&self.base_url).await {
            warn!("⚠️ 加载根地址失败: {}", e);
        }
        sleep(BASE_SETTLE).await;

        let url = best_effort(session.current_url().await, "读取当前地址");
        if !selectors::is_login_url(&url) {
            return true;
        }

        warn!("🔐 会话已过期 ({})，等待重新登录", url);
        let link = selectors::relogin_link();
        if best_effort(session.click(&link, 0).await, "点击重新登录链接") {
            info!("已点击重新登录链接");
        }

        let seconds = self.timings.reauth_wait_ms / 1000;
        self.reporter
            .status(format!("🔐 会话已过期，请登录。最多等待 {} 秒…", seconds));

        let logged_in = wait_until(self.timings.reauth(), move || async move {
            let url = best_effort(session.current_url().await, "读取当前地址");
            !url.is_empty() && !selectors::is_login_url(&url)
        })
        .await;

        if !logged_in {
            error!("❌ 在 {} 秒内未检测到登录", seconds);
        }
        logged_in
    }

    async fn open_via_menu(&self, session: &dyn BrowserSession) -> bool {
        let exact = Locator::text("a", selectors::MENU_TOP_LABEL, true);
        let fuzzy = Locator::text("a", selectors::MENU_TOP_FALLBACK, false);

        let top = if self.wait_present(session, &exact).await {
            exact
        } else if best_effort(session.count(&fuzzy).await, "查找菜单") > 0 {
            warn!("菜单 '{}' 未精确匹配，使用模糊匹配", selectors::MENU_TOP_LABEL);
            fuzzy
        } else {
            warn!("⚠️ 未找到菜单 '{}'", selectors::MENU_TOP_LABEL);
            return false;
        };
        if !best_effort(session.click(&top, 0).await, "点击菜单") {
            return false;
        }

        let sub = Locator::text("a", selectors::MENU_SUB_LABEL, true);
        if !self.wait_present(session, &sub).await {
            warn!("⚠️ 未找到子菜单 '{}'", selectors::MENU_SUB_LABEL);
            return false;
        }
        if !best_effort(session.click(&sub, 0).await, "点击子菜单") {
            return false;
        }

        self.wait_for_marker(session, self.timings.marker()).await
    }

    async fn wait_present(&self, session: &dyn BrowserSession, locator: &Locator) -> bool {
        wait_until(self.timings.menu(), move || async move {
            best_effort(session.count(locator).await, "等待菜单") > 0
        })
        .await
    }
}
