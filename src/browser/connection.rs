use std::time::Duration;

use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::ChromiumSession;

/// 调试端口探测超时
const PROBE_TIMEOUT: Duration = Duration::from_millis(800);

/// 检查浏览器调试端口是否可用（GET /json/version）
pub async fn debug_port_open(port: u16) -> bool {
    let url = format!("http://localhost:{}/json/version", port);
    let client = match reqwest::Client::builder().timeout(PROBE_TIMEOUT).build() {
        Ok(client) => client,
        Err(e) => {
            debug!("创建探测客户端失败: {}", e);
            return false;
        }
    };
    match client.get(&url).send().await {
        Ok(resp) => resp.status().is_success(),
        Err(e) => {
            debug!("调试端口 {} 不可用: {}", port, e);
            false
        }
    }
}

/// 浏览器启动提示
pub fn start_instructions(port: u16) -> String {
    format!(
        "未在端口 {port} 找到浏览器，请先以远程调试模式启动 Chrome：\n\
         chrome.exe --remote-debugging-port={port} --user-data-dir=ChromeDevSession"
    )
}

/// 连接到已运行的浏览器，并选中目标系统所在的页面
pub async fn connect(config: &Config) -> AppResult<ChromiumSession> {
    let port = config.browser_debug_port;
    if !debug_port_open(port).await {
        let msg = start_instructions(port);
        error!("{}", msg);
        return Err(AppError::connection(port, msg));
    }

    let browser_url = format!("http://localhost:{}", port);
    info!("正在连接到浏览器: {}", browser_url);

    let (mut browser, mut handler) = Browser::connect(&browser_url).await.map_err(|e| {
        error!("连接浏览器失败: {}", e);
        AppError::connection(port, e.to_string())
    })?;
    debug!("浏览器连接成功");

    // 在后台处理浏览器事件
    let handler_task = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    if let Err(e) = browser.fetch_targets().await {
        debug!("获取已有页面失败: {}", e);
    }
    // 等待浏览器状态同步
    sleep(Duration::from_millis(300)).await;

    let page = pick_page(&browser, &config.base_url).await?;
    ChromiumSession::new(browser, page, handler_task).await
}

/// 优先选择已打开目标系统的页面，其次任一页面，最后新建
async fn pick_page(browser: &Browser, base_url: &str) -> AppResult<Page> {
    let pages = browser.pages().await?;
    debug!("获取到 {} 个页面", pages.len());

    let host = host_of(base_url);
    for p in pages.iter() {
        if let Ok(Some(url)) = p.url().await {
            debug!("检查页面: {}", url);
            if !host.is_empty() && url.contains(host) {
                info!("✓ 找到目标页面: {}", url);
                return Ok(p.clone());
            }
        }
    }

    if let Some(first) = pages.into_iter().next() {
        debug!("未找到目标系统页面，使用第一个页面");
        return Ok(first);
    }

    debug!("没有可用页面，创建空白页面");
    Ok(browser.new_page("about:blank").await?)
}

fn host_of(url: &str) -> &str {
    let rest = url.split("://").nth(1).unwrap_or(url);
    rest.split('/').next().unwrap_or_default()
}
