//! 基于 chromiumoxide 的浏览器会话
//!
//! 每个 DOM 操作都是一段脚本（见 `scripts`），原生对话框由后台任务
//! 监听 `Page.javascriptDialogOpening` 事件后记录下来。

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::input::InsertTextParams;
use chromiumoxide::cdp::browser_protocol::page::{
    EventJavascriptDialogOpening, HandleJavaScriptDialogParams,
};
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::infrastructure::scripts;
use crate::infrastructure::session::{
    BrowserSession, EditableTarget, FieldInfo, Locator, Scope, SelectOption, TableRow,
};
use crate::infrastructure::JsExecutor;

/// 各窗口上尚未处理的原生对话框（按 target id）
///
/// 切换窗口不会丢掉其他窗口上的对话框
#[derive(Debug, Default)]
struct DialogBook {
    pending: HashMap<String, String>,
}

impl DialogBook {
    fn record(&mut self, target: &str, message: String) {
        self.pending.insert(target.to_string(), message);
    }

    fn pending(&self, target: &str) -> Option<String> {
        self.pending.get(target).cloned()
    }

    fn take(&mut self, target: &str) -> Option<String> {
        self.pending.remove(target)
    }
}

/// 每个 target 至多一个对话框监听任务
#[derive(Default)]
struct DialogWatchers {
    tasks: HashMap<String, JoinHandle<()>>,
}

impl DialogWatchers {
    /// 先清掉已结束的任务，再判断 target 是否还需要监听
    fn needs_watch(&mut self, target: &str) -> bool {
        self.tasks.retain(|_, task| !task.is_finished());
        !self.tasks.contains_key(target)
    }

    fn insert(&mut self, target: String, task: JoinHandle<()>) {
        if let Some(previous) = self.tasks.insert(target, task) {
            previous.abort();
        }
    }

    fn remove(&mut self, target: &str) {
        if let Some(task) = self.tasks.remove(target) {
            task.abort();
        }
    }

    fn abort_all(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }

    fn len(&self) -> usize {
        self.tasks.len()
    }
}

fn target_of(page: &Page) -> String {
    page.target_id().inner().clone()
}

/// 真实浏览器会话
pub struct ChromiumSession {
    browser: Browser,
    executor: JsExecutor,
    dialogs: Arc<Mutex<DialogBook>>,
    watchers: Mutex<DialogWatchers>,
    handler: Mutex<Option<JoinHandle<()>>>,
}

impl ChromiumSession {
    /// 接管已连接的浏览器；`handler_task` 是驱动 CDP 事件循环的后台任务
    pub async fn new(browser: Browser, page: Page, handler_task: JoinHandle<()>) -> AppResult<Self> {
        let session = Self {
            browser,
            executor: JsExecutor::new(page.clone()),
            dialogs: Arc::new(Mutex::new(DialogBook::default())),
            watchers: Mutex::new(DialogWatchers::default()),
            handler: Mutex::new(Some(handler_task)),
        };
        session.watch_dialogs(&page).await?;
        Ok(session)
    }

    /// 为 page 启动对话框监听，已在监听的 page 直接跳过
    async fn watch_dialogs(&self, page: &Page) -> AppResult<()> {
        let target = target_of(page);
        let needed = self
            .watchers
            .lock()
            .map(|mut watchers| watchers.needs_watch(&target))
            .unwrap_or(true);
        if !needed {
            return Ok(());
        }

        let mut events = page.event_listener::<EventJavascriptDialogOpening>().await?;
        let book = Arc::clone(&self.dialogs);
        let watched = target.clone();
        let task = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                debug!("💬 检测到对话框 [{}]: {}", watched, event.message);
                if let Ok(mut book) = book.lock() {
                    book.record(&watched, event.message.clone());
                }
            }
        });
        match self.watchers.lock() {
            Ok(mut watchers) => {
                watchers.insert(target, task);
                debug!("对话框监听任务: {} 个", watchers.len());
            }
            Err(_) => task.abort(),
        }
        Ok(())
    }

    async fn page_by_handle(&self, handle: &str) -> AppResult<Option<Page>> {
        let pages = self.browser.pages().await?;
        Ok(pages
            .into_iter()
            .find(|p| p.target_id().inner().as_str() == handle))
    }

    fn with_dialogs<T>(&self, f: impl FnOnce(&mut DialogBook) -> T) -> AppResult<T> {
        self.dialogs
            .lock()
            .map(|mut book| f(&mut *book))
            .map_err(|e| AppError::Browser(format!("对话框状态不可用: {}", e)))
    }

    fn stop_tasks(&self) {
        if let Ok(mut watchers) = self.watchers.lock() {
            watchers.abort_all();
        }
        if let Ok(mut handler) = self.handler.lock() {
            if let Some(task) = handler.take() {
                task.abort();
            }
        }
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        self.stop_tasks();
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn goto(&self, url: &str) -> AppResult<()> {
        debug!("🌐 导航到: {}", url);
        let page = self.executor.page().await;
        page.goto(url).await?;
        Ok(())
    }

    async fn current_url(&self) -> AppResult<String> {
        let page = self.executor.page().await;
        Ok(page.url().await?.unwrap_or_default())
    }

    async fn go_back(&self) -> AppResult<()> {
        let _: bool = self.executor.run(scripts::HISTORY_BACK, json!({})).await?;
        Ok(())
    }

    async fn count(&self, locator: &Locator) -> AppResult<usize> {
        self.executor
            .run(scripts::COUNT, json!({ "frame": null, "loc": locator }))
            .await
    }

    async fn is_visible(&self, locator: &Locator) -> AppResult<bool> {
        self.executor
            .run(scripts::IS_VISIBLE, json!({ "frame": null, "loc": locator }))
            .await
    }

    async fn click(&self, locator: &Locator, nth: usize) -> AppResult<bool> {
        self.executor
            .run(scripts::CLICK, json!({ "loc": locator, "nth": nth }))
            .await
    }

    async fn options(&self, locator: &Locator) -> AppResult<Vec<SelectOption>> {
        self.executor
            .run(scripts::OPTIONS, json!({ "loc": locator }))
            .await
    }

    async fn select_value(&self, locator: &Locator, value: &str) -> AppResult<bool> {
        self.executor
            .run(scripts::SELECT_VALUE, json!({ "loc": locator, "value": value }))
            .await
    }

    async fn type_text(&self, locator: &Locator, text: &str) -> AppResult<bool> {
        let focused: bool = self
            .executor
            .run(scripts::PREPARE_TYPING, json!({ "loc": locator }))
            .await?;
        if !focused {
            return Ok(false);
        }
        let page = self.executor.page().await;
        page.execute(InsertTextParams::new(text)).await?;
        let _: bool = self
            .executor
            .run(scripts::FIRE_EVENTS, json!({ "loc": locator }))
            .await?;
        Ok(true)
    }

    async fn table_row(&self, locator: &Locator, nth: usize) -> AppResult<Option<TableRow>> {
        self.executor
            .run(scripts::TABLE_ROW, json!({ "loc": locator, "nth": nth }))
            .await
    }

    async fn frame_count(&self) -> AppResult<usize> {
        self.executor.run(scripts::FRAME_COUNT, json!({})).await
    }

    async fn editor_frames(&self, hints: &[String]) -> AppResult<Vec<usize>> {
        self.executor
            .run(scripts::EDITOR_FRAMES, json!({ "hints": hints }))
            .await
    }

    async fn fill_frame_body(&self, frame: usize, html: &str) -> AppResult<Option<usize>> {
        self.executor
            .run(scripts::FILL_FRAME_BODY, json!({ "frame": frame, "html": html }))
            .await
    }

    async fn fill_editables(
        &self,
        scope: Scope,
        html: &str,
        target: EditableTarget,
    ) -> AppResult<Vec<usize>> {
        let args = json!({
            "frame": scope.frame_index(),
            "html": html,
            "first_only": target == EditableTarget::First,
        });
        self.executor.run(scripts::FILL_EDITABLES, args).await
    }

    async fn editable_text_len(&self, scope: Scope) -> AppResult<usize> {
        self.executor
            .run(scripts::EDITABLE_LEN, json!({ "frame": scope.frame_index() }))
            .await
    }

    async fn write_fields(&self, scope: Scope, locator: &Locator, text: &str) -> AppResult<usize> {
        let args = json!({ "frame": scope.frame_index(), "loc": locator, "text": text });
        self.executor.run(scripts::WRITE_FIELDS, args).await
    }

    async fn field_text_len(&self, scope: Scope, locator: &Locator) -> AppResult<usize> {
        let args = json!({ "frame": scope.frame_index(), "loc": locator });
        self.executor.run(scripts::FIELD_LEN, args).await
    }

    async fn describe_fields(&self, scope: Scope, locator: &Locator) -> AppResult<Vec<FieldInfo>> {
        let args = json!({ "frame": scope.frame_index(), "loc": locator });
        let mut fields: Vec<FieldInfo> = self.executor.run(scripts::DESCRIBE_FIELDS, args).await?;
        for field in &mut fields {
            field.location = scope.to_string();
        }
        Ok(fields)
    }

    async fn append_hidden_field(&self, scope: Scope, id: &str, name: &str) -> AppResult<bool> {
        let args = json!({ "frame": scope.frame_index(), "id": id, "name": name });
        self.executor.run(scripts::APPEND_HIDDEN, args).await
    }

    async fn client_validate(&self, group: &str) -> AppResult<bool> {
        self.executor
            .run(scripts::CLIENT_VALIDATE, json!({ "group": group }))
            .await
    }

    async fn postback(&self, target: &str, validation_group: Option<&str>) -> AppResult<bool> {
        self.executor
            .run(
                scripts::POSTBACK,
                json!({ "target": target, "group": validation_group }),
            )
            .await
    }

    async fn pending_dialog(&self) -> AppResult<Option<String>> {
        let target = target_of(&self.executor.page().await);
        self.with_dialogs(|book| book.pending(&target))
    }

    async fn accept_dialog(&self) -> AppResult<()> {
        let page = self.executor.page().await;
        let result = page.execute(HandleJavaScriptDialogParams::new(true)).await;
        self.with_dialogs(|book| book.take(&target_of(&page)))?;
        result?;
        Ok(())
    }

    async fn window_handles(&self) -> AppResult<Vec<String>> {
        let pages = self.browser.pages().await?;
        Ok(pages
            .iter()
            .map(|p| p.target_id().inner().clone())
            .collect())
    }

    async fn current_window(&self) -> AppResult<String> {
        let page = self.executor.page().await;
        Ok(page.target_id().inner().clone())
    }

    async fn switch_window(&self, handle: &str) -> AppResult<bool> {
        let Some(page) = self.page_by_handle(handle).await? else {
            return Ok(false);
        };
        if let Err(e) = page.bring_to_front().await {
            debug!("bring_to_front 失败（忽略）: {}", e);
        }
        self.executor.switch_to(page.clone()).await;
        self.watch_dialogs(&page).await?;
        Ok(true)
    }

    async fn close_window(&self) -> AppResult<()> {
        let page = self.executor.page().await;
        let target = target_of(&page);
        page.close().await?;
        if let Ok(mut watchers) = self.watchers.lock() {
            watchers.remove(&target);
        }
        self.with_dialogs(|book| book.take(&target))?;
        Ok(())
    }

    async fn release(&self) -> AppResult<()> {
        self.stop_tasks();
        info!("🔌 已断开浏览器连接");
        Ok(())
    }
}
