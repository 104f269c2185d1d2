//! 基础设施层
//!
//! 持有稀缺资源（浏览器 page），只向上层暴露能力。

pub mod chromium_session;
pub mod js_executor;
pub mod scripts;
pub mod session;
pub mod wait;

pub use chromium_session::ChromiumSession;
pub use js_executor::JsExecutor;
pub use session::{
    best_effort, BrowserSession, EditableTarget, FieldInfo, Locator, Scope, SelectOption,
    TableRow,
};
pub use wait::{poll_for, wait_until, WaitPolicy};
