//! JS 执行器 - 基础设施层
//!
//! 持有当前活动的 page，只暴露"执行 JS"的能力。
//! 多窗口场景下可以切换到其他 page。

use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tokio::sync::RwLock;

use crate::error::AppResult;
use crate::infrastructure::scripts;

/// JS 执行器
///
/// 职责：
/// - 持有当前 Page 资源
/// - 暴露 eval() 能力
/// - 不认识条目 / 部门等业务概念
pub struct JsExecutor {
    page: RwLock<Page>,
}

impl JsExecutor {
    /// 创建新的 JS 执行器
    pub fn new(page: Page) -> Self {
        Self {
            page: RwLock::new(page),
        }
    }

    /// 当前 page（chromiumoxide 的 Page 内部是 Arc，clone 代价很小）
    pub async fn page(&self) -> Page {
        self.page.read().await.clone()
    }

    /// 切换当前 page
    pub async fn switch_to(&self, page: Page) {
        *self.page.write().await = page;
    }

    /// 执行 JS 代码并返回 JSON 结果（undefined / null 统一为 Null）
    pub async fn eval(&self, js_code: impl Into<String>) -> AppResult<JsonValue> {
        let page = self.page().await;
        let result = page.evaluate(js_code.into()).await?;
        Ok(result.value().cloned().unwrap_or(JsonValue::Null))
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> AppResult<T> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }

    /// 执行 `scripts` 中的脚本体
    pub async fn run<T: DeserializeOwned>(&self, body: &str, args: JsonValue) -> AppResult<T> {
        self.eval_as(scripts::build(body, &args)).await
    }
}
