//! 浏览器会话契约 - 基础设施层
//!
//! 核心逻辑只通过 `BrowserSession` 访问页面。真实实现基于 chromiumoxide，
//! 测试中注入内存假会话。

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AppResult;

/// 元素定位方式
///
/// 序列化为 JSON 后由页面端脚本解释，见 `scripts::PRELUDE`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Locator {
    /// 按 id
    Id { id: String },
    /// 按 name 属性
    Name { name: String },
    /// id 同时包含 `all` 中所有片段，且包含 `any` 中至少一个（`any` 为空时不限制）
    IdContains {
        tag: String,
        all: Vec<String>,
        any: Vec<String>,
    },
    /// 指定标签、按规范化后的可见文本匹配
    Text {
        tag: String,
        text: String,
        exact: bool,
    },
    /// 提交类控件，value 或文本包含 label（不区分大小写）
    Control { label: String },
    /// 可直接编辑的区域（contenteditable）
    Editable,
    /// 观察字段：textarea / hidden / text 输入框，id 或 name 包含 marker，
    /// 或者 id / name 与已知值完全一致
    ObservationFields {
        marker: String,
        id: String,
        name: String,
    },
}

impl Locator {
    pub fn id(id: impl Into<String>) -> Self {
        Locator::Id { id: id.into() }
    }

    pub fn name(name: impl Into<String>) -> Self {
        Locator::Name { name: name.into() }
    }

    pub fn text(tag: impl Into<String>, text: impl Into<String>, exact: bool) -> Self {
        Locator::Text {
            tag: tag.into(),
            text: text.into(),
            exact,
        }
    }

    pub fn control(label: impl Into<String>) -> Self {
        Locator::Control {
            label: label.into(),
        }
    }

    pub fn id_contains(tag: impl Into<String>, all: &[&str], any: &[&str]) -> Self {
        Locator::IdContains {
            tag: tag.into(),
            all: all.iter().map(|s| s.to_string()).collect(),
            any: any.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Id { id } => write!(f, "#{}", id),
            Locator::Name { name } => write!(f, "[name={}]", name),
            Locator::IdContains { tag, all, any } => {
                write!(f, "{}[id*={:?} any={:?}]", tag, all, any)
            }
            Locator::Text { tag, text, exact } => {
                let op = if *exact { "=" } else { "~" };
                write!(f, "{}{{text{}'{}'}}", tag, op, text)
            }
            Locator::Control { label } => write!(f, "control('{}')", label),
            Locator::Editable => write!(f, "[contenteditable]"),
            Locator::ObservationFields { marker, .. } => write!(f, "fields(*{}*)", marker),
        }
    }
}

/// 操作作用域：主文档或第 n 个同源 iframe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Document,
    Frame(usize),
}

impl Scope {
    /// 传给页面脚本的 frame 参数（主文档为 null）
    pub fn frame_index(self) -> Option<usize> {
        match self {
            Scope::Document => None,
            Scope::Frame(i) => Some(i),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Document => write!(f, "root"),
            Scope::Frame(i) => write!(f, "frame{}", i),
        }
    }
}

/// 编辑区写入范围
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditableTarget {
    First,
    All,
}

/// 下拉框选项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

/// 元素所在表格行
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRow {
    /// 表格首行的单元格文本
    pub header: Vec<String>,
    /// 当前行的单元格文本
    pub cells: Vec<String>,
    /// 整行文本
    pub text: String,
}

/// 观察字段诊断信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInfo {
    #[serde(default)]
    pub location: String,
    pub id: String,
    pub name: String,
    pub kind: String,
    pub disabled: bool,
    pub length: usize,
}

impl fmt::Display for FieldInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}|{}|{}",
            self.location, self.id, self.name, self.kind, self.disabled, self.length
        )
    }
}

/// 浏览器会话
///
/// 约定：
/// - 预期内的失败（元素不存在、对话框未出现）用 bool / Option / 空集合表达
/// - `Err` 只用于通信或脚本层面的异常
/// - 所有读取都是实时的，不缓存页面状态
#[async_trait]
pub trait BrowserSession: Send + Sync {
    // ---------- 导航 ----------
    async fn goto(&self, url: &str) -> AppResult<()>;
    async fn current_url(&self) -> AppResult<String>;
    async fn go_back(&self) -> AppResult<()>;

    // ---------- 主文档元素 ----------
    async fn count(&self, locator: &Locator) -> AppResult<usize>;
    /// 任一匹配元素可见
    async fn is_visible(&self, locator: &Locator) -> AppResult<bool>;
    /// 滚动到视图并点击第 nth 个匹配元素；不存在时返回 false
    async fn click(&self, locator: &Locator, nth: usize) -> AppResult<bool>;
    async fn options(&self, locator: &Locator) -> AppResult<Vec<SelectOption>>;
    async fn select_value(&self, locator: &Locator, value: &str) -> AppResult<bool>;
    /// 解除 disabled、清空后模拟键入；元素不存在时返回 false
    async fn type_text(&self, locator: &Locator, text: &str) -> AppResult<bool>;
    async fn table_row(&self, locator: &Locator, nth: usize) -> AppResult<Option<TableRow>>;

    // ---------- 编辑器 / 字段 ----------
    /// 同源 iframe 数量
    async fn frame_count(&self) -> AppResult<usize>;
    /// id 或 name 包含任一提示词的 iframe 序号
    async fn editor_frames(&self, hints: &[String]) -> AppResult<Vec<usize>>;
    /// 设置 iframe 的 body 内容，返回可见文本长度；没有 body 时返回 None
    async fn fill_frame_body(&self, frame: usize, html: &str) -> AppResult<Option<usize>>;
    /// 写入可编辑区域并派发 input/keyup/change/blur，返回每个区域的可见文本长度
    async fn fill_editables(
        &self,
        scope: Scope,
        html: &str,
        target: EditableTarget,
    ) -> AppResult<Vec<usize>>;
    /// 第一个可编辑区域的去空白文本长度
    async fn editable_text_len(&self, scope: Scope) -> AppResult<usize>;
    /// 解除 disabled 后写入所有匹配字段并派发事件，返回写入数量
    async fn write_fields(&self, scope: Scope, locator: &Locator, text: &str) -> AppResult<usize>;
    /// 第一个匹配字段 value/textContent 的去空白长度
    async fn field_text_len(&self, scope: Scope, locator: &Locator) -> AppResult<usize>;
    async fn describe_fields(&self, scope: Scope, locator: &Locator) -> AppResult<Vec<FieldInfo>>;
    /// 在第一个 form 中追加 hidden 输入框；没有 form 时返回 false
    async fn append_hidden_field(&self, scope: Scope, id: &str, name: &str) -> AppResult<bool>;

    // ---------- 表单机制 ----------
    /// 触发客户端校验；页面没有校验器时返回 false
    async fn client_validate(&self, group: &str) -> AppResult<bool>;
    /// 调用页面 postback；带校验组时走带选项的形式。机制不存在时返回 false
    async fn postback(&self, target: &str, validation_group: Option<&str>) -> AppResult<bool>;
    /// 当前打开的原生对话框消息
    async fn pending_dialog(&self) -> AppResult<Option<String>>;
    async fn accept_dialog(&self) -> AppResult<()>;

    // ---------- 窗口 ----------
    async fn window_handles(&self) -> AppResult<Vec<String>>;
    async fn current_window(&self) -> AppResult<String>;
    async fn switch_window(&self, handle: &str) -> AppResult<bool>;
    /// 关闭当前窗口
    async fn close_window(&self) -> AppResult<()>;

    /// 释放连接
    async fn release(&self) -> AppResult<()>;
}

/// 尽力而为：错误只记诊断，返回默认值
pub fn best_effort<T: Default>(result: AppResult<T>, what: &str) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            debug!("{} 失败（忽略）: {}", what, e);
            T::default()
        }
    }
}
