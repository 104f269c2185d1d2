//! 测试用的内存浏览器会话
//!
//! 每个窗口持有一组元素、可编辑区域和 iframe；点击 / 导航 / postback
//! 可以挂上反应函数来模拟页面变化。
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use ueci_tramitacao::config::Config;
use ueci_tramitacao::error::{AppError, AppResult};
use ueci_tramitacao::infrastructure::{
    BrowserSession, EditableTarget, FieldInfo, Locator, Scope, SelectOption, TableRow,
};
use ueci_tramitacao::models::payload::html_to_plain;
use ueci_tramitacao::models::selectors;
use ueci_tramitacao::utils::normalize;

pub type Reaction = Arc<dyn Fn(&mut FakeState) + Send + Sync>;

/// 页面元素
#[derive(Debug, Clone, Default)]
pub struct Element {
    pub tag: String,
    pub kind: String,
    pub id: String,
    pub name: String,
    pub text: String,
    pub value: String,
    pub options: Vec<SelectOption>,
    pub row: Option<TableRow>,
    pub hidden: bool,
    pub disabled: bool,
}

impl Element {
    pub fn new(tag: &str, id: &str) -> Self {
        Self {
            tag: tag.to_string(),
            kind: tag.to_string(),
            id: id.to_string(),
            ..Default::default()
        }
    }

    pub fn input(kind: &str, id: &str) -> Self {
        Self {
            kind: kind.to_string(),
            ..Self::new("input", id)
        }
    }

    pub fn select(id: &str, options: &[(&str, &str)]) -> Self {
        Self {
            options: options
                .iter()
                .map(|(value, label)| SelectOption {
                    value: value.to_string(),
                    label: label.to_string(),
                })
                .collect(),
            ..Self::new("select", id)
        }
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn value(mut self, value: &str) -> Self {
        self.value = value.to_string();
        self
    }

    pub fn row(mut self, row: TableRow) -> Self {
        self.row = Some(row);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    fn is_field(&self) -> bool {
        self.tag == "textarea" || (self.tag == "input" && (self.kind == "hidden" || self.kind == "text"))
    }

    fn matches(&self, locator: &Locator) -> bool {
        match locator {
            Locator::Id { id } => self.id == *id,
            Locator::Name { name } => self.name == *name,
            Locator::IdContains { tag, all, any } => {
                self.tag == *tag
                    && all.iter().all(|f| self.id.contains(f.as_str()))
                    && (any.is_empty() || any.iter().any(|f| self.id.contains(f.as_str())))
            }
            Locator::Text { tag, text, exact } => {
                let mine = normalize(&self.text);
                let wanted = normalize(text);
                self.tag == *tag && if *exact { mine == wanted } else { mine.contains(&wanted) }
            }
            Locator::Control { label } => {
                let label = label.to_lowercase();
                (self.tag == "input" || self.tag == "button")
                    && (self.value.to_lowercase().contains(&label)
                        || self.text.to_lowercase().contains(&label))
            }
            Locator::Editable => false,
            Locator::ObservationFields { marker, id, name } => {
                self.is_field()
                    && (self.id.to_lowercase().contains(marker.as_str())
                        || self.name.to_lowercase().contains(marker.as_str())
                        || self.id == *id
                        || self.name == *name)
            }
        }
    }

    fn text_len(&self) -> usize {
        self.value.trim().chars().count()
    }
}

/// 同源 iframe
#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub id: String,
    /// None 表示没有 body
    pub body: Option<String>,
    pub editables: Vec<String>,
    pub elements: Vec<Element>,
    pub has_form: bool,
}

impl Frame {
    pub fn editor(id: &str) -> Self {
        Self {
            id: id.to_string(),
            body: Some(String::new()),
            ..Default::default()
        }
    }
}

/// 浏览器窗口
#[derive(Debug, Clone, Default)]
pub struct Window {
    pub handle: String,
    pub url: String,
    pub elements: Vec<Element>,
    pub editables: Vec<String>,
    pub frames: Vec<Frame>,
    pub has_form: bool,
}

/// postback 机制
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostbackSupport {
    None,
    PlainOnly,
    Both,
}

/// 会话内部状态
pub struct FakeState {
    pub windows: Vec<Window>,
    pub current: usize,
    pub dialog: Option<String>,
    pub postbacks: PostbackSupport,
    pub validator: bool,
    pub typing: bool,
    pub released: bool,
    pub closed: Vec<String>,
    pub log: Vec<String>,
    /// 当前打开的部门内条目
    pub opened: Option<String>,
    next_handle: usize,
    click_reactions: HashMap<String, Reaction>,
    goto_reactions: HashMap<String, Reaction>,
    postback_reactions: HashMap<String, Reaction>,
    back_reaction: Option<Reaction>,
}

fn plain_len(html: &str) -> usize {
    html_to_plain(html)
        .map(|t| t.trim().chars().count())
        .unwrap_or(0)
}

impl FakeState {
    fn new() -> Self {
        Self {
            windows: vec![Window {
                handle: "W0".to_string(),
                url: "about:blank".to_string(),
                has_form: true,
                ..Default::default()
            }],
            current: 0,
            dialog: None,
            postbacks: PostbackSupport::Both,
            validator: true,
            typing: true,
            released: false,
            closed: Vec::new(),
            log: Vec::new(),
            opened: None,
            next_handle: 1,
            click_reactions: HashMap::new(),
            goto_reactions: HashMap::new(),
            postback_reactions: HashMap::new(),
            back_reaction: None,
        }
    }

    pub fn window(&mut self) -> &mut Window {
        &mut self.windows[self.current]
    }

    pub fn add(&mut self, element: Element) {
        self.window().elements.push(element);
    }

    pub fn remove(&mut self, id: &str) {
        self.window().elements.retain(|e| e.id != id);
    }

    /// 删除第一个匹配的元素
    pub fn remove_first(&mut self, locator: &Locator) {
        let elements = &mut self.window().elements;
        if let Some(pos) = elements.iter().position(|e| e.matches(locator)) {
            elements.remove(pos);
        }
    }

    pub fn set_url(&mut self, url: &str) {
        self.window().url = url.to_string();
    }

    pub fn set_visible(&mut self, id: &str, visible: bool) {
        for e in self.window().elements.iter_mut().filter(|e| e.id == id) {
            e.hidden = !visible;
        }
    }

    /// 打开新窗口（不切换焦点）
    pub fn open_window(&mut self, url: &str) -> String {
        let handle = format!("W{}", self.next_handle);
        self.next_handle += 1;
        self.windows.push(Window {
            handle: handle.clone(),
            url: url.to_string(),
            ..Default::default()
        });
        handle
    }

    pub fn element(&self, id: &str) -> Option<&Element> {
        self.windows[self.current].elements.iter().find(|e| e.id == id)
    }

    fn scope_elements(&mut self, scope: Scope) -> Option<&mut Vec<Element>> {
        match scope {
            Scope::Document => Some(&mut self.window().elements),
            Scope::Frame(i) => self.window().frames.get_mut(i).map(|f| &mut f.elements),
        }
    }

    fn scope_editables(&mut self, scope: Scope) -> Option<&mut Vec<String>> {
        match scope {
            Scope::Document => Some(&mut self.window().editables),
            Scope::Frame(i) => self.window().frames.get_mut(i).map(|f| &mut f.editables),
        }
    }

    fn matching(&self, locator: &Locator) -> Vec<&Element> {
        self.windows[self.current]
            .elements
            .iter()
            .filter(|e| e.matches(locator))
            .collect()
    }
}

/// 内存会话
#[derive(Clone)]
pub struct FakeSession {
    state: Arc<Mutex<FakeState>>,
}

impl Default for FakeSession {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeSession {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState::new())),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        f(&mut self.state())
    }

    /// 点击 id 为 `id` 的元素时执行
    pub fn on_click(&self, id: &str, f: impl Fn(&mut FakeState) + Send + Sync + 'static) {
        self.state().click_reactions.insert(id.to_string(), Arc::new(f));
    }

    /// 导航到 `url` 时执行
    pub fn on_goto(&self, url: &str, f: impl Fn(&mut FakeState) + Send + Sync + 'static) {
        self.state().goto_reactions.insert(url.to_string(), Arc::new(f));
    }

    /// 以 `target` 为目标的 postback 时执行
    pub fn on_postback(&self, target: &str, f: impl Fn(&mut FakeState) + Send + Sync + 'static) {
        self.state().postback_reactions.insert(target.to_string(), Arc::new(f));
    }

    pub fn on_back(&self, f: impl Fn(&mut FakeState) + Send + Sync + 'static) {
        self.state().back_reaction = Some(Arc::new(f));
    }

    pub fn log(&self) -> Vec<String> {
        self.state().log.clone()
    }

    /// 以 prefix 开头的日志条数
    pub fn count_log(&self, prefix: &str) -> usize {
        self.state().log.iter().filter(|l| l.starts_with(prefix)).count()
    }

    pub fn value_of(&self, id: &str) -> Option<String> {
        self.state().element(id).map(|e| e.value.clone())
    }

    pub fn released(&self) -> bool {
        self.state().released
    }

    pub fn closed_windows(&self) -> Vec<String> {
        self.state().closed.clone()
    }

    fn react(&self, reaction: Option<Reaction>) {
        if let Some(f) = reaction {
            f(&mut self.state());
        }
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn goto(&self, url: &str) -> AppResult<()> {
        let reaction = {
            let mut s = self.state();
            s.log.push(format!("goto:{}", url));
            s.set_url(url);
            s.goto_reactions.get(url).cloned()
        };
        self.react(reaction);
        Ok(())
    }

    async fn current_url(&self) -> AppResult<String> {
        let s = self.state();
        s.windows
            .get(s.current)
            .map(|w| w.url.clone())
            .ok_or_else(|| AppError::Browser("没有当前窗口".into()))
    }

    async fn go_back(&self) -> AppResult<()> {
        let reaction = {
            let mut s = self.state();
            s.log.push("back".to_string());
            s.back_reaction.clone()
        };
        self.react(reaction);
        Ok(())
    }

    async fn count(&self, locator: &Locator) -> AppResult<usize> {
        let mut s = self.state();
        if *locator == Locator::Editable {
            return Ok(s.window().editables.len());
        }
        Ok(s.matching(locator).len())
    }

    async fn is_visible(&self, locator: &Locator) -> AppResult<bool> {
        Ok(self.state().matching(locator).iter().any(|e| !e.hidden))
    }

    async fn click(&self, locator: &Locator, nth: usize) -> AppResult<bool> {
        let reaction = {
            let mut s = self.state();
            let Some(element) = s.matching(locator).get(nth).map(|e| (*e).clone()) else {
                return Ok(false);
            };
            let key = if element.id.is_empty() {
                element.text.clone()
            } else {
                element.id.clone()
            };
            s.log.push(format!("click:{}", key));
            if element.kind == "checkbox" {
                if let Some(e) = s.window().elements.iter_mut().find(|e| e.id == element.id) {
                    e.value = "on".to_string();
                }
            }
            s.click_reactions.get(&key).cloned()
        };
        self.react(reaction);
        Ok(true)
    }

    async fn options(&self, locator: &Locator) -> AppResult<Vec<SelectOption>> {
        Ok(self
            .state()
            .matching(locator)
            .first()
            .map(|e| e.options.clone())
            .unwrap_or_default())
    }

    async fn select_value(&self, locator: &Locator, value: &str) -> AppResult<bool> {
        let mut s = self.state();
        let Some(id) = s.matching(locator).first().map(|e| e.id.clone()) else {
            return Ok(false);
        };
        let Some(element) = s.window().elements.iter_mut().find(|e| e.id == id) else {
            return Ok(false);
        };
        if !element.options.iter().any(|o| o.value == value) {
            return Ok(false);
        }
        element.value = value.to_string();
        s.log.push(format!("select:{}={}", id, value));
        Ok(true)
    }

    async fn type_text(&self, locator: &Locator, text: &str) -> AppResult<bool> {
        let mut s = self.state();
        if !s.typing {
            return Ok(false);
        }
        let Some(id) = s.matching(locator).first().map(|e| e.id.clone()) else {
            return Ok(false);
        };
        if let Some(e) = s.window().elements.iter_mut().find(|e| e.id == id) {
            e.disabled = false;
            e.value = text.to_string();
        }
        s.log.push(format!("type:{}", id));
        Ok(true)
    }

    async fn table_row(&self, locator: &Locator, nth: usize) -> AppResult<Option<TableRow>> {
        Ok(self
            .state()
            .matching(locator)
            .get(nth)
            .and_then(|e| e.row.clone()))
    }

    async fn frame_count(&self) -> AppResult<usize> {
        Ok(self.state().window().frames.len())
    }

    async fn editor_frames(&self, hints: &[String]) -> AppResult<Vec<usize>> {
        Ok(self
            .state()
            .window()
            .frames
            .iter()
            .enumerate()
            .filter(|(_, f)| hints.iter().any(|h| f.id.contains(h.as_str())))
            .map(|(i, _)| i)
            .collect())
    }

    async fn fill_frame_body(&self, frame: usize, html: &str) -> AppResult<Option<usize>> {
        let mut s = self.state();
        let Some(frame) = s.window().frames.get_mut(frame) else {
            return Err(AppError::Script("frame 不存在".into()));
        };
        let Some(body) = frame.body.as_mut() else {
            return Ok(None);
        };
        *body = html.to_string();
        Ok(Some(plain_len(html)))
    }

    async fn fill_editables(
        &self,
        scope: Scope,
        html: &str,
        target: EditableTarget,
    ) -> AppResult<Vec<usize>> {
        let mut s = self.state();
        let Some(editables) = s.scope_editables(scope) else {
            return Ok(Vec::new());
        };
        let take = match target {
            EditableTarget::First => editables.len().min(1),
            EditableTarget::All => editables.len(),
        };
        let mut lengths = Vec::new();
        for region in editables.iter_mut().take(take) {
            *region = html.to_string();
            lengths.push(plain_len(html));
        }
        if !lengths.is_empty() {
            s.log.push(format!("fill_editables:{}:{}", scope, lengths.len()));
        }
        Ok(lengths)
    }

    async fn editable_text_len(&self, scope: Scope) -> AppResult<usize> {
        let mut s = self.state();
        Ok(s
            .scope_editables(scope)
            .and_then(|e| e.first().map(|html| plain_len(html)))
            .unwrap_or(0))
    }

    async fn write_fields(&self, scope: Scope, locator: &Locator, text: &str) -> AppResult<usize> {
        let mut s = self.state();
        let Some(elements) = s.scope_elements(scope) else {
            return Ok(0);
        };
        let mut written = 0;
        for e in elements.iter_mut().filter(|e| e.matches(locator)) {
            e.disabled = false;
            e.value = text.to_string();
            written += 1;
        }
        if written > 0 {
            s.log.push(format!("write:{}:{}", scope, written));
        }
        Ok(written)
    }

    async fn field_text_len(&self, scope: Scope, locator: &Locator) -> AppResult<usize> {
        let mut s = self.state();
        Ok(s.scope_elements(scope)
            .and_then(|elements| elements.iter().find(|e| e.matches(locator)).map(Element::text_len))
            .unwrap_or(0))
    }

    async fn describe_fields(&self, scope: Scope, locator: &Locator) -> AppResult<Vec<FieldInfo>> {
        let mut s = self.state();
        s.log.push(format!("describe:{}", scope));
        Ok(s.scope_elements(scope)
            .map(|elements| {
                elements
                    .iter()
                    .filter(|e| e.matches(locator))
                    .map(|e| FieldInfo {
                        location: scope.to_string(),
                        id: e.id.clone(),
                        name: e.name.clone(),
                        kind: e.kind.clone(),
                        disabled: e.disabled,
                        length: e.text_len(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn append_hidden_field(&self, scope: Scope, id: &str, name: &str) -> AppResult<bool> {
        let mut s = self.state();
        let has_form = match scope {
            Scope::Document => s.window().has_form,
            Scope::Frame(i) => s.window().frames.get(i).is_some_and(|f| f.has_form),
        };
        if !has_form {
            return Ok(false);
        }
        let field = Element::input("hidden", id).name(name).hidden();
        if let Some(elements) = s.scope_elements(scope) {
            elements.push(field);
        }
        s.log.push(format!("append_hidden:{}", scope));
        Ok(true)
    }

    async fn client_validate(&self, group: &str) -> AppResult<bool> {
        let mut s = self.state();
        s.log.push(format!("validate:{}", group));
        Ok(s.validator)
    }

    async fn postback(&self, target: &str, validation_group: Option<&str>) -> AppResult<bool> {
        let reaction = {
            let mut s = self.state();
            let available = match (s.postbacks, validation_group) {
                (PostbackSupport::None, _) => false,
                (PostbackSupport::PlainOnly, Some(_)) => false,
                _ => true,
            };
            if !available {
                return Ok(false);
            }
            s.log.push(match validation_group {
                Some(group) => format!("postback:{}:{}", target, group),
                None => format!("postback:{}", target),
            });
            s.postback_reactions.get(target).cloned()
        };
        self.react(reaction);
        Ok(true)
    }

    async fn pending_dialog(&self) -> AppResult<Option<String>> {
        Ok(self.state().dialog.clone())
    }

    async fn accept_dialog(&self) -> AppResult<()> {
        let mut s = self.state();
        if let Some(message) = s.dialog.take() {
            s.log.push(format!("accept:{}", message));
        }
        Ok(())
    }

    async fn window_handles(&self) -> AppResult<Vec<String>> {
        Ok(self.state().windows.iter().map(|w| w.handle.clone()).collect())
    }

    async fn current_window(&self) -> AppResult<String> {
        let s = self.state();
        Ok(s.windows.get(s.current).map(|w| w.handle.clone()).unwrap_or_default())
    }

    async fn switch_window(&self, handle: &str) -> AppResult<bool> {
        let mut s = self.state();
        match s.windows.iter().position(|w| w.handle == handle) {
            Some(pos) => {
                s.current = pos;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn close_window(&self) -> AppResult<()> {
        let mut s = self.state();
        let current = s.current;
        if current >= s.windows.len() {
            return Err(AppError::Browser("没有当前窗口".into()));
        }
        let closed = s.windows.remove(current);
        s.closed.push(closed.handle);
        s.current = 0;
        Ok(())
    }

    async fn release(&self) -> AppResult<()> {
        self.state().released = true;
        Ok(())
    }
}

// ========== SISPREV 页面构造 ==========

/// 测试配置：负责人已设置
pub fn test_config() -> Config {
    Config {
        responsible_name: "Maria Souza".to_string(),
        responsible_cpf: "00000000000".to_string(),
        signer_name: Some("MARIA SOUZA".to_string()),
        ..Config::default()
    }
}

/// 待接收列表的一行
pub fn receive_row(origin: &str) -> TableRow {
    let cells = vec![
        String::new(),
        "2024/000123".to_string(),
        origin.to_string(),
        "01/02/2024".to_string(),
    ];
    TableRow {
        header: vec![
            String::new(),
            "Processo".to_string(),
            "Setor Enviou".to_string(),
            "Data".to_string(),
        ],
        text: cells.join(" "),
        cells,
    }
}

/// 部门选择页面：可见的部门下拉框 + 确认按钮；确认后进入部门
pub fn unit_selection_page(session: &FakeSession, config: &Config) {
    let unit_value = config.unit_value.clone();
    session.with(|s| {
        s.add(Element::select(
            selectors::UNIT_SELECTOR_ID,
            &[("1", "GERÊNCIA"), (unit_value.as_str(), "UECI - CONTROLE INTERNO")],
        ));
        s.add(Element::input("submit", selectors::UNIT_CONFIRM_ID).value("Confirmar"));
    });
    session.on_click(selectors::UNIT_CONFIRM_ID, move |s| {
        let chosen = s
            .element(selectors::UNIT_SELECTOR_ID)
            .map(|e| e.value.clone())
            .unwrap_or_default();
        if chosen == unit_value {
            s.set_visible(selectors::UNIT_SELECTOR_ID, false);
            add_headers(s);
        }
    });
}

/// 两个列表标题
pub fn add_headers(s: &mut FakeState) {
    if s.element(selectors::RECEIVE_HEADER_ID).is_none() {
        s.add(Element::new("span", selectors::RECEIVE_HEADER_ID).text("Processos a Receber"));
    }
    if s.element(selectors::INSIDE_HEADER_ID).is_none() {
        s.add(Element::new("span", selectors::INSIDE_HEADER_ID).text("Processos no Setor"));
    }
}

/// 待接收条目（复选框 + 批量接收按钮，接收后弹出确认对话框）
pub fn receive_list(session: &FakeSession, origins: &[&str]) {
    let origins: Vec<String> = origins.iter().map(|s| s.to_string()).collect();
    session.with(|s| {
        for (i, origin) in origins.iter().enumerate() {
            let id = format!("ctl00_grdReceber_ctl0{}_chk_receber", i + 2);
            s.add(Element::input("checkbox", &id).row(receive_row(origin)));
        }
        s.add(Element::input("image", selectors::RECEIVE_BATCH_ID));
    });
    session.on_click(selectors::RECEIVE_BATCH_ID, |s| {
        s.dialog = Some("Processo(s) recebido(s) com sucesso.".to_string());
    });
}

pub fn item_control_id(i: usize) -> String {
    format!(
        "ctl00_ContentCampos_{}_ctl0{}_imgbtnEdit",
        selectors::ITEM_GRID_FRAGMENT,
        i + 2
    )
}

/// 部门内条目的打开按钮
pub fn inside_items(session: &FakeSession, count: usize) {
    session.with(|s| {
        for i in 0..count {
            s.add(Element::input("image", &item_control_id(i)));
        }
    });
    for i in 0..count {
        let id = item_control_id(i);
        session.on_click(&item_control_id(i), move |s| s.opened = Some(id.clone()));
    }
}

/// 条目页面上的所有控件
///
/// 提交后弹出确认对话框，打开一个报表窗口，并从列表中移除当前条目
pub fn item_form(session: &FakeSession, config: &Config) {
    let opinion = config.review_opinion_label.clone();
    let despatch = config.despatch_type_value.clone();
    let destination = config.destination_unit_value.clone();
    session.with(|s| {
        s.add(Element::new("span", selectors::INFO_TAB_ID).text(selectors::INFO_TAB_LABEL));
        s.add(Element::select(
            selectors::REVIEW_OPINION_ID,
            &[("0", "Selecione"), ("3", opinion.as_str())],
        ));
        s.add(Element::input("text", selectors::RESPONSIBLE_CPF_ID));
        s.add(Element::input("text", selectors::RESPONSIBLE_NAME_ID));
        s.add(Element::input("submit", selectors::SAVE_ID).value("Salvar"));
        s.add(Element::input("submit", selectors::DISPATCH_PANEL_ID).value("Tramitar"));
        s.add(Element::select(
            selectors::DESPATCH_TYPE_ID,
            &[("1", "Arquivar"), (despatch.as_str(), "Encaminhar")],
        ));
        s.add(Element::select(
            selectors::DESTINATION_UNIT_ID,
            &[("2", "GAB"), (destination.as_str(), "PRESIDÊNCIA")],
        ));
        s.add(Element::new("textarea", selectors::OBSERVATION_ID).name(selectors::OBSERVATION_NAME));
        s.add(Element::input("submit", selectors::SUBMIT_ID).value("Tramitar"));
    });
    session.on_click(selectors::SUBMIT_ID, |s| {
        s.dialog = Some("Processo tramitado com sucesso.".to_string());
        s.open_window("https://previdencia.es.gov.br/sisprevweb/Relatorios/VisualizaRelatorio.aspx");
        match s.opened.take() {
            Some(id) => s.remove(&id),
            None => s.remove_first(&selectors::item_open_controls()),
        }
    });
}
