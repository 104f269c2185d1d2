//! 目标系统（SISPREV）页面上的元素标识
//!
//! 这些 id / name 由 ASP.NET WebForms 生成，视为稳定契约；
//! 每个都配有按文本或值匹配的后备定位。

use crate::infrastructure::Locator;

// ---------- 部门选择 ----------
pub const UNIT_SELECTOR_ID: &str = "ctl00_ContentCampos_ddlSetor";
pub const UNIT_CONFIRM_ID: &str = "ctl00_ContentCampos_Button1";
pub const RECEIVE_HEADER_ID: &str = "ctl00_ContentCampos_AccordionPane1_header_lblProcessoReceber";
pub const INSIDE_HEADER_ID: &str = "ctl00_ContentCampos_AccordionPane2_header_lblProcessoSetor";

// ---------- 接收 ----------
pub const RECEIVE_CHECKBOX_FRAGMENT: &str = "chk_receber";
pub const RECEIVE_BATCH_ID: &str = "ctl00_ContentCampos_AccordionPane1_content_imgBtnRecebeLote";

// ---------- 部门内条目 ----------
pub const ITEM_GRID_FRAGMENT: &str = "AccordionPane2_content_grdProcessoSetor";
pub const ITEM_OPEN_FRAGMENTS: [&str; 2] = ["imgbtnEdit", "imgbtnAbrir"];

// ---------- 内控信息 ----------
pub const INFO_TAB_ID: &str = "__tab_ctl00_ContentCampos_TabContainer1_tabTCE";
pub const INFO_TAB_LABEL: &str = "Mais Informações do Processo";
pub const REVIEW_OPINION_ID: &str = "ctl00_ContentCampos_TabContainer1_tabTCE_parecerControleInternoTCE";
pub const RESPONSIBLE_CPF_ID: &str = "ctl00_ContentCampos_TabContainer1_tabTCE_txtCPFRespControleInternoTCE";
pub const RESPONSIBLE_NAME_ID: &str = "ctl00_ContentCampos_TabContainer1_tabTCE_txtNomeRespControleInternoTCE";
pub const SAVE_ID: &str = "ctl00_ContentToolBar_btnSalvar";

// ---------- 转办面板 ----------
pub const DISPATCH_PANEL_ID: &str = "ctl00_ContentToolBar_btnTramitar";
pub const DESPATCH_TYPE_ID: &str = "ctl00_ContentToolBar_ddlDespacho";
pub const DESTINATION_UNIT_ID: &str = "ctl00_ContentToolBar_ddlSetor";
pub const OBSERVATION_ID: &str = "ctl00_ContentToolBar_txtObservacao";
pub const OBSERVATION_NAME: &str = "ctl00$ContentToolBar$txtObservacao";
pub const OBSERVATION_MARKER: &str = "observa";
pub const EDITOR_FRAME_HINTS: [&str; 3] = ["txtObservacao", "ContentToolBar", "Editor"];
pub const SUBMIT_ID: &str = "ctl00_ContentToolBar_Button1";
pub const SUBMIT_TARGET: &str = "ctl00$ContentToolBar$Button1";
pub const SUBMIT_LABEL: &str = "Tramitar";
pub const VALIDATION_GROUP: &str = "vgTramitar";

// ---------- 结果页 ----------
pub const REPORT_CLOSE_ID: &str = "btnFechar";
pub const REPORT_CLOSE_LABEL: &str = "Fechar";
pub const REPORT_URL_PATTERNS: [&str; 2] = ["visualizarelatorio.aspx", "/relatorios/"];

// ---------- 登录 / 菜单 ----------
pub const LOGIN_URL_PATTERNS: [&str; 2] = ["/Login/", "AvisoLogin"];
pub const RELOGIN_LINK_TEXT: &str = "Clique aqui";
pub const MENU_TOP_LABEL: &str = "Benefício";
pub const MENU_TOP_FALLBACK: &str = "Benef";
pub const MENU_SUB_LABEL: &str = "Concessão";

pub fn unit_selector() -> Locator {
    Locator::id(UNIT_SELECTOR_ID)
}

pub fn receive_header() -> Locator {
    Locator::id(RECEIVE_HEADER_ID)
}

pub fn inside_header() -> Locator {
    Locator::id(INSIDE_HEADER_ID)
}

pub fn receive_checkboxes() -> Locator {
    Locator::id_contains("input", &[RECEIVE_CHECKBOX_FRAGMENT], &[])
}

pub fn item_open_controls() -> Locator {
    Locator::id_contains("input", &[ITEM_GRID_FRAGMENT], &ITEM_OPEN_FRAGMENTS)
}

pub fn observation_field() -> Locator {
    Locator::id(OBSERVATION_ID)
}

/// 所有 id/name 含 "observa" 的字段，以及已知 id/name 的字段
pub fn observation_fields() -> Locator {
    Locator::ObservationFields {
        marker: OBSERVATION_MARKER.to_string(),
        id: OBSERVATION_ID.to_string(),
        name: OBSERVATION_NAME.to_string(),
    }
}

/// "Clique aqui para logar novamente."
pub fn relogin_link() -> Locator {
    Locator::text("a", RELOGIN_LINK_TEXT, false)
}

pub fn report_close_controls() -> [Locator; 2] {
    [
        Locator::id(REPORT_CLOSE_ID),
        Locator::text("a", REPORT_CLOSE_LABEL, false),
    ]
}

/// URL 是否指向登录 / 会话过期页
pub fn is_login_url(url: &str) -> bool {
    LOGIN_URL_PATTERNS.iter().any(|p| url.contains(p))
}

/// URL 是否指向报表 / PDF
pub fn is_report_url(url: &str) -> bool {
    let lower = url.to_lowercase();
    lower.ends_with(".pdf") || REPORT_URL_PATTERNS.iter().any(|p| lower.contains(p))
}
