use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::infrastructure::WaitPolicy;

/// 程序配置
///
/// 加载顺序：默认值 → `UECI_CONFIG` 指向的 TOML 文件（可选）→ 环境变量
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 浏览器调试端口
    pub browser_debug_port: u16,
    /// 目标系统根地址
    pub base_url: String,
    /// 要进入的部门（下拉框 value）
    pub unit_value: String,
    /// 部门下拉框 value 不存在时的模糊匹配标签
    pub unit_label: String,
    /// 转办类型（despacho）下拉框 value
    pub despatch_type_value: String,
    /// 目标部门下拉框 value
    pub destination_unit_value: String,
    /// 内控意见下拉框的可见文本
    pub review_opinion_label: String,
    /// 不接收的来源部门片段（多词片段要求全部命中）
    pub blocked_origins: Vec<String>,
    /// 内控负责人姓名
    pub responsible_name: String,
    /// 内控负责人 CPF
    pub responsible_cpf: String,
    /// 当前操作系统用户
    pub operator: String,
    /// 签名人（为空时按操作员查表）
    pub signer_name: Option<String>,
    /// 诊断日志文件
    pub diagnostics_file: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 同步置信比例
    pub sync_min_fraction: f64,
    /// 同步最小字符数
    pub sync_min_chars: usize,
    /// 各类等待时间（毫秒）
    pub timings: Timings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            browser_debug_port: 9222,
            base_url: "https://previdencia.es.gov.br/sisprevweb".to_string(),
            unit_value: "59".to_string(),
            unit_label: "UECI".to_string(),
            despatch_type_value: "4".to_string(),
            destination_unit_value: "15".to_string(),
            review_opinion_label: "Não foi objeto do exame".to_string(),
            blocked_origins: vec![
                "CPAD".to_string(),
                "COORDENAÇÃO PROTOCOLO ARQUIVO DOCUMENTAL".to_string(),
            ],
            responsible_name: String::new(),
            responsible_cpf: String::new(),
            operator: "Usuário".to_string(),
            signer_name: None,
            diagnostics_file: "logs_ueci.txt".to_string(),
            verbose_logging: false,
            sync_min_fraction: 0.3,
            sync_min_chars: 15,
            timings: Timings::default(),
        }
    }
}

/// 等待时间表（毫秒）
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Timings {
    pub marker_wait_ms: u64,
    pub marker_poll_ms: u64,
    pub direct_attempts: usize,
    pub direct_backoff_ms: u64,
    pub reauth_wait_ms: u64,
    pub reauth_poll_ms: u64,
    pub menu_wait_ms: u64,
    pub menu_poll_ms: u64,
    pub unit_confirm_wait_ms: u64,
    pub sync_primary_ms: u64,
    pub sync_preclick_ms: u64,
    pub sync_poll_ms: u64,
    pub submit_control_wait_ms: u64,
    pub element_poll_ms: u64,
    pub dialog_after_click_ms: u64,
    pub dialog_after_postback_ms: u64,
    pub dialog_final_ms: u64,
    pub intake_dialog_ms: u64,
    pub result_window_wait_ms: u64,
    pub result_window_poll_ms: u64,
    pub modal_open_delay_ms: u64,
    pub after_select_delay_ms: u64,
    pub item_recovery_pause_ms: u64,
    pub tab_open_delay_ms: u64,
    pub after_save_delay_ms: u64,
    pub list_expand_delay_ms: u64,
    pub item_open_delay_ms: u64,
    pub close_control_wait_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            marker_wait_ms: 10_000,
            marker_poll_ms: 300,
            direct_attempts: 2,
            direct_backoff_ms: 1_000,
            reauth_wait_ms: 60_000,
            reauth_poll_ms: 500,
            menu_wait_ms: 5_000,
            menu_poll_ms: 200,
            unit_confirm_wait_ms: 10_000,
            sync_primary_ms: 1_200,
            sync_preclick_ms: 500,
            sync_poll_ms: 300,
            submit_control_wait_ms: 6_000,
            element_poll_ms: 200,
            dialog_after_click_ms: 3_000,
            dialog_after_postback_ms: 4_000,
            dialog_final_ms: 10_000,
            intake_dialog_ms: 5_000,
            result_window_wait_ms: 8_000,
            result_window_poll_ms: 250,
            modal_open_delay_ms: 600,
            after_select_delay_ms: 300,
            item_recovery_pause_ms: 3_000,
            tab_open_delay_ms: 1_000,
            after_save_delay_ms: 1_000,
            list_expand_delay_ms: 800,
            item_open_delay_ms: 1_000,
            close_control_wait_ms: 2_000,
        }
    }
}

impl Timings {
    pub fn marker(&self) -> WaitPolicy {
        WaitPolicy::from_millis(self.marker_wait_ms, self.marker_poll_ms)
    }

    pub fn reauth(&self) -> WaitPolicy {
        WaitPolicy::from_millis(self.reauth_wait_ms, self.reauth_poll_ms)
    }

    pub fn menu(&self) -> WaitPolicy {
        WaitPolicy::from_millis(self.menu_wait_ms, self.menu_poll_ms)
    }

    pub fn unit_confirm(&self) -> WaitPolicy {
        WaitPolicy::from_millis(self.unit_confirm_wait_ms, self.marker_poll_ms)
    }

    pub fn submit_control(&self) -> WaitPolicy {
        WaitPolicy::from_millis(self.submit_control_wait_ms, self.element_poll_ms)
    }

    /// 普通控件等待（与 submit_control 共用轮询间隔）
    pub fn element(&self, timeout_ms: u64) -> WaitPolicy {
        WaitPolicy::from_millis(timeout_ms, self.element_poll_ms)
    }

    pub fn dialog(&self, timeout_ms: u64) -> WaitPolicy {
        WaitPolicy::from_millis(timeout_ms, self.element_poll_ms)
    }

    pub fn result_window(&self) -> WaitPolicy {
        WaitPolicy::from_millis(self.result_window_wait_ms, self.result_window_poll_ms)
    }

    pub fn direct_backoff(&self, attempt: usize) -> Duration {
        Duration::from_millis(self.direct_backoff_ms * (attempt as u64 + 1))
    }

    pub fn modal_open_delay(&self) -> Duration {
        Duration::from_millis(self.modal_open_delay_ms)
    }

    pub fn after_select_delay(&self) -> Duration {
        Duration::from_millis(self.after_select_delay_ms)
    }

    pub fn item_recovery_pause(&self) -> Duration {
        Duration::from_millis(self.item_recovery_pause_ms)
    }

    pub fn tab_open_delay(&self) -> Duration {
        Duration::from_millis(self.tab_open_delay_ms)
    }

    pub fn after_save_delay(&self) -> Duration {
        Duration::from_millis(self.after_save_delay_ms)
    }

    pub fn list_expand_delay(&self) -> Duration {
        Duration::from_millis(self.list_expand_delay_ms)
    }

    pub fn item_open_delay(&self) -> Duration {
        Duration::from_millis(self.item_open_delay_ms)
    }
}

impl Config {
    /// 按 默认值 → TOML → 环境变量 的顺序加载
    pub fn load() -> AppResult<Self> {
        let base = match std::env::var("UECI_CONFIG") {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        Ok(base.with_env())
    }

    /// 从 TOML 文件读取，缺省的键使用默认值
    pub fn from_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// 用环境变量覆盖
    pub fn with_env(self) -> Self {
        let default = self;
        Self {
            browser_debug_port: std::env::var("BROWSER_DEBUG_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.browser_debug_port),
            base_url: std::env::var("SISPREV_BASE_URL").unwrap_or(default.base_url),
            unit_value: std::env::var("UNIT_VALUE").unwrap_or(default.unit_value),
            unit_label: std::env::var("UNIT_LABEL").unwrap_or(default.unit_label),
            despatch_type_value: std::env::var("DESPATCH_TYPE_VALUE").unwrap_or(default.despatch_type_value),
            destination_unit_value: std::env::var("DESTINATION_UNIT_VALUE").unwrap_or(default.destination_unit_value),
            review_opinion_label: std::env::var("REVIEW_OPINION_LABEL").unwrap_or(default.review_opinion_label),
            blocked_origins: std::env::var("BLOCKED_ORIGINS").ok().map(|v| split_list(&v)).unwrap_or(default.blocked_origins),
            responsible_name: std::env::var("RESPONSIBLE_NAME").unwrap_or(default.responsible_name),
            responsible_cpf: std::env::var("RESPONSIBLE_CPF").unwrap_or(default.responsible_cpf),
            operator: std::env::var("USERNAME").unwrap_or(default.operator),
            signer_name: std::env::var("SIGNER_NAME").ok().or(default.signer_name),
            diagnostics_file: std::env::var("DIAGNOSTICS_FILE").unwrap_or(default.diagnostics_file),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            sync_min_fraction: default.sync_min_fraction,
            sync_min_chars: default.sync_min_chars,
            timings: default.timings,
        }
    }

    /// 启动前校验
    pub fn validate(&self) -> AppResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(AppError::Config("base_url 不能为空".to_string()));
        }
        if self.responsible_name.trim().is_empty() {
            return Err(AppError::Config("RESPONSIBLE_NAME 未设置".to_string()));
        }
        if self.responsible_cpf.trim().is_empty() {
            return Err(AppError::Config("RESPONSIBLE_CPF 未设置".to_string()));
        }
        if !(self.sync_min_fraction > 0.0 && self.sync_min_fraction <= 1.0) {
            return Err(AppError::Config(format!(
                "sync_min_fraction 必须在 (0, 1] 内: {}",
                self.sync_min_fraction
            )));
        }
        Ok(())
    }

    /// 工作队列（Concessão）页面地址
    pub fn queue_url(&self) -> String {
        format!(
            "{}/ProcessoBeneficio/ConProcessoBeneficio.aspx",
            self.base_url.trim_end_matches('/')
        )
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
