//! 日志工具模块
//!
//! 控制台 + 诊断文件双输出，文件只追加
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::sync::Mutex;

use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;
use crate::error::{AppError, AppResult};

/// 初始化 tracing
///
/// `RUST_LOG` 优先；否则默认 info，详细日志模式下为 debug
pub fn init(config: &Config) -> AppResult<()> {
    let file = open_diagnostics_file(&config.diagnostics_file)?;

    let default_level = if config.verbose_logging { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init()
        .map_err(|e| AppError::Config(format!("日志初始化失败: {}", e)))
}

/// 以追加方式打开诊断文件并写入本次运行的抬头
fn open_diagnostics_file(path: &str) -> AppResult<File> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(run_header().as_bytes())?;
    Ok(file)
}

fn run_header() -> String {
    format!(
        "\n{}\n转办运行日志 - {}\n{}\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    )
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 批量转办模式");
    info!("👤 操作员: {}", config.operator);
    info!("🧾 内控负责人: {}", config.responsible_name);
    info!("🏢 目标部门: {} ({})", config.unit_label, config.unit_value);
    info!("🌐 系统地址: {}", config.base_url);
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
