//! 批量转办处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，按固定的状态顺序驱动一批条目：
//!
//! ```text
//! Start → UnitResolution → Intake → PerItem → Idle
//!   └──────────┴─────────────┴──────────┴────→ Fatal
//! ```
//!
//! 1. **Start**：连接浏览器，打开工作队列
//! 2. **UnitResolution**：确保进入目标部门
//! 3. **Intake**：按拦截规则接收待接收条目
//! 4. **PerItem**：逐个转办部门内条目，单个失败不影响其他条目
//! 5. **Idle**：整批结束
//!
//! 连接失败或工作队列不可达进入 Fatal，通过状态通知告知用户后整批终止。
//! 无论结果如何，浏览器连接都会被释放。

use std::fmt;

use tracing::{error, info, warn};

use crate::browser;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::BrowserSession;
use crate::models::{resolve_signer, BlockRule, ObservationPayload};
use crate::orchestrator::intake::{receive_items, IntakeReport};
use crate::orchestrator::queue_processor::{QueueProcessor, QueueStats};
use crate::orchestrator::unit_resolution::resolve_unit;
use crate::services::{Navigator, StatusReporter};
use crate::workflow::ItemFlow;

/// 批处理状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Start,
    UnitResolution,
    Intake,
    PerItem,
    Idle,
    Fatal,
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BatchState::Start => "Start",
            BatchState::UnitResolution => "UnitResolution",
            BatchState::Intake => "Intake",
            BatchState::PerItem => "PerItem",
            BatchState::Idle => "Idle",
            BatchState::Fatal => "Fatal",
        };
        f.write_str(name)
    }
}

/// 整批结果
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub intake: IntakeReport,
    pub queue: QueueStats,
    /// 部门内没有任何条目
    pub nothing_to_process: bool,
}

/// 应用主结构
pub struct App {
    config: Config,
    session: Box<dyn BrowserSession>,
    reporter: StatusReporter,
    state: BatchState,
}

impl App {
    /// 初始化应用：校验配置并连接浏览器
    pub async fn initialize(config: Config, reporter: StatusReporter) -> AppResult<Self> {
        if let Err(e) = config.validate() {
            report_fatal(&reporter, &e);
            return Err(e);
        }

        reporter.status(format!(
            "🔗 连接浏览器 (端口 {})…",
            config.browser_debug_port
        ));
        reporter.progress(0.05);

        match browser::connect(&config).await {
            Ok(session) => {
                reporter.status("✓ 已连接浏览器");
                Ok(Self::with_session(config, Box::new(session), reporter))
            }
            Err(e) => {
                report_fatal(&reporter, &e);
                Err(e)
            }
        }
    }

    /// 使用已有会话创建应用
    pub fn with_session(
        config: Config,
        session: Box<dyn BrowserSession>,
        reporter: StatusReporter,
    ) -> Self {
        Self {
            config,
            session,
            reporter,
            state: BatchState::Start,
        }
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    /// 运行整批流程，结束后释放浏览器连接
    pub async fn run(&mut self) -> AppResult<BatchReport> {
        let result = self.drive().await;

        if let Err(e) = self.session.release().await {
            warn!("释放浏览器连接失败: {}", e);
        }

        match result {
            Ok(report) => {
                self.transition(BatchState::Idle);
                self.finish(&report);
                Ok(report)
            }
            Err(e) => {
                self.transition(BatchState::Fatal);
                error!("❌ 整批终止: {}", e);
                report_fatal(&self.reporter, &e);
                Err(e)
            }
        }
    }

    async fn drive(&mut self) -> AppResult<BatchReport> {
        let mut report = BatchReport::default();
        let signer = resolve_signer(&self.config);
        let payload = ObservationPayload::for_signer(&signer)?;
        info!("说明签名人: {}", signer);

        self.reporter.status("📂 打开工作队列…");
        let navigator = Navigator::new(&self.config, self.reporter.clone());
        if !navigator.open_target_screen(self.session.as_ref()).await {
            return Err(AppError::Navigation(format!(
                "无法打开工作队列 {}",
                self.config.queue_url()
            )));
        }
        self.reporter.progress(0.15);

        self.transition(BatchState::UnitResolution);
        resolve_unit(self.session.as_ref(), &self.config, &self.reporter).await?;
        self.reporter.progress(0.25);

        self.transition(BatchState::Intake);
        let rule = BlockRule::new(self.config.blocked_origins.as_slice());
        report.intake = receive_items(self.session.as_ref(), &self.config, &rule, &self.reporter).await;
        info!(
            "接收完成: 找到 {} 个, 接收 {} 个, 跳过 {} 个",
            report.intake.found,
            report.intake.received.len(),
            report.intake.skipped.len()
        );
        self.reporter.progress(0.5);

        self.transition(BatchState::PerItem);
        let flow = ItemFlow::new(&self.config, payload);
        let processor = QueueProcessor::new(&self.config, &flow, &self.reporter);
        report.queue = processor.process(self.session.as_ref()).await?;
        report.nothing_to_process = report.queue.total == 0;

        Ok(report)
    }

    fn transition(&mut self, next: BatchState) {
        info!("状态: {} → {}", self.state, next);
        self.state = next;
    }

    fn finish(&self, report: &BatchReport) {
        if report.nothing_to_process {
            self.reporter.status("✅ 没有需要转办的条目");
        } else {
            self.reporter.status(format!(
                "✅ 完成: 成功 {} 个, 失败 {} 个",
                report.queue.processed, report.queue.failed
            ));
        }
        self.reporter.progress(1.0);
        print_final_stats(report);
    }
}

/// 连接浏览器并运行整批流程
pub async fn run_batch(config: Config, reporter: StatusReporter) -> AppResult<BatchReport> {
    let mut app = App::initialize(config, reporter).await?;
    app.run().await
}

fn report_fatal(reporter: &StatusReporter, err: &AppError) {
    reporter.status(format!("❌ {}", err));
    reporter.progress(0.0);
}

// ========== 日志辅助函数 ==========

fn print_final_stats(report: &BatchReport) {
    info!("{}", "=".repeat(60));
    info!("📊 转办完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!(
        "📦 接收: {} 个 (跳过 {} 个)",
        report.intake.received.len(),
        report.intake.skipped.len()
    );
    if report.nothing_to_process {
        info!("📭 部门内没有条目");
    } else {
        info!(
            "✅ 成功: {}/{}",
            report.queue.processed,
            report.queue.attempted()
        );
        info!("❌ 失败: {}", report.queue.failed);
    }
    info!("{}", "=".repeat(60));
}
