//! # UECI Tramitação
//!
//! 在 SISPREV（ASP.NET WebForms 旧系统）中批量完成"内控审查 → 转办"的自动化工具，
//! 通过远程调试端口驱动用户已经登录的 Chrome。
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露能力
//! - `BrowserSession` - 页面能力契约，核心逻辑只依赖它
//! - `ChromiumSession` - 基于 chromiumoxide 的实现
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `ScreenStateClassifier` - 页面状态识别
//! - `Navigator` - 直接地址 / 重新登录 / 菜单导航
//! - `ContentSynchronizer` - 富文本说明字段的多策略写入与确认
//! - `SubmissionDriver` - 点击 → 带校验 postback → 普通 postback
//! - `ResultPageCloser` - 关闭提交后弹出的报表页
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个条目"的完整处理流程
//! - `ItemCtx` - 上下文封装
//! - `ItemFlow` - 内控 → 转办面板 → 说明同步 → 提交 → 关闭结果页
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 整批状态机，持有会话
//! - `orchestrator/unit_resolution` / `intake` / `queue_processor` - 各阶段
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::connect;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{BrowserSession, ChromiumSession};
pub use models::{ObservationPayload, ScreenState};
pub use orchestrator::{run_batch, App, BatchReport, BatchState};
pub use services::{StatusEvent, StatusReporter};
pub use workflow::{ItemCtx, ItemFlow};
