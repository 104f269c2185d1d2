//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 整批状态机
//! - 管理应用生命周期（连接、运行、释放）
//! - 按 Start → UnitResolution → Intake → PerItem → Idle 推进
//! - 致命错误进入 Fatal，通知用户后终止
//!
//! ### `unit_resolution` - 部门选择
//!
//! ### `intake` - 按拦截规则接收条目
//!
//! ### `queue_processor` - 逐个转办部门内条目
//! - 游标 = 已失败数量
//! - 单个条目失败后恢复并继续
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (整批)
//!     ↓
//! unit_resolution / intake / queue_processor
//!     ↓
//! workflow::ItemFlow (单个条目)
//!     ↓
//! services (能力层：导航 / 同步 / 提交 / 关闭结果页)
//!     ↓
//! infrastructure (BrowserSession)
//! ```

pub mod batch_processor;
pub mod intake;
pub mod queue_processor;
pub mod unit_resolution;

pub use batch_processor::{run_batch, App, BatchReport, BatchState};
pub use intake::{receive_items, IntakeReport};
pub use queue_processor::{QueueProcessor, QueueStats};
pub use unit_resolution::resolve_unit;
