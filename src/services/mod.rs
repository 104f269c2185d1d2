//! 业务能力层
//!
//! 每个服务只负责一件事，只通过 `BrowserSession` 访问页面

pub mod classifier;
pub mod content_sync;
pub mod internal_control;
pub mod navigator;
pub mod result_closer;
pub mod status;
pub mod submission;

pub use classifier::ScreenStateClassifier;
pub use content_sync::{ContentSynchronizer, FillStrategy, SyncLevel, SyncReport};
pub use internal_control::InternalControlForm;
pub use navigator::Navigator;
pub use result_closer::{CloseReport, InPlaceClose, ResultPageCloser};
pub use status::{StatusEvent, StatusReporter};
pub use submission::{absorb_dialog, SubmissionDriver, SubmitOutcome, SubmitPath};
