//! 状态 / 进度通知
//!
//! 核心流程只往有界通道里投递消息，从不阻塞；通道满或接收端已关闭时丢弃。

use tokio::sync::mpsc;
use tracing::debug;

/// 状态事件
#[derive(Debug, Clone, PartialEq)]
pub enum StatusEvent {
    /// 状态文本
    Status(String),
    /// 进度（0.0 ~ 1.0）
    Progress(f64),
}

/// 状态通知发送端
#[derive(Debug, Clone)]
pub struct StatusReporter {
    tx: Option<mpsc::Sender<StatusEvent>>,
}

impl StatusReporter {
    /// 创建发送端和接收端
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<StatusEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx: Some(tx) }, rx)
    }

    /// 不投递任何消息
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn status(&self, text: impl Into<String>) {
        self.emit(StatusEvent::Status(text.into()));
    }

    pub fn progress(&self, fraction: f64) {
        self.emit(StatusEvent::Progress(fraction.clamp(0.0, 1.0)));
    }

    fn emit(&self, event: StatusEvent) {
        if let Some(tx) = &self.tx {
            if let Err(e) = tx.try_send(event) {
                debug!("状态消息被丢弃: {}", e);
            }
        }
    }
}
