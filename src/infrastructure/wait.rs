//! 有界轮询等待
//!
//! 所有等待都带超时和轮询间隔，不存在无限阻塞

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};

/// 等待策略（超时 + 轮询间隔）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub timeout: Duration,
    pub poll: Duration,
}

impl WaitPolicy {
    pub const fn new(timeout: Duration, poll: Duration) -> Self {
        Self { timeout, poll }
    }

    pub const fn from_millis(timeout_ms: u64, poll_ms: u64) -> Self {
        Self::new(
            Duration::from_millis(timeout_ms),
            Duration::from_millis(poll_ms),
        )
    }
}

/// 轮询直到 probe 返回 Some，或超时返回 None
///
/// probe 至少执行一次；超时为零时只探测一次
pub async fn poll_for<T, F, Fut>(policy: WaitPolicy, mut probe: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let deadline = Instant::now() + policy.timeout;
    loop {
        if let Some(value) = probe().await {
            return Some(value);
        }
        let now = Instant::now();
        if now >= deadline {
            return None;
        }
        let step = policy.poll.max(Duration::from_millis(1));
        sleep(step.min(deadline - now)).await;
    }
}

/// 轮询直到条件成立
pub async fn wait_until<F, Fut>(policy: WaitPolicy, mut probe: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    poll_for(policy, || {
        let fut = probe();
        async move { fut.await.then_some(()) }
    })
    .await
    .is_some()
}
