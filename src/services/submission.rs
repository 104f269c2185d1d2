//! 提交（Tramitar）
//!
//! 点击提交按钮后等待确认对话框；对话框没有出现时依次调用
//! 带校验组的 postback 和简单 postback。对话框只是完成回执，一律接受。

use std::fmt::Display;

use tracing::{debug, info, warn};

use crate::config::Timings;
use crate::error::{AppError, AppResult};
use crate::infrastructure::{best_effort, poll_for, wait_until, BrowserSession, Locator, WaitPolicy};
use crate::models::selectors;

/// 实际生效的提交路径
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitPath {
    Click,
    ValidatedPostback,
    PlainPostback,
}

impl Display for SubmitPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            SubmitPath::Click => "点击",
            SubmitPath::ValidatedPostback => "带校验组 postback",
            SubmitPath::PlainPostback => "简单 postback",
        };
        write!(f, "{}", label)
    }
}

/// 提交结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub path: SubmitPath,
    /// 确认对话框的消息（没有出现时为 None）
    pub acknowledgement: Option<String>,
}

/// 提交驱动
pub struct SubmissionDriver {
    timings: Timings,
}

impl SubmissionDriver {
    pub fn new(timings: &Timings) -> Self {
        Self {
            timings: timings.clone(),
        }
    }

    /// 定位提交按钮：先按 id 等待，再按文本 / 值匹配
    pub async fn locate(&self, session: &dyn BrowserSession) -> AppResult<Locator> {
        let by_id = Locator::id(selectors::SUBMIT_ID);
        let by_id_ref = &by_id;
        let found = wait_until(self.timings.submit_control(), move || async move {
            best_effort(session.count(by_id_ref).await, "等待提交按钮") > 0
        })
        .await;
        if found {
            return Ok(by_id);
        }

        let by_label = Locator::control(selectors::SUBMIT_LABEL);
        if best_effort(session.count(&by_label).await, "按文本查找提交按钮") > 0 {
            warn!("提交按钮 id 未找到，使用文本匹配 {}", by_label);
            return Ok(by_label);
        }

        Err(AppError::ElementNotFound(format!(
            "提交按钮 '{}' (#{})",
            selectors::SUBMIT_LABEL,
            selectors::SUBMIT_ID
        )))
    }

    /// 触发提交并吸收确认对话框
    ///
    /// 只有点击没有派发出去且两种 postback 都不存在时才返回错误
    pub async fn trigger(
        &self,
        session: &dyn BrowserSession,
        control: &Locator,
    ) -> AppResult<SubmitOutcome> {
        let clicked = best_effort(session.click(control, 0).await, "点击提交按钮");
        if clicked {
            debug!("已点击提交按钮 {}", control);
            let policy = self.timings.dialog(self.timings.dialog_after_click_ms);
            if let Some(message) = absorb_dialog(session, policy).await {
                return Ok(SubmitOutcome {
                    path: SubmitPath::Click,
                    acknowledgement: Some(message),
                });
            }
            warn!("⚠️ 点击后未出现确认对话框，尝试带校验组的 postback");
        } else {
            warn!("⚠️ 提交按钮点击未派发，尝试带校验组的 postback");
        }

        let validated = best_effort(
            session
                .postback(selectors::SUBMIT_TARGET, Some(selectors::VALIDATION_GROUP))
                .await,
            "带校验组 postback",
        );
        if validated {
            let policy = self.timings.dialog(self.timings.dialog_after_postback_ms);
            if let Some(message) = absorb_dialog(session, policy).await {
                return Ok(SubmitOutcome {
                    path: SubmitPath::ValidatedPostback,
                    acknowledgement: Some(message),
                });
            }
            warn!("⚠️ 带校验组的 postback 未出现对话框，尝试简单 postback");
        } else {
            warn!("⚠️ 页面没有带校验组的 postback，尝试简单 postback");
        }

        let plain = best_effort(
            session.postback(selectors::SUBMIT_TARGET, None).await,
            "简单 postback",
        );
        if !clicked && !validated && !plain {
            return Err(AppError::Submission(
                "点击未派发，页面也没有 postback 机制".to_string(),
            ));
        }

        let path = if plain {
            SubmitPath::PlainPostback
        } else if validated {
            SubmitPath::ValidatedPostback
        } else {
            SubmitPath::Click
        };

        let policy = self.timings.dialog(self.timings.dialog_final_ms);
        let acknowledgement = absorb_dialog(session, policy).await;
        if acknowledgement.is_none() {
            warn!("⚠️ 提交后没有出现确认对话框 (路径: {})", path);
        }
        Ok(SubmitOutcome {
            path,
            acknowledgement,
        })
    }

    /// 定位 + 触发
    pub async fn submit(&self, session: &dyn BrowserSession) -> AppResult<SubmitOutcome> {
        let control = self.locate(session).await?;
        self.trigger(session, &control).await
    }
}

/// 等待原生对话框，出现后记录消息并接受
pub async fn absorb_dialog(session: &dyn BrowserSession, policy: WaitPolicy) -> Option<String> {
    let message = poll_for(policy, move || async move {
        best_effort(session.pending_dialog().await, "检查对话框")
    })
    .await?;
    info!("[对话框] {}", message);
    if let Err(e) = session.accept_dialog().await {
        warn!("接受对话框失败: {}", e);
    }
    Some(message)
}
