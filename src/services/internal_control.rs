//! 条目页面上的内控固定字段
//!
//! 打开"Mais Informações do Processo"标签页，选择审查意见，
//! 填写内控负责人 CPF 和姓名，然后保存。

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::{Config, Timings};
use crate::error::{AppError, AppResult};
use crate::infrastructure::{best_effort, wait_until, BrowserSession, Locator, Scope, WaitPolicy};
use crate::models::selectors;

/// 内控字段表单
pub struct InternalControlForm {
    opinion_label: String,
    responsible_cpf: String,
    responsible_name: String,
    timings: Timings,
}

impl InternalControlForm {
    pub fn new(config: &Config) -> Self {
        Self {
            opinion_label: config.review_opinion_label.clone(),
            responsible_cpf: config.responsible_cpf.clone(),
            responsible_name: config.responsible_name.clone(),
            timings: config.timings.clone(),
        }
    }

    fn element_wait(&self) -> WaitPolicy {
        self.timings.element(5_000)
    }

    /// 填写并保存；任一步失败都返回错误（当前条目失败）
    pub async fn fill(&self, session: &dyn BrowserSession) -> AppResult<()> {
        self.open_tab(session).await?;
        sleep(self.timings.tab_open_delay()).await;

        self.choose_opinion(session).await?;

        let cpf = Locator::id(selectors::RESPONSIBLE_CPF_ID);
        let name = Locator::id(selectors::RESPONSIBLE_NAME_ID);
        self.type_into(session, &cpf, &self.responsible_cpf).await?;
        self.type_into(session, &name, &self.responsible_name).await?;

        let save = Locator::id(selectors::SAVE_ID);
        if !self.click_when_present(session, &save).await? {
            return Err(AppError::ElementNotFound(format!("保存按钮 {}", save)));
        }
        sleep(self.timings.after_save_delay()).await;

        info!("✓ 内控信息已填写: {}", self.responsible_name);
        Ok(())
    }

    async fn open_tab(&self, session: &dyn BrowserSession) -> AppResult<()> {
        let by_id = Locator::id(selectors::INFO_TAB_ID);
        if self.click_when_present(session, &by_id).await? {
            debug!("标签页已通过 id 打开");
            return Ok(());
        }

        let by_label = Locator::text("span", selectors::INFO_TAB_LABEL, false);
        warn!("标签页 id 未找到，按文本查找 {}", by_label);
        if self.click_when_present(session, &by_label).await? {
            return Ok(());
        }
        Err(AppError::ElementNotFound(format!(
            "标签页 '{}'",
            selectors::INFO_TAB_LABEL
        )))
    }

    /// 按可见文本选择审查意见
    async fn choose_opinion(&self, session: &dyn BrowserSession) -> AppResult<()> {
        let select = Locator::id(selectors::REVIEW_OPINION_ID);
        if !self.wait_present(session, &select).await {
            return Err(AppError::ElementNotFound(format!("审查意见下拉框 {}", select)));
        }

        let options = session.options(&select).await?;
        let option = options
            .iter()
            .find(|o| o.label == self.opinion_label)
            .ok_or_else(|| {
                AppError::ElementNotFound(format!("审查意见选项 '{}'", self.opinion_label))
            })?;
        if !session.select_value(&select, &option.value).await? {
            return Err(AppError::ElementNotFound(format!(
                "审查意见选项 '{}'",
                self.opinion_label
            )));
        }
        Ok(())
    }

    async fn type_into(
        &self,
        session: &dyn BrowserSession,
        field: &Locator,
        text: &str,
    ) -> AppResult<()> {
        if !self.wait_present(session, field).await {
            return Err(AppError::ElementNotFound(format!("字段 {}", field)));
        }
        if !session.type_text(field, text).await? {
            debug!("字段 {} 无法键入，直接赋值", field);
            session
                .write_fields(Scope::Document, field, text)
                .await?;
        }
        Ok(())
    }

    async fn wait_present(&self, session: &dyn BrowserSession, locator: &Locator) -> bool {
        wait_until(self.element_wait(), move || async move {
            best_effort(session.count(locator).await, "等待元素") > 0
        })
        .await
    }

    async fn click_when_present(
        &self,
        session: &dyn BrowserSession,
        locator: &Locator,
    ) -> AppResult<bool> {
        if !self.wait_present(session, locator).await {
            return Ok(false);
        }
        session.click(locator, 0).await
    }
}
