//! 翻译流程的监听器
//!
//! - `TranslateOnReady`：调用语言模型，发布 `TranslationReady`；
//! - `NotifyPartner`：把翻译结果回写给合作方；
//! - `ResubmitOnRetry`：收到重投信号后按订单号重投未完成记录。
//!
//! 三者都可能被重复调用，重复执行的结果与执行一次相同或可被下游覆盖。
//!
use super::event::{READY_TO_TRANSLATE, RETRY_REQUESTED, TRANSLATION_READY, TranslationEvent};
use super::ports::{PartnerNotifier, TranslationUpdate, Translator};
use super::prompt::{TranslationOutput, render_prompt};
use async_trait::async_trait;
use relay_domain::eventing::{
    CorrelationResubmitter, EventListener, HandledEventType, WeakDispatcher,
};
use relay_domain::persist::PublicationLedger;
use std::sync::Arc;

pub const TRANSLATE_LISTENER: &str = "translation.translate";
pub const NOTIFY_LISTENER: &str = "translation.notify";
pub const RETRY_LISTENER: &str = "translation.retry";

pub struct TranslateOnReady<L: PublicationLedger> {
    translator: Arc<dyn Translator>,
    dispatcher: WeakDispatcher<L, TranslationEvent>,
}

impl<L: PublicationLedger> TranslateOnReady<L> {
    pub fn new(translator: Arc<dyn Translator>, dispatcher: WeakDispatcher<L, TranslationEvent>) -> Self {
        Self {
            translator,
            dispatcher,
        }
    }
}

#[async_trait]
impl<L: PublicationLedger> EventListener<TranslationEvent> for TranslateOnReady<L> {
    fn listener_id(&self) -> &str {
        TRANSLATE_LISTENER
    }

    fn handled_event_type(&self) -> HandledEventType {
        HandledEventType::one(READY_TO_TRANSLATE)
    }

    async fn on_event(&self, event: &TranslationEvent) -> anyhow::Result<()> {
        let TranslationEvent::ReadyToTranslate { request } = event else {
            return Ok(());
        };
        tracing::info!(
            order_id = request.order_id,
            target_locale = %request.target_locale,
            "translating"
        );

        let raw = self.translator.translate(&render_prompt(request)).await?;
        let output = TranslationOutput::parse(&raw)?;
        tracing::info!(order_id = request.order_id, confidence = ?output.confidence, "translation ready");

        self.dispatcher
            .upgrade()?
            .publish(TranslationEvent::TranslationReady {
                request: request.clone(),
                translation_result: output.translated_text,
            })
            .await?;
        Ok(())
    }
}

pub struct NotifyPartner {
    notifier: Arc<dyn PartnerNotifier>,
}

impl NotifyPartner {
    pub fn new(notifier: Arc<dyn PartnerNotifier>) -> Self {
        Self { notifier }
    }
}

#[async_trait]
impl EventListener<TranslationEvent> for NotifyPartner {
    fn listener_id(&self) -> &str {
        NOTIFY_LISTENER
    }

    fn handled_event_type(&self) -> HandledEventType {
        HandledEventType::one(TRANSLATION_READY)
    }

    async fn on_event(&self, event: &TranslationEvent) -> anyhow::Result<()> {
        let TranslationEvent::TranslationReady {
            request,
            translation_result,
        } = event
        else {
            return Ok(());
        };

        let update = TranslationUpdate::new(request, translation_result.as_str());
        let response = self.notifier.update_translation(&update).await?;
        if !response.error_list.is_empty() {
            anyhow::bail!(
                "update translation request failed for order {}: {:?}",
                update.order_id,
                response.error_list
            );
        }

        tracing::info!(order_id = update.order_id, "partner notified");
        Ok(())
    }
}

pub struct ResubmitOnRetry<L: PublicationLedger> {
    resubmitter: CorrelationResubmitter<L, TranslationEvent>,
}

impl<L: PublicationLedger> ResubmitOnRetry<L> {
    pub fn new(resubmitter: CorrelationResubmitter<L, TranslationEvent>) -> Self {
        Self { resubmitter }
    }
}

#[async_trait]
impl<L: PublicationLedger> EventListener<TranslationEvent> for ResubmitOnRetry<L> {
    fn listener_id(&self) -> &str {
        RETRY_LISTENER
    }

    fn handled_event_type(&self) -> HandledEventType {
        HandledEventType::one(RETRY_REQUESTED)
    }

    async fn on_event(&self, event: &TranslationEvent) -> anyhow::Result<()> {
        if let TranslationEvent::RetryRequested { order_id } = event {
            let report = self.resubmitter.resubmit(&(*order_id).into()).await?;
            tracing::info!(order_id, completed = report.completed, failed = report.failed, "refetch finished");
        }
        Ok(())
    }
}
