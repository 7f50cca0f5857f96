use super::commands::{
    RefetchTranslations, RequestTranslation, RequestTranslations, TranslationCommandHandler,
};
use super::event::TranslationEvent;
use super::listeners::{NotifyPartner, ResubmitOnRetry, TranslateOnReady};
use super::ports::{PartnerNotifier, Translator};
use super::queries::{CountIncompletePublications, PublicationQueryHandler};
use crate::error::AppError;
use crate::inmemory_command_bus::InMemoryCommandBus;
use crate::inmemory_query_bus::InMemoryQueryBus;
use relay_domain::clock::SharedClock;
use relay_domain::config::DispatcherConfig;
use relay_domain::eventing::{CorrelationResubmitter, Dispatcher, EventListener};
use relay_domain::persist::PublicationLedger;
use std::sync::Arc;

/// 翻译模块：组装账本、监听器与分发器，并向总线注册处理器
///
/// 需要回调分发器的监听器只持有弱引用，分发器随模块一起释放。
pub struct TranslationModule<L: PublicationLedger> {
    dispatcher: Dispatcher<L, TranslationEvent>,
}

impl<L: PublicationLedger> TranslationModule<L> {
    pub fn new(
        ledger: Arc<L>,
        clock: SharedClock,
        config: &DispatcherConfig,
        translator: Arc<dyn Translator>,
        notifier: Arc<dyn PartnerNotifier>,
    ) -> Result<Self, AppError> {
        let dispatcher = Dispatcher::new_cyclic(ledger, clock, config, |weak| {
            let listeners: Vec<Arc<dyn EventListener<TranslationEvent>>> = vec![
                Arc::new(TranslateOnReady::new(translator, weak.clone())),
                Arc::new(NotifyPartner::new(notifier)),
                Arc::new(ResubmitOnRetry::new(CorrelationResubmitter::new(weak.clone()))),
            ];
            listeners
        })?;
        Ok(Self { dispatcher })
    }

    pub fn dispatcher(&self) -> &Dispatcher<L, TranslationEvent> {
        &self.dispatcher
    }

    pub fn register(
        &self,
        commands: &InMemoryCommandBus,
        queries: &InMemoryQueryBus,
    ) -> Result<(), AppError> {
        let handler = Arc::new(TranslationCommandHandler::new(self.dispatcher.clone()));
        commands.register::<RequestTranslation, _>(handler.clone())?;
        commands.register::<RequestTranslations, _>(handler.clone())?;
        commands.register::<RefetchTranslations, _>(handler)?;

        queries.register::<CountIncompletePublications, _>(Arc::new(PublicationQueryHandler::new(
            self.dispatcher.ledger().clone(),
        )))?;
        Ok(())
    }
}
