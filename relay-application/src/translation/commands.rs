use super::event::TranslationEvent;
use super::request::TranslationRequest;
use crate::command::Command;
use crate::command::CommandHandler;
use crate::context::AppContext;
use crate::error::AppError;
use async_trait::async_trait;
use relay_domain::eventing::Dispatcher;
use relay_domain::persist::PublicationLedger;

/// 受理单条翻译请求
#[derive(Debug, Clone)]
pub struct RequestTranslation {
    pub request: TranslationRequest,
}

impl Command for RequestTranslation {
    const NAME: &'static str = "RequestTranslation";
}

/// 批量受理，全部校验通过才会入账；空批次直接成功
#[derive(Debug, Clone)]
pub struct RequestTranslations {
    pub requests: Vec<TranslationRequest>,
}

impl Command for RequestTranslations {
    const NAME: &'static str = "RequestTranslations";
}

/// 重新拉取某订单的翻译：重投其全部未完成记录
#[derive(Debug, Clone, Copy)]
pub struct RefetchTranslations {
    pub order_id: i64,
}

impl Command for RefetchTranslations {
    const NAME: &'static str = "RefetchTranslations";
}

pub struct TranslationCommandHandler<L: PublicationLedger> {
    dispatcher: Dispatcher<L, TranslationEvent>,
}

impl<L: PublicationLedger> TranslationCommandHandler<L> {
    pub fn new(dispatcher: Dispatcher<L, TranslationEvent>) -> Self {
        Self { dispatcher }
    }

    /// 在一个事务内入账，提交后在后台投递；调用方只等待提交
    async fn accept(&self, ctx: &AppContext, events: Vec<TranslationEvent>) -> Result<(), AppError> {
        let mut scope = self.dispatcher.begin().await?;
        for event in &events {
            if let Err(err) = scope.publish(event).await {
                scope.rollback().await?;
                return Err(err.into());
            }
        }

        let committed = scope.commit().await?;
        tracing::info!(
            request_id = ?ctx.request_id,
            events = events.len(),
            publications = committed.publication_ids().len(),
            "accepted"
        );

        tokio::spawn(async move {
            let report = committed.deliver().await;
            tracing::debug!(?report, "delivery finished");
        });
        Ok(())
    }
}

#[async_trait]
impl<L: PublicationLedger> CommandHandler<RequestTranslation> for TranslationCommandHandler<L> {
    async fn handle(&self, ctx: &AppContext, cmd: RequestTranslation) -> Result<(), AppError> {
        cmd.request.validate()?;
        self.accept(
            ctx,
            vec![TranslationEvent::ReadyToTranslate {
                request: cmd.request,
            }],
        )
        .await
    }
}

#[async_trait]
impl<L: PublicationLedger> CommandHandler<RequestTranslations> for TranslationCommandHandler<L> {
    async fn handle(&self, ctx: &AppContext, cmd: RequestTranslations) -> Result<(), AppError> {
        for request in &cmd.requests {
            request.validate()?;
        }
        if cmd.requests.is_empty() {
            tracing::debug!(request_id = ?ctx.request_id, "empty translation batch");
            return Ok(());
        }

        let events = cmd
            .requests
            .into_iter()
            .map(|request| TranslationEvent::ReadyToTranslate { request })
            .collect();
        self.accept(ctx, events).await
    }
}

#[async_trait]
impl<L: PublicationLedger> CommandHandler<RefetchTranslations> for TranslationCommandHandler<L> {
    async fn handle(&self, ctx: &AppContext, cmd: RefetchTranslations) -> Result<(), AppError> {
        self.accept(
            ctx,
            vec![TranslationEvent::RetryRequested {
                order_id: cmd.order_id,
            }],
        )
        .await
    }
}
