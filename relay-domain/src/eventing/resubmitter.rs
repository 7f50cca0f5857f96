//! 定向重投（CorrelationResubmitter）
//!
//! 按关联键找出某个业务单元全部未完成的发布记录并重新投递，
//! 用于按需触发，不受锁与陈旧度约束。
//!
use super::dispatcher::{DispatchReport, Dispatcher, WeakDispatcher};
use crate::error::DomainResult;
use crate::event::{CorrelationKey, RelayEvent};
use crate::persist::{PublicationLedger, PublicationLedgerExt};
use futures_util::StreamExt;

pub struct CorrelationResubmitter<L: PublicationLedger, E: RelayEvent> {
    dispatcher: WeakDispatcher<L, E>,
}

impl<L: PublicationLedger, E: RelayEvent> Clone for CorrelationResubmitter<L, E> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
        }
    }
}

impl<L: PublicationLedger, E: RelayEvent> CorrelationResubmitter<L, E> {
    pub fn new(dispatcher: WeakDispatcher<L, E>) -> Self {
        Self { dispatcher }
    }

    pub fn for_dispatcher(dispatcher: &Dispatcher<L, E>) -> Self {
        Self::new(dispatcher.downgrade())
    }

    /// 重投关联键匹配的全部未完成记录；控制信号从不参与匹配
    pub async fn resubmit(&self, key: &CorrelationKey) -> DomainResult<DispatchReport> {
        let dispatcher = self.dispatcher.upgrade()?;
        let target = key.clone();
        let mut matches = dispatcher.ledger().find_incomplete_matching(move |event: &E| {
            !event.is_control_signal() && event.correlation_key().as_ref() == Some(&target)
        });

        let mut report = DispatchReport::default();
        while let Some(item) = matches.next().await {
            let (record, event) = item?;
            report += dispatcher.redeliver(&record, &event).await;
        }

        tracing::info!(
            correlation_key = %key,
            completed = report.completed,
            failed = report.failed,
            "correlation resubmission finished"
        );
        Ok(report)
    }
}
