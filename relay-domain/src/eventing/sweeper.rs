//! 周期清扫任务
//!
//! - `RetentionSweeper`：删除完成已久的发布记录；
//! - `ResubmissionSweeper`：重投陈旧的未完成记录。
//!
//! 两者都经由锁表互斥，同一轮次在所有实例中最多执行一次。
//!
use super::dispatcher::{DispatchReport, Dispatcher};
use crate::clock::SharedClock;
use crate::config::{ResubmissionConfig, RetentionConfig};
use crate::error::DomainResult;
use crate::event::RelayEvent;
use crate::persist::{GuardedOutcome, LockStore, LockStoreExt, PublicationLedger};
use async_trait::async_trait;
use futures_util::StreamExt;
use std::sync::Arc;

/// 可被调度器周期触发的任务
#[async_trait]
pub trait ScheduledTask: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self) -> DomainResult<()>;
}

fn log_outcome<T: std::fmt::Debug>(task: &str, lock_name: &str, outcome: &GuardedOutcome<T>) {
    match outcome {
        GuardedOutcome::Executed(result) => {
            tracing::info!(task, lock_name, ?result, "sweep executed")
        }
        GuardedOutcome::Skipped { last_run } => {
            tracing::info!(task, lock_name, ?last_run, "sweep skipped, ran recently")
        }
        GuardedOutcome::Failed { reason } => {
            tracing::error!(task, lock_name, reason, "sweep failed")
        }
    }
}

pub struct RetentionSweeper<S: LockStore, L: PublicationLedger> {
    locks: Arc<S>,
    ledger: Arc<L>,
    clock: SharedClock,
    config: RetentionConfig,
}

impl<S: LockStore, L: PublicationLedger> RetentionSweeper<S, L> {
    pub fn new(locks: Arc<S>, ledger: Arc<L>, clock: SharedClock, config: RetentionConfig) -> Self {
        Self {
            locks,
            ledger,
            clock,
            config,
        }
    }

    /// 返回删除的记录数
    pub async fn sweep(&self) -> DomainResult<GuardedOutcome<u64>> {
        let ledger = self.ledger.clone();
        let retention = self.config.retention;
        self.locks
            .run_exclusively(
                self.clock.as_ref(),
                &self.config.lock_name,
                self.config.staleness,
                || async move { ledger.delete_completed_older_than(retention).await },
            )
            .await
    }
}

#[async_trait]
impl<S: LockStore, L: PublicationLedger> ScheduledTask for RetentionSweeper<S, L> {
    fn name(&self) -> &str {
        "retention"
    }

    async fn run(&self) -> DomainResult<()> {
        let outcome = self.sweep().await?;
        log_outcome(self.name(), &self.config.lock_name, &outcome);
        Ok(())
    }
}

pub struct ResubmissionSweeper<S: LockStore, L: PublicationLedger, E: RelayEvent> {
    locks: Arc<S>,
    dispatcher: Dispatcher<L, E>,
    config: ResubmissionConfig,
}

impl<S: LockStore, L: PublicationLedger, E: RelayEvent> ResubmissionSweeper<S, L, E> {
    pub fn new(locks: Arc<S>, dispatcher: Dispatcher<L, E>, config: ResubmissionConfig) -> Self {
        Self {
            locks,
            dispatcher,
            config,
        }
    }

    /// 逐条重投；单条失败不影响其余记录，读取账本出错则本轮失败
    pub async fn sweep(&self) -> DomainResult<GuardedOutcome<DispatchReport>> {
        let dispatcher = self.dispatcher.clone();
        let min_age = self.config.min_age;
        self.locks
            .run_exclusively(
                self.dispatcher.clock().as_ref(),
                &self.config.lock_name,
                self.config.staleness,
                || async move {
                    let mut stale = dispatcher.ledger().find_incomplete_older_than(min_age);
                    let mut report = DispatchReport::default();
                    while let Some(item) = stale.next().await {
                        let record = item?;
                        report += dispatcher.redispatch(&record).await;
                    }
                    Ok(report)
                },
            )
            .await
    }
}

#[async_trait]
impl<S: LockStore, L: PublicationLedger, E: RelayEvent> ScheduledTask
    for ResubmissionSweeper<S, L, E>
{
    fn name(&self) -> &str {
        "resubmission"
    }

    async fn run(&self) -> DomainResult<()> {
        let outcome = self.sweep().await?;
        log_outcome(self.name(), &self.config.lock_name, &outcome);
        Ok(())
    }
}
