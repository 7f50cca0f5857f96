//! 锁表（LockStore）与受锁保护的周期任务协议
//!
//! 每个协调域对应锁表中的一行 `{name, last_run}`。多个实例竞争同一行的行级锁，
//! 持锁者根据 `last_run` 判断本轮是否需要执行：
//! 1. 获取行锁（阻塞直到当前持有者释放）；
//! 2. `last_run` 缺省，或 `now - last_run < staleness`：释放并跳过；
//! 3. 否则在持锁状态下写入 `last_run = now`，执行任务，无论成败都释放。
//!
use crate::clock::Clock;
use crate::error::{DomainError, DomainResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;

/// 锁表中的一行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockRow {
    pub name: String,
    pub last_run: Option<DateTime<Utc>>,
}

/// 已持有的行锁；`release` 之前其他实例在 `acquire` 上等待
#[async_trait]
pub trait LockHold: Send {
    /// 持锁时读到的最近执行时间；锁行不存在时同样为 `None`
    fn last_run(&self) -> Option<DateTime<Utc>>;

    /// `last_run` 只前进不后退
    async fn update_last_run(&mut self, at: DateTime<Utc>) -> DomainResult<()>;

    async fn release(self) -> DomainResult<()>;
}

#[async_trait]
pub trait LockStore: Send + Sync + 'static {
    type Hold: LockHold;

    async fn acquire(&self, lock_name: &str) -> DomainResult<Self::Hold>;
}

/// 受锁保护任务的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardedOutcome<T> {
    Executed(T),
    Skipped { last_run: Option<DateTime<Utc>> },
    Failed { reason: String },
}

impl<T> GuardedOutcome<T> {
    pub fn is_executed(&self) -> bool {
        matches!(self, GuardedOutcome::Executed(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, GuardedOutcome::Skipped { .. })
    }
}

/// 锁表扩展：按获取-判断-执行-释放的顺序运行任务
#[async_trait]
pub trait LockStoreExt: LockStore {
    async fn run_exclusively<T, F, Fut>(
        &self,
        clock: &dyn Clock,
        lock_name: &str,
        staleness: Duration,
        work: F,
    ) -> DomainResult<GuardedOutcome<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = DomainResult<T>> + Send,
    {
        let staleness = chrono::Duration::from_std(staleness)?;
        let mut hold = self.acquire(lock_name).await?;
        let now = clock.now();

        let due = hold
            .last_run()
            .is_some_and(|last| now.signed_duration_since(last) >= staleness);
        if !due {
            let last_run = hold.last_run();
            hold.release().await?;
            tracing::debug!(lock_name, ?last_run, "guarded task skipped");
            return Ok(GuardedOutcome::Skipped { last_run });
        }

        if let Err(err) = hold.update_last_run(now).await {
            // 写入失败时本轮不执行，释放后交给下一个实例
            if let Err(release_err) = hold.release().await {
                tracing::warn!(lock_name, error = %release_err, "failed to release lock");
            }
            return Err(err);
        }

        let outcome = match work().await {
            Ok(value) => GuardedOutcome::Executed(value),
            Err(err) => {
                tracing::error!(lock_name, error = %err, "guarded task failed");
                GuardedOutcome::Failed {
                    reason: err.to_string(),
                }
            }
        };

        hold.release()
            .await
            .map_err(|err| DomainError::lock(lock_name, err.to_string()))?;
        Ok(outcome)
    }
}

impl<S: LockStore + ?Sized> LockStoreExt for S {}
