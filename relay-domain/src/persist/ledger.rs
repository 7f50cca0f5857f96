//! 发布账本（PublicationLedger）协议
//!
//! - `begin` 打开与业务写入共享的事务，记录在提交后才可见；
//! - `mark_complete` 幂等地设置完成时间；
//! - 未完成记录以惰性、有限、可重新开始的流返回，按 `(published_at, id)` 升序；
//! - 保留清理只会触及已完成记录。
//!
use super::publication_record::{PublicationId, PublicationRecord};
use crate::error::{DomainError, DomainResult};
use crate::event::RelayEvent;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_core::stream::BoxStream;
use futures_util::{StreamExt, future, stream};
use std::time::Duration;

/// 与调用方业务写入共享的账本事务
#[async_trait]
pub trait LedgerTransaction: Send {
    /// 在当前事务内写入一条未完成记录
    async fn record(&mut self, record: &PublicationRecord) -> DomainResult<()>;

    async fn commit(self) -> DomainResult<()>;

    async fn rollback(self) -> DomainResult<()>;
}

#[async_trait]
pub trait PublicationLedger: Send + Sync + 'static {
    type Transaction: LedgerTransaction;

    async fn begin(&self) -> DomainResult<Self::Transaction>;

    /// 幂等：仅当尚未完成时设置完成时间，返回是否发生了变更
    async fn mark_complete(&self, id: PublicationId) -> DomainResult<bool>;

    async fn find(&self, id: PublicationId) -> DomainResult<Option<PublicationRecord>>;

    /// `completed_at` 缺省且 `now - published_at > age` 的记录（边界不含）
    fn find_incomplete_older_than(
        &self,
        age: Duration,
    ) -> BoxStream<'static, DomainResult<PublicationRecord>>;

    /// 全部未完成记录
    fn find_incomplete(&self) -> BoxStream<'static, DomainResult<PublicationRecord>>;

    async fn find_completed_older_than(&self, age: Duration)
    -> DomainResult<Vec<PublicationRecord>>;

    /// 删除完成时间早于 `now - age` 的记录，返回删除条数
    async fn delete_completed_older_than(&self, age: Duration) -> DomainResult<u64>;

    async fn count_incomplete(&self) -> DomainResult<u64>;
}

/// 账本扩展：按反序列化后的载荷筛选未完成记录
pub trait PublicationLedgerExt: PublicationLedger {
    /// 解码失败（含未知类型标签）记录日志并视为不匹配，不会中断扫描
    fn find_incomplete_matching<E, P>(
        &self,
        predicate: P,
    ) -> BoxStream<'static, DomainResult<(PublicationRecord, E)>>
    where
        E: RelayEvent,
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.find_incomplete()
            .filter_map(move |item| {
                let matched = match item {
                    Err(err) => Some(Err(err)),
                    Ok(record) => match record.decode::<E>() {
                        Ok(event) if predicate(&event) => Some(Ok((record, event))),
                        Ok(_) => None,
                        Err(err) => {
                            tracing::warn!(
                                publication_id = %record.id(),
                                event_type = record.event_type(),
                                error = %err,
                                "skipping undecodable publication"
                            );
                            None
                        }
                    },
                };
                future::ready(matched)
            })
            .boxed()
    }
}

impl<L: PublicationLedger + ?Sized> PublicationLedgerExt for L {}

/// 将年龄阈值换算为截止时间点
pub fn cutoff(now: DateTime<Utc>, age: Duration) -> DomainResult<DateTime<Utc>> {
    let age = chrono::Duration::from_std(age)?;
    now.checked_sub_signed(age)
        .ok_or_else(|| DomainError::InvalidDuration {
            reason: format!("{age} before {now} is out of range"),
        })
}

/// 单个错误构成的流，用于参数非法时的早退
pub(crate) fn failed_stream<T: Send + 'static>(err: DomainError) -> BoxStream<'static, DomainResult<T>> {
    stream::once(future::ready(Err(err))).boxed()
}
