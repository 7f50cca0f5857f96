//! 内存版发布账本（InMemoryLedger）
//!
//! 满足 `PublicationLedger` 协议的进程内实现：事务内的写入先暂存，提交时一次性
//! 落入共享表，回滚或丢弃事务则全部作废。典型用途：测试、示例与本地开发。
//!
use super::ledger::{LedgerTransaction, PublicationLedger, cutoff, failed_stream};
use super::paging::{PageCursor, keyset_stream};
use super::publication_record::{PublicationId, PublicationRecord};
use crate::clock::SharedClock;
use crate::error::{DomainError, DomainResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_core::stream::BoxStream;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

type Table = Arc<Mutex<HashMap<PublicationId, PublicationRecord>>>;

fn lock_table(table: &Table) -> DomainResult<MutexGuard<'_, HashMap<PublicationId, PublicationRecord>>> {
    table
        .lock()
        .map_err(|_| DomainError::ledger("in-memory ledger poisoned"))
}

#[derive(Clone)]
pub struct InMemoryLedger {
    table: Table,
    clock: SharedClock,
    page_size: usize,
}

impl InMemoryLedger {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            table: Arc::default(),
            clock,
            page_size: 100,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// 已提交记录的快照，按 `(published_at, id)` 升序
    pub fn snapshot(&self) -> DomainResult<Vec<PublicationRecord>> {
        let mut all: Vec<_> = lock_table(&self.table)?.values().cloned().collect();
        all.sort_by_key(PageCursor::of);
        Ok(all)
    }

    pub fn len(&self) -> DomainResult<usize> {
        Ok(lock_table(&self.table)?.len())
    }

    pub fn is_empty(&self) -> DomainResult<bool> {
        Ok(self.len()? == 0)
    }

    /// 绕过事务直接写入，用于模拟历史遗留或损坏的记录
    pub fn insert_committed(&self, record: PublicationRecord) -> DomainResult<()> {
        lock_table(&self.table)?.insert(record.id(), record);
        Ok(())
    }

    fn scan_incomplete(
        &self,
        published_before: Option<DateTime<Utc>>,
    ) -> BoxStream<'static, DomainResult<PublicationRecord>> {
        let table = self.table.clone();
        keyset_stream(self.page_size, move |cursor, limit| {
            let page = lock_table(&table).map(|rows| {
                let mut page: Vec<_> = rows
                    .values()
                    .filter(|r| !r.is_completed())
                    .filter(|r| published_before.is_none_or(|before| r.published_at() < before))
                    .filter(|r| cursor.is_none_or(|c| c.precedes(r)))
                    .cloned()
                    .collect();
                page.sort_by_key(PageCursor::of);
                page.truncate(limit);
                page
            });
            std::future::ready(page)
        })
    }
}

pub struct InMemoryLedgerTransaction {
    table: Table,
    staged: Vec<PublicationRecord>,
}

#[async_trait]
impl LedgerTransaction for InMemoryLedgerTransaction {
    async fn record(&mut self, record: &PublicationRecord) -> DomainResult<()> {
        self.staged.push(record.clone());
        Ok(())
    }

    async fn commit(self) -> DomainResult<()> {
        let mut rows = lock_table(&self.table)?;
        if let Some(dup) = self.staged.iter().find(|r| rows.contains_key(&r.id())) {
            return Err(DomainError::ledger(format!(
                "duplicate publication id {}",
                dup.id()
            )));
        }
        for record in self.staged {
            rows.insert(record.id(), record);
        }
        Ok(())
    }

    async fn rollback(self) -> DomainResult<()> {
        Ok(())
    }
}

#[async_trait]
impl PublicationLedger for InMemoryLedger {
    type Transaction = InMemoryLedgerTransaction;

    async fn begin(&self) -> DomainResult<Self::Transaction> {
        Ok(InMemoryLedgerTransaction {
            table: self.table.clone(),
            staged: Vec::new(),
        })
    }

    async fn mark_complete(&self, id: PublicationId) -> DomainResult<bool> {
        let now = self.clock.now();
        let mut rows = lock_table(&self.table)?;
        Ok(rows.get_mut(&id).is_some_and(|r| r.complete(now)))
    }

    async fn find(&self, id: PublicationId) -> DomainResult<Option<PublicationRecord>> {
        Ok(lock_table(&self.table)?.get(&id).cloned())
    }

    fn find_incomplete_older_than(
        &self,
        age: Duration,
    ) -> BoxStream<'static, DomainResult<PublicationRecord>> {
        match cutoff(self.clock.now(), age) {
            Ok(before) => self.scan_incomplete(Some(before)),
            Err(err) => failed_stream(err),
        }
    }

    fn find_incomplete(&self) -> BoxStream<'static, DomainResult<PublicationRecord>> {
        self.scan_incomplete(None)
    }

    async fn find_completed_older_than(
        &self,
        age: Duration,
    ) -> DomainResult<Vec<PublicationRecord>> {
        let before = cutoff(self.clock.now(), age)?;
        let mut found: Vec<_> = lock_table(&self.table)?
            .values()
            .filter(|r| r.completed_at().is_some_and(|at| at < before))
            .cloned()
            .collect();
        found.sort_by_key(PageCursor::of);
        Ok(found)
    }

    async fn delete_completed_older_than(&self, age: Duration) -> DomainResult<u64> {
        let before = cutoff(self.clock.now(), age)?;
        let mut rows = lock_table(&self.table)?;
        let len_before = rows.len();
        rows.retain(|_, r| !r.completed_at().is_some_and(|at| at < before));
        Ok((len_before - rows.len()) as u64)
    }

    async fn count_incomplete(&self) -> DomainResult<u64> {
        Ok(lock_table(&self.table)?
            .values()
            .filter(|r| !r.is_completed())
            .count() as u64)
    }
}
