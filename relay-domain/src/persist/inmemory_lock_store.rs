//! 内存版锁表
//!
//! 每行锁由一把 `tokio::sync::Mutex` 表示，持有期间跨越整个受保护任务；
//! 行需要预先 `seed`，未登记的名称得到一个空的持有（总是跳过）。
//!
use super::lock_store::{LockHold, LockRow, LockStore};
use crate::error::{DomainError, DomainResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Rows = Arc<Mutex<HashMap<String, Arc<AsyncMutex<LockRow>>>>>;

#[derive(Clone, Default)]
pub struct InMemoryLockStore {
    rows: Rows,
}

impl InMemoryLockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记一行锁；已存在时保持不变
    pub fn seed(&self, name: impl Into<String>, last_run: Option<DateTime<Utc>>) -> DomainResult<()> {
        let name = name.into();
        let mut rows = self.rows()?;
        rows.entry(name.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(LockRow { name, last_run })));
        Ok(())
    }

    /// 读取当前 `last_run`；会等待正在持有该行的任务
    pub async fn last_run(&self, name: &str) -> DomainResult<Option<DateTime<Utc>>> {
        let row = self.row(name)?;
        match row {
            Some(row) => Ok(row.lock().await.last_run),
            None => Ok(None),
        }
    }

    fn rows(&self) -> DomainResult<std::sync::MutexGuard<'_, HashMap<String, Arc<AsyncMutex<LockRow>>>>> {
        self.rows
            .lock()
            .map_err(|_| DomainError::lock("*", "in-memory lock table poisoned"))
    }

    fn row(&self, name: &str) -> DomainResult<Option<Arc<AsyncMutex<LockRow>>>> {
        Ok(self.rows()?.get(name).cloned())
    }
}

pub struct InMemoryLockHold {
    name: String,
    guard: Option<OwnedMutexGuard<LockRow>>,
}

#[async_trait]
impl LockHold for InMemoryLockHold {
    fn last_run(&self) -> Option<DateTime<Utc>> {
        self.guard.as_ref().and_then(|row| row.last_run)
    }

    async fn update_last_run(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        let Some(row) = self.guard.as_mut() else {
            return Err(DomainError::lock(&self.name, "lock row does not exist"));
        };
        row.last_run = Some(row.last_run.map_or(at, |last| last.max(at)));
        Ok(())
    }

    async fn release(self) -> DomainResult<()> {
        drop(self.guard);
        Ok(())
    }
}

#[async_trait]
impl LockStore for InMemoryLockStore {
    type Hold = InMemoryLockHold;

    async fn acquire(&self, lock_name: &str) -> DomainResult<Self::Hold> {
        let guard = match self.row(lock_name)? {
            Some(row) => Some(row.lock_owned().await),
            None => None,
        };
        Ok(InMemoryLockHold {
            name: lock_name.to_string(),
            guard,
        })
    }
}
