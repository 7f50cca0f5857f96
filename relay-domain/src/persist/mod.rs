//! 持久化抽象（persist）
//!
//! - `PublicationLedger`：发布账本，记录每个（事件，监听器）配对及其完成状态；
//! - `LockStore`：锁表，为跨实例的周期任务提供行级互斥；
//! - 内存实现用于测试与示例，Postgres 实现位于 `postgres`（需启用 `infra-sqlx`）。
//!
mod inmemory_ledger;
mod inmemory_lock_store;
mod ledger;
mod lock_store;
mod paging;
mod publication_record;

#[cfg(feature = "infra-sqlx")]
pub mod postgres;

pub use inmemory_ledger::{InMemoryLedger, InMemoryLedgerTransaction};
pub use inmemory_lock_store::{InMemoryLockHold, InMemoryLockStore};
pub use ledger::{LedgerTransaction, PublicationLedger, PublicationLedgerExt, cutoff};
pub use lock_store::{GuardedOutcome, LockHold, LockRow, LockStore, LockStoreExt};
pub use paging::PageCursor;
pub use publication_record::{PublicationId, PublicationRecord};
