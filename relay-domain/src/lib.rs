//! 持久化事件中继（relay-domain）
//!
//! 为多实例、无状态的服务提供至少一次的领域事件投递：
//! - 发布账本（`persist::PublicationLedger`）：与业务写入同一事务记录每个（事件，监听器）配对；
//! - 分发器（`eventing::Dispatcher`）：提交后调用监听器并标记完成；
//! - 锁表（`persist::LockStore`）：为周期清扫提供跨实例互斥；
//! - 清扫任务与调度器（`eventing::sweeper` / `eventing::scheduler`）：保留清理与失败重投；
//! - 定向重投（`eventing::CorrelationResubmitter`）：按关联键重新投递某个业务单元的未完成记录。
//!
//! 默认只带内存实现；启用 `infra-sqlx` 后提供 `persist::postgres` 下的 Postgres 实现。
//!
//! 典型用法：
//! 1. 为事件枚举实现 `RelayEvent`，为消费方实现 `EventListener`；
//! 2. 以账本、时钟与监听器构造 `Dispatcher`，在 `DispatchScope` 内发布并提交；
//! 3. 用 `SweepScheduler` 按 `RelayConfig` 的节奏挂载两个清扫任务。
//!
pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod eventing;
pub mod persist;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use config::RelayConfig;
pub use error::{DomainError, DomainResult};
