//! 中继事件（Relay Event）
//!
//! 定义可经由账本持久化与重投的事件需要实现的最小接口（`RelayEvent`），
//! 以及用于按业务单元分组重投的关联键 `CorrelationKey`。

mod correlation_key;
mod relay_event;

pub use correlation_key::CorrelationKey;
pub use relay_event::RelayEvent;
