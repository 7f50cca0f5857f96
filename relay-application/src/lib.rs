//! 中继应用层（relay-application）
//!
//! 命令/查询总线与翻译模块：命令在事务内入账并立即返回，
//! 监听器在提交后于后台执行。
//!
pub mod command;
pub mod context;
pub mod error;
pub mod inmemory_command_bus;
pub mod inmemory_query_bus;
pub mod query;
pub mod translation;

pub use command::{Command, CommandBus, CommandHandler};
pub use inmemory_command_bus::InMemoryCommandBus;
pub use inmemory_query_bus::InMemoryQueryBus;
pub use query::{Dto, Query, QueryBus, QueryHandler};
