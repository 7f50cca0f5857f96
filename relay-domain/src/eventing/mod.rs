//! 事件子系统（eventing）
//!
//! 提供中继的运行时构件：
//! - `EventListener`：消费事件的监听器及其订阅类型；
//! - `Dispatcher`：在事务内入账、提交后投递并记录结果；
//! - `CorrelationResubmitter`：按关联键定向重投；
//! - `RetentionSweeper` / `ResubmissionSweeper`：受锁保护的周期清扫；
//! - `SweepScheduler`：进程内定时触发清扫任务。
//!
pub mod dispatcher;
pub mod listener;
pub mod registry;
pub mod resubmitter;
pub mod scheduler;
pub mod sweeper;

pub use dispatcher::{CommittedDispatch, DispatchReport, DispatchScope, Dispatcher, WeakDispatcher};
pub use listener::{EventListener, HandledEventType};
pub use registry::ListenerRegistry;
pub use resubmitter::CorrelationResubmitter;
pub use scheduler::{Schedule, SchedulerHandle, SweepScheduler};
pub use sweeper::{ResubmissionSweeper, RetentionSweeper, ScheduledTask};
