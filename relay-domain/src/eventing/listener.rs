//! 事件监听器（EventListener）
//!
//! 定义消费某类/多类/全部事件的处理逻辑与元信息（标识、订阅类型）。
//!
use crate::event::RelayEvent;
use async_trait::async_trait;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandledEventType {
    One(String),
    Many(Vec<String>),
    All,
}

impl HandledEventType {
    pub fn one(event_type: impl Into<String>) -> Self {
        HandledEventType::One(event_type.into())
    }

    pub fn many<I, S>(event_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        HandledEventType::Many(event_types.into_iter().map(Into::into).collect())
    }
}

/// 事件监听器
///
/// 投递语义是至少一次：同一条发布记录可能因重投、扫描或崩溃恢复被多次送达，
/// 实现必须是幂等的。
#[async_trait]
pub trait EventListener<E: RelayEvent>: Send + Sync {
    /// 稳定的监听器标识，写入发布记录并用于重投时查找监听器
    fn listener_id(&self) -> &str;
    /// 返回该监听器订阅的事件类型
    fn handled_event_type(&self) -> HandledEventType;
    /// 处理事件；返回错误时发布记录保持未完成
    async fn on_event(&self, event: &E) -> anyhow::Result<()>;
}
