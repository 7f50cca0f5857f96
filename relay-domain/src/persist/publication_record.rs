//! 发布记录（PublicationRecord）
//!
//! 一条记录对应一次（事件实例，监听器）配对及其完成状态，是重试的最小单位。
//!
use crate::{
    error::{DomainError, DomainResult},
    event::RelayEvent,
};
use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// 发布记录标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicationId(Uuid);

impl PublicationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for PublicationId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for PublicationId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for PublicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
pub struct PublicationRecord {
    /// 记录唯一标识
    #[builder(default)]
    id: PublicationId,
    /// 事件类型标签
    event_type: String,
    /// 目标监听器
    listener_id: String,
    /// 序列化后的事件
    payload: Value,
    /// 发布时间（与业务写入同一事务）
    published_at: DateTime<Utc>,
    /// 完成时间；缺省表示未完成
    completed_at: Option<DateTime<Utc>>,
}

impl PublicationRecord {
    /// 为指定监听器创建一条未完成记录
    pub fn for_listener<E: RelayEvent>(
        event: &E,
        listener_id: impl Into<String>,
        published_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        Ok(PublicationRecord::builder()
            .event_type(event.event_type().to_string())
            .listener_id(listener_id.into())
            .payload(serde_json::to_value(event)?)
            .published_at(published_at)
            .build())
    }

    pub fn id(&self) -> PublicationId {
        self.id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn listener_id(&self) -> &str {
        &self.listener_id
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn published_at(&self) -> DateTime<Utc> {
        self.published_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    /// 完成时间只设置一次，之后不再变化
    pub(crate) fn complete(&mut self, at: DateTime<Utc>) -> bool {
        if self.completed_at.is_some() {
            return false;
        }
        self.completed_at = Some(at);
        true
    }

    /// 反序列化载荷；先校验类型标签属于封闭集合
    pub fn decode<E: RelayEvent>(&self) -> DomainResult<E> {
        if !E::is_known_type(&self.event_type) {
            return Err(DomainError::UnknownEventType {
                event_type: self.event_type.clone(),
            });
        }
        Ok(serde_json::from_value(self.payload.clone())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::CorrelationKey;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(tag = "type")]
    enum Probe {
        Pinged { order_id: i64 },
    }

    impl RelayEvent for Probe {
        const EVENT_TYPES: &'static [&'static str] = &["Pinged"];

        fn event_type(&self) -> &'static str {
            "Pinged"
        }

        fn correlation_key(&self) -> Option<CorrelationKey> {
            match self {
                Probe::Pinged { order_id } => Some((*order_id).into()),
            }
        }
    }

    #[test]
    fn new_record_is_incomplete_and_decodes() {
        let now = Utc::now();
        let record =
            PublicationRecord::for_listener(&Probe::Pinged { order_id: 7 }, "probe", now).unwrap();
        assert_eq!(record.event_type(), "Pinged");
        assert_eq!(record.listener_id(), "probe");
        assert_eq!(record.published_at(), now);
        assert!(!record.is_completed());

        let Probe::Pinged { order_id } = record.decode::<Probe>().unwrap();
        assert_eq!(order_id, 7);
    }

    #[test]
    fn completion_is_monotonic() {
        let now = Utc::now();
        let mut record =
            PublicationRecord::for_listener(&Probe::Pinged { order_id: 1 }, "probe", now).unwrap();

        assert!(record.complete(now));
        assert!(!record.complete(now + chrono::Duration::hours(1)));
        assert_eq!(record.completed_at(), Some(now));
    }

    #[test]
    fn unknown_tag_is_an_explicit_failure() {
        let record = PublicationRecord::builder()
            .event_type("Vanished".to_string())
            .listener_id("probe".to_string())
            .payload(serde_json::json!({"type": "Vanished"}))
            .published_at(Utc::now())
            .build();

        match record.decode::<Probe>().unwrap_err() {
            DomainError::UnknownEventType { event_type } => assert_eq!(event_type, "Vanished"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn corrupt_payload_is_a_serde_failure() {
        let record = PublicationRecord::builder()
            .event_type("Pinged".to_string())
            .listener_id("probe".to_string())
            .payload(serde_json::json!({"type": "Pinged", "order_id": "not-a-number"}))
            .published_at(Utc::now())
            .build();

        assert!(matches!(
            record.decode::<Probe>().unwrap_err(),
            DomainError::Serde { .. }
        ));
    }
}
