use super::CorrelationKey;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;

/// 中继事件载荷需要满足的通用能力边界
///
/// 事件类型集合是封闭的：`EVENT_TYPES` 列出全部标签，账本解码时遇到集合外的
/// 标签会明确失败（`DomainError::UnknownEventType`），而不是静默落到某个缺省分支。
pub trait RelayEvent:
    Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// 全部已知的事件类型标签
    const EVENT_TYPES: &'static [&'static str];

    /// 事件类型标签（必须属于 `EVENT_TYPES`）
    fn event_type(&self) -> &'static str;

    /// 事件所属业务单元的关联键
    fn correlation_key(&self) -> Option<CorrelationKey>;

    /// 控制信号不入账本，投递后不留痕，也不会被定向重投匹配到
    fn is_control_signal(&self) -> bool {
        false
    }

    fn is_known_type(event_type: &str) -> bool {
        Self::EVENT_TYPES.contains(&event_type)
    }
}
