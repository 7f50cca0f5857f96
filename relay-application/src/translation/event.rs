use super::request::TranslationRequest;
use relay_domain::event::{CorrelationKey, RelayEvent};
use serde::{Deserialize, Serialize};

pub const READY_TO_TRANSLATE: &str = "ReadyToTranslate";
pub const TRANSLATION_READY: &str = "TranslationReady";
pub const RETRY_REQUESTED: &str = "RetryRequested";

/// 翻译流程中流转的事件，关联键为订单号
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TranslationEvent {
    /// 请求已受理，等待翻译
    ReadyToTranslate { request: TranslationRequest },
    /// 翻译完成，等待通知合作方
    TranslationReady {
        request: TranslationRequest,
        translation_result: String,
    },
    /// 要求重投某订单的未完成记录（控制信号）
    RetryRequested { order_id: i64 },
}

impl RelayEvent for TranslationEvent {
    const EVENT_TYPES: &'static [&'static str] =
        &[READY_TO_TRANSLATE, TRANSLATION_READY, RETRY_REQUESTED];

    fn event_type(&self) -> &'static str {
        match self {
            TranslationEvent::ReadyToTranslate { .. } => READY_TO_TRANSLATE,
            TranslationEvent::TranslationReady { .. } => TRANSLATION_READY,
            TranslationEvent::RetryRequested { .. } => RETRY_REQUESTED,
        }
    }

    fn correlation_key(&self) -> Option<CorrelationKey> {
        let order_id = match self {
            TranslationEvent::ReadyToTranslate { request }
            | TranslationEvent::TranslationReady { request, .. } => request.order_id,
            TranslationEvent::RetryRequested { order_id } => *order_id,
        };
        Some(order_id.into())
    }

    fn is_control_signal(&self) -> bool {
        matches!(self, TranslationEvent::RetryRequested { .. })
    }
}
