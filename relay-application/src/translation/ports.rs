//! 外部协作方端口
//!
use super::request::TranslationRequest;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// 语言模型：接收提示词，返回 `TranslationOutput` 结构的 JSON 文本
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, prompt: &str) -> anyhow::Result<String>;
}

/// 回写给合作方的翻译结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationUpdate {
    pub order_id: i64,
    pub master_copy_key_id: i64,
    pub target_locale: String,
    pub translation_result: String,
}

impl TranslationUpdate {
    pub fn new(request: &TranslationRequest, translation_result: impl Into<String>) -> Self {
        Self {
            order_id: request.order_id,
            master_copy_key_id: request.master_copy_key_id,
            target_locale: request.target_locale.clone(),
            translation_result: translation_result.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifierResponse {
    #[serde(default)]
    pub error_list: Vec<String>,
}

/// 合作方接口；响应中带错误视为失败
#[async_trait]
pub trait PartnerNotifier: Send + Sync {
    async fn update_translation(&self, update: &TranslationUpdate) -> anyhow::Result<NotifierResponse>;
}
