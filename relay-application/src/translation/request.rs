use crate::error::AppError;
use serde::{Deserialize, Serialize};

/// 一条翻译请求（对应合作方的一个待翻译文案）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationRequest {
    pub order_id: i64,
    pub master_copy_key_id: i64,
    pub value: String,
    pub source_locale: String,
    pub target_locale: String,
    pub user_id: String,
}

impl TranslationRequest {
    /// 文本类字段不得为空白
    pub fn validate(&self) -> Result<(), AppError> {
        let blank: Vec<&str> = [
            ("value", &self.value),
            ("sourceLocale", &self.source_locale),
            ("targetLocale", &self.target_locale),
            ("userId", &self.user_id),
        ]
        .into_iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(field, _)| field)
        .collect();

        if blank.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(format!(
                "order {}: {} must not be blank",
                self.order_id,
                blank.join(", ")
            )))
        }
    }
}
