//! 翻译提示词与模型输出解析
//!
use super::request::TranslationRequest;
use serde::Deserialize;

pub const TRANSLATION_PROMPT: &str = r#"You are a professional translator specializing in e-commerce photo descriptions.

Translate the following text from {SOURCE_LANGUAGE} to {TARGET_LANGUAGE}.

Original text: "{VALUE}"

Requirements:
- Maintain the tone and style appropriate for product photography descriptions
- Preserve any technical terms or brand names
- Keep the same level of formality
- Ensure cultural appropriateness for the target locale
"#;

pub fn render_prompt(request: &TranslationRequest) -> String {
    TRANSLATION_PROMPT
        .replace("{VALUE}", &request.value)
        .replace("{SOURCE_LANGUAGE}", &request.source_locale)
        .replace("{TARGET_LANGUAGE}", &request.target_locale)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// 模型按 JSON 结构返回的翻译结果
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationOutput {
    pub translated_text: String,
    pub source_language: String,
    pub target_language: String,
    pub confidence: Confidence,
}

impl TranslationOutput {
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        serde_json::from_str(raw)
            .map_err(|err| anyhow::anyhow!("error occurred while parsing translation output: {err}"))
    }
}
