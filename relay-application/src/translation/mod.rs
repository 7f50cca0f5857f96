//! 翻译模块（translation）
//!
//! 受理翻译请求并经由中继驱动两段下游处理：语言模型翻译、合作方回写。
//! 任一段失败只会让对应的发布记录保持未完成，由清扫任务或重新拉取命令重投。
//!
mod commands;
mod event;
mod listeners;
mod module;
mod ports;
mod prompt;
mod queries;
mod request;

pub use commands::{
    RefetchTranslations, RequestTranslation, RequestTranslations, TranslationCommandHandler,
};
pub use event::{READY_TO_TRANSLATE, RETRY_REQUESTED, TRANSLATION_READY, TranslationEvent};
pub use listeners::{
    NOTIFY_LISTENER, NotifyPartner, RETRY_LISTENER, ResubmitOnRetry, TRANSLATE_LISTENER,
    TranslateOnReady,
};
pub use module::TranslationModule;
pub use ports::{NotifierResponse, PartnerNotifier, TranslationUpdate, Translator};
pub use prompt::{Confidence, TRANSLATION_PROMPT, TranslationOutput, render_prompt};
pub use queries::{CountIncompletePublications, IncompleteCountDto, PublicationQueryHandler};
pub use request::TranslationRequest;
