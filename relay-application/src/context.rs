/// 应用层上下文（Application Context）
///
/// 承载一次应用层调用（命令/查询）的请求标识（`request_id`），
/// 写入日志，便于串联一次请求触发的分发。
///
/// 典型用法：
/// ```rust
/// use relay_application::context::AppContext;
///
/// let ctx = AppContext::with_request_id("req-123");
/// assert_eq!(ctx.request_id.as_deref(), Some("req-123"));
/// ```
#[derive(Clone, Debug, Default)]
pub struct AppContext {
    pub request_id: Option<String>,
}

impl AppContext {
    pub fn with_request_id(request_id: impl Into<String>) -> Self {
        Self {
            request_id: Some(request_id.into()),
        }
    }
}
