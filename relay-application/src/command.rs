//! 写侧契约：命令、处理器与总线
//!
//! 命令处理成功只代表翻译请求与对应的发布记录已提交，
//! 下游监听器（翻译、回写）的结果不在命令返回值里体现。
//!
use crate::{context::AppContext, error::AppError};
use async_trait::async_trait;

/// 关联常量 `NAME` 是命令在日志与错误中的稳定名称
pub trait Command: Send + Sync + 'static {
    const NAME: &'static str;
}

#[async_trait]
pub trait CommandHandler<C: Command>: Send + Sync {
    async fn handle(&self, ctx: &AppContext, cmd: C) -> Result<(), AppError>;
}

/// 按命令类型路由；方法带泛型，因此以具体类型注入而不是 `dyn`
#[async_trait]
pub trait CommandBus: Send + Sync {
    async fn dispatch<C: Command>(&self, ctx: &AppContext, cmd: C) -> Result<(), AppError>;
}
