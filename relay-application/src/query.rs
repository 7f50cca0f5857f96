//! 读侧契约：查询、DTO、处理器与总线
//!
use crate::{context::AppContext, error::AppError};
use async_trait::async_trait;
use serde::Serialize;

/// 查询结果的载体，可直接序列化给调用方
pub trait Dto: Serialize + Send + Sync + 'static {}

/// 只读请求，不触碰账本的完成状态
pub trait Query: Send + Sync + 'static {
    const NAME: &'static str;
    type Dto: Dto;
}

#[async_trait]
pub trait QueryHandler<Q: Query>: Send + Sync {
    async fn handle(&self, ctx: &AppContext, q: Q) -> Result<Q::Dto, AppError>;
}

#[async_trait]
pub trait QueryBus: Send + Sync {
    async fn dispatch<Q: Query>(&self, ctx: &AppContext, q: Q) -> Result<Q::Dto, AppError>;
}
