use crate::context::AppContext;
use crate::error::AppError;
use crate::query::{Dto, Query, QueryHandler};
use async_trait::async_trait;
use relay_domain::persist::PublicationLedger;
use serde::Serialize;
use std::sync::Arc;

/// 未完成发布记录的数量（重试积压）
#[derive(Debug, Clone, Copy)]
pub struct CountIncompletePublications;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IncompleteCountDto {
    pub incomplete: u64,
}

impl Dto for IncompleteCountDto {}

impl Query for CountIncompletePublications {
    const NAME: &'static str = "CountIncompletePublications";
    type Dto = IncompleteCountDto;
}

pub struct PublicationQueryHandler<L: PublicationLedger> {
    ledger: Arc<L>,
}

impl<L: PublicationLedger> PublicationQueryHandler<L> {
    pub fn new(ledger: Arc<L>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl<L: PublicationLedger> QueryHandler<CountIncompletePublications> for PublicationQueryHandler<L> {
    async fn handle(
        &self,
        _ctx: &AppContext,
        _q: CountIncompletePublications,
    ) -> Result<IncompleteCountDto, AppError> {
        Ok(IncompleteCountDto {
            incomplete: self.ledger.count_incomplete().await?,
        })
    }
}
