//! 键集分页（keyset pagination）
//!
//! 以 `(published_at, id)` 作为游标逐页拉取，流是惰性的：只有消费到页尾时才读取下一页；
//! 每次调用账本方法都会得到一个从头开始的新流。
//!
use super::publication_record::{PublicationId, PublicationRecord};
use crate::error::DomainResult;
use chrono::{DateTime, Utc};
use futures_core::stream::BoxStream;
use futures_util::{StreamExt, stream};
use std::future::Future;

/// 上一页最后一条记录的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PageCursor {
    pub published_at: DateTime<Utc>,
    pub id: PublicationId,
}

impl PageCursor {
    pub fn of(record: &PublicationRecord) -> Self {
        Self {
            published_at: record.published_at(),
            id: record.id(),
        }
    }

    /// 记录是否位于游标之后
    pub fn precedes(&self, record: &PublicationRecord) -> bool {
        *self < PageCursor::of(record)
    }
}

pub(crate) fn keyset_stream<F, Fut>(
    page_size: usize,
    fetch_page: F,
) -> BoxStream<'static, DomainResult<PublicationRecord>>
where
    F: Fn(Option<PageCursor>, usize) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = DomainResult<Vec<PublicationRecord>>> + Send + 'static,
{
    let page_size = page_size.max(1);

    // 外层 None 表示已读完；内层为下一页的起始游标
    stream::unfold(
        (Some(None::<PageCursor>), fetch_page),
        move |(state, fetch_page)| async move {
            let Some(cursor) = state else {
                return None;
            };
            match fetch_page(cursor, page_size).await {
                Ok(page) => {
                    let next = match page.last() {
                        Some(last) if page.len() >= page_size => Some(Some(PageCursor::of(last))),
                        _ => None,
                    };
                    let items: Vec<DomainResult<PublicationRecord>> =
                        page.into_iter().map(Ok).collect();
                    Some((items, (next, fetch_page)))
                }
                Err(err) => Some((vec![Err(err)], (None, fetch_page))),
            }
        },
    )
    .flat_map(stream::iter)
    .boxed()
}
