//! Page-number-addressed pages.

use std::future::Future;

use serde::Deserialize;

use super::{Page, Paginator, null_as_empty};
use crate::Result;

/// A page addressed by a 1-based page counter.
///
/// ```json
/// {"results": [...], "currentPage": 2, "totalPages": 7}
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "T: Deserialize<'de>"))]
pub struct NumberedPage<T> {
    #[serde(default = "Vec::new", deserialize_with = "null_as_empty", alias = "data")]
    pub results: Vec<T>,
    #[serde(default)]
    pub current_page: u32,
    #[serde(default)]
    pub total_pages: u32,
}

impl<T> NumberedPage<T> {
    fn into_page(self, requested: u32) -> Page<T, u32> {
        let next = (self.current_page < self.total_pages).then(|| requested.saturating_add(1));
        Page::new(self.results, next)
    }
}

impl<'a, T: Send + 'a> Paginator<'a, T, u32> {
    /// Paginate by page number, starting at page 1.
    pub fn numbered<F, Fut>(fetch: F) -> Self
    where
        F: FnMut(u32) -> Fut + Send + 'a,
        Fut: Future<Output = Result<NumberedPage<T>>> + Send + 'a,
    {
        Self::numbered_from(1, fetch)
    }

    /// Paginate by page number, starting at `first` (for 0-based APIs).
    pub fn numbered_from<F, Fut>(first: u32, mut fetch: F) -> Self
    where
        F: FnMut(u32) -> Fut + Send + 'a,
        Fut: Future<Output = Result<NumberedPage<T>>> + Send + 'a,
    {
        Self::new(first, move |page_number| {
            let page = fetch(page_number);
            async move { page.await.map(|page| page.into_page(page_number)) }
        })
    }
}
