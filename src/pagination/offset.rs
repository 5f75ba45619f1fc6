//! Offset/limit-addressed pages.

use std::future::Future;

use serde::{Deserialize, Deserializer};

use super::{Page, Paginator, null_as_empty};
use crate::{Error, Result};

/// The slice of results a single offset/limit request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetWindow {
    pub offset: usize,
    pub limit: usize,
}

/// A bare JSON array of items; `null` reads as an empty page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatPage<T>(pub Vec<T>);

impl<'de, T: Deserialize<'de>> Deserialize<'de> for FlatPage<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        null_as_empty(deserializer).map(FlatPage)
    }
}

impl<T> From<FlatPage<T>> for Vec<T> {
    fn from(page: FlatPage<T>) -> Self {
        page.0
    }
}

impl OffsetWindow {
    fn advance(self, returned: usize) -> Option<Self> {
        // A short page is the only end-of-data signal; a full page always
        // costs one more fetch.
        (returned >= self.limit).then(|| Self {
            offset: self.offset + returned,
            limit: self.limit,
        })
    }
}

impl<'a, T: Send + 'a> Paginator<'a, T, OffsetWindow> {
    /// Paginate by offset, `limit` items at a time, starting at offset 0.
    ///
    /// A `limit` of zero is treated as one.
    pub fn offset<F, Fut, P>(limit: usize, mut fetch: F) -> Self
    where
        F: FnMut(OffsetWindow) -> Fut + Send + 'a,
        Fut: Future<Output = Result<P>> + Send + 'a,
        P: Into<Vec<T>>,
    {
        let start = OffsetWindow {
            offset: 0,
            limit: limit.max(1),
        };
        Self::new(start, move |window| {
            let page = fetch(window);
            async move {
                let items: Vec<T> = page.await?.into();
                let next = window.advance(items.len());
                Ok::<_, Error>(Page::new(items, next))
            }
        })
    }
}
