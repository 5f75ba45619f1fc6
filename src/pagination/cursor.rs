//! Cursor-addressed pages.

use std::future::Future;

use serde::Deserialize;

use super::{Page, Paginator, null_as_empty};
use crate::Result;

/// A page addressed by an opaque server cursor.
///
/// ```json
/// {"data": [...], "cursor": "eyJvZmZzZXQiOjEwMH0"}
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct CursorPage<T> {
    #[serde(default = "Vec::new", deserialize_with = "null_as_empty")]
    pub data: Vec<T>,
    /// Cursor for the following page; empty or absent on the last page.
    #[serde(default, alias = "next", alias = "nextCursor", alias = "next_cursor")]
    pub cursor: Option<String>,
}

impl<T> CursorPage<T> {
    fn into_page(self) -> Page<T, Option<String>> {
        let next = self.cursor.filter(|c| !c.is_empty()).map(Some);
        Page::new(self.data, next)
    }
}

impl<'a, T: Send + 'a> Paginator<'a, T, Option<String>> {
    /// Paginate by server cursor. `fetch` receives `None` for the first page.
    pub fn cursor<F, Fut>(mut fetch: F) -> Self
    where
        F: FnMut(Option<String>) -> Fut + Send + 'a,
        Fut: Future<Output = Result<CursorPage<T>>> + Send + 'a,
    {
        Self::new(None, move |cursor| {
            let page = fetch(cursor);
            async move { page.await.map(CursorPage::into_page) }
        })
    }
}
