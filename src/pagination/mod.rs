//! Lazy pagination over vendor list endpoints.
//!
//! A [`Paginator`] wraps a one-page fetch function and exposes the result as
//! a stream. Pages are fetched on demand: dropping the stream, or simply not
//! polling it, stops further requests. The first fetch error is yielded once
//! and ends the stream.
//!
//! Three addressing schemes are provided as constructors:
//! - [`Paginator::cursor`]: opaque server cursor, empty or absent when done
//! - [`Paginator::numbered`]: page counter, done when `currentPage >= totalPages`
//! - [`Paginator::offset`]: offset/limit, done on a short page

mod cursor;
mod numbered;
mod offset;

pub use cursor::CursorPage;
pub use numbered::NumberedPage;
pub use offset::{FlatPage, OffsetWindow};

use std::future::Future;

use futures::future::{BoxFuture, Either};
use futures::stream::{self, BoxStream};
use futures::{FutureExt, StreamExt, TryStreamExt};
use serde::{Deserialize, Deserializer};
use tokio_util::sync::CancellationToken;

use crate::cancel::cancellable;
use crate::{Error, Result};

/// One fetched page and the state to request the following one with.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T, S> {
    pub items: Vec<T>,
    /// `None` when this is the last page.
    pub next: Option<S>,
}

impl<T, S> Page<T, S> {
    pub fn new(items: Vec<T>, next: Option<S>) -> Self {
        Self { items, next }
    }

    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }
}

type FetchFn<'a, T, S> = Box<dyn FnMut(S) -> BoxFuture<'a, Result<Page<T, S>>> + Send + 'a>;

/// Turns a page fetch function into a lazy stream of items.
pub struct Paginator<'a, T, S> {
    start: S,
    fetch: FetchFn<'a, T, S>,
    cancel: CancellationToken,
}

struct Cursor<'a, T, S> {
    state: S,
    fetch: FetchFn<'a, T, S>,
    cancel: CancellationToken,
    index: usize,
}

impl<'a, T, S> Paginator<'a, T, S>
where
    T: Send + 'a,
    S: Send + 'a,
{
    /// Generic form: `fetch` maps a page state to the page's items and the
    /// next state, starting from `start`.
    pub fn new<F, Fut>(start: S, mut fetch: F) -> Self
    where
        F: FnMut(S) -> Fut + Send + 'a,
        Fut: Future<Output = Result<Page<T, S>>> + Send + 'a,
    {
        Self {
            start,
            fetch: Box::new(move |state| fetch(state).boxed()),
            cancel: CancellationToken::new(),
        }
    }

    /// Abort the in-flight fetch and end the stream with
    /// [`Error::Cancelled`] when `token` fires.
    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Stream of whole pages, in server order.
    pub fn pages(self) -> BoxStream<'a, Result<Vec<T>>> {
        let first = Cursor {
            state: self.start,
            fetch: self.fetch,
            cancel: self.cancel,
            index: 0,
        };

        stream::unfold(Some(first), |cursor| async move {
            let Some(Cursor {
                state,
                mut fetch,
                cancel,
                index,
            }) = cursor
            else {
                return None;
            };

            let page = match cancellable(&cancel, fetch(state)).await {
                Some(Ok(page)) => page,
                Some(Err(err)) => {
                    tracing::debug!(page = index, error = %err, "pagination stopped on error");
                    return Some((Err(err), None));
                }
                None => {
                    tracing::debug!(page = index, "pagination cancelled");
                    return Some((Err(Error::Cancelled), None));
                }
            };

            tracing::trace!(page = index, items = page.items.len(), "fetched page");

            if page.items.is_empty() {
                tracing::debug!(page = index, "pagination finished: empty page");
                return None;
            }

            let next = match page.next {
                Some(state) => Some(Cursor {
                    state,
                    fetch,
                    cancel,
                    index: index + 1,
                }),
                None => {
                    tracing::debug!(page = index, "pagination finished: last page");
                    None
                }
            };
            Some((Ok(page.items), next))
        })
        .boxed()
    }

    /// Stream of individual items across all pages.
    ///
    /// The next page is only requested once every item of the current one
    /// has been consumed.
    pub fn items(self) -> BoxStream<'a, Result<T>> {
        self.pages()
            .flat_map(|page| match page {
                Ok(items) => Either::Left(stream::iter(items.into_iter().map(Ok))),
                Err(err) => Either::Right(stream::once(async move { Err(err) })),
            })
            .boxed()
    }

    /// Drain every page into one `Vec`, failing on the first fetch error.
    pub async fn collect_all(self) -> Result<Vec<T>> {
        self.items().try_collect().await
    }
}

impl<T, S: std::fmt::Debug> std::fmt::Debug for Paginator<'_, T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Paginator")
            .field("start", &self.start)
            .finish_non_exhaustive()
    }
}

/// Accept `null` wherever a list is expected.
pub(crate) fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
