//! Cancellation for network-issuing operations.

use std::future::Future;

use tokio_util::sync::CancellationToken;

/// Drive `fut` until it completes or `token` fires.
///
/// On cancellation `fut` is dropped before returning, which closes any
/// connection it was holding.
pub(crate) async fn cancellable<F>(token: &CancellationToken, fut: F) -> Option<F::Output>
where
    F: Future,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => None,
        out = fut => Some(out),
    }
}
