//! Credential store with single-flight refresh.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, Weak};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{AuthError, Credential};
use crate::cancel::cancellable;

type RefreshOutcome = Result<Credential, AuthError>;
type PendingRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

struct InFlight {
    generation: u64,
    handle: PendingRefresh,
}

/// Holds one cached credential and coalesces concurrent refreshes.
///
/// Locks are only held for field reads and writes, never across an await;
/// the refresh itself runs outside them and is published atomically on
/// success. A failed refresh leaves the cached credential untouched.
#[derive(Default)]
pub struct CredentialStore {
    current: RwLock<Option<Credential>>,
    in_flight: Mutex<Option<InFlight>>,
    generations: AtomicU64,
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStore").finish_non_exhaustive()
    }
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: Credential) -> Self {
        Self {
            current: RwLock::new(Some(credential)),
            ..Self::default()
        }
    }

    /// Snapshot of the cached credential, stale or not.
    pub fn current(&self) -> Option<Credential> {
        self.current.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn set(&self, credential: Credential) {
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Some(credential);
    }

    pub fn invalidate(&self) {
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    fn fresh(&self, buffer: Duration) -> Option<Credential> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .filter(|cred| !cred.is_stale(buffer))
            .cloned()
    }

    fn slot(&self) -> MutexGuard<'_, Option<InFlight>> {
        self.in_flight.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Return the cached credential, or refresh it when less than `buffer`
    /// remains.
    ///
    /// Callers arriving while a refresh is in flight await that refresh
    /// instead of starting their own; `refresh` is only invoked by the caller
    /// that starts one. A caller that stops waiting, either through `cancel`
    /// or by dropping this future, drops the request if no one else is
    /// waiting on it.
    pub async fn get_or_refresh<F, Fut>(
        self: &Arc<Self>,
        buffer: Duration,
        cancel: &CancellationToken,
        refresh: F,
    ) -> RefreshOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = RefreshOutcome> + Send + 'static,
    {
        if let Some(cred) = self.fresh(buffer) {
            return Ok(cred);
        }

        let mut waiter = {
            let mut slot = self.slot();

            // Published while we waited for the slot.
            if let Some(cred) = self.fresh(buffer) {
                return Ok(cred);
            }

            match slot.as_ref() {
                Some(pending) => {
                    debug!(generation = pending.generation, "joining in-flight token refresh");
                    Waiter {
                        store: self,
                        generation: pending.generation,
                        handle: pending.handle.clone(),
                    }
                }
                None => {
                    let generation = self.generations.fetch_add(1, Ordering::Relaxed);
                    debug!(generation, "starting token refresh");
                    let handle = self.start_refresh(generation, refresh());
                    *slot = Some(InFlight {
                        generation,
                        handle: handle.clone(),
                    });
                    Waiter {
                        store: self,
                        generation,
                        handle,
                    }
                }
            }
        };

        cancellable(cancel, &mut waiter.handle)
            .await
            .unwrap_or(Err(AuthError::Cancelled))
    }

    fn start_refresh<Fut>(self: &Arc<Self>, generation: u64, refresh: Fut) -> PendingRefresh
    where
        Fut: Future<Output = RefreshOutcome> + Send + 'static,
    {
        let store: Weak<Self> = Arc::downgrade(self);
        async move {
            let outcome = refresh.await;
            if let Some(store) = store.upgrade() {
                if let Ok(cred) = &outcome {
                    store.set(cred.clone());
                }
                let mut slot = store.slot();
                if slot.as_ref().is_some_and(|p| p.generation == generation) {
                    *slot = None;
                }
            }
            outcome
        }
        .boxed()
        .shared()
    }
}

/// One caller's interest in an in-flight refresh.
///
/// Dropping the last waiter before the refresh resolves also drops the
/// refresh, so the next caller starts a new one instead of joining a future
/// nobody is polling.
struct Waiter<'a> {
    store: &'a CredentialStore,
    generation: u64,
    handle: PendingRefresh,
}

impl Drop for Waiter<'_> {
    fn drop(&mut self) {
        // `None` once this handle has resolved.
        if self.handle.strong_count() != Some(2) {
            return;
        }
        let mut slot = self.store.slot();
        // Only the slot and this waiter still hold the refresh.
        if slot.as_ref().is_some_and(|p| p.generation == self.generation)
            && self.handle.strong_count() == Some(2)
        {
            debug!(
                generation = self.generation,
                "dropping token refresh with no remaining waiters"
            );
            *slot = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    const BUFFER: Duration = Duration::from_secs(30);

    #[tokio::test]
    async fn test_fresh_credential_skips_refresh() {
        let store = Arc::new(CredentialStore::with_credential(Credential::expiring_in(
            "cached",
            Duration::from_secs(60),
        )));
        let calls = Arc::new(AtomicUsize::new(0));
        let cancel = CancellationToken::new();

        let counter = Arc::clone(&calls);
        let cred = store
            .get_or_refresh(BUFFER, &cancel, move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(AuthError::EmptyToken)
            })
            .await
            .unwrap();
        assert_eq!(cred.secret(), "cached");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stale_credential_refreshes_once() {
        let store = Arc::new(CredentialStore::with_credential(Credential::expiring_in(
            "old",
            Duration::from_secs(10),
        )));
        let calls = Arc::new(AtomicUsize::new(0));
        let cancel = CancellationToken::new();

        let counter = Arc::clone(&calls);
        let cred = store
            .get_or_refresh(BUFFER, &cancel, move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Credential::expiring_in("new", Duration::from_secs(3600)))
            })
            .await
            .unwrap();

        assert_eq!(cred.secret(), "new");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.current().unwrap().secret(), "new");
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_credential() {
        let store = Arc::new(CredentialStore::with_credential(Credential::expiring_in(
            "still-valid",
            Duration::from_secs(20),
        )));
        let cancel = CancellationToken::new();

        let err = store
            .get_or_refresh(BUFFER, &cancel, || async { Err(AuthError::EmptyToken) })
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::EmptyToken));
        assert_eq!(store.current().unwrap().secret(), "still-valid");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_share_one_refresh() {
        let store = Arc::new(CredentialStore::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                let calls = Arc::clone(&calls);
                tokio::spawn(async move {
                    let cancel = CancellationToken::new();
                    store
                        .get_or_refresh(BUFFER, &cancel, move || async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            Ok(Credential::expiring_in("shared", Duration::from_secs(3600)))
                        })
                        .await
                })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap().secret(), "shared");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_waiter_gets_cancelled_error() {
        let store = Arc::new(CredentialStore::new());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = store
            .get_or_refresh(BUFFER, &cancel, || async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(Credential::permanent("never"))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::Cancelled));
        assert!(store.current().is_none());
        assert!(store.slot().is_none());
    }

    #[tokio::test]
    async fn test_dropped_waiter_releases_refresh() {
        let store = Arc::new(CredentialStore::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let cancel = CancellationToken::new();

        let counter = Arc::clone(&calls);
        let timed_out = tokio::time::timeout(
            Duration::from_millis(20),
            store.get_or_refresh(BUFFER, &cancel, move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(Credential::permanent("never"))
            }),
        )
        .await;
        assert!(timed_out.is_err());
        assert!(store.slot().is_none());

        let counter = Arc::clone(&calls);
        let cred = store
            .get_or_refresh(BUFFER, &cancel, move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Credential::permanent("second"))
            })
            .await
            .unwrap();
        assert_eq!(cred.secret(), "second");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_dropped_waiter_keeps_refresh_for_others() {
        let store = Arc::new(CredentialStore::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let make_refresh = |calls: Arc<AtomicUsize>| {
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok::<_, AuthError>(Credential::permanent("shared"))
            }
        };

        let patient = {
            let store = Arc::clone(&store);
            let refresh = make_refresh(Arc::clone(&calls));
            tokio::spawn(async move {
                let cancel = CancellationToken::new();
                store.get_or_refresh(BUFFER, &cancel, refresh).await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        let cancel = CancellationToken::new();
        let impatient = tokio::time::timeout(
            Duration::from_millis(10),
            store.get_or_refresh(BUFFER, &cancel, make_refresh(Arc::clone(&calls))),
        )
        .await;
        assert!(impatient.is_err());

        assert_eq!(patient.await.unwrap().unwrap().secret(), "shared");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refresh_after_invalidate() {
        let store = Arc::new(CredentialStore::with_credential(Credential::permanent("a")));
        store.invalidate();
        let cancel = CancellationToken::new();
        let cred = store
            .get_or_refresh(BUFFER, &cancel, || async { Ok(Credential::permanent("b")) })
            .await
            .unwrap();
        assert_eq!(cred.secret(), "b");
    }
}
