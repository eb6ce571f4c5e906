//! Decision coordinator: one outstanding decision request per certificate,
//! any number of waiters.
//!
//! The first caller for a certificate creates a pending request and invokes
//! the provider; later callers join the waiter list. The provider's answer
//! (or a timeout, treated as distrust) is persisted into the [`TrustStore`]
//! and delivered to every waiter under the same lock that admits new
//! waiters, so nobody joins a request that has already been drained.
//!
//! The provider future runs on its own task: dropping the caller that issued
//! the request only cancels that caller's wait.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::sync::{broadcast, oneshot};

use trustgate_crypto::fingerprint;
use trustgate_types::{Certificate, DecisionSource, Fingerprint, TrustError, TrustRecord};

use crate::trust_store::TrustStore;

/// How long a provider may take before its silence counts as distrust.
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(60);

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Lifecycle notifications for pending decisions.
///
/// Subscribers use the fingerprint to correlate with whatever they showed the
/// user, e.g. to dismiss a notification once nobody is waiting anymore.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DecisionEvent {
    /// A decision request was issued to the provider.
    Requested { fingerprint: Fingerprint },
    /// A decision was reached and delivered to `waiters` callers.
    Resolved {
        fingerprint: Fingerprint,
        trusted: bool,
        source: DecisionSource,
        waiters: usize,
    },
    /// A waiter stopped waiting; the request itself stays in flight.
    WaiterCancelled {
        fingerprint: Fingerprint,
        remaining: usize,
    },
}

struct Waiter {
    id: u64,
    tx: oneshot::Sender<bool>,
}

struct PendingRequest {
    request_id: u64,
    certificate: Certificate,
    waiters: Vec<Waiter>,
}

struct Inner {
    store: Arc<TrustStore>,
    pending: Mutex<HashMap<Fingerprint, PendingRequest>>,
    provider_timeout: Duration,
    next_id: AtomicU64,
    events: broadcast::Sender<DecisionEvent>,
}

/// Deduplicates concurrent decision requests and fans out their outcome.
///
/// Cheap to clone; clones share the pending table.
#[derive(Clone)]
pub struct DecisionCoordinator {
    inner: Arc<Inner>,
}

impl DecisionCoordinator {
    pub fn new(store: Arc<TrustStore>) -> Self {
        Self::with_timeout(store, DEFAULT_PROVIDER_TIMEOUT)
    }

    pub fn with_timeout(store: Arc<TrustStore>, provider_timeout: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                store,
                pending: Mutex::new(HashMap::new()),
                provider_timeout,
                next_id: AtomicU64::new(1),
                events,
            }),
        }
    }

    pub fn provider_timeout(&self) -> Duration {
        self.inner.provider_timeout
    }

    /// Wait for the trust decision on `cert`.
    ///
    /// `provider` is called at most once, and only when no request for this
    /// certificate is pending and the store holds no decision for it yet. A
    /// decision recorded since the caller last looked is returned as is. The
    /// provider's future is driven on a spawned
    /// tokio task and bounded by the provider timeout; a timeout resolves all
    /// waiters with `false`.
    ///
    /// Must be polled within a tokio runtime. Dropping the returned future
    /// removes only this caller from the waiter list.
    pub async fn resolve<F>(&self, cert: &Certificate, provider: F) -> bool
    where
        F: FnOnce(&Certificate) -> BoxFuture<'static, bool>,
    {
        let fp = fingerprint(cert);
        let waiter_id = self.inner.next_id();
        let (tx, rx) = oneshot::channel();

        let issue = {
            let mut pending = self.inner.lock_pending();
            match pending.get_mut(&fp) {
                Some(request) => {
                    request.waiters.push(Waiter { id: waiter_id, tx });
                    tracing::debug!(
                        fingerprint = %fp.short(),
                        waiters = request.waiters.len(),
                        "joined pending trust decision"
                    );
                    None
                }
                None => {
                    // A request may have completed between the caller's store
                    // lookup and this lock; its decision stands.
                    if let Some(trusted) = self.inner.decided(cert) {
                        tracing::debug!(
                            fingerprint = %fp.short(),
                            trusted,
                            "trust decision already made"
                        );
                        return trusted;
                    }
                    let request_id = self.inner.next_id();
                    pending.insert(
                        fp,
                        PendingRequest {
                            request_id,
                            certificate: cert.clone(),
                            waiters: vec![Waiter { id: waiter_id, tx }],
                        },
                    );
                    Some(request_id)
                }
            }
        };

        let guard = WaiterGuard {
            inner: &self.inner,
            fingerprint: fp,
            waiter_id,
            armed: true,
        };

        if let Some(request_id) = issue {
            tracing::info!(fingerprint = %fp.short(), "requesting trust decision");
            let _ = self.inner.events.send(DecisionEvent::Requested { fingerprint: fp });
            let answer = provider(cert);
            self.spawn_request(fp, request_id, answer);
        }

        let outcome = rx.await;
        guard.disarm();
        // A dropped sender means the request vanished without an answer.
        outcome.unwrap_or(false)
    }

    /// Like [`resolve`](Self::resolve), but gives up waiting after `wait`.
    ///
    /// Returns `None` when this caller timed out. The request stays in
    /// flight for the other waiters and is still persisted when it resolves.
    pub async fn resolve_within<F>(
        &self,
        cert: &Certificate,
        provider: F,
        wait: Duration,
    ) -> Option<bool>
    where
        F: FnOnce(&Certificate) -> BoxFuture<'static, bool>,
    {
        tokio::time::timeout(wait, self.resolve(cert, provider))
            .await
            .ok()
    }

    /// Apply a decision that arrived out of band, e.g. from a UI callback.
    ///
    /// The decision is always persisted. If a request for `cert` is pending,
    /// its waiters are woken and the provider's own answer is ignored later.
    /// Returns the number of waiters that received the decision.
    pub fn submit_decision(&self, cert: &Certificate, trusted: bool) -> usize {
        let fp = fingerprint(cert);
        let mut pending = self.inner.lock_pending();
        let request = pending.remove(&fp);
        self.inner.persist(cert, trusted);

        let delivered = match request {
            Some(request) => deliver(request.waiters, trusted),
            None => 0,
        };
        drop(pending);

        tracing::info!(
            fingerprint = %fp.short(),
            trusted,
            waiters = delivered,
            "trust decision submitted"
        );
        let _ = self.inner.events.send(DecisionEvent::Resolved {
            fingerprint: fp,
            trusted,
            source: DecisionSource::Submitted,
            waiters: delivered,
        });
        delivered
    }

    /// Number of certificates with a decision in flight.
    pub fn pending_count(&self) -> usize {
        self.inner.lock_pending().len()
    }

    /// Number of callers currently waiting on `cert`.
    pub fn waiter_count(&self, cert: &Certificate) -> usize {
        let fp = fingerprint(cert);
        self.inner
            .lock_pending()
            .get(&fp)
            .map_or(0, |request| request.waiters.len())
    }

    pub fn is_pending(&self, cert: &Certificate) -> bool {
        let fp = fingerprint(cert);
        self.inner.lock_pending().contains_key(&fp)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DecisionEvent> {
        self.inner.events.subscribe()
    }

    fn spawn_request(&self, fp: Fingerprint, request_id: u64, answer: BoxFuture<'static, bool>) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let (trusted, source) = match tokio::time::timeout(inner.provider_timeout, answer).await
            {
                Ok(trusted) => (trusted, DecisionSource::Provider),
                Err(_) => {
                    tracing::warn!(
                        fingerprint = %fp.short(),
                        timeout_secs = inner.provider_timeout.as_secs(),
                        "{}",
                        TrustError::DecisionTimeout
                    );
                    (false, DecisionSource::Timeout)
                }
            };
            inner.complete(fp, request_id, trusted, source);
        });
    }
}

impl Inner {
    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn lock_pending(&self) -> MutexGuard<'_, HashMap<Fingerprint, PendingRequest>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Decision already held by the store. Called with the pending lock held.
    fn decided(&self, cert: &Certificate) -> Option<bool> {
        match self.store.record(cert) {
            TrustRecord::UserTrusted => Some(true),
            TrustRecord::UserDistrusted => Some(false),
            TrustRecord::Unknown => None,
        }
    }

    fn persist(&self, cert: &Certificate, trusted: bool) {
        if trusted {
            self.store.set_trusted(cert);
        } else {
            self.store.set_distrusted(cert);
        }
    }

    /// Persist and deliver the provider's answer for request `request_id`.
    ///
    /// Answers for a request that was already resolved (by
    /// [`DecisionCoordinator::submit_decision`]) are dropped.
    fn complete(&self, fp: Fingerprint, request_id: u64, trusted: bool, source: DecisionSource) {
        let mut pending = self.lock_pending();
        let current = pending
            .get(&fp)
            .is_some_and(|request| request.request_id == request_id);
        if !current {
            tracing::debug!(fingerprint = %fp.short(), "ignoring answer for a decision already made");
            return;
        }
        let Some(request) = pending.remove(&fp) else {
            return;
        };

        self.persist(&request.certificate, trusted);
        let delivered = deliver(request.waiters, trusted);
        drop(pending);

        tracing::info!(
            fingerprint = %fp.short(),
            trusted,
            %source,
            waiters = delivered,
            "trust decision resolved"
        );
        let _ = self.events.send(DecisionEvent::Resolved {
            fingerprint: fp,
            trusted,
            source,
            waiters: delivered,
        });
    }

    fn cancel_waiter(&self, fp: Fingerprint, waiter_id: u64) {
        let mut pending = self.lock_pending();
        let Some(request) = pending.get_mut(&fp) else {
            return;
        };
        let before = request.waiters.len();
        request.waiters.retain(|w| w.id != waiter_id);
        if request.waiters.len() == before {
            return;
        }
        let remaining = request.waiters.len();
        drop(pending);

        tracing::debug!(fingerprint = %fp.short(), remaining, "trust decision waiter cancelled");
        let _ = self.events.send(DecisionEvent::WaiterCancelled {
            fingerprint: fp,
            remaining,
        });
    }
}

fn deliver(waiters: Vec<Waiter>, trusted: bool) -> usize {
    waiters
        .into_iter()
        .map(|waiter| waiter.tx.send(trusted).is_ok())
        .filter(|delivered| *delivered)
        .count()
}

/// Removes its waiter from the pending request unless disarmed, i.e. when
/// the waiting future is dropped before receiving an answer.
struct WaiterGuard<'a> {
    inner: &'a Inner,
    fingerprint: Fingerprint,
    waiter_id: u64,
    armed: bool,
}

impl WaiterGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for WaiterGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.inner.cancel_waiter(self.fingerprint, self.waiter_id);
        }
    }
}
