//! Decision providers: whoever ultimately answers "trust this certificate?".
//!
//! A provider is asked at most once per pending certificate. Its future may
//! take as long as the user needs; the coordinator bounds it with the
//! provider timeout.

use futures_util::future::BoxFuture;
use tokio::sync::{mpsc, oneshot};

use trustgate_crypto::fingerprint;
use trustgate_types::{Certificate, Fingerprint, ForegroundHint};

/// Source of trust decisions for certificates nobody has decided on yet.
pub trait DecisionProvider: Send + Sync {
    /// Whether the provider can reach the user at all under `hint`.
    ///
    /// When this returns `false` the certificate is rejected without a
    /// pending request being created.
    fn is_available(&self, _hint: ForegroundHint) -> bool {
        true
    }

    /// Ask for a decision on `certificate`. Resolves to `true` to trust it.
    fn request(&self, certificate: &Certificate, hint: ForegroundHint) -> BoxFuture<'static, bool>;
}

/// A decision request travelling to a UI or another process.
///
/// Dropping the request without calling [`respond`](Self::respond) counts as
/// a rejection.
#[derive(Debug)]
pub struct DecisionRequest {
    pub certificate: Certificate,
    /// Correlation id, e.g. for tagging and later dismissing a notification.
    pub fingerprint: Fingerprint,
    pub hint: ForegroundHint,
    responder: oneshot::Sender<bool>,
}

impl DecisionRequest {
    /// Deliver the decision. Returns `false` if nobody is listening anymore.
    pub fn respond(self, trusted: bool) -> bool {
        self.responder.send(trusted).is_ok()
    }

    /// Whether the requesting side has given up on this request.
    pub fn is_abandoned(&self) -> bool {
        self.responder.is_closed()
    }
}

/// Forwards decision requests over a bounded tokio channel.
#[derive(Clone)]
pub struct ChannelDecisionProvider {
    tx: mpsc::Sender<DecisionRequest>,
}

impl ChannelDecisionProvider {
    /// Create a provider and the receiving end a UI loop reads requests from.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<DecisionRequest>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

impl DecisionProvider for ChannelDecisionProvider {
    fn is_available(&self, _hint: ForegroundHint) -> bool {
        !self.tx.is_closed()
    }

    fn request(&self, certificate: &Certificate, hint: ForegroundHint) -> BoxFuture<'static, bool> {
        let tx = self.tx.clone();
        let certificate = certificate.clone();
        Box::pin(async move {
            let (responder, answer) = oneshot::channel();
            let request = DecisionRequest {
                fingerprint: fingerprint(&certificate),
                certificate,
                hint,
                responder,
            };
            if tx.send(request).await.is_err() {
                tracing::warn!("decision channel closed, rejecting certificate");
                return false;
            }
            answer.await.unwrap_or_else(|_| {
                tracing::debug!("decision request dropped without an answer");
                false
            })
        })
    }
}

/// Answers every request with the same fixed decision.
#[derive(Clone, Copy, Debug)]
pub struct PolicyDecisionProvider {
    trusted: bool,
}

impl PolicyDecisionProvider {
    pub fn new(trusted: bool) -> Self {
        Self { trusted }
    }

    pub fn accept_all() -> Self {
        Self::new(true)
    }

    pub fn reject_all() -> Self {
        Self::new(false)
    }
}

impl DecisionProvider for PolicyDecisionProvider {
    fn request(&self, certificate: &Certificate, _hint: ForegroundHint) -> BoxFuture<'static, bool> {
        let trusted = self.trusted;
        tracing::debug!(
            fingerprint = %fingerprint(certificate).short(),
            trusted,
            "answering trust decision by policy"
        );
        Box::pin(async move { trusted })
    }
}
