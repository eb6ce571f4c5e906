//! Nullable decision provider: scripted answers, recorded requests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use futures_util::future::BoxFuture;
use tokio::sync::watch;

use trustgate_crypto::fingerprint;
use trustgate_manager::DecisionProvider;
use trustgate_types::{Certificate, Fingerprint, ForegroundHint};

enum Script {
    Answer(bool),
    Gated(bool, watch::Receiver<bool>),
    Sequence(Mutex<VecDeque<bool>>),
    Silent,
}

/// Releases the answers of a gated [`NullDecisionProvider`].
pub struct DecisionGate {
    tx: watch::Sender<bool>,
}

impl DecisionGate {
    /// Let every pending and future request resolve.
    pub fn open(&self) {
        let _ = self.tx.send(true);
    }
}

/// A decision provider that answers from a script instead of asking a user.
pub struct NullDecisionProvider {
    script: Script,
    available: AtomicBool,
    calls: AtomicUsize,
    requests: Mutex<Vec<(Fingerprint, ForegroundHint)>>,
}

impl NullDecisionProvider {
    fn with_script(script: Script) -> Self {
        Self {
            script,
            available: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answers `trusted` immediately.
    pub fn answering(trusted: bool) -> Self {
        Self::with_script(Script::Answer(trusted))
    }

    /// Answers `trusted` once the returned gate is opened. A gate dropped
    /// while still closed counts as a rejection.
    pub fn gated(trusted: bool) -> (Self, DecisionGate) {
        let (tx, rx) = watch::channel(false);
        (
            Self::with_script(Script::Gated(trusted, rx)),
            DecisionGate { tx },
        )
    }

    /// Gives `answers` in order, one per request, then rejects.
    pub fn sequence(answers: impl IntoIterator<Item = bool>) -> Self {
        Self::with_script(Script::Sequence(Mutex::new(answers.into_iter().collect())))
    }

    /// Never answers; only the coordinator's timeout ends the request.
    pub fn silent() -> Self {
        Self::with_script(Script::Silent)
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// How many decision requests were issued.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every request issued so far, in order.
    pub fn requests(&self) -> Vec<(Fingerprint, ForegroundHint)> {
        self.requests.lock().unwrap().clone()
    }
}

impl DecisionProvider for NullDecisionProvider {
    fn is_available(&self, _hint: ForegroundHint) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn request(&self, certificate: &Certificate, hint: ForegroundHint) -> BoxFuture<'static, bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap()
            .push((fingerprint(certificate), hint));

        match &self.script {
            Script::Answer(trusted) => {
                let trusted = *trusted;
                Box::pin(async move { trusted })
            }
            Script::Gated(trusted, rx) => {
                let trusted = *trusted;
                let mut rx = rx.clone();
                Box::pin(async move {
                    let opened = rx.wait_for(|open| *open).await.is_ok();
                    opened && trusted
                })
            }
            Script::Sequence(answers) => {
                let trusted = answers.lock().unwrap().pop_front().unwrap_or(false);
                Box::pin(async move { trusted })
            }
            Script::Silent => Box::pin(std::future::pending()),
        }
    }
}
