//! Trust evaluation: decides whether a server certificate chain is accepted.
//!
//! Precedence, first match wins:
//!
//! 1. leaf trusted by the user → accept
//! 2. leaf distrusted by the user in this session → reject
//! 3. system roots enabled and the system accepts the chain → accept
//! 4. non-interactive → reject
//! 5. the provider cannot reach the user → reject
//! 6. ask the [`DecisionCoordinator`]
//!
//! Steps 1–5 are synchronous and never need a runtime.

use std::fmt;
use std::sync::Arc;

use tokio::runtime::{Handle, RuntimeFlavor};

use trustgate_crypto::fingerprint;
use trustgate_types::{Certificate, ForegroundHint, TrustError};

use crate::coordinator::DecisionCoordinator;
use crate::provider::DecisionProvider;
use crate::system::SystemTrust;
use crate::trust_store::TrustStore;

/// Why a chain was accepted or rejected without asking anyone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Basis {
    UserTrusted,
    UserDistrusted,
    SystemRoots,
    NonInteractive,
    ProviderUnavailable,
}

impl Basis {
    pub fn as_str(&self) -> &'static str {
        match self {
            Basis::UserTrusted => "trusted by user",
            Basis::UserDistrusted => "distrusted by user",
            Basis::SystemRoots => "trusted by system",
            Basis::NonInteractive => "unknown, non-interactive",
            Basis::ProviderUnavailable => "unknown, user unreachable",
        }
    }
}

impl fmt::Display for Basis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the synchronous part of an evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Accept(Basis),
    Reject(Basis),
    /// Nothing is known; a decision must be requested under this hint.
    NeedsDecision(ForegroundHint),
}

pub struct TrustEvaluator {
    store: Arc<TrustStore>,
    coordinator: DecisionCoordinator,
    system: Arc<dyn SystemTrust>,
    provider: Arc<dyn DecisionProvider>,
    runtime: Option<Handle>,
}

impl TrustEvaluator {
    pub fn new(
        store: Arc<TrustStore>,
        coordinator: DecisionCoordinator,
        system: Arc<dyn SystemTrust>,
        provider: Arc<dyn DecisionProvider>,
    ) -> Self {
        Self {
            store,
            coordinator,
            system,
            provider,
            runtime: None,
        }
    }

    /// Multi-threaded runtime used by the blocking entry points when the
    /// calling thread is not a worker of one.
    pub fn with_runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    pub fn store(&self) -> &Arc<TrustStore> {
        &self.store
    }

    pub fn coordinator(&self) -> &DecisionCoordinator {
        &self.coordinator
    }

    /// Whether the server presenting `chain` is trusted.
    ///
    /// `interactive` is `None` in non-interactive mode; otherwise it is
    /// handed to the decision provider.
    pub async fn evaluate(
        &self,
        chain: &[Certificate],
        auth_type: &str,
        trust_system_roots: bool,
        interactive: Option<ForegroundHint>,
    ) -> Result<bool, TrustError> {
        self.evaluate_with(
            self.system.as_ref(),
            chain,
            auth_type,
            trust_system_roots,
            interactive,
        )
        .await
    }

    /// [`evaluate`](Self::evaluate) with a system trust for this call only,
    /// e.g. one that already knows the TLS library's verdict on the chain.
    pub async fn evaluate_with(
        &self,
        system: &dyn SystemTrust,
        chain: &[Certificate],
        auth_type: &str,
        trust_system_roots: bool,
        interactive: Option<ForegroundHint>,
    ) -> Result<bool, TrustError> {
        match self.explain_with(system, chain, auth_type, trust_system_roots, interactive)? {
            Verdict::Accept(_) => Ok(true),
            Verdict::Reject(_) => Ok(false),
            Verdict::NeedsDecision(hint) => Ok(self.request_decision(&chain[0], hint).await),
        }
    }

    /// Blocking variant of [`evaluate`](Self::evaluate) for synchronous TLS
    /// callbacks.
    pub fn evaluate_blocking(
        &self,
        chain: &[Certificate],
        auth_type: &str,
        trust_system_roots: bool,
        interactive: Option<ForegroundHint>,
    ) -> Result<bool, TrustError> {
        self.evaluate_blocking_with(
            self.system.as_ref(),
            chain,
            auth_type,
            trust_system_roots,
            interactive,
        )
    }

    /// Blocking variant of [`evaluate_with`](Self::evaluate_with).
    ///
    /// Waiting for a decision needs a multi-threaded runtime: either the one
    /// the calling thread belongs to, or the handle set with
    /// [`with_runtime`](Self::with_runtime). A caller on a current-thread
    /// runtime waits on the stored handle from a scoped thread, blocking its
    /// own runtime meanwhile. Without a usable runtime, a certificate that
    /// needs a decision is rejected.
    pub fn evaluate_blocking_with(
        &self,
        system: &dyn SystemTrust,
        chain: &[Certificate],
        auth_type: &str,
        trust_system_roots: bool,
        interactive: Option<ForegroundHint>,
    ) -> Result<bool, TrustError> {
        let hint = match self.explain_with(system, chain, auth_type, trust_system_roots, interactive)? {
            Verdict::Accept(_) => return Ok(true),
            Verdict::Reject(_) => return Ok(false),
            Verdict::NeedsDecision(hint) => hint,
        };
        let leaf = &chain[0];

        match Handle::try_current() {
            Ok(handle) => match handle.runtime_flavor() {
                RuntimeFlavor::MultiThread => Ok(tokio::task::block_in_place(|| {
                    handle.block_on(self.request_decision(leaf, hint))
                })),
                _ => match self.multi_thread_runtime() {
                    // The calling thread already runs a runtime, so the wait
                    // happens on a scoped thread that can enter the other one.
                    Some(other) => Ok(std::thread::scope(|scope| {
                        scope
                            .spawn(|| other.block_on(self.request_decision(leaf, hint)))
                            .join()
                            .unwrap_or(false)
                    })),
                    None => {
                        tracing::warn!(
                            fingerprint = %fingerprint(leaf).short(),
                            "can't wait for a trust decision on a current-thread runtime without a multi-threaded runtime handle, rejecting certificate"
                        );
                        Ok(false)
                    }
                },
            },
            Err(_) => match &self.runtime {
                Some(handle) => Ok(handle.block_on(self.request_decision(leaf, hint))),
                None => {
                    tracing::warn!(
                        fingerprint = %fingerprint(leaf).short(),
                        "no runtime to wait for a trust decision on, rejecting certificate"
                    );
                    Ok(false)
                }
            },
        }
    }

    /// The synchronous part of an evaluation, using the injected system trust.
    pub fn explain(
        &self,
        chain: &[Certificate],
        auth_type: &str,
        trust_system_roots: bool,
        interactive: Option<ForegroundHint>,
    ) -> Result<Verdict, TrustError> {
        self.explain_with(
            self.system.as_ref(),
            chain,
            auth_type,
            trust_system_roots,
            interactive,
        )
    }

    fn explain_with(
        &self,
        system: &dyn SystemTrust,
        chain: &[Certificate],
        auth_type: &str,
        trust_system_roots: bool,
        interactive: Option<ForegroundHint>,
    ) -> Result<Verdict, TrustError> {
        let leaf = chain.first().ok_or(TrustError::EmptyChain)?;

        if self.store.is_user_trusted(leaf) {
            return Ok(Verdict::Accept(Basis::UserTrusted));
        }
        if self.store.is_user_distrusted(leaf) {
            return Ok(Verdict::Reject(Basis::UserDistrusted));
        }
        if trust_system_roots && system.accepts(chain, auth_type) {
            return Ok(Verdict::Accept(Basis::SystemRoots));
        }

        let Some(hint) = interactive else {
            tracing::debug!(
                fingerprint = %fingerprint(leaf).short(),
                "non-interactive mode, rejecting unknown certificate"
            );
            return Ok(Verdict::Reject(Basis::NonInteractive));
        };
        if !self.provider.is_available(hint) {
            tracing::warn!(
                fingerprint = %fingerprint(leaf).short(),
                ?hint,
                error = %TrustError::ProviderUnavailable,
                "rejecting certificate"
            );
            return Ok(Verdict::Reject(Basis::ProviderUnavailable));
        }
        Ok(Verdict::NeedsDecision(hint))
    }

    fn multi_thread_runtime(&self) -> Option<&Handle> {
        self.runtime
            .as_ref()
            .filter(|handle| handle.runtime_flavor() == RuntimeFlavor::MultiThread)
    }

    async fn request_decision(&self, leaf: &Certificate, hint: ForegroundHint) -> bool {
        let provider = Arc::clone(&self.provider);
        self.coordinator
            .resolve(leaf, move |cert| provider.request(cert, hint))
            .await
    }
}
