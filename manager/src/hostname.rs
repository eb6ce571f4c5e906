//! Hostname verification that honours user trust.
//!
//! A certificate the user explicitly accepted is accepted for any host name,
//! since the user has seen the certificate itself. The hostname path never
//! asks for a decision.

use std::sync::Arc;

use trustgate_crypto::fingerprint;
use trustgate_types::Certificate;

use crate::trust_store::TrustStore;

/// Default hostname check, e.g. the TLS library's own.
pub trait HostnameMatcher: Send + Sync {
    fn matches(&self, hostname: &str, leaf: &Certificate) -> bool;
}

impl<F> HostnameMatcher for F
where
    F: Fn(&str, &Certificate) -> bool + Send + Sync,
{
    fn matches(&self, hostname: &str, leaf: &Certificate) -> bool {
        self(hostname, leaf)
    }
}

pub struct HostnameVerifier {
    store: Arc<TrustStore>,
    default: Option<Arc<dyn HostnameMatcher>>,
}

impl HostnameVerifier {
    /// `default` is consulted first; without one only user trust counts.
    pub fn new(store: Arc<TrustStore>, default: Option<Arc<dyn HostnameMatcher>>) -> Self {
        Self { store, default }
    }

    /// Whether `chain` may be used for `hostname`.
    pub fn verify(&self, hostname: &str, chain: &[Certificate]) -> bool {
        let Some(leaf) = chain.first() else {
            return false;
        };

        if let Some(default) = &self.default {
            if default.matches(hostname, leaf) {
                return true;
            }
        }

        if self.store.is_user_trusted(leaf) {
            tracing::warn!(
                hostname,
                fingerprint = %fingerprint(leaf).short(),
                "host name doesn't match certificate, accepting because it is trusted by user"
            );
            return true;
        }
        false
    }
}
