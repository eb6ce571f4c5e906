//! Platform / default trust evaluation, injected into the evaluator.

use trustgate_types::Certificate;

/// Judges a chain against the system's trust roots.
///
/// `chain[0]` is the leaf. `auth_type` is passed through from the TLS layer
/// unchanged.
pub trait SystemTrust: Send + Sync {
    fn accepts(&self, chain: &[Certificate], auth_type: &str) -> bool;
}

impl<F> SystemTrust for F
where
    F: Fn(&[Certificate], &str) -> bool + Send + Sync,
{
    fn accepts(&self, chain: &[Certificate], auth_type: &str) -> bool {
        self(chain, auth_type)
    }
}

/// System trust that accepts nothing; only user decisions count.
#[derive(Clone, Copy, Debug, Default)]
pub struct RejectAllSystemTrust;

impl SystemTrust for RejectAllSystemTrust {
    fn accepts(&self, _chain: &[Certificate], _auth_type: &str) -> bool {
        false
    }
}
