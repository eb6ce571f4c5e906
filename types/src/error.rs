//! Top-level error type shared across crates.

use thiserror::Error;

/// Common error type for trust evaluation.
#[derive(Debug, Error)]
pub enum TrustError {
    #[error("certificate chain must not be empty")]
    EmptyChain,

    #[error("could not persist trust decisions: {0}")]
    StorePersistenceFailure(String),

    #[error("timeout when waiting for certificate trustworthiness decision")]
    DecisionTimeout,

    #[error("no decision provider can reach the user")]
    ProviderUnavailable,
}
