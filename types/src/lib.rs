//! Fundamental types for trustgate.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! certificates, fingerprints, foreground hints, trust records and the common error type.

pub mod certificate;
pub mod decision;
pub mod error;
pub mod fingerprint;

pub use certificate::Certificate;
pub use decision::{DecisionSource, ForegroundHint, TrustRecord};
pub use error::TrustError;
pub use fingerprint::Fingerprint;
