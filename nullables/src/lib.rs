//! Nullable infrastructure for deterministic testing.
//!
//! Everything the trust manager talks to (key store, system trust, decision
//! provider) sits behind a trait. This crate provides test-friendly
//! implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Record how they were called
//! - Never touch the filesystem, network or a user
//!
//! Usage: swap real implementations for nullables in tests.

pub mod key_store;
pub mod provider;
pub mod system_trust;

pub use key_store::NullKeyStore;
pub use provider::{DecisionGate, NullDecisionProvider};
pub use system_trust::NullSystemTrust;
