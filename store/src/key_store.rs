//! Persistent key store trait.
//!
//! Durable mapping from a certificate's fingerprint key to its DER bytes.
//! The trust store loads the whole mapping once at start-up and writes the
//! whole mapping back after every change, so backends only need bulk
//! operations.

use std::collections::BTreeMap;

use crate::StoreError;

/// Fingerprint key (upper-case SHA-512 hex) → DER-encoded certificate.
pub type CertificateMap = BTreeMap<String, Vec<u8>>;

/// Trait for persisting user-trusted certificates across restarts.
///
/// Implementations must be safe to share between threads; the trust store
/// serializes its own calls, so a backend never sees two concurrent `save`s
/// from the same store.
pub trait KeyStore: Send + Sync {
    /// Read every persisted entry.
    fn load(&self) -> Result<CertificateMap, StoreError>;

    /// Replace the persisted contents with `entries`.
    fn save(&self, entries: &CertificateMap) -> Result<(), StoreError>;
}
