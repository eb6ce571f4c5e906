//! Abstract persistence traits for trustgate.
//!
//! Every key-store backend (LMDB, in-memory for testing) implements these
//! traits. The trust store depends only on the traits.

pub mod error;
pub mod key_store;
pub mod meta;

pub use error::StoreError;
pub use key_store::{CertificateMap, KeyStore};
pub use meta::MetaStore;
