//! LMDB key-store backend for trustgate.
//!
//! Implements the traits from `trustgate-store` using the `heed` LMDB bindings.
//! Trusted certificates and schema metadata live in two named databases of a
//! single environment.

pub mod environment;
pub mod error;
pub mod key_store;
pub mod meta;
pub mod migration;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use key_store::LmdbKeyStore;
pub use meta::LmdbMetaStore;
