//! Certificate fingerprinting for trustgate.
//!
//! - **SHA-512** over the DER encoding is the certificate's identity: the
//!   persisted key and the correlation id for pending decisions
//! - **SHA-256** is offered as a shorter, colon-separated display fingerprint

pub mod hash;

pub use hash::{display_fingerprint, fingerprint, hex_string, sha256, sha512};
