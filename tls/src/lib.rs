//! TLS integration for trustgate.
//!
//! [`TrustManagerVerifier`] plugs a [`TrustManager`](trustgate_manager::TrustManager)
//! into rustls as its server certificate verifier: certificates the system
//! roots don't cover are deferred to the user, once per certificate.

pub mod error;
pub mod pem;
pub mod system;
pub mod verifier;

pub use error::TlsError;
pub use pem::{load_certificate_file, load_certificates};
pub use system::WebPkiSystemTrust;
pub use verifier::{client_config, default_provider, webpki_root_store, TrustManagerVerifier};
