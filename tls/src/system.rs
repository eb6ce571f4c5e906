//! System trust backed by webpki path validation.

use std::sync::Arc;

use rustls::client::danger::{ServerCertVerified, ServerCertVerifier};
use rustls::client::WebPkiServerVerifier;
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{CertificateError, Error, RootCertStore};

use trustgate_manager::SystemTrust;
use trustgate_types::Certificate;

use crate::TlsError;

/// Name to validate against when no server name is known. A name mismatch
/// against it still means the chain itself is valid.
const PLACEHOLDER_NAME: &str = "trustgate.invalid";

/// [`SystemTrust`] that validates chains against a set of root certificates.
///
/// Outside of a handshake there is no server name, so only the chain is
/// judged.
pub struct WebPkiSystemTrust {
    verifier: Option<Arc<WebPkiServerVerifier>>,
    placeholder: ServerName<'static>,
}

impl WebPkiSystemTrust {
    /// An empty `roots` store yields a system trust that accepts nothing.
    pub fn new(roots: RootCertStore, provider: Arc<CryptoProvider>) -> Result<Self, TlsError> {
        let verifier = build_webpki(roots, provider)?;
        let placeholder = ServerName::try_from(PLACEHOLDER_NAME)?;
        Ok(Self {
            verifier,
            placeholder,
        })
    }

    /// Mozilla's root program, as shipped by `webpki-roots`.
    pub fn with_webpki_roots() -> Result<Self, TlsError> {
        Self::new(crate::webpki_root_store(), crate::default_provider())
    }
}

impl SystemTrust for WebPkiSystemTrust {
    fn accepts(&self, chain: &[Certificate], _auth_type: &str) -> bool {
        let Some(verifier) = &self.verifier else {
            return false;
        };
        let Some((leaf, intermediates)) = chain.split_first() else {
            return false;
        };
        let intermediates: Vec<_> = intermediates
            .iter()
            .map(|c| CertificateDer::from(c.as_der()))
            .collect();

        match verify_chain(
            verifier,
            &CertificateDer::from(leaf.as_der()),
            &intermediates,
            &self.placeholder,
        ) {
            Ok(_) => true,
            Err(e) => {
                let accepted = is_name_mismatch(&e);
                if !accepted {
                    tracing::debug!(error = %e, "chain not trusted by system roots");
                }
                accepted
            }
        }
    }
}

/// `None` when there are no roots to build a verifier from.
pub(crate) fn build_webpki(
    roots: RootCertStore,
    provider: Arc<CryptoProvider>,
) -> Result<Option<Arc<WebPkiServerVerifier>>, TlsError> {
    if roots.is_empty() {
        return Ok(None);
    }
    let verifier = WebPkiServerVerifier::builder_with_provider(Arc::new(roots), provider).build()?;
    Ok(Some(verifier))
}

pub(crate) fn verify_chain(
    verifier: &WebPkiServerVerifier,
    end_entity: &CertificateDer<'_>,
    intermediates: &[CertificateDer<'_>],
    server_name: &ServerName<'_>,
) -> Result<ServerCertVerified, Error> {
    verifier.verify_server_cert(end_entity, intermediates, server_name, &[], UnixTime::now())
}

/// The chain is valid but was issued for another name.
pub(crate) fn is_name_mismatch(error: &Error) -> bool {
    matches!(
        error,
        Error::InvalidCertificate(
            CertificateError::NotValidForName | CertificateError::NotValidForNameContext { .. }
        )
    )
}
