//! rustls [`ServerCertVerifier`] that defers to a [`TrustManager`].
//!
//! Per handshake the chain is validated against the system roots once (when
//! enabled); the result feeds the manager's evaluation as its system trust.
//! A valid chain issued for another host name is only accepted if the user
//! trusts the leaf; that path never asks for a decision.

use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::WebPkiServerVerifier;
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{
    CertificateError, ClientConfig, DigitallySignedStruct, Error, RootCertStore, SignatureScheme,
};

use trustgate_crypto::fingerprint;
use trustgate_manager::{TrustManager, DEFAULT_AUTH_TYPE};
use trustgate_types::Certificate;

use crate::system::{build_webpki, is_name_mismatch, verify_chain};
use crate::TlsError;

/// The ring crypto provider used unless another one is supplied.
pub fn default_provider() -> Arc<CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}

/// Root store holding the Mozilla roots shipped by `webpki-roots`.
pub fn webpki_root_store() -> RootCertStore {
    RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    }
}

pub struct TrustManagerVerifier {
    manager: Arc<TrustManager>,
    webpki: Option<Arc<WebPkiServerVerifier>>,
    provider: Arc<CryptoProvider>,
}

impl std::fmt::Debug for TrustManagerVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustManagerVerifier")
            .field("manager", &"<TrustManager>")
            .field("webpki", &self.webpki.is_some())
            .field("provider", &"<CryptoProvider>")
            .finish()
    }
}

impl TrustManagerVerifier {
    pub fn new(
        manager: Arc<TrustManager>,
        roots: RootCertStore,
        provider: Arc<CryptoProvider>,
    ) -> Result<Self, TlsError> {
        Ok(Self {
            manager,
            webpki: build_webpki(roots, Arc::clone(&provider))?,
            provider,
        })
    }

    /// Verifier using the `webpki-roots` system roots and the ring provider.
    pub fn with_webpki_roots(manager: Arc<TrustManager>) -> Result<Self, TlsError> {
        Self::new(manager, webpki_root_store(), default_provider())
    }

    pub fn manager(&self) -> &Arc<TrustManager> {
        &self.manager
    }

    fn system_verdict(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
    ) -> Result<ServerCertVerified, Error> {
        match &self.webpki {
            Some(webpki) => verify_chain(webpki, end_entity, intermediates, server_name),
            None => Err(Error::InvalidCertificate(CertificateError::UnknownIssuer)),
        }
    }
}

impl ServerCertVerifier for TrustManagerVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, Error> {
        let chain: Vec<Certificate> = std::iter::once(end_entity)
            .chain(intermediates)
            .map(|der| Certificate::from_der(der.to_vec()))
            .collect();
        let settings = self.manager.settings();
        let trust_system_roots = settings.trust_system_roots();

        let system = if trust_system_roots {
            self.system_verdict(end_entity, intermediates, server_name)
        } else {
            Err(Error::InvalidCertificate(CertificateError::UnknownIssuer))
        };

        if let Err(e) = &system {
            if is_name_mismatch(e) {
                let hostname = server_name.to_str();
                let hostnames = self.manager.hostname_verifier(None);
                if hostnames.verify(&hostname, &chain) {
                    return Ok(ServerCertVerified::assertion());
                }
                tracing::warn!(
                    hostname = %hostname,
                    fingerprint = %fingerprint(&chain[0]).short(),
                    "certificate not valid for host name"
                );
                return Err(e.clone());
            }
        }

        let accepted_by_system = system.is_ok();
        let handshake_trust = move |_: &[Certificate], _: &str| accepted_by_system;
        let trusted = self
            .manager
            .evaluator()
            .evaluate_blocking_with(
                &handshake_trust,
                &chain,
                DEFAULT_AUTH_TYPE,
                trust_system_roots,
                settings.foreground_hint(),
            )
            .map_err(|e| Error::General(e.to_string()))?;

        if trusted {
            Ok(ServerCertVerified::assertion())
        } else {
            Err(Error::InvalidCertificate(CertificateError::UnknownIssuer))
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, Error> {
        verify_tls12_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, Error> {
        verify_tls13_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider.signature_verification_algorithms.supported_schemes()
    }
}

/// Client configuration whose server certificates are checked by `manager`.
///
/// Handshakes driven from a current-thread runtime can only wait for a user
/// decision if `manager` was given a multi-threaded runtime with
/// [`TrustManager::with_runtime`]; otherwise unknown certificates are
/// rejected.
pub fn client_config(manager: Arc<TrustManager>) -> Result<ClientConfig, TlsError> {
    let provider = default_provider();
    let verifier = TrustManagerVerifier::new(manager, webpki_root_store(), Arc::clone(&provider))?;
    let config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(verifier))
        .with_no_client_auth();
    Ok(config)
}
