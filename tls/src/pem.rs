//! Loading certificates from PEM or raw DER.

use std::path::Path;

use rustls::pki_types::pem::PemObject;
use rustls::pki_types::CertificateDer;

use trustgate_types::Certificate;

use crate::TlsError;

const PEM_MARKER: &[u8] = b"-----BEGIN";

/// Parse every certificate in `bytes`.
///
/// PEM input may hold a whole chain, leaf first. Anything without a PEM
/// header is taken as a single DER certificate.
pub fn load_certificates(bytes: &[u8]) -> Result<Vec<Certificate>, TlsError> {
    if !is_pem(bytes) {
        if bytes.is_empty() {
            return Err(TlsError::NoCertificate);
        }
        return Ok(vec![Certificate::from_der(bytes.to_vec())]);
    }

    let certs = CertificateDer::pem_slice_iter(bytes)
        .map(|der| der.map(|der| Certificate::from_der(der.to_vec())))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| TlsError::Pem(e.to_string()))?;
    if certs.is_empty() {
        return Err(TlsError::NoCertificate);
    }
    Ok(certs)
}

pub fn load_certificate_file(path: impl AsRef<Path>) -> Result<Vec<Certificate>, TlsError> {
    let bytes = std::fs::read(path)?;
    load_certificates(&bytes)
}

fn is_pem(bytes: &[u8]) -> bool {
    bytes.windows(PEM_MARKER.len()).any(|w| w == PEM_MARKER)
}
