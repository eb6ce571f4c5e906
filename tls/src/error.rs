use thiserror::Error;

#[derive(Debug, Error)]
pub enum TlsError {
    #[error("invalid PEM: {0}")]
    Pem(String),

    #[error("no certificate found in input")]
    NoCertificate,

    #[error("invalid server name: {0}")]
    InvalidServerName(#[from] rustls::pki_types::InvalidDnsNameError),

    #[error("verifier error: {0}")]
    Verifier(#[from] rustls::client::VerifierBuilderError),

    #[error("TLS error: {0}")]
    Rustls(#[from] rustls::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
