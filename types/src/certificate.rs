//! DER-encoded certificate identity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An X.509 certificate held as its DER encoding.
///
/// Certificates are compared by content, never by reference: two values built
/// from the same bytes are the same certificate. No parsing happens here, the
/// bytes are opaque to everything except the system trust evaluator.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Certificate(Vec<u8>);

impl Certificate {
    pub fn from_der(der: impl Into<Vec<u8>>) -> Self {
        Self(der.into())
    }

    pub fn as_der(&self) -> &[u8] {
        &self.0
    }

    pub fn into_der(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for Certificate {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Certificate {
    fn from(der: Vec<u8>) -> Self {
        Self(der)
    }
}

impl From<&[u8]> for Certificate {
    fn from(der: &[u8]) -> Self {
        Self(der.to_vec())
    }
}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head: String = self.0.iter().take(4).map(|b| format!("{:02x}", b)).collect();
        write!(f, "Certificate({} bytes, {}..)", self.0.len(), head)
    }
}
