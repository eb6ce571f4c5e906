//! Certificate fingerprint used as storage key and correlation id.

use std::fmt;

/// Length of a fingerprint in bytes (SHA-512).
pub const FINGERPRINT_LEN: usize = 64;

/// A 64-byte SHA-512 digest over a certificate's DER encoding.
///
/// Rendered as 128 upper-case hex digits without separators; that string is
/// the key under which trusted certificates are persisted.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; FINGERPRINT_LEN]);

impl Fingerprint {
    pub fn new(bytes: [u8; FINGERPRINT_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; FINGERPRINT_LEN] {
        &self.0
    }

    /// Upper-case hex rendering, the persisted key form.
    pub fn to_hex(&self) -> String {
        hex::encode_upper(&self.0)
    }

    /// Short prefix for log lines.
    pub fn short(&self) -> String {
        hex::encode_upper(&self.0[..6])
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.short())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// Inline hex encoding to avoid adding the `hex` crate as a dependency of types.
mod hex {
    pub fn encode_upper(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02X}", b)).collect()
    }
}
