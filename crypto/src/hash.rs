//! SHA-2 hashing of certificate encodings.

use sha2::{Digest, Sha256, Sha512};
use trustgate_types::fingerprint::FINGERPRINT_LEN;
use trustgate_types::{Certificate, Fingerprint};

/// Compute a SHA-512 digest of arbitrary data.
pub fn sha512(data: &[u8]) -> [u8; FINGERPRINT_LEN] {
    let mut hasher = Sha512::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; FINGERPRINT_LEN];
    output.copy_from_slice(&result);
    output
}

/// Compute a SHA-256 digest of arbitrary data.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Fingerprint a certificate: SHA-512 over its DER encoding.
pub fn fingerprint(cert: &Certificate) -> Fingerprint {
    Fingerprint::new(sha512(cert.as_der()))
}

/// SHA-256 fingerprint in the familiar `AB:CD:..` form, for display only.
pub fn display_fingerprint(cert: &Certificate) -> String {
    hex_string(&sha256(cert.as_der()), Some(':'))
}

/// Upper-case hex rendering with an optional separator between bytes.
pub fn hex_string(data: &[u8], separator: Option<char>) -> String {
    match separator {
        None => hex::encode_upper(data),
        Some(sep) => {
            let mut out = String::with_capacity(data.len() * 3);
            for (idx, b) in data.iter().enumerate() {
                if idx != 0 {
                    out.push(sep);
                }
                out.push_str(&format!("{:02X}", b));
            }
            out
        }
    }
}
