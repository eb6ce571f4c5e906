#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // PEM or DER input must either load or fail cleanly.
    let Ok(certs) = trustgate_tls::load_certificates(data) else {
        return;
    };
    assert!(!certs.is_empty(), "a successful load yields at least one certificate");

    for cert in &certs {
        let fp = trustgate_crypto::fingerprint(cert);
        assert_eq!(fp.to_hex().len(), 128);
        let _ = trustgate_crypto::display_fingerprint(cert);
    }
});
