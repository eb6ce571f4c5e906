#![no_main]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use trustgate_manager::TrustStore;
use trustgate_store::{CertificateMap, KeyStore, StoreError};
use trustgate_types::Certificate;

#[derive(Debug, Arbitrary)]
struct Input {
    entries: BTreeMap<String, Vec<u8>>,
    // Stored under their real fingerprint, so these always survive loading.
    valid: Vec<Vec<u8>>,
}

struct FuzzKeyStore(Mutex<CertificateMap>);

impl KeyStore for FuzzKeyStore {
    fn load(&self) -> Result<CertificateMap, StoreError> {
        Ok(self.0.lock().unwrap().clone())
    }

    fn save(&self, entries: &CertificateMap) -> Result<(), StoreError> {
        *self.0.lock().unwrap() = entries.clone();
        Ok(())
    }
}

fuzz_target!(|input: Input| {
    let mut entries = input.entries;
    for der in &input.valid {
        let cert = Certificate::from_der(der.clone());
        entries.insert(trustgate_crypto::fingerprint(&cert).to_hex(), der.clone());
    }

    // Arbitrary stored entries never panic the loader.
    let store = TrustStore::new(Arc::new(FuzzKeyStore(Mutex::new(entries))));
    for cert in store.trusted_certificates() {
        assert!(store.is_user_trusted(&cert));
    }
    for der in &input.valid {
        assert!(store.is_user_trusted(&Certificate::from_der(der.clone())));
    }
});
