//! Helpers shared by this crate's unit tests.

use std::sync::Mutex;

use trustgate_store::{CertificateMap, KeyStore, StoreError};

/// Minimal key store; the full-featured double lives in trustgate-nullables.
#[derive(Default)]
pub(crate) struct MapKeyStore(pub(crate) Mutex<CertificateMap>);

impl KeyStore for MapKeyStore {
    fn load(&self) -> Result<CertificateMap, StoreError> {
        Ok(self.0.lock().unwrap().clone())
    }

    fn save(&self, entries: &CertificateMap) -> Result<(), StoreError> {
        *self.0.lock().unwrap() = entries.clone();
        Ok(())
    }
}
