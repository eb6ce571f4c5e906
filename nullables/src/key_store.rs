//! Nullable key store: thread-safe in-memory persistence for testing.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use trustgate_store::{CertificateMap, KeyStore, StoreError};

/// An in-memory key store for testing.
///
/// Clones share the same backing map, so dropping a trust store and building
/// a new one from a clone simulates a process restart. Loads and saves can be
/// made to fail to exercise error paths.
#[derive(Clone, Default)]
pub struct NullKeyStore {
    entries: Arc<Mutex<CertificateMap>>,
    fail_loads: Arc<AtomicBool>,
    fail_saves: Arc<AtomicBool>,
    saves: Arc<AtomicUsize>,
}

impl NullKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-filled with `entries`.
    pub fn with_entries(entries: CertificateMap) -> Self {
        let store = Self::new();
        *store.entries.lock().unwrap() = entries;
        store
    }

    /// Make every subsequent `load` fail.
    pub fn fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `save` fail without touching the contents.
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Snapshot of what is currently "on disk".
    pub fn entries(&self) -> CertificateMap {
        self.entries.lock().unwrap().clone()
    }
}

impl KeyStore for NullKeyStore {
    fn load(&self) -> Result<CertificateMap, StoreError> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("simulated load failure".into()));
        }
        Ok(self.entries.lock().unwrap().clone())
    }

    fn save(&self, entries: &CertificateMap) -> Result<(), StoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("simulated save failure".into()));
        }
        *self.entries.lock().unwrap() = entries.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
