//! User trust decisions: persisted trust, session-scoped distrust.
//!
//! Trusted certificates are written through a [`KeyStore`] after every
//! change; distrusted certificates live only in memory and are forgotten on
//! restart or [`TrustStore::clear_all_decisions`]. The two sets never share a
//! fingerprint.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use trustgate_crypto::fingerprint;
use trustgate_store::{CertificateMap, KeyStore};
use trustgate_types::{Certificate, Fingerprint, TrustError, TrustRecord};

#[derive(Default)]
struct TrustState {
    trusted: HashMap<Fingerprint, Certificate>,
    distrusted: HashMap<Fingerprint, Certificate>,
}

/// Store of user (dis)trust decisions.
///
/// Readers run concurrently; mutations are serialized by the write lock,
/// which is held until the key store has been written so no reader observes
/// a state that is still being persisted.
pub struct TrustStore {
    key_store: Arc<dyn KeyStore>,
    state: RwLock<TrustState>,
}

impl TrustStore {
    /// Create a store backed by `key_store`, loading previously trusted
    /// certificates from it.
    ///
    /// A key store that cannot be read is logged and treated as empty.
    pub fn new(key_store: Arc<dyn KeyStore>) -> Self {
        let trusted = load_trusted(key_store.as_ref());
        Self {
            key_store,
            state: RwLock::new(TrustState {
                trusted,
                distrusted: HashMap::new(),
            }),
        }
    }

    /// Whether the certificate has been explicitly accepted by the user.
    pub fn is_user_trusted(&self, cert: &Certificate) -> bool {
        let fp = fingerprint(cert);
        self.read().trusted.contains_key(&fp)
    }

    /// Whether the certificate has been explicitly rejected in this session.
    pub fn is_user_distrusted(&self, cert: &Certificate) -> bool {
        let fp = fingerprint(cert);
        self.read().distrusted.contains_key(&fp)
    }

    /// The single record currently held for `cert`.
    pub fn record(&self, cert: &Certificate) -> TrustRecord {
        let fp = fingerprint(cert);
        let state = self.read();
        if state.trusted.contains_key(&fp) {
            TrustRecord::UserTrusted
        } else if state.distrusted.contains_key(&fp) {
            TrustRecord::UserDistrusted
        } else {
            TrustRecord::Unknown
        }
    }

    /// Mark `cert` as trusted. Persistence failures are logged; the decision
    /// still holds for this process.
    pub fn set_trusted(&self, cert: &Certificate) {
        let _ = self.try_set_trusted(cert);
    }

    /// Mark `cert` as trusted, reporting whether the key store was written.
    ///
    /// The in-memory decision takes effect even when this returns
    /// [`TrustError::StorePersistenceFailure`]; calling again retries the write.
    pub fn try_set_trusted(&self, cert: &Certificate) -> Result<(), TrustError> {
        let fp = fingerprint(cert);
        let mut state = self.write();
        tracing::info!(fingerprint = %fp.short(), "trusted by user");

        state.distrusted.remove(&fp);
        state.trusted.insert(fp, cert.clone());
        self.persist(&state)
    }

    /// Mark `cert` as distrusted for the rest of the session.
    pub fn set_distrusted(&self, cert: &Certificate) {
        let _ = self.try_set_distrusted(cert);
    }

    /// Mark `cert` as distrusted, reporting whether removing a previous trust
    /// decision could be persisted.
    pub fn try_set_distrusted(&self, cert: &Certificate) -> Result<(), TrustError> {
        let fp = fingerprint(cert);
        let mut state = self.write();
        tracing::info!(fingerprint = %fp.short(), "distrusted by user");

        let removed = state.trusted.remove(&fp).is_some();
        state.distrusted.insert(fp, cert.clone());
        if removed {
            self.persist(&state)
        } else {
            Ok(())
        }
    }

    /// Forget every trust and distrust decision.
    pub fn clear_all_decisions(&self) {
        let _ = self.try_clear_all_decisions();
    }

    /// Forget every decision, reporting whether the empty set was persisted.
    pub fn try_clear_all_decisions(&self) -> Result<(), TrustError> {
        let mut state = self.write();
        tracing::info!(
            trusted = state.trusted.len(),
            distrusted = state.distrusted.len(),
            "clearing user-(dis)trusted certificates"
        );

        state.trusted.clear();
        state.distrusted.clear();
        self.persist(&state)
    }

    /// Snapshot of all user-trusted certificates, ordered by fingerprint.
    pub fn trusted_certificates(&self) -> Vec<Certificate> {
        let state = self.read();
        let mut entries: Vec<_> = state.trusted.iter().collect();
        entries.sort_by_key(|(fp, _)| **fp);
        entries.into_iter().map(|(_, cert)| cert.clone()).collect()
    }

    pub fn trusted_count(&self) -> usize {
        self.read().trusted.len()
    }

    pub fn distrusted_count(&self) -> usize {
        self.read().distrusted.len()
    }

    fn persist(&self, state: &TrustState) -> Result<(), TrustError> {
        let entries: CertificateMap = state
            .trusted
            .iter()
            .map(|(fp, cert)| (fp.to_hex(), cert.as_der().to_vec()))
            .collect();

        self.key_store.save(&entries).map_err(|e| {
            tracing::error!(error = %e, "couldn't save trusted certificates");
            TrustError::StorePersistenceFailure(e.to_string())
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, TrustState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, TrustState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn load_trusted(key_store: &dyn KeyStore) -> HashMap<Fingerprint, Certificate> {
    let entries = match key_store.load() {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(error = %e, "couldn't load trusted certificates, starting empty");
            return HashMap::new();
        }
    };

    let mut trusted = HashMap::with_capacity(entries.len());
    for (alias, der) in entries {
        let cert = Certificate::from_der(der);
        let fp = fingerprint(&cert);
        if !alias.eq_ignore_ascii_case(&fp.to_hex()) {
            tracing::warn!(%alias, "dropping key store entry whose key does not match its certificate");
            continue;
        }
        trusted.insert(fp, cert);
    }
    tracing::debug!(count = trusted.len(), "loaded trusted certificate(s)");
    trusted
}
