//! LMDB implementation of KeyStore.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use trustgate_store::{CertificateMap, KeyStore, StoreError};

use crate::LmdbError;

pub struct LmdbKeyStore {
    pub(crate) env: Arc<Env>,
    pub(crate) trusted_certs_db: Database<Bytes, Bytes>,
}

impl KeyStore for LmdbKeyStore {
    fn load(&self) -> Result<CertificateMap, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self
            .trusted_certs_db
            .iter(&rtxn)
            .map_err(LmdbError::from)?;
        let mut entries = CertificateMap::new();
        for entry in iter {
            let (key, val) = entry.map_err(LmdbError::from)?;
            let alias = std::str::from_utf8(key).map_err(|_| LmdbError::InvalidKey {
                alias: String::from_utf8_lossy(key).into_owned(),
            })?;
            entries.insert(alias.to_string(), val.to_vec());
        }
        Ok(entries)
    }

    fn save(&self, entries: &CertificateMap) -> Result<(), StoreError> {
        // One write transaction: readers see either the old or the new set.
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.trusted_certs_db
            .clear(&mut wtxn)
            .map_err(LmdbError::from)?;
        for (alias, der) in entries {
            self.trusted_certs_db
                .put(&mut wtxn, alias.as_bytes(), der.as_slice())
                .map_err(LmdbError::from)?;
        }
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}
