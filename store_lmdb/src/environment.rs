//! LMDB environment setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use crate::meta::MetaDatabase;
use crate::migration::Migrator;
use crate::{LmdbError, LmdbKeyStore, LmdbMetaStore};

/// Named database holding fingerprint → DER entries.
const TRUSTED_CERTS_DB: &str = "trusted_certs";
/// Named database holding schema bookkeeping.
const META_DB: &str = "meta";

/// Default LMDB map size: 16 MiB is far more than any realistic trust store.
pub const DEFAULT_MAP_SIZE: usize = 16 * 1024 * 1024;

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    pub(crate) env: Arc<Env>,
    path: PathBuf,
    pub(crate) trusted_certs_db: Database<Bytes, Bytes>,
    pub(crate) meta_db: MetaDatabase,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given directory, creating the
    /// directory when missing, and bring its schema up to date.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;

        // SAFETY: the environment is opened once per directory by this process
        // and never memory-mapped twice with different options.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(2)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let trusted_certs_db: Database<Bytes, Bytes> =
            env.create_database(&mut wtxn, Some(TRUSTED_CERTS_DB))?;
        let meta_db: MetaDatabase = env.create_database(&mut wtxn, Some(META_DB))?;
        wtxn.commit()?;

        let environment = Self {
            env: Arc::new(env),
            path: path.to_path_buf(),
            trusted_certs_db,
            meta_db,
        };

        Migrator::run(&environment)?;
        tracing::debug!(path = %path.display(), "opened LMDB key store");
        Ok(environment)
    }

    /// Directory the environment lives in.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Key store view over the trusted-certificates database.
    pub fn key_store(&self) -> LmdbKeyStore {
        LmdbKeyStore {
            env: Arc::clone(&self.env),
            trusted_certs_db: self.trusted_certs_db,
        }
    }

    /// Metadata view over the meta database.
    pub fn meta_store(&self) -> LmdbMetaStore {
        LmdbMetaStore {
            env: Arc::clone(&self.env),
            meta_db: self.meta_db,
        }
    }
}
