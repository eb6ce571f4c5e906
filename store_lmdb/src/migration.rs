//! Key store schema migrations.
//!
//! The schema version lives in the meta database. Opening an environment
//! walks every step between the stored and the current version, then stamps
//! the current version.
//!
//! | version | layout |
//! |---|---|
//! | 0 | unstamped; keys may be hex in either case |
//! | 1 | keys are upper-case SHA-512 hex, values raw DER |

use heed::RwTxn;

use trustgate_store::MetaStore;

use crate::{LmdbEnvironment, LmdbError};

/// The schema version written by this code.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

pub struct Migrator;

impl Migrator {
    /// Bring `env` up to [`CURRENT_SCHEMA_VERSION`].
    ///
    /// A store stamped with a newer version was written by a newer release
    /// and is refused rather than rewritten.
    pub fn run(env: &LmdbEnvironment) -> Result<(), LmdbError> {
        let meta = env.meta_store();
        let stored = meta.schema_version()?;

        if stored > CURRENT_SCHEMA_VERSION {
            return Err(LmdbError::SchemaTooNew {
                found: stored,
                supported: CURRENT_SCHEMA_VERSION,
            });
        }
        if stored == CURRENT_SCHEMA_VERSION {
            tracing::debug!(version = stored, "key store schema is up to date");
            return Ok(());
        }

        let mut wtxn = env.env.write_txn()?;
        for from in stored..CURRENT_SCHEMA_VERSION {
            tracing::info!(from, to = from + 1, "migrating key store");
            migrate(env, &mut wtxn, from)?;
        }
        wtxn.commit()?;

        meta.set_schema_version(CURRENT_SCHEMA_VERSION)?;
        Ok(())
    }
}

fn migrate(env: &LmdbEnvironment, wtxn: &mut RwTxn<'_>, from: u32) -> Result<(), LmdbError> {
    match from {
        0 => upper_case_keys(env, wtxn),
        _ => Err(LmdbError::UnknownMigration { from, to: from + 1 }),
    }
}

/// Rewrite every key that is not already upper case.
fn upper_case_keys(env: &LmdbEnvironment, wtxn: &mut RwTxn<'_>) -> Result<(), LmdbError> {
    let db = env.trusted_certs_db;
    let mut renamed = Vec::new();
    for entry in db.iter(wtxn)? {
        let (key, der) = entry?;
        let upper = key.to_ascii_uppercase();
        if upper != key {
            renamed.push((key.to_vec(), upper, der.to_vec()));
        }
    }

    for (old, new, der) in &renamed {
        db.delete(wtxn, old)?;
        db.put(wtxn, new, der)?;
    }
    if !renamed.is_empty() {
        tracing::info!(count = renamed.len(), "normalised key store entries to upper-case keys");
    }
    Ok(())
}
