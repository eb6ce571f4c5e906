use thiserror::Error;

use trustgate_store::StoreError;

#[derive(Debug, Error)]
pub enum LmdbError {
    #[error("LMDB error: {0}")]
    Heed(String),

    #[error("key '{alias}' is not valid UTF-8")]
    InvalidKey { alias: String },

    #[error("key store schema version {found} is newer than supported version {supported}")]
    SchemaTooNew { found: u32, supported: u32 },

    #[error("no migration from schema version {from} to {to}")]
    UnknownMigration { from: u32, to: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<heed::Error> for LmdbError {
    fn from(e: heed::Error) -> Self {
        LmdbError::Heed(e.to_string())
    }
}

impl From<StoreError> for LmdbError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::UnsupportedSchema { found, supported } => {
                LmdbError::SchemaTooNew { found, supported }
            }
            other => LmdbError::Heed(other.to_string()),
        }
    }
}

impl From<LmdbError> for StoreError {
    fn from(e: LmdbError) -> Self {
        match e {
            LmdbError::InvalidKey { alias } => StoreError::InvalidEntry {
                alias,
                reason: "key is not valid UTF-8".to_string(),
            },
            LmdbError::SchemaTooNew { found, supported } => {
                StoreError::UnsupportedSchema { found, supported }
            }
            other => StoreError::Backend(other.to_string()),
        }
    }
}
