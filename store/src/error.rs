use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key store backend error: {0}")]
    Backend(String),

    #[error("invalid key store entry '{alias}': {reason}")]
    InvalidEntry { alias: String, reason: String },

    #[error("key store schema version {found} is newer than supported version {supported}")]
    UnsupportedSchema { found: u32, supported: u32 },
}
