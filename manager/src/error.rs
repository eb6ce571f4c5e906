use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("config error: {0}")]
    Config(String),

    #[error("LMDB error: {0}")]
    Lmdb(#[from] trustgate_store_lmdb::LmdbError),
}
