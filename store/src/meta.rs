//! Key store bookkeeping.

use crate::StoreError;

/// Schema version of a persistent key store. A store that was never stamped
/// reports 0.
pub trait MetaStore {
    fn schema_version(&self) -> Result<u32, StoreError>;

    fn set_schema_version(&self, version: u32) -> Result<(), StoreError>;
}
