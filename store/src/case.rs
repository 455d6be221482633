//! Case and ledger storage trait.

use crate::batch::WriteBatch;
use crate::StoreError;
use tribunal_types::{CaseId, ParticipantId};

/// Current on-disk encoding version, stored under the `schema_version` meta key.
pub const SCHEMA_VERSION: u32 = 1;

/// Trait for storing case files, ledger rows and the reserve.
///
/// Readers return `Ok(None)` for a missing key. Writes only happen through
/// [`CaseStore::commit`], which must be atomic.
pub trait CaseStore: Send + Sync {
    /// Get an encoded case file.
    fn get_case(&self, id: CaseId) -> Result<Option<Vec<u8>>, StoreError>;

    /// All encoded case files, ordered by case id.
    fn iter_cases(&self) -> Result<Vec<(CaseId, Vec<u8>)>, StoreError>;

    /// Get an encoded ledger row.
    fn get_account(&self, id: &ParticipantId) -> Result<Option<Vec<u8>>, StoreError>;

    /// All encoded ledger rows.
    fn iter_accounts(&self) -> Result<Vec<Vec<u8>>, StoreError>;

    /// The reserve pool balance (0 if never written).
    fn get_reserve(&self) -> Result<u128, StoreError>;

    /// Retrieve a metadata value.
    fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Apply every write of `batch`, or none.
    fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;
}
