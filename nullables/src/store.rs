//! Nullable store: thread-safe in-memory storage for testing.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tribunal_store::{CaseStore, StoreError, WriteBatch, WriteOp};
use tribunal_types::{CaseId, ParticipantId};

#[derive(Clone, Default)]
struct Tables {
    cases: BTreeMap<CaseId, Vec<u8>>,
    accounts: BTreeMap<ParticipantId, Vec<u8>>,
    reserve: u128,
    meta: BTreeMap<String, Vec<u8>>,
}

/// An in-memory case store.
///
/// Commits apply to a copy of the tables which replaces the live tables only
/// when every write succeeded. [`NullStore::fail_commits`] makes every
/// commit fail without touching anything.
#[derive(Default)]
pub struct NullStore {
    tables: Mutex<Tables>,
    fail: AtomicBool,
    commits: AtomicUsize,
}

impl NullStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_commits(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Number of successful commits.
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn case_count(&self) -> usize {
        self.tables.lock().unwrap().cases.len()
    }

    pub fn account_count(&self) -> usize {
        self.tables.lock().unwrap().accounts.len()
    }
}

impl CaseStore for NullStore {
    fn get_case(&self, id: CaseId) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.tables.lock().unwrap().cases.get(&id).cloned())
    }

    fn iter_cases(&self) -> Result<Vec<(CaseId, Vec<u8>)>, StoreError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .cases
            .iter()
            .map(|(id, bytes)| (*id, bytes.clone()))
            .collect())
    }

    fn get_account(&self, id: &ParticipantId) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.tables.lock().unwrap().accounts.get(id).cloned())
    }

    fn iter_accounts(&self) -> Result<Vec<Vec<u8>>, StoreError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .accounts
            .values()
            .cloned()
            .collect())
    }

    fn get_reserve(&self) -> Result<u128, StoreError> {
        Ok(self.tables.lock().unwrap().reserve)
    }

    fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.tables.lock().unwrap().meta.get(key).cloned())
    }

    fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("commit failure injected".into()));
        }
        let mut tables = self.tables.lock().unwrap();
        let mut next = tables.clone();
        for op in batch.into_ops() {
            match op {
                WriteOp::PutCase { id, bytes } => {
                    next.cases.insert(id, bytes);
                }
                WriteOp::PutAccount { id, bytes } => {
                    next.accounts.insert(id, bytes);
                }
                WriteOp::PutReserve(reserve) => next.reserve = reserve,
                WriteOp::PutMeta { key, bytes } => {
                    next.meta.insert(key, bytes);
                }
            }
        }
        *tables = next;
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_applies_all_or_nothing() {
        let store = NullStore::new();
        let mut batch = WriteBatch::new();
        batch.put_case(CaseId::new(1), vec![1]);
        batch.put_reserve(42);
        store.commit(batch.clone()).unwrap();
        assert_eq!(store.get_case(CaseId::new(1)).unwrap(), Some(vec![1]));
        assert_eq!(store.get_reserve().unwrap(), 42);

        store.fail_commits(true);
        batch.put_meta("k", vec![9]);
        assert!(store.commit(batch).is_err());
        assert_eq!(store.get_meta("k").unwrap(), None);
        assert_eq!(store.commit_count(), 1);
    }
}
