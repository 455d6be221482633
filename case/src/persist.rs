//! Encoding engine state into store rows and rebuilding it on startup.
//!
//! Case files and ledger rows are bincode-encoded. Only rows touched since
//! the previous flush are written; the whole flush is one [`WriteBatch`].

use crate::engine::CaseEngine;
use crate::error::CaseError;
use crate::file::CaseFile;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tribunal_ledger::Account;
use tribunal_store::{CaseStore, StoreError, WriteBatch, SCHEMA_VERSION};
use tribunal_types::CaseParams;

pub const META_NEXT_CASE_ID: &str = "next_case_id";
pub const META_SCHEMA_VERSION: &str = "schema_version";

pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    bincode::serialize(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
    bincode::deserialize(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Drain the engine's change tracking into a batch.
pub fn collect_writes(engine: &mut CaseEngine) -> Result<WriteBatch, CaseError> {
    let mut batch = WriteBatch::new();
    for file in engine.take_dirty_cases() {
        batch.put_case(file.case.id, encode(&file)?);
    }
    let changes = engine.take_ledger_changes();
    for row in &changes.accounts {
        batch.put_account(&row.id, encode(row)?);
    }
    if let Some(reserve) = changes.reserve {
        batch.put_reserve(reserve);
    }
    if let Some(next) = engine.take_meta_changes() {
        batch.put_meta(META_NEXT_CASE_ID, encode(&next)?);
        batch.put_meta(META_SCHEMA_VERSION, encode(&SCHEMA_VERSION)?);
    }
    Ok(batch)
}

/// Rebuild an engine from everything in `store`.
pub fn load_engine(store: &dyn CaseStore, params: CaseParams) -> Result<CaseEngine, CaseError> {
    if let Some(bytes) = store.get_meta(META_SCHEMA_VERSION)? {
        let version: u32 = decode(&bytes)?;
        if version != SCHEMA_VERSION {
            return Err(StoreError::Corruption(format!(
                "schema version {version}, expected {SCHEMA_VERSION}"
            ))
            .into());
        }
    }

    let mut files = Vec::new();
    for (id, bytes) in store.iter_cases()? {
        let file: CaseFile = decode(&bytes)?;
        if file.case.id != id {
            return Err(StoreError::Corruption(format!("row {id} holds {}", file.case.id)).into());
        }
        files.push(file);
    }
    let accounts = store
        .iter_accounts()?
        .iter()
        .map(|bytes| decode::<Account>(bytes))
        .collect::<Result<Vec<_>, _>>()?;
    let reserve = store.get_reserve()?;
    let next_case_id = match store.get_meta(META_NEXT_CASE_ID)? {
        Some(bytes) => decode(&bytes)?,
        None => 1,
    };

    CaseEngine::restore(params, files, accounts, reserve, next_case_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Complaint;
    use std::collections::BTreeSet;
    use tribunal_store::WriteOp;
    use tribunal_types::{ParticipantId, RiskTier, Role, Timestamp};

    #[test]
    fn writes_cover_touched_rows_only() {
        let mut engine = CaseEngine::new(CaseParams::default()).unwrap();
        engine
            .register_participant(ParticipantId::new("alice"), Role::Complainant, 0)
            .unwrap();
        engine
            .register_participant(ParticipantId::new("acme"), Role::Enterprise, 0)
            .unwrap();
        let first = collect_writes(&mut engine).unwrap();
        assert_eq!(first.len(), 2);
        assert!(collect_writes(&mut engine).unwrap().is_empty());

        engine
            .deposit(&ParticipantId::new("alice"), 500, Timestamp::new(1))
            .unwrap();
        let second = collect_writes(&mut engine).unwrap();
        let keys: BTreeSet<String> = second
            .ops()
            .iter()
            .map(|op| match op {
                WriteOp::PutAccount { id, .. } => id.as_str().to_string(),
                other => format!("{other:?}"),
            })
            .collect();
        assert_eq!(keys, BTreeSet::from(["alice".to_string()]));
    }

    #[test]
    fn case_file_encoding_is_stable() {
        let mut engine = CaseEngine::new(CaseParams::default()).unwrap();
        for (id, role) in [("alice", Role::Complainant), ("acme", Role::Enterprise)] {
            engine
                .register_participant(ParticipantId::new(id), role, 0)
                .unwrap();
            engine
                .deposit(&ParticipantId::new(id), 10_000, Timestamp::new(0))
                .unwrap();
        }
        struct Open;
        impl crate::AccessControl for Open {
            fn can_complain(&self, _: &ParticipantId) -> bool {
                true
            }
            fn is_registered_respondent(&self, _: &ParticipantId) -> bool {
                true
            }
            fn can_vote(&self, _: &ParticipantId) -> bool {
                true
            }
            fn trust_score(&self, _: &ParticipantId) -> u32 {
                0
            }
        }
        let id = engine
            .file_complaint(
                Complaint {
                    complainant: ParticipantId::new("alice"),
                    respondent: ParticipantId::new("acme"),
                    description: "late delivery".into(),
                    evidence_count: 2,
                },
                RiskTier::Medium,
                &Open,
                Timestamp::new(5),
            )
            .unwrap();
        let file = engine.case_file(id).unwrap().clone();
        let decoded: CaseFile = decode(&encode(&file).unwrap()).unwrap();
        assert_eq!(decoded, file);
        assert!(matches!(
            decode::<CaseFile>(&[1, 2, 3]),
            Err(StoreError::Serialization(_))
        ));
    }
}
