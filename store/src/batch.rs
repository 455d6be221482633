//! Write batching: groups store writes into one atomic commit.
//!
//! # Usage
//!
//! ```ignore
//! let mut batch = WriteBatch::new();
//! batch.put_case(case_id, case_bytes);
//! batch.put_account(&participant, row_bytes);
//! batch.put_reserve(reserve);
//! store.commit(batch)?;
//! ```
//!
//! A backend applies every operation of a batch or none of them.

use tribunal_types::{CaseId, ParticipantId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WriteOp {
    PutCase { id: CaseId, bytes: Vec<u8> },
    PutAccount { id: ParticipantId, bytes: Vec<u8> },
    PutReserve(u128),
    PutMeta { key: String, bytes: Vec<u8> },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_case(&mut self, id: CaseId, bytes: Vec<u8>) {
        self.ops.push(WriteOp::PutCase { id, bytes });
    }

    pub fn put_account(&mut self, id: &ParticipantId, bytes: Vec<u8>) {
        self.ops.push(WriteOp::PutAccount {
            id: id.clone(),
            bytes,
        });
    }

    pub fn put_reserve(&mut self, reserve: u128) {
        self.ops.push(WriteOp::PutReserve(reserve));
    }

    pub fn put_meta(&mut self, key: &str, bytes: Vec<u8>) {
        self.ops.push(WriteOp::PutMeta {
            key: key.to_string(),
            bytes,
        });
    }

    /// Move every op of `other` to the end of this batch.
    pub fn append(&mut self, other: WriteBatch) {
        self.ops.extend(other.ops);
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}
