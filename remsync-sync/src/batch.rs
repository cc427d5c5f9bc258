//! Order-preserving, size-bounded chunking of a plan.

use serde::Serialize;

use remsync_core::{ConfigError, Operation, RecordId};

/// A contiguous, non-empty run of operations submitted together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Batch {
    index: usize,
    first: RecordId,
    last: RecordId,
    operations: Vec<Operation>,
}

impl Batch {
    /// Zero-based position of this batch in the run.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn into_operations(self) -> Vec<Operation> {
        self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Never true for a batch built by [`batch`].
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Identity of the first operation.
    pub fn first_id(&self) -> &RecordId {
        &self.first
    }

    /// Identity of the last operation.
    pub fn last_id(&self) -> &RecordId {
        &self.last
    }
}

/// Split `operations` into contiguous batches of at most `max_batch_size`.
///
/// Concatenating the returned batches yields `operations` unchanged.
pub fn batch(operations: Vec<Operation>, max_batch_size: usize) -> Result<Vec<Batch>, ConfigError> {
    if max_batch_size == 0 {
        return Err(ConfigError::InvalidBatchSize(0));
    }

    let mut batches = Vec::with_capacity(operations.len().div_ceil(max_batch_size));
    for chunk in operations.chunks(max_batch_size) {
        let (Some(first), Some(last)) = (chunk.first(), chunk.last()) else {
            continue;
        };
        batches.push(Batch {
            index: batches.len(),
            first: first.id().clone(),
            last: last.id().clone(),
            operations: chunk.to_vec(),
        });
    }
    Ok(batches)
}
