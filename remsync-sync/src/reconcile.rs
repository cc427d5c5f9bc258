//! Diff engine: the minimal ordered plan that turns `destination` into `source`.
//!
//! ## Algorithm
//!
//! 1. In source only → `Create`.
//! 2. In both and unequal (metadata ignored) → `Update` with the source record.
//! 3. In destination only → `Delete`.
//! 4. Sort by (identity, kind).
//!
//! Written records never carry server metadata fields.

use serde::Serialize;

use remsync_core::{Operation, OperationKind, RecordSet};

/// Compute the ordered operations that reconcile `destination` with `source`.
///
/// Pure. Returns an empty plan iff both sets are equal under the record
/// comparison rule.
pub fn reconcile(source: &RecordSet, destination: &RecordSet) -> Vec<Operation> {
    let mut operations = Vec::new();

    for record in source {
        match destination.get(record.id()) {
            None => operations.push(Operation::Create(record.without_metadata())),
            Some(existing) if existing != record => {
                tracing::debug!("changed: {}", record.id());
                operations.push(Operation::Update(record.without_metadata()));
            }
            Some(_) => tracing::trace!("unchanged: {}", record.id()),
        }
    }

    for id in destination.ids() {
        if !source.contains(id) {
            operations.push(Operation::Delete(id.clone()));
        }
    }

    operations.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    operations
}

/// Per-kind operation counts of a plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    pub creates: usize,
    pub updates: usize,
    pub deletes: usize,
}

impl PlanSummary {
    pub fn of(operations: &[Operation]) -> Self {
        operations
            .iter()
            .fold(PlanSummary::default(), |mut summary, op| {
                match op.kind() {
                    OperationKind::Create => summary.creates += 1,
                    OperationKind::Update => summary.updates += 1,
                    OperationKind::Delete => summary.deletes += 1,
                }
                summary
            })
    }

    pub fn total(&self) -> usize {
        self.creates + self.updates + self.deletes
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}
