//! In-memory source and destination for pipeline tests.

#![allow(dead_code)]

use std::cell::RefCell;

use remsync_core::{Operation, Record, RecordSet, TransportError};
use remsync_sync::{Batch, BatchReceipt, Destination, RecordSource};
use serde_json::Value;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn records(values: Vec<Value>) -> Vec<Record> {
    values
        .into_iter()
        .map(|v| Record::from_value(v).expect("record"))
        .collect()
}

pub struct FakeSource {
    pub records: Result<Vec<Record>, TransportError>,
}

impl FakeSource {
    pub fn with(values: Vec<Value>) -> Self {
        Self {
            records: Ok(records(values)),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            records: Err(TransportError::new(message)),
        }
    }
}

impl RecordSource for FakeSource {
    fn label(&self) -> &str {
        "fake-source"
    }

    fn fetch_records(&self) -> Result<Vec<Record>, TransportError> {
        self.records.clone()
    }
}

/// Applies submitted batches to an in-memory collection.
pub struct FakeDestination {
    pub collection: RefCell<RecordSet>,
    pub fetch_error: Option<TransportError>,
    /// Batch indexes that fail with the given error instead of applying.
    pub failing_batches: Vec<(usize, TransportError)>,
    pub review_error: Option<TransportError>,
    pub submitted: RefCell<Vec<usize>>,
    pub reviews: RefCell<Vec<String>>,
    pub approvals: RefCell<usize>,
}

impl FakeDestination {
    pub fn with(values: Vec<Value>) -> Self {
        Self {
            collection: RefCell::new(RecordSet::from_records(records(values)).expect("set")),
            fetch_error: None,
            failing_batches: Vec::new(),
            review_error: None,
            submitted: RefCell::new(Vec::new()),
            reviews: RefCell::new(Vec::new()),
            approvals: RefCell::new(0),
        }
    }

    pub fn snapshot(&self) -> RecordSet {
        self.collection.borrow().clone()
    }

    pub fn wrote_anything(&self) -> bool {
        !self.submitted.borrow().is_empty()
    }
}

impl Destination for FakeDestination {
    fn fetch_records(&self) -> Result<Vec<Record>, TransportError> {
        if let Some(err) = &self.fetch_error {
            return Err(err.clone());
        }
        Ok(self.collection.borrow().iter().cloned().collect())
    }

    fn submit_batch(&self, batch: &Batch) -> Result<BatchReceipt, TransportError> {
        self.submitted.borrow_mut().push(batch.index());
        if let Some((_, err)) = self
            .failing_batches
            .iter()
            .find(|(index, _)| *index == batch.index())
        {
            return Err(err.clone());
        }
        let applied = self.collection.borrow().apply(batch.operations());
        *self.collection.borrow_mut() = applied;
        let status = if batch
            .operations()
            .iter()
            .any(|op| matches!(op, Operation::Create(_)))
        {
            201
        } else {
            200
        };
        Ok(BatchReceipt { status })
    }

    fn request_review(&self, message: &str) -> Result<(), TransportError> {
        self.reviews.borrow_mut().push(message.to_string());
        match &self.review_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn approve_changes(&self) -> Result<(), TransportError> {
        *self.approvals.borrow_mut() += 1;
        Ok(())
    }
}
