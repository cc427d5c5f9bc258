//! remsync core library: record types, configuration, errors.
//!
//! - [`types`]: records, record sets, operations
//! - [`error`]: [`RecordError`], [`ConfigError`], [`TransportError`]
//! - [`config`]: layered [`SyncConfig`] loading

pub mod config;
pub mod error;
pub mod types;

pub use config::{Environment, SyncConfig};
pub use error::{ConfigError, RecordError, TransportError};
pub use types::{Operation, OperationKind, Record, RecordId, RecordSet};
