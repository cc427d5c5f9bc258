//! # remsync-remote
//!
//! Implementations of the sync seams:
//! - [`client::RemoteSettingsClient`]: Kinto HTTP API over `ureq`
//! - [`source::GitSource`] / [`source::DirectorySource`]: prompt records
//!   from a git checkout

pub mod client;
pub mod error;
pub mod source;

pub use client::{RemoteSettingsClient, ServerInfo};
pub use error::RemoteError;
pub use source::{DirectorySource, GitSource};
