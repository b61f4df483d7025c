//! Shared foundation for OpenBookManager services
//!
//! Provides the error taxonomy, configuration resolution, database
//! initialization, and entity models used by obm-api.

pub mod config;
pub mod db;
pub mod error;

pub use error::{DuplicateKind, Error, ExistingBook, Result};
