//! Database access and schema for OpenBookManager

pub mod init;
pub mod models;

pub use init::*;
pub use models::*;
