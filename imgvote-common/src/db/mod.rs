//! Database bootstrap and shared queries

pub mod catalog;
pub mod init;
pub mod migrations;
pub mod models;
pub mod partition;

pub use init::*;
pub use migrations::*;
pub use models::*;
