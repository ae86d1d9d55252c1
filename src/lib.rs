//! Keep many git checkouts in view: a concurrent, aligned status summary of
//! every registered repository, and delegation of commands to some or all
//! of them.

pub mod config;
pub mod discovery;
pub mod dispatch;
pub mod error;
pub mod inspector;
pub mod logger;
pub mod registry;
pub mod render;
pub mod repo_status;
pub mod summary;
