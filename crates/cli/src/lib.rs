//! binlog-cleaner command-line support
//!
//! Configuration, credentials, locking, logging and run orchestration for
//! the `binlog-cleaner` binary.

pub mod config;
pub mod credentials;
pub mod display;
pub mod locks;
pub mod logging;
pub mod run;
pub mod util;
