//! Logging utilities.
//!
//! Library code logs through the `log` facade only. Binaries install the
//! `env_logger` backend once with [`init_logging`].

mod init;

pub use init::{init_logging, LoggingConfig};
