//! Logging setup.
//!
//! Everything in the engine logs through the `log` facade; this module only
//! owns the one-time `env_logger` initialization used by binaries.

mod init;

pub use init::{init_logging, LoggingConfig};
