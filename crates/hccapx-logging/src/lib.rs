#![deny(unsafe_op_in_unsafe_fn)]
//! Tracing initialisation for the hccapx tools.

pub mod config;
pub mod init;
pub mod targets;

pub use config::LoggingConfig;
pub use init::{init, set_level, LoggingGuards};
