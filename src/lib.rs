#![forbid(unsafe_code)]

//! Supervise a long-running worker process over a line-delimited JSON
//! control protocol on its standard streams.

pub mod config;
pub mod discovery;
pub mod errors;
pub mod interaction;
pub mod protocol;
pub mod secrets;
pub mod sink;
pub mod supervisor;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
pub use supervisor::Supervisor;
