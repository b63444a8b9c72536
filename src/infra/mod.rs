//! Infrastructure layer: config, logging, storage paths and credentials.

pub mod config;
pub mod error;
pub mod logging;
pub mod secrets;
pub mod storage_layout;
