//! Shared configuration for Ducket.
//!
//! This crate provides the settings surface consumed by the other crates:
//! - Flat storage settings as they appear in files and environment variables
//! - Logging settings for the binaries
//! - Layered loading from `config/` files and `DUCKET__*` variables

pub mod config;

pub use self::config::{AppConfig, LogConfig, StorageSettings};
