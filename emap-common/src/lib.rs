//! # Emergency Map Common Library
//!
//! Shared code for the emergency map services:
//! - Common error type
//! - Bootstrap TOML configuration and its resolution order
//! - SQLite pool initialization

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
