//! # ITAM Common Library
//!
//! Shared code for the IT-asset management services including:
//! - Domain models (plans, scan records, asset snapshots)
//! - Error taxonomy
//! - Configuration loading
//! - Logging initialization

pub mod config;
pub mod error;
pub mod logging;
pub mod models;

pub use error::{Error, FieldError, Result};
