//! # QCAT Common Library
//!
//! Shared code for the quantum computing catalog service:
//! - Domain models (algorithms, implementations, compute resources, ...)
//! - SQLite schema, migrations and per-aggregate service operations
//! - Configuration loading and root folder resolution
//! - Pagination helpers
//! - Error taxonomy

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod pagination;
pub mod uuid_utils;

pub use error::{Error, Result};
pub use pagination::{Page, PageRequest};
