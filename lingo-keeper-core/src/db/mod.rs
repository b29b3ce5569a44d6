//! Database layer for lingo-keeper
//!
//! This module provides the storage layer using SQLite with:
//! - Schema migrations
//! - Repository implementations of the [`crate::store`] traits
//! - Checkpoint tracking for catalog imports

pub mod repo;
pub mod schema;

pub use repo::{CatalogImport, ContentCounts, Database};
