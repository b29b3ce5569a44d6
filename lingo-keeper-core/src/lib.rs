//! # lingo-keeper-core
//!
//! Core library for lingo-keeper - a graded reader for Japanese learners.
//!
//! This library provides:
//! - Domain types for stories, chapters, quizzes and learner history
//! - Level classification, story navigation and recommendation
//! - Database storage layer with SQLite
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! The learner's history (quiz attempts and story completions) is the only
//! mutable state. Everything else is either static content imported from
//! catalog files or derived on demand:
//! - **Content:** stories, chapters, choices, quizzes ([`catalog`])
//! - **History:** append-only attempts, write-once completions ([`store`])
//! - **Derived:** learner level, recommendations, progress ([`analytics`])
//!
//! ## Example
//!
//! ```rust,no_run
//! use lingo_keeper_core::{Config, Database, LearningService};
//!
//! // Load configuration
//! let config = Config::load().expect("failed to load config");
//!
//! // Open database
//! let db = Database::open(&Config::database_path()).expect("failed to open database");
//! db.migrate().expect("failed to run migrations");
//!
//! let service = LearningService::new(&db, &config);
//! let level = service.learner_level().expect("failed to classify");
//! println!("{} ({}% confidence)", level.current_level, level.confidence);
//! ```

// Re-export commonly used items at the crate root
pub use analytics::{compute_learner_level, LevelClassifier, StoryLevelMap};
pub use catalog::{Catalog, CatalogImporter, ImportResult};
pub use config::Config;
pub use db::Database;
pub use error::{Error, Result};
pub use service::LearningService;
pub use store::{AttemptStore, CompletionStore, ContentStore, MemoryStore};
pub use story::{StoryGraphNavigator, StorySession};
pub use types::*;

// Public modules
pub mod analytics;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod quiz;
pub mod service;
pub mod store;
pub mod story;
pub mod types;
