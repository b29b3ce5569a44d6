//! Error types for lingo-keeper-core

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the lingo-keeper-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Story not found
    #[error("story not found: {0}")]
    StoryNotFound(String),

    /// Chapter not found
    #[error("chapter not found: {0}")]
    ChapterNotFound(String),

    /// Quiz not found
    #[error("quiz not found: {0}")]
    QuizNotFound(String),

    /// The choice is not one of the chapter's outgoing edges
    #[error("choice {choice_id} does not belong to chapter {chapter_id}")]
    InvalidChoice {
        chapter_id: String,
        choice_id: String,
    },

    /// The answer is not one of the quiz's choices
    #[error("answer {choice_id} is not a choice of quiz {quiz_id}")]
    InvalidAnswer { quiz_id: String, choice_id: String },

    /// Quiz content has no correct choice
    #[error("quiz {0} has no correct choice")]
    QuizMisconfigured(String),

    /// An attempt refers to a story with no level mapping (strict policy only)
    #[error("no JLPT level mapped for story {story_id}")]
    UnmappedStory { story_id: String },

    /// Unknown JLPT/CEFR label
    #[error("invalid level: {0}")]
    InvalidLevel(String),

    /// Unknown story list filter
    #[error("invalid level filter: {0}")]
    InvalidLevelFilter(String),

    /// The reading session already reached a terminal chapter
    #[error("story {0} is already completed in this session")]
    SessionCompleted(String),

    /// Catalog file could not be loaded
    #[error("catalog error in {}: {message}", .path.display())]
    Catalog { path: PathBuf, message: String },
}

impl Error {
    /// Whether this error means a content id was absent.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::StoryNotFound(_) | Error::ChapterNotFound(_) | Error::QuizNotFound(_)
        )
    }
}

/// Result type alias for lingo-keeper-core
pub type Result<T> = std::result::Result<T, Error>;
