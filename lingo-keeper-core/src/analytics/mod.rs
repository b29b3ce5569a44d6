//! Analytics module for lingo-keeper
//!
//! Everything here is computed from the learner's history on demand:
//! - Level classification ([`level`])
//! - Story recommendation ([`recommend`])
//! - Progress reports ([`progress`])

pub mod level;
pub mod progress;
pub mod recommend;

pub use level::{
    compute_learner_level, AttemptLevel, Classification, LevelClassifier, StoryLevelMap,
};
pub use progress::{
    learning_progress, progress_graph, story_quiz_accuracy, LearningProgress, LevelProgress,
    ProgressDataPoint, ProgressGraph, ProgressPeriod,
};
pub use recommend::{
    filter_stories_by_level, overall_completion, recommend_stories, recommend_story,
    Recommendation, RecommendationReason, RecommendationSelector,
};
