//! Learner level classification
//!
//! Turns the complete quiz-attempt history into a [`LearnerLevel`]. The
//! computation is pure: no storage access, no clock, no randomness. Callers
//! read attempts through [`crate::store::AttemptStore`] and pass them in.
//!
//! ## Algorithm
//!
//! 1. Resolve each attempt to a story, then to that story's JLPT level.
//! 2. Tally `{correct, total}` per level.
//! 3. The current level is the hardest level with at least `min_attempts`
//!    attempts and at least `mastery_accuracy` percent correct, else N5.
//! 4. Confidence scales with the number of attempts at the current level,
//!    saturating at `confidence_full_at`.

use crate::config::{ClassifierConfig, UnmappedStoryPolicy};
use crate::error::{Error, Result};
use crate::store::ContentStore;
use crate::types::{percent, JlptLevel, LearnerLevel, LevelStats, QuizAttempt, Story};
use std::collections::{BTreeMap, HashMap};

/// Story id to JLPT level lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoryLevelMap {
    levels: HashMap<String, JlptLevel>,
}

/// How a single attempt maps onto a level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptLevel {
    /// The attempt's story has a known level
    Mapped(JlptLevel),
    /// The story id resolved but has no level entry
    Unmapped(String),
    /// Neither an explicit story id nor a well-formed quiz id
    Unparsed,
}

impl StoryLevelMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Levels taken from the stories themselves.
    pub fn from_stories(stories: &[Story]) -> Self {
        Self {
            levels: stories
                .iter()
                .map(|s| (s.story_id.clone(), s.level_jlpt))
                .collect(),
        }
    }

    /// Levels from the content store with `overrides` applied on top.
    pub fn from_catalog<S: ContentStore + ?Sized>(
        store: &S,
        overrides: &BTreeMap<String, JlptLevel>,
    ) -> Result<Self> {
        Ok(Self::from_stories(&store.list_stories()?).with_overrides(overrides))
    }

    /// The table for the nine stories the app first shipped with.
    pub fn builtin() -> Self {
        let table = [
            ("1", JlptLevel::N5),
            ("2", JlptLevel::N5),
            ("3", JlptLevel::N5),
            ("4", JlptLevel::N4),
            ("5", JlptLevel::N3),
            ("6", JlptLevel::N2),
            ("7", JlptLevel::N2),
            ("8", JlptLevel::N1),
            ("9", JlptLevel::N1),
        ];
        Self {
            levels: table
                .iter()
                .map(|(id, level)| (id.to_string(), *level))
                .collect(),
        }
    }

    pub fn with_overrides(mut self, overrides: &BTreeMap<String, JlptLevel>) -> Self {
        for (story_id, level) in overrides {
            self.levels.insert(story_id.clone(), *level);
        }
        self
    }

    pub fn insert(&mut self, story_id: impl Into<String>, level: JlptLevel) {
        self.levels.insert(story_id.into(), level);
    }

    pub fn get(&self, story_id: &str) -> Option<JlptLevel> {
        self.levels.get(story_id).copied()
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Where an attempt lands, before any unmapped-story policy is applied.
    pub fn attempt_level(&self, attempt: &QuizAttempt) -> AttemptLevel {
        match attempt.resolved_story_id() {
            None => AttemptLevel::Unparsed,
            Some(story_id) => match self.get(story_id) {
                Some(level) => AttemptLevel::Mapped(level),
                None => AttemptLevel::Unmapped(story_id.to_string()),
            },
        }
    }
}

/// Full classifier output.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub level: LearnerLevel,
    /// Raw tallies, so callers can tell "no data" from "0% correct"
    pub stats: BTreeMap<JlptLevel, LevelStats>,
    /// Attempts skipped because no story could be resolved
    pub unparsed_attempts: usize,
    /// Attempts counted toward the easiest level for lack of a mapping
    pub unmapped_attempts: usize,
}

impl Classification {
    /// Whether any attempts exist at `level`.
    pub fn has_data(&self, level: JlptLevel) -> bool {
        self.stats.get(&level).map(|s| s.total > 0).unwrap_or(false)
    }
}

/// Computes [`LearnerLevel`] from attempt history.
#[derive(Debug, Clone)]
pub struct LevelClassifier {
    config: ClassifierConfig,
    levels: StoryLevelMap,
}

impl LevelClassifier {
    pub fn new(config: ClassifierConfig, levels: StoryLevelMap) -> Self {
        Self { config, levels }
    }

    /// Classifier with default thresholds.
    pub fn with_defaults(levels: StoryLevelMap) -> Self {
        Self::new(ClassifierConfig::default(), levels)
    }

    pub fn levels(&self) -> &StoryLevelMap {
        &self.levels
    }

    pub fn classify(&self, attempts: &[QuizAttempt]) -> Result<Classification> {
        let mut stats: BTreeMap<JlptLevel, LevelStats> = JlptLevel::ALL
            .iter()
            .map(|l| (*l, LevelStats::default()))
            .collect();
        let mut unparsed_attempts = 0;
        let mut unmapped_attempts = 0;

        for attempt in attempts {
            let level = match self.levels.attempt_level(attempt) {
                AttemptLevel::Mapped(level) => level,
                AttemptLevel::Unmapped(story_id) => match self.config.unmapped_story {
                    UnmappedStoryPolicy::Easiest => {
                        unmapped_attempts += 1;
                        JlptLevel::easiest()
                    }
                    UnmappedStoryPolicy::Strict => {
                        return Err(Error::UnmappedStory { story_id });
                    }
                },
                AttemptLevel::Unparsed => {
                    unparsed_attempts += 1;
                    continue;
                }
            };
            stats.entry(level).or_default().record(attempt.is_correct);
        }

        let accuracy_by_level: BTreeMap<JlptLevel, u8> =
            stats.iter().map(|(l, s)| (*l, s.accuracy())).collect();

        let current_level = JlptLevel::ALL
            .iter()
            .rev()
            .copied()
            .find(|level| {
                let s = stats[level];
                s.total >= self.config.min_attempts && s.accuracy() >= self.config.mastery_accuracy
            })
            .unwrap_or_else(JlptLevel::easiest);

        let at_current = stats[&current_level].total;
        let confidence = percent(
            at_current as u64,
            self.config.confidence_full_at.max(1) as u64,
        );

        if unparsed_attempts > 0 {
            tracing::warn!(unparsed_attempts, "Skipped attempts with no resolvable story");
        }

        tracing::debug!(
            attempts = attempts.len(),
            current_level = %current_level,
            confidence,
            unmapped_attempts,
            "Classified learner level"
        );

        Ok(Classification {
            level: LearnerLevel {
                current_level,
                confidence,
                recommended_next_level: current_level.next(),
                accuracy_by_level,
            },
            stats,
            unparsed_attempts,
            unmapped_attempts,
        })
    }
}

/// Learner level with default thresholds. Unmapped stories count toward N5.
pub fn compute_learner_level(attempts: &[QuizAttempt], levels: &StoryLevelMap) -> LearnerLevel {
    let config = ClassifierConfig {
        unmapped_story: UnmappedStoryPolicy::Easiest,
        ..ClassifierConfig::default()
    };
    // Only the strict policy can fail.
    LevelClassifier::new(config, levels.clone())
        .classify(attempts)
        .map(|c| c.level)
        .unwrap_or_default()
}
