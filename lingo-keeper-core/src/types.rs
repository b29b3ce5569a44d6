//! Core domain types for lingo-keeper
//!
//! These types are the content catalog (stories, chapters, quizzes) and the
//! learner's history (quiz attempts, story completions). Everything derived
//! from the history, like [`LearnerLevel`], is recomputed on demand.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Story** | A short branching narrative at one JLPT level |
//! | **Chapter** | One node of a story; the root has no parent |
//! | **Choice** | A directed edge from one chapter to another |
//! | **Terminal chapter** | A chapter with no outgoing choices |
//! | **Quiz** | A multiple-choice question attached to a story |
//! | **Attempt** | One recorded answer to a quiz, correct or not |
//! | **Completion** | Written once when a learner first reaches a terminal chapter |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::Error;

// ============================================
// Levels
// ============================================

/// JLPT proficiency label, ordered from easiest (N5) to hardest (N1).
///
/// The derived `Ord` follows declaration order, so `N5 < N4 < ... < N1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum JlptLevel {
    N5,
    N4,
    N3,
    N2,
    N1,
}

impl JlptLevel {
    /// All levels, easiest first.
    pub const ALL: [JlptLevel; 5] = [
        JlptLevel::N5,
        JlptLevel::N4,
        JlptLevel::N3,
        JlptLevel::N2,
        JlptLevel::N1,
    ];

    pub fn easiest() -> Self {
        JlptLevel::N5
    }

    pub fn hardest() -> Self {
        JlptLevel::N1
    }

    /// The next harder level. N1 is its own successor.
    pub fn next(&self) -> Self {
        match self {
            JlptLevel::N5 => JlptLevel::N4,
            JlptLevel::N4 => JlptLevel::N3,
            JlptLevel::N3 => JlptLevel::N2,
            JlptLevel::N2 => JlptLevel::N1,
            JlptLevel::N1 => JlptLevel::N1,
        }
    }

    /// 1-based difficulty rank (N5 = 1, N1 = 5).
    pub fn rank(&self) -> u8 {
        match self {
            JlptLevel::N5 => 1,
            JlptLevel::N4 => 2,
            JlptLevel::N3 => 3,
            JlptLevel::N2 => 4,
            JlptLevel::N1 => 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JlptLevel::N5 => "N5",
            JlptLevel::N4 => "N4",
            JlptLevel::N3 => "N3",
            JlptLevel::N2 => "N2",
            JlptLevel::N1 => "N1",
        }
    }

    /// The CEFR band the catalog pairs with this level.
    pub fn paired_cefr(&self) -> CefrLevel {
        match self {
            JlptLevel::N5 => CefrLevel::A1,
            JlptLevel::N4 => CefrLevel::A2,
            JlptLevel::N3 => CefrLevel::B1,
            JlptLevel::N2 => CefrLevel::B2,
            JlptLevel::N1 => CefrLevel::C1,
        }
    }
}

impl fmt::Display for JlptLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JlptLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "N5" => Ok(JlptLevel::N5),
            "N4" => Ok(JlptLevel::N4),
            "N3" => Ok(JlptLevel::N3),
            "N2" => Ok(JlptLevel::N2),
            "N1" => Ok(JlptLevel::N1),
            _ => Err(Error::InvalidLevel(s.to_string())),
        }
    }
}

/// CEFR label shown next to the JLPT level. Presentational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CefrLevel {
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
}

impl CefrLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            CefrLevel::A1 => "A1",
            CefrLevel::A2 => "A2",
            CefrLevel::B1 => "B1",
            CefrLevel::B2 => "B2",
            CefrLevel::C1 => "C1",
            CefrLevel::C2 => "C2",
        }
    }
}

impl fmt::Display for CefrLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CefrLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A1" => Ok(CefrLevel::A1),
            "A2" => Ok(CefrLevel::A2),
            "B1" => Ok(CefrLevel::B1),
            "B2" => Ok(CefrLevel::B2),
            "C1" => Ok(CefrLevel::C1),
            "C2" => Ok(CefrLevel::C2),
            _ => Err(Error::InvalidLevel(s.to_string())),
        }
    }
}

/// Story list filter: everything, or one paired JLPT/CEFR band like `N3-B1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LevelFilter {
    #[default]
    All,
    Level(JlptLevel),
}

impl LevelFilter {
    pub fn matches(&self, story: &Story) -> bool {
        match self {
            LevelFilter::All => true,
            LevelFilter::Level(level) => story.level_jlpt == *level,
        }
    }
}

impl std::str::FromStr for LevelFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(LevelFilter::All);
        }
        let invalid = || Error::InvalidLevelFilter(s.to_string());
        let (jlpt, cefr) = s.split_once('-').ok_or_else(invalid)?;
        let jlpt: JlptLevel = jlpt.parse().map_err(|_| invalid())?;
        let cefr: CefrLevel = cefr.parse().map_err(|_| invalid())?;
        if jlpt.paired_cefr() != cefr {
            return Err(invalid());
        }
        Ok(LevelFilter::Level(jlpt))
    }
}

// ============================================
// Content
// ============================================

/// A branching story. Immutable content record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    pub story_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub level_jlpt: JlptLevel,
    #[serde(default)]
    pub level_cefr: Option<CefrLevel>,
    /// Estimated reading time in minutes
    #[serde(default)]
    pub estimated_minutes: u32,
    pub root_chapter_id: String,
}

/// One node of a story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub chapter_id: String,
    pub story_id: String,
    /// Breadcrumb only; traversal follows [`Choice`] edges
    #[serde(default)]
    pub parent_chapter_id: Option<String>,
    pub chapter_number: u32,
    /// Tree depth, 0 for the root
    #[serde(default)]
    pub depth_level: u32,
    pub content: String,
    #[serde(default)]
    pub translation: Option<String>,
    #[serde(default)]
    pub choices: Vec<Choice>,
}

/// Directed edge between two chapters of the same story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub choice_id: String,
    /// Source chapter; catalog files may leave it out for nested choices
    #[serde(default)]
    pub chapter_id: String,
    pub choice_text: String,
    /// Destination chapter
    pub next_chapter_id: String,
    /// Presentation order; no effect on traversal
    #[serde(default)]
    pub display_order: u32,
}

/// Multiple-choice comprehension question attached to a story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    pub quiz_id: String,
    pub story_id: String,
    pub question_text: String,
    pub difficulty_level: JlptLevel,
    #[serde(default)]
    pub choices: Vec<QuizChoice>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizChoice {
    pub choice_id: String,
    pub choice_text: String,
    pub is_correct: bool,
    #[serde(default)]
    pub explanation: Option<String>,
}

// ============================================
// Learner history
// ============================================

/// One recorded answer. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub attempt_id: String,
    /// By convention `quiz-{story_id}-{n}`
    pub quiz_id: String,
    /// Owning story. When absent the story is parsed from `quiz_id`.
    #[serde(default)]
    pub story_id: Option<String>,
    #[serde(default)]
    pub user_answer: Option<String>,
    pub is_correct: bool,
    pub answered_at: DateTime<Utc>,
}

impl QuizAttempt {
    /// New attempt with a fresh id, answered now.
    pub fn new(quiz_id: impl Into<String>, story_id: Option<String>, is_correct: bool) -> Self {
        Self {
            attempt_id: uuid::Uuid::new_v4().to_string(),
            quiz_id: quiz_id.into(),
            story_id,
            user_answer: None,
            is_correct,
            answered_at: Utc::now(),
        }
    }

    /// The story this attempt belongs to: the explicit `story_id`, else the
    /// numeric segment of a `quiz-{story_id}-{n}` quiz id.
    pub fn resolved_story_id(&self) -> Option<&str> {
        match self.story_id.as_deref() {
            Some(id) if !id.is_empty() => Some(id),
            _ => parse_story_from_quiz_id(&self.quiz_id),
        }
    }
}

/// Extract `{story_id}` from `quiz-{story_id}-{rest}`. The story segment must
/// be all ASCII digits.
pub fn parse_story_from_quiz_id(quiz_id: &str) -> Option<&str> {
    let rest = quiz_id.strip_prefix("quiz-")?;
    let (story, _) = rest.split_once('-')?;
    if story.is_empty() || !story.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(story)
}

/// Written once, the first time a learner reaches a terminal chapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryCompletion {
    pub story_id: String,
    pub completed_at: DateTime<Utc>,
    /// 0-100
    pub completion_percentage: u8,
    /// Accuracy over this story's quizzes, 0-100
    pub quiz_accuracy: u8,
    /// Chapters visited on the way, in order
    pub chapters_completed: Vec<String>,
}

// ============================================
// Derived
// ============================================

/// Correct/total tally for one level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelStats {
    pub correct: u32,
    pub total: u32,
}

impl LevelStats {
    pub fn record(&mut self, is_correct: bool) {
        self.total += 1;
        if is_correct {
            self.correct += 1;
        }
    }

    /// Rounded percentage; 0 when there is no data.
    pub fn accuracy(&self) -> u8 {
        percent(self.correct as u64, self.total as u64)
    }
}

/// Snapshot of where the learner stands. Always fully recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnerLevel {
    pub current_level: JlptLevel,
    /// 0-100
    pub confidence: u8,
    pub recommended_next_level: JlptLevel,
    /// 0-100 per level; 0 also stands for "no data"
    pub accuracy_by_level: BTreeMap<JlptLevel, u8>,
}

impl Default for LearnerLevel {
    fn default() -> Self {
        let easiest = JlptLevel::easiest();
        Self {
            current_level: easiest,
            confidence: 0,
            recommended_next_level: easiest.next(),
            accuracy_by_level: JlptLevel::ALL.iter().map(|l| (*l, 0)).collect(),
        }
    }
}

/// `round(100 * part / whole)` with halves rounded up, 0 when `whole` is 0.
pub fn percent(part: u64, whole: u64) -> u8 {
    if whole == 0 {
        return 0;
    }
    let rounded = (200 * part + whole) / (2 * whole);
    rounded.min(100) as u8
}
