//! Storage interfaces consumed by the learning logic
//!
//! The classifier, navigator and selector never touch storage directly;
//! callers pass data read through these traits. Two implementations ship:
//! [`MemoryStore`] for tests and embedding, and [`crate::Database`] for
//! SQLite persistence.

use crate::error::{Error, Result};
use crate::types::*;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

/// Append-only log of quiz attempts.
pub trait AttemptStore {
    /// Every attempt ever recorded, oldest first.
    fn list_attempts(&self) -> Result<Vec<QuizAttempt>>;

    fn append_attempt(&self, attempt: &QuizAttempt) -> Result<()>;
}

/// Read-only view of the content catalog.
pub trait ContentStore {
    fn get_story(&self, story_id: &str) -> Result<Option<Story>>;

    fn list_stories(&self) -> Result<Vec<Story>>;

    /// Chapter with its outgoing choices.
    fn get_chapter(&self, chapter_id: &str) -> Result<Option<Chapter>>;

    /// All chapters of a story, with choices, ordered by chapter number.
    fn list_chapters(&self, story_id: &str) -> Result<Vec<Chapter>>;

    fn get_quiz(&self, quiz_id: &str) -> Result<Option<Quiz>>;

    fn list_quizzes(&self, story_id: &str) -> Result<Vec<Quiz>>;

    /// Number of quizzes in the catalog per difficulty level.
    fn count_quizzes_by_level(&self) -> Result<BTreeMap<JlptLevel, u32>>;
}

/// Write-once record of finished stories.
pub trait CompletionStore {
    fn is_completed(&self, story_id: &str) -> Result<bool> {
        Ok(self.get_completion(story_id)?.is_some())
    }

    fn get_completion(&self, story_id: &str) -> Result<Option<StoryCompletion>>;

    fn list_completions(&self) -> Result<Vec<StoryCompletion>>;

    /// Record a completion. Returns `false` and writes nothing when the
    /// story is already completed.
    fn record_completion(&self, completion: &StoryCompletion) -> Result<bool>;
}

#[derive(Default)]
struct MemoryState {
    stories: BTreeMap<String, Story>,
    chapters: BTreeMap<String, Chapter>,
    quizzes: BTreeMap<String, Quiz>,
    attempts: Vec<QuizAttempt>,
    completions: HashMap<String, StoryCompletion>,
}

/// In-memory implementation of all three stores.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_story(&self, story: Story) {
        self.write().stories.insert(story.story_id.clone(), story);
    }

    pub fn insert_chapter(&self, chapter: Chapter) {
        self.write()
            .chapters
            .insert(chapter.chapter_id.clone(), chapter);
    }

    pub fn insert_quiz(&self, quiz: Quiz) {
        self.write().quizzes.insert(quiz.quiz_id.clone(), quiz);
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, MemoryState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, MemoryState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl AttemptStore for MemoryStore {
    fn list_attempts(&self) -> Result<Vec<QuizAttempt>> {
        Ok(self.read().attempts.clone())
    }

    fn append_attempt(&self, attempt: &QuizAttempt) -> Result<()> {
        self.write().attempts.push(attempt.clone());
        Ok(())
    }
}

impl ContentStore for MemoryStore {
    fn get_story(&self, story_id: &str) -> Result<Option<Story>> {
        Ok(self.read().stories.get(story_id).cloned())
    }

    fn list_stories(&self) -> Result<Vec<Story>> {
        Ok(self.read().stories.values().cloned().collect())
    }

    fn get_chapter(&self, chapter_id: &str) -> Result<Option<Chapter>> {
        Ok(self.read().chapters.get(chapter_id).cloned())
    }

    fn list_chapters(&self, story_id: &str) -> Result<Vec<Chapter>> {
        let mut chapters: Vec<Chapter> = self
            .read()
            .chapters
            .values()
            .filter(|c| c.story_id == story_id)
            .cloned()
            .collect();
        chapters.sort_by(|a, b| {
            a.chapter_number
                .cmp(&b.chapter_number)
                .then_with(|| a.chapter_id.cmp(&b.chapter_id))
        });
        Ok(chapters)
    }

    fn get_quiz(&self, quiz_id: &str) -> Result<Option<Quiz>> {
        Ok(self.read().quizzes.get(quiz_id).cloned())
    }

    fn list_quizzes(&self, story_id: &str) -> Result<Vec<Quiz>> {
        Ok(self
            .read()
            .quizzes
            .values()
            .filter(|q| q.story_id == story_id)
            .cloned()
            .collect())
    }

    fn count_quizzes_by_level(&self) -> Result<BTreeMap<JlptLevel, u32>> {
        let mut counts = BTreeMap::new();
        for quiz in self.read().quizzes.values() {
            *counts.entry(quiz.difficulty_level).or_insert(0) += 1;
        }
        Ok(counts)
    }
}

impl CompletionStore for MemoryStore {
    fn get_completion(&self, story_id: &str) -> Result<Option<StoryCompletion>> {
        Ok(self.read().completions.get(story_id).cloned())
    }

    fn list_completions(&self) -> Result<Vec<StoryCompletion>> {
        let mut completions: Vec<StoryCompletion> =
            self.read().completions.values().cloned().collect();
        completions.sort_by_key(|c| c.completed_at);
        Ok(completions)
    }

    fn record_completion(&self, completion: &StoryCompletion) -> Result<bool> {
        let mut state = self.write();
        if state.completions.contains_key(&completion.story_id) {
            return Ok(false);
        }
        state
            .completions
            .insert(completion.story_id.clone(), completion.clone());
        Ok(true)
    }
}

/// Look up a story, failing with [`Error::StoryNotFound`].
pub fn require_story<S: ContentStore + ?Sized>(store: &S, story_id: &str) -> Result<Story> {
    store
        .get_story(story_id)?
        .ok_or_else(|| Error::StoryNotFound(story_id.to_string()))
}

/// Look up a chapter, failing with [`Error::ChapterNotFound`].
pub fn require_chapter<S: ContentStore + ?Sized>(store: &S, chapter_id: &str) -> Result<Chapter> {
    store
        .get_chapter(chapter_id)?
        .ok_or_else(|| Error::ChapterNotFound(chapter_id.to_string()))
}

/// Look up a quiz, failing with [`Error::QuizNotFound`].
pub fn require_quiz<S: ContentStore + ?Sized>(store: &S, quiz_id: &str) -> Result<Quiz> {
    store
        .get_quiz(quiz_id)?
        .ok_or_else(|| Error::QuizNotFound(quiz_id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn completion(story_id: &str) -> StoryCompletion {
        StoryCompletion {
            story_id: story_id.to_string(),
            completed_at: Utc::now(),
            completion_percentage: 100,
            quiz_accuracy: 50,
            chapters_completed: vec!["ch-1-1".to_string()],
        }
    }

    #[test]
    fn test_record_completion_is_write_once() {
        let store = MemoryStore::new();
        assert!(!store.is_completed("1").unwrap());

        assert!(store.record_completion(&completion("1")).unwrap());
        let mut second = completion("1");
        second.quiz_accuracy = 100;
        assert!(!store.record_completion(&second).unwrap());

        assert_eq!(store.list_completions().unwrap().len(), 1);
        assert_eq!(store.get_completion("1").unwrap().unwrap().quiz_accuracy, 50);
    }

    #[test]
    fn test_attempts_append_in_order() {
        let store = MemoryStore::new();
        store
            .append_attempt(&QuizAttempt::new("quiz-1-1", None, true))
            .unwrap();
        store
            .append_attempt(&QuizAttempt::new("quiz-1-2", None, false))
            .unwrap();

        let attempts = store.list_attempts().unwrap();
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[0].quiz_id, "quiz-1-1");
        assert_eq!(attempts[1].quiz_id, "quiz-1-2");
    }

    #[test]
    fn test_require_missing_content() {
        let store = MemoryStore::new();
        assert!(matches!(
            require_chapter(&store, "nope"),
            Err(Error::ChapterNotFound(id)) if id == "nope"
        ));
        assert!(require_story(&store, "nope").unwrap_err().is_not_found());
    }
}
