//! Learning service
//!
//! Wires the pure analytics and story logic to a store. The CLI talks to
//! this type; tests run it over [`crate::store::MemoryStore`].

use crate::analytics::{
    learning_progress, progress_graph, recommend_stories, recommend_story, story_quiz_accuracy,
    Classification, LearningProgress, LevelClassifier, ProgressGraph, ProgressPeriod,
    Recommendation, StoryLevelMap,
};
use crate::config::Config;
use crate::error::Result;
use crate::quiz::{grade_answer, QuizFeedback};
use crate::store::{require_quiz, require_story, AttemptStore, CompletionStore, ContentStore};
use crate::story::{SessionState, StoryGraphNavigator, StorySession};
use crate::types::{LearnerLevel, LevelFilter, Quiz, QuizAttempt, Story, StoryCompletion};
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

pub struct LearningService<'a, S>
where
    S: AttemptStore + ContentStore + CompletionStore + ?Sized,
{
    store: &'a S,
    config: &'a Config,
}

impl<'a, S> LearningService<'a, S>
where
    S: AttemptStore + ContentStore + CompletionStore + ?Sized,
{
    pub fn new(store: &'a S, config: &'a Config) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &'a S {
        self.store
    }

    // ============================================
    // Level
    // ============================================

    /// Story levels from the catalog plus configured overrides.
    pub fn level_map(&self) -> Result<StoryLevelMap> {
        StoryLevelMap::from_catalog(self.store, &self.config.story_levels)
    }

    pub fn classify(&self) -> Result<Classification> {
        let classifier = LevelClassifier::new(self.config.classifier.clone(), self.level_map()?);
        classifier.classify(&self.store.list_attempts()?)
    }

    pub fn learner_level(&self) -> Result<LearnerLevel> {
        Ok(self.classify()?.level)
    }

    // ============================================
    // Quizzes
    // ============================================

    /// Quizzes of one story. Fails when the story does not exist.
    pub fn quizzes(&self, story_id: &str) -> Result<Vec<Quiz>> {
        require_story(self.store, story_id)?;
        self.store.list_quizzes(story_id)
    }

    /// One quiz drawn uniformly from the whole catalog; `None` when there
    /// are no quizzes.
    pub fn random_quiz<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Option<Quiz>> {
        let mut quizzes = Vec::new();
        for story in self.store.list_stories()? {
            quizzes.extend(self.store.list_quizzes(&story.story_id)?);
        }
        Ok(quizzes.choose(rng).cloned())
    }

    /// Grade an answer and append it to the attempt history.
    pub fn submit_answer(&self, quiz_id: &str, choice_id: &str) -> Result<QuizFeedback> {
        let quiz = require_quiz(self.store, quiz_id)?;
        let feedback = grade_answer(&quiz, choice_id)?;

        let mut attempt =
            QuizAttempt::new(quiz.quiz_id.clone(), Some(quiz.story_id.clone()), feedback.is_correct);
        attempt.user_answer = Some(choice_id.to_string());
        self.store.append_attempt(&attempt)?;

        tracing::info!(
            quiz_id = %quiz.quiz_id,
            story_id = %quiz.story_id,
            is_correct = feedback.is_correct,
            "Quiz answer recorded"
        );

        Ok(feedback)
    }

    // ============================================
    // Stories
    // ============================================

    pub fn navigator(&self) -> StoryGraphNavigator<'a, S> {
        StoryGraphNavigator::with_config(self.store, self.config.story.clone())
    }

    pub fn stories(&self, filter: LevelFilter) -> Result<Vec<Story>> {
        Ok(self
            .store
            .list_stories()?
            .into_iter()
            .filter(|s| filter.matches(s))
            .collect())
    }

    pub fn start_story(&self, story_id: &str) -> Result<StorySession> {
        StorySession::start(&self.navigator(), story_id)
    }

    pub fn choose(&self, session: &mut StorySession, choice_id: &str) -> Result<SessionState> {
        let nav = self.navigator();
        session.select_choice(&nav, choice_id).cloned()
    }

    /// Record the completion for a finished session.
    ///
    /// Returns `None` when the session has not reached a terminal chapter or
    /// the story was already completed earlier; nothing is written then.
    pub fn finish_story(&self, session: &StorySession) -> Result<Option<StoryCompletion>> {
        if !session.is_completed() {
            return Ok(None);
        }
        if self.store.is_completed(session.story_id())? {
            tracing::debug!(story_id = session.story_id(), "Story already completed");
            return Ok(None);
        }

        let attempts = self.store.list_attempts()?;
        let completion = StoryCompletion {
            story_id: session.story_id().to_string(),
            completed_at: Utc::now(),
            completion_percentage: session.progress(),
            quiz_accuracy: story_quiz_accuracy(&attempts, session.story_id()),
            chapters_completed: session.visited_chapters().to_vec(),
        };

        if !self.store.record_completion(&completion)? {
            return Ok(None);
        }

        tracing::info!(
            story_id = %completion.story_id,
            quiz_accuracy = completion.quiz_accuracy,
            chapters = completion.chapters_completed.len(),
            "Story completion recorded"
        );
        Ok(Some(completion))
    }

    pub fn completed_story_ids(&self) -> Result<HashSet<String>> {
        Ok(self
            .store
            .list_completions()?
            .into_iter()
            .map(|c| c.story_id)
            .collect())
    }

    // ============================================
    // Recommendations and progress
    // ============================================

    pub fn recommend<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Option<Recommendation>> {
        let learner = self.learner_level()?;
        let stories = self.store.list_stories()?;
        Ok(recommend_story(
            &stories,
            &self.completed_story_ids()?,
            &learner,
            rng,
        ))
    }

    /// Up to `recommendation.max_suggestions` stories near the learner's level.
    pub fn suggestions<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Vec<Story>> {
        let learner = self.learner_level()?;
        let stories = self.store.list_stories()?;
        Ok(recommend_stories(
            &stories,
            &self.completed_story_ids()?,
            &learner,
            self.config.recommendation.max_suggestions,
            rng,
        ))
    }

    pub fn progress(&self) -> Result<LearningProgress> {
        let completed = self
            .store
            .list_completions()?
            .into_iter()
            .map(|c| c.story_id)
            .collect();
        Ok(learning_progress(
            &self.store.list_attempts()?,
            &self.level_map()?,
            &self.store.count_quizzes_by_level()?,
            completed,
        ))
    }

    pub fn progress_graph(&self, period: ProgressPeriod, now: DateTime<Utc>) -> Result<ProgressGraph> {
        Ok(progress_graph(
            &self.store.list_attempts()?,
            &self.level_map()?,
            period,
            now,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::RecommendationReason;
    use crate::store::MemoryStore;
    use crate::types::{Chapter, Choice, JlptLevel, Quiz, QuizChoice};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        for (id, level) in [("1", JlptLevel::N5), ("2", JlptLevel::N4)] {
            store.insert_story(Story {
                story_id: id.to_string(),
                title: format!("Story {}", id),
                description: String::new(),
                level_jlpt: level,
                level_cefr: Some(level.paired_cefr()),
                estimated_minutes: 5,
                root_chapter_id: format!("ch-{}-1", id),
            });
            store.insert_chapter(Chapter {
                chapter_id: format!("ch-{}-1", id),
                story_id: id.to_string(),
                parent_chapter_id: None,
                chapter_number: 1,
                depth_level: 0,
                content: String::new(),
                translation: None,
                choices: vec![Choice {
                    choice_id: format!("choice-{}-1-a", id),
                    chapter_id: format!("ch-{}-1", id),
                    choice_text: "next".to_string(),
                    next_chapter_id: format!("ch-{}-5", id),
                    display_order: 1,
                }],
            });
            store.insert_chapter(Chapter {
                chapter_id: format!("ch-{}-5", id),
                story_id: id.to_string(),
                parent_chapter_id: Some(format!("ch-{}-1", id)),
                chapter_number: 5,
                depth_level: 1,
                content: String::new(),
                translation: None,
                choices: vec![],
            });
            store.insert_quiz(Quiz {
                quiz_id: format!("quiz-{}-1", id),
                story_id: id.to_string(),
                question_text: "?".to_string(),
                difficulty_level: level,
                choices: vec![
                    QuizChoice {
                        choice_id: "a".to_string(),
                        choice_text: "right".to_string(),
                        is_correct: true,
                        explanation: None,
                    },
                    QuizChoice {
                        choice_id: "b".to_string(),
                        choice_text: "wrong".to_string(),
                        is_correct: false,
                        explanation: None,
                    },
                ],
            });
        }
        store
    }

    #[test]
    fn test_submit_answer_records_story_id() {
        let store = seeded_store();
        let config = Config::default();
        let service = LearningService::new(&store, &config);

        let feedback = service.submit_answer("quiz-1-1", "b").unwrap();
        assert!(!feedback.is_correct);
        assert_eq!(feedback.sample_answer.as_deref(), Some("right"));

        let attempts = store.list_attempts().unwrap();
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].story_id.as_deref(), Some("1"));
        assert_eq!(attempts[0].user_answer.as_deref(), Some("b"));
    }

    #[test]
    fn test_quizzes_for_story() {
        let store = seeded_store();
        let config = Config::default();
        let service = LearningService::new(&store, &config);

        let quizzes = service.quizzes("2").unwrap();
        assert_eq!(quizzes.len(), 1);
        assert_eq!(quizzes[0].quiz_id, "quiz-2-1");
        let order: Vec<_> = quizzes[0].choices.iter().map(|c| c.choice_id.as_str()).collect();
        assert_eq!(order, vec!["a", "b"]);

        assert!(service.quizzes("9").unwrap_err().is_not_found());
    }

    #[test]
    fn test_random_quiz_uses_given_rng() {
        let store = seeded_store();
        let config = Config::default();
        let service = LearningService::new(&store, &config);

        let pick = |seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            service.random_quiz(&mut rng).unwrap().unwrap().quiz_id
        };
        for seed in 0..8 {
            assert_eq!(pick(seed), pick(seed));
            assert!(["quiz-1-1", "quiz-2-1"].contains(&pick(seed).as_str()));
        }

        let empty = MemoryStore::new();
        let service = LearningService::new(&empty, &config);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(service.random_quiz(&mut rng).unwrap().is_none());
    }

    #[test]
    fn test_invalid_answer_is_not_recorded() {
        let store = seeded_store();
        let config = Config::default();
        let service = LearningService::new(&store, &config);

        assert!(service.submit_answer("quiz-1-1", "z").is_err());
        assert!(service.submit_answer("quiz-9-1", "a").unwrap_err().is_not_found());
        assert!(store.list_attempts().unwrap().is_empty());
    }

    #[test]
    fn test_level_rises_with_answers() {
        let store = seeded_store();
        let config = Config::default();
        let service = LearningService::new(&store, &config);

        for _ in 0..3 {
            service.submit_answer("quiz-2-1", "a").unwrap();
        }
        let level = service.learner_level().unwrap();
        assert_eq!(level.current_level, JlptLevel::N4);
        assert_eq!(level.confidence, 30);
        assert_eq!(level.recommended_next_level, JlptLevel::N3);
    }

    #[test]
    fn test_finish_story_once() {
        let store = seeded_store();
        let config = Config::default();
        let service = LearningService::new(&store, &config);
        service.submit_answer("quiz-1-1", "a").unwrap();

        let mut session = service.start_story("1").unwrap();
        assert!(service.finish_story(&session).unwrap().is_none());

        service.choose(&mut session, "choice-1-1-a").unwrap();
        let completion = service.finish_story(&session).unwrap().unwrap();
        assert_eq!(completion.quiz_accuracy, 100);
        assert_eq!(completion.completion_percentage, 100);
        assert_eq!(completion.chapters_completed, vec!["ch-1-1", "ch-1-5"]);

        assert!(service.finish_story(&session).unwrap().is_none());
        assert_eq!(store.list_completions().unwrap().len(), 1);
    }

    #[test]
    fn test_recommend_skips_completed() {
        let store = seeded_store();
        let config = Config::default();
        let service = LearningService::new(&store, &config);
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let first = service.recommend(&mut rng).unwrap().unwrap();
        assert_eq!(first.story.story_id, "2");
        assert_eq!(first.reason, RecommendationReason::NextLevel);

        for id in ["1", "2"] {
            let mut session = service.start_story(id).unwrap();
            service
                .choose(&mut session, &format!("choice-{}-1-a", id))
                .unwrap();
            service.finish_story(&session).unwrap();
        }
        assert!(service.recommend(&mut rng).unwrap().is_none());
    }

    #[test]
    fn test_stories_filter() {
        let store = seeded_store();
        let config = Config::default();
        let service = LearningService::new(&store, &config);

        assert_eq!(service.stories(LevelFilter::All).unwrap().len(), 2);
        let n4 = service.stories("N4-A2".parse().unwrap()).unwrap();
        assert_eq!(n4.len(), 1);
        assert_eq!(n4[0].story_id, "2");
    }

    #[test]
    fn test_progress_counts_catalog_quizzes() {
        let store = seeded_store();
        let config = Config::default();
        let service = LearningService::new(&store, &config);
        service.submit_answer("quiz-1-1", "a").unwrap();

        let progress = service.progress().unwrap();
        assert_eq!(progress.total_quizzes, 1);
        assert_eq!(progress.level_progress[&JlptLevel::N5].total, 1);
        assert_eq!(progress.level_progress[&JlptLevel::N4].completed, 0);
    }
}
