//! One learner's walk through a story.

use super::navigator::StoryGraphNavigator;
use crate::error::{Error, Result};
use crate::store::ContentStore;
use crate::types::Chapter;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    /// Reading a chapter that still has choices
    AtChapter { chapter_id: String },
    /// Reached a terminal chapter
    Completed {
        story_id: String,
        chapter_id: String,
    },
}

/// Reading position plus the path taken so far.
#[derive(Debug, Clone, Serialize)]
pub struct StorySession {
    story_id: String,
    state: SessionState,
    /// Chapters left behind, then the terminal chapter once completed
    visited: Vec<String>,
    choices_taken: u32,
    progress: u8,
}

impl StorySession {
    /// Enter the story's root chapter.
    pub fn start<S: ContentStore + ?Sized>(
        nav: &StoryGraphNavigator<'_, S>,
        story_id: &str,
    ) -> Result<Self> {
        let story = nav.get_story(story_id)?;
        let root = nav.root_chapter(&story)?;

        let mut session = Self {
            story_id: story.story_id.clone(),
            state: SessionState::AtChapter {
                chapter_id: root.chapter_id.clone(),
            },
            visited: Vec::new(),
            choices_taken: 0,
            progress: 0,
        };

        tracing::info!(story_id = %session.story_id, chapter_id = %root.chapter_id, "Story started");

        if StoryGraphNavigator::<S>::is_terminal(&root) {
            session.complete(nav, &root);
        }
        Ok(session)
    }

    /// Follow `choice_id` out of the current chapter.
    ///
    /// On error the session is left unchanged.
    pub fn select_choice<S: ContentStore + ?Sized>(
        &mut self,
        nav: &StoryGraphNavigator<'_, S>,
        choice_id: &str,
    ) -> Result<&SessionState> {
        let current = match &self.state {
            SessionState::AtChapter { chapter_id } => chapter_id.clone(),
            SessionState::Completed { .. } => {
                return Err(Error::SessionCompleted(self.story_id.clone()))
            }
        };

        let next_id = nav.resolve_choice(&current, choice_id)?;
        let next = nav.get_chapter(&next_id)?;

        if next.story_id != self.story_id {
            tracing::warn!(
                story_id = %self.story_id,
                chapter_id = %next.chapter_id,
                chapter_story = %next.story_id,
                "Choice leads into another story"
            );
        }

        self.visited.push(current);
        self.choices_taken += 1;

        if StoryGraphNavigator::<S>::is_terminal(&next) {
            self.complete(nav, &next);
        } else {
            tracing::debug!(
                story_id = %self.story_id,
                choice_id,
                chapter_id = %next.chapter_id,
                "Choice taken"
            );
            self.progress = nav.progress(self.choices_taken);
            self.state = SessionState::AtChapter {
                chapter_id: next.chapter_id,
            };
        }

        Ok(&self.state)
    }

    fn complete<S: ContentStore + ?Sized>(
        &mut self,
        nav: &StoryGraphNavigator<'_, S>,
        terminal: &Chapter,
    ) {
        let expected = nav.config().final_chapter_number;
        if terminal.chapter_number != expected {
            tracing::warn!(
                story_id = %self.story_id,
                chapter_id = %terminal.chapter_id,
                chapter_number = terminal.chapter_number,
                expected,
                "Terminal chapter has unexpected chapter number"
            );
        }

        self.visited.push(terminal.chapter_id.clone());
        self.progress = 100;
        self.state = SessionState::Completed {
            story_id: self.story_id.clone(),
            chapter_id: terminal.chapter_id.clone(),
        };

        tracing::info!(
            story_id = %self.story_id,
            chapter_id = %terminal.chapter_id,
            choices_taken = self.choices_taken,
            "Story completed"
        );
    }

    pub fn story_id(&self) -> &str {
        &self.story_id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.state, SessionState::Completed { .. })
    }

    /// The chapter being read, or the terminal chapter once completed.
    pub fn current_chapter_id(&self) -> &str {
        match &self.state {
            SessionState::AtChapter { chapter_id } => chapter_id,
            SessionState::Completed { chapter_id, .. } => chapter_id,
        }
    }

    pub fn visited_chapters(&self) -> &[String] {
        &self.visited
    }

    pub fn choices_taken(&self) -> u32 {
        self.choices_taken
    }

    /// 0-100; see [`StoryGraphNavigator::progress_percentage`]
    pub fn progress(&self) -> u8 {
        self.progress
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoryConfig;
    use crate::store::MemoryStore;
    use crate::types::{Choice, JlptLevel, Story};

    fn add_chapter(store: &MemoryStore, id: &str, number: u32, edges: &[(&str, &str)]) {
        store.insert_chapter(Chapter {
            chapter_id: id.to_string(),
            story_id: "1".to_string(),
            parent_chapter_id: None,
            chapter_number: number,
            depth_level: number - 1,
            content: format!("{} content", id),
            translation: None,
            choices: edges
                .iter()
                .enumerate()
                .map(|(i, (choice_id, to))| Choice {
                    choice_id: choice_id.to_string(),
                    chapter_id: id.to_string(),
                    choice_text: choice_id.to_string(),
                    next_chapter_id: to.to_string(),
                    display_order: i as u32,
                })
                .collect(),
        });
    }

    fn story_store(root: &str) -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_story(Story {
            story_id: "1".to_string(),
            title: "Test".to_string(),
            description: String::new(),
            level_jlpt: JlptLevel::N5,
            level_cefr: None,
            estimated_minutes: 5,
            root_chapter_id: root.to_string(),
        });
        add_chapter(&store, "ch-1-1", 1, &[("a", "ch-1-2"), ("b", "ch-1-5")]);
        add_chapter(&store, "ch-1-2", 2, &[("c", "ch-1-3")]);
        add_chapter(&store, "ch-1-3", 3, &[]);
        add_chapter(&store, "ch-1-5", 5, &[]);
        store
    }

    #[test]
    fn test_walk_to_completion() {
        let store = story_store("ch-1-1");
        let nav = StoryGraphNavigator::new(&store);
        let mut session = StorySession::start(&nav, "1").unwrap();
        assert_eq!(session.current_chapter_id(), "ch-1-1");
        assert_eq!(session.progress(), 0);

        session.select_choice(&nav, "a").unwrap();
        assert_eq!(session.current_chapter_id(), "ch-1-2");
        assert_eq!(session.progress(), 20);
        assert!(!session.is_completed());

        let state = session.select_choice(&nav, "c").unwrap().clone();
        assert_eq!(
            state,
            SessionState::Completed {
                story_id: "1".to_string(),
                chapter_id: "ch-1-3".to_string()
            }
        );
        assert_eq!(session.progress(), 100);
        assert_eq!(session.choices_taken(), 2);
        assert_eq!(session.visited_chapters(), &["ch-1-1", "ch-1-2", "ch-1-3"]);
    }

    #[test]
    fn test_completed_session_rejects_choices() {
        let store = story_store("ch-1-1");
        let nav = StoryGraphNavigator::new(&store);
        let mut session = StorySession::start(&nav, "1").unwrap();
        session.select_choice(&nav, "b").unwrap();
        assert!(session.is_completed());

        assert!(matches!(
            session.select_choice(&nav, "a"),
            Err(Error::SessionCompleted(id)) if id == "1"
        ));
    }

    #[test]
    fn test_invalid_choice_leaves_session_unchanged() {
        let store = story_store("ch-1-1");
        let nav = StoryGraphNavigator::new(&store);
        let mut session = StorySession::start(&nav, "1").unwrap();

        assert!(session.select_choice(&nav, "c").is_err());
        assert_eq!(session.current_chapter_id(), "ch-1-1");
        assert_eq!(session.choices_taken(), 0);
        assert!(session.visited_chapters().is_empty());
    }

    #[test]
    fn test_dangling_target_is_not_found() {
        let store = story_store("ch-1-1");
        add_chapter(&store, "ch-1-1", 1, &[("x", "ch-1-missing")]);
        let nav = StoryGraphNavigator::new(&store);
        let mut session = StorySession::start(&nav, "1").unwrap();

        let err = session.select_choice(&nav, "x").unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(session.choices_taken(), 0);
    }

    #[test]
    fn test_terminal_root_completes_immediately() {
        let store = story_store("ch-1-3");
        let nav = StoryGraphNavigator::new(&store);
        let session = StorySession::start(&nav, "1").unwrap();
        assert!(session.is_completed());
        assert_eq!(session.visited_chapters(), &["ch-1-3"]);
    }

    #[test]
    fn test_chapter_number_does_not_decide_completion() {
        // ch-1-3 is terminal at chapter_number 3; a custom final number of
        // 3 or the default of 5 must not matter.
        let store = story_store("ch-1-1");
        for final_number in [3, 5] {
            let nav = StoryGraphNavigator::with_config(
                &store,
                StoryConfig {
                    final_chapter_number: final_number,
                    ..StoryConfig::default()
                },
            );
            let mut session = StorySession::start(&nav, "1").unwrap();
            session.select_choice(&nav, "a").unwrap();
            session.select_choice(&nav, "c").unwrap();
            assert!(session.is_completed());
        }
    }

    #[test]
    fn test_missing_story() {
        let store = story_store("ch-1-1");
        let nav = StoryGraphNavigator::new(&store);
        assert!(matches!(
            StorySession::start(&nav, "2"),
            Err(Error::StoryNotFound(_))
        ));
    }
}
