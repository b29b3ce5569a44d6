//! Chapter and choice resolution over a [`ContentStore`].

use crate::config::StoryConfig;
use crate::error::{Error, Result};
use crate::store::{require_chapter, require_story, ContentStore};
use crate::types::{percent, Chapter, Choice, Story};

/// Read-only traversal helper. Holds no position; see
/// [`super::StorySession`] for that.
pub struct StoryGraphNavigator<'a, S: ContentStore + ?Sized> {
    store: &'a S,
    config: StoryConfig,
}

impl<'a, S: ContentStore + ?Sized> StoryGraphNavigator<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self::with_config(store, StoryConfig::default())
    }

    pub fn with_config(store: &'a S, config: StoryConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &StoryConfig {
        &self.config
    }

    pub fn store(&self) -> &'a S {
        self.store
    }

    pub fn get_story(&self, story_id: &str) -> Result<Story> {
        require_story(self.store, story_id)
    }

    pub fn get_chapter(&self, chapter_id: &str) -> Result<Chapter> {
        require_chapter(self.store, chapter_id)
    }

    /// The story's entry chapter.
    pub fn root_chapter(&self, story: &Story) -> Result<Chapter> {
        self.get_chapter(&story.root_chapter_id)
    }

    /// Destination of `choice_id` when taken from `chapter_id`.
    ///
    /// Fails with [`Error::InvalidChoice`] unless the choice is one of that
    /// chapter's own outgoing edges.
    pub fn resolve_choice(&self, chapter_id: &str, choice_id: &str) -> Result<String> {
        let chapter = self.get_chapter(chapter_id)?;
        Self::resolve_in(&chapter, choice_id)
    }

    /// Same as [`Self::resolve_choice`] on an already-loaded chapter.
    pub fn resolve_in(chapter: &Chapter, choice_id: &str) -> Result<String> {
        chapter
            .choices
            .iter()
            .find(|c| c.choice_id == choice_id)
            .map(|c| c.next_chapter_id.clone())
            .ok_or_else(|| Error::InvalidChoice {
                chapter_id: chapter.chapter_id.clone(),
                choice_id: choice_id.to_string(),
            })
    }

    /// A chapter ends its story exactly when it has no outgoing choices.
    pub fn is_terminal(chapter: &Chapter) -> bool {
        chapter.choices.is_empty()
    }

    /// Approximate progress after `choices_taken` steps of an assumed
    /// `total_steps`-step path. Branches of different depth make this a
    /// display hint only.
    pub fn progress_percentage(choices_taken: u32, total_steps: u32) -> u8 {
        percent(choices_taken as u64, total_steps.max(1) as u64)
    }

    /// [`Self::progress_percentage`] with the configured step count.
    pub fn progress(&self, choices_taken: u32) -> u8 {
        Self::progress_percentage(choices_taken, self.config.assumed_total_steps)
    }

    /// Choices in presentation order.
    pub fn sorted_choices(chapter: &Chapter) -> Vec<&Choice> {
        let mut choices: Vec<&Choice> = chapter.choices.iter().collect();
        choices.sort_by(|a, b| {
            a.display_order
                .cmp(&b.display_order)
                .then_with(|| a.choice_id.cmp(&b.choice_id))
        });
        choices
    }
}
