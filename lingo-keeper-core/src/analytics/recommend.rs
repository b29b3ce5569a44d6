//! Story recommendation
//!
//! Picks an uncompleted story near the learner's level. Randomness is
//! always injected, so a seeded RNG gives reproducible picks.

use crate::config::RecommendationConfig;
use crate::types::{percent, JlptLevel, LearnerLevel, Story};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::collections::HashSet;

/// Which tier produced a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationReason {
    /// A story at the learner's recommended next level
    NextLevel,
    /// Nothing left at the next level; a story at the current level
    CurrentLevel,
    /// Nothing left near the learner; any uncompleted story
    AnyUncompleted,
}

impl RecommendationReason {
    pub fn description(&self) -> &'static str {
        match self {
            RecommendationReason::NextLevel => "matches your next level",
            RecommendationReason::CurrentLevel => "matches your current level",
            RecommendationReason::AnyUncompleted => "not yet read",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub story: Story,
    pub reason: RecommendationReason,
}

/// Pick one uncompleted story. `None` once everything is completed.
pub fn recommend_story<R: Rng + ?Sized>(
    stories: &[Story],
    completed: &HashSet<String>,
    learner: &LearnerLevel,
    rng: &mut R,
) -> Option<Recommendation> {
    let uncompleted: Vec<&Story> = stories
        .iter()
        .filter(|s| !completed.contains(&s.story_id))
        .collect();

    if uncompleted.is_empty() {
        tracing::info!("All stories completed");
        return None;
    }

    let tiers = [
        (
            RecommendationReason::NextLevel,
            Some(learner.recommended_next_level),
        ),
        (
            RecommendationReason::CurrentLevel,
            Some(learner.current_level),
        ),
        (RecommendationReason::AnyUncompleted, None),
    ];

    for (reason, level) in tiers {
        let candidates: Vec<&Story> = uncompleted
            .iter()
            .copied()
            .filter(|s| level.map_or(true, |l| s.level_jlpt == l))
            .collect();

        if let Some(story) = candidates.choose(rng) {
            tracing::info!(
                story_id = %story.story_id,
                level = %story.level_jlpt,
                ?reason,
                "Recommended story selected"
            );
            return Some(Recommendation {
                story: (*story).clone(),
                reason,
            });
        }
    }

    None
}

/// Up to `max_count` uncompleted stories within one level of the learner's
/// recommended level, in random order.
pub fn recommend_stories<R: Rng + ?Sized>(
    stories: &[Story],
    completed: &HashSet<String>,
    learner: &LearnerLevel,
    max_count: usize,
    rng: &mut R,
) -> Vec<Story> {
    let target = learner.recommended_next_level.rank() as i32;

    let mut relevant: Vec<Story> = stories
        .iter()
        .filter(|s| !completed.contains(&s.story_id))
        .filter(|s| (s.level_jlpt.rank() as i32 - target).abs() <= 1)
        .cloned()
        .collect();

    relevant.shuffle(rng);
    relevant.truncate(max_count);

    tracing::info!(
        count = relevant.len(),
        recommended_level = %learner.recommended_next_level,
        "Recommended stories list generated"
    );

    relevant
}

/// Stories at `target`, or at `target` and every easier level.
pub fn filter_stories_by_level(
    stories: &[Story],
    target: JlptLevel,
    include_easier: bool,
) -> Vec<Story> {
    stories
        .iter()
        .filter(|s| {
            if include_easier {
                s.level_jlpt <= target
            } else {
                s.level_jlpt == target
            }
        })
        .cloned()
        .collect()
}

/// Completed stories as a rounded percentage of the catalog.
pub fn overall_completion(completed: usize, total: usize) -> u8 {
    percent(completed as u64, total as u64)
}

/// Recommendation entry point holding its own RNG.
pub struct RecommendationSelector {
    rng: ChaCha8Rng,
    max_suggestions: usize,
}

impl RecommendationSelector {
    /// Seeded from `config.seed`, or from OS entropy when unset.
    pub fn new(config: &RecommendationConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            rng,
            max_suggestions: config.max_suggestions,
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::new(&RecommendationConfig {
            seed: Some(seed),
            ..RecommendationConfig::default()
        })
    }

    pub fn pick(
        &mut self,
        stories: &[Story],
        completed: &HashSet<String>,
        learner: &LearnerLevel,
    ) -> Option<Recommendation> {
        recommend_story(stories, completed, learner, &mut self.rng)
    }

    pub fn suggestions(
        &mut self,
        stories: &[Story],
        completed: &HashSet<String>,
        learner: &LearnerLevel,
    ) -> Vec<Story> {
        recommend_stories(
            stories,
            completed,
            learner,
            self.max_suggestions,
            &mut self.rng,
        )
    }

    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }
}
