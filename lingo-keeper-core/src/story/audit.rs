//! Structural checks on story content
//!
//! Finds authoring mistakes that the navigator would only hit at read
//! time: choices into nowhere, unreachable chapters, and so on.

use crate::config::StoryConfig;
use crate::error::Result;
use crate::store::{require_story, ContentStore};
use crate::types::Chapter;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditIssue {
    /// The story's root chapter does not exist
    MissingRoot { root_chapter_id: String },
    /// A choice points at a chapter that does not exist
    DanglingChoice {
        chapter_id: String,
        choice_id: String,
        next_chapter_id: String,
    },
    /// A choice points at a chapter of a different story
    CrossStoryChoice {
        chapter_id: String,
        choice_id: String,
        next_chapter_id: String,
        target_story_id: String,
    },
    /// A choice listed under one chapter names another as its source
    MismatchedChoiceSource {
        chapter_id: String,
        choice_id: String,
        declared_chapter_id: String,
    },
    /// No path of choices leads here from the root
    Unreachable { chapter_id: String },
    /// Terminal chapter numbered differently from the configured final number
    TerminalNumberMismatch {
        chapter_id: String,
        chapter_number: u32,
        expected: u32,
    },
}

impl fmt::Display for AuditIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditIssue::MissingRoot { root_chapter_id } => {
                write!(f, "root chapter {} does not exist", root_chapter_id)
            }
            AuditIssue::DanglingChoice {
                chapter_id,
                choice_id,
                next_chapter_id,
            } => write!(
                f,
                "choice {} in {} leads to missing chapter {}",
                choice_id, chapter_id, next_chapter_id
            ),
            AuditIssue::CrossStoryChoice {
                chapter_id,
                choice_id,
                next_chapter_id,
                target_story_id,
            } => write!(
                f,
                "choice {} in {} leads to {} of story {}",
                choice_id, chapter_id, next_chapter_id, target_story_id
            ),
            AuditIssue::MismatchedChoiceSource {
                chapter_id,
                choice_id,
                declared_chapter_id,
            } => write!(
                f,
                "choice {} is listed under {} but declares source {}",
                choice_id, chapter_id, declared_chapter_id
            ),
            AuditIssue::Unreachable { chapter_id } => {
                write!(f, "chapter {} is unreachable from the root", chapter_id)
            }
            AuditIssue::TerminalNumberMismatch {
                chapter_id,
                chapter_number,
                expected,
            } => write!(
                f,
                "terminal chapter {} is numbered {} (expected {})",
                chapter_id, chapter_number, expected
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    pub story_id: String,
    pub chapters: usize,
    pub terminal_chapters: usize,
    pub issues: Vec<AuditIssue>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Check one story's chapter graph.
pub fn audit_story<S: ContentStore + ?Sized>(
    store: &S,
    story_id: &str,
    config: &StoryConfig,
) -> Result<AuditReport> {
    let story = require_story(store, story_id)?;
    let chapters: HashMap<String, Chapter> = store
        .list_chapters(story_id)?
        .into_iter()
        .map(|c| (c.chapter_id.clone(), c))
        .collect();

    let mut issues = Vec::new();

    // Edge checks, in a stable order
    let mut ordered: Vec<&Chapter> = chapters.values().collect();
    ordered.sort_by(|a, b| {
        a.chapter_number
            .cmp(&b.chapter_number)
            .then_with(|| a.chapter_id.cmp(&b.chapter_id))
    });

    for chapter in &ordered {
        for choice in &chapter.choices {
            if choice.chapter_id != chapter.chapter_id {
                issues.push(AuditIssue::MismatchedChoiceSource {
                    chapter_id: chapter.chapter_id.clone(),
                    choice_id: choice.choice_id.clone(),
                    declared_chapter_id: choice.chapter_id.clone(),
                });
            }
            if chapters.contains_key(&choice.next_chapter_id) {
                continue;
            }
            match store.get_chapter(&choice.next_chapter_id)? {
                Some(target) => issues.push(AuditIssue::CrossStoryChoice {
                    chapter_id: chapter.chapter_id.clone(),
                    choice_id: choice.choice_id.clone(),
                    next_chapter_id: choice.next_chapter_id.clone(),
                    target_story_id: target.story_id,
                }),
                None => issues.push(AuditIssue::DanglingChoice {
                    chapter_id: chapter.chapter_id.clone(),
                    choice_id: choice.choice_id.clone(),
                    next_chapter_id: choice.next_chapter_id.clone(),
                }),
            }
        }

        if chapter.choices.is_empty() && chapter.chapter_number != config.final_chapter_number {
            issues.push(AuditIssue::TerminalNumberMismatch {
                chapter_id: chapter.chapter_id.clone(),
                chapter_number: chapter.chapter_number,
                expected: config.final_chapter_number,
            });
        }
    }

    // Reachability from the root
    let mut reached: BTreeSet<&str> = BTreeSet::new();
    if chapters.contains_key(&story.root_chapter_id) {
        let mut queue = VecDeque::from([story.root_chapter_id.as_str()]);
        while let Some(id) = queue.pop_front() {
            if !reached.insert(id) {
                continue;
            }
            if let Some(chapter) = chapters.get(id) {
                for choice in &chapter.choices {
                    if chapters.contains_key(&choice.next_chapter_id) {
                        queue.push_back(choice.next_chapter_id.as_str());
                    }
                }
            }
        }
    } else {
        issues.push(AuditIssue::MissingRoot {
            root_chapter_id: story.root_chapter_id.clone(),
        });
    }

    for chapter in &ordered {
        if !reached.contains(chapter.chapter_id.as_str()) {
            issues.push(AuditIssue::Unreachable {
                chapter_id: chapter.chapter_id.clone(),
            });
        }
    }

    let report = AuditReport {
        story_id: story.story_id.clone(),
        chapters: chapters.len(),
        terminal_chapters: chapters.values().filter(|c| c.choices.is_empty()).count(),
        issues,
    };

    if !report.is_clean() {
        tracing::warn!(
            story_id = %report.story_id,
            issues = report.issues.len(),
            "Story content has structural issues"
        );
    }

    Ok(report)
}
