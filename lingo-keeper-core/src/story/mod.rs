//! Branching story traversal
//!
//! A story is a directed graph of chapters joined by choices. Traversal
//! only ever follows choice edges; a chapter with no outgoing choices ends
//! the story.

pub mod audit;
pub mod navigator;
pub mod session;

pub use audit::{audit_story, AuditIssue, AuditReport};
pub use navigator::StoryGraphNavigator;
pub use session::{SessionState, StorySession};
