//! Stories: numbered lines of text plus per-story metadata
//!
//! Annotations hang off `(story_id, line_number)`; this module owns the
//! lines themselves and assembles full stories for rendering and practice.

mod repository;
mod store;
mod types;

pub use repository::{LineRow, StoryRepository};
pub use store::StoryStore;
pub(crate) use store::line_not_found;
pub use types::*;
