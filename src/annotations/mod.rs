//! Position-anchored annotations on story lines
//!
//! - `types`: the interval model and the three annotation kinds
//! - `store`: deduplicating insert-or-reject writes
//! - `editor`: targeted replacement by position, word or footnote ID
//! - `clear`: per-line and per-story clearing, whole-story deletion

mod clear;
mod editor;
mod repository;
mod store;
mod types;

pub use clear::AnnotationClearer;
pub use editor::{AnnotationEdit, AnnotationEditor, EditOutcome};
pub use repository::AnnotationRepository;
pub use store::AnnotationStore;
pub use types::*;
