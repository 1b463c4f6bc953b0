//! Story Annotator
//!
//! Position-anchored vocabulary, grammar and footnote annotations on story
//! lines, rendered into practice views and checked against learner answers.

pub mod annotations;
pub mod config;
pub mod db;
pub mod error;
pub mod practice;
pub mod render;
pub mod routes;
pub mod state;
pub mod stories;

pub use config::Config;
pub use error::{AppError, Result};
pub use state::AppState;
