//! Learner-facing story API

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::practice::{AnswerResult, AnswerSubmission, LineView, PracticeService};
use crate::render::{RenderMode, RenderedStory};
use crate::state::AppState;
use crate::stories::{Story, StoryStore};

/// Create the stories router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:id", get(get_story))
        .route("/:id/render", get(render_story))
        .route("/:id/lines/:line/render", get(render_line))
        .route("/:id/check-vocab", post(check_vocab))
}

#[derive(Deserialize)]
struct RenderQuery {
    #[serde(default)]
    mode: RenderMode,
}

#[derive(Deserialize)]
struct CheckVocabRequest {
    answers: Vec<AnswerSubmission>,
}

#[derive(Serialize)]
struct CheckVocabResponse {
    results: Vec<AnswerResult>,
}

/// Get a story with every line and its annotations
async fn get_story(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Story>> {
    let story = StoryStore::new(state.db()).get_story(id).await?;
    Ok(Json(story))
}

/// Render every line of a story
async fn render_story(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<RenderQuery>,
) -> Result<Json<RenderedStory>> {
    let service = PracticeService::new(state.db(), &state.config().markers);
    Ok(Json(service.render_story(id, query.mode).await?))
}

/// Render one line
async fn render_line(
    State(state): State<AppState>,
    Path((id, line)): Path<(i64, i64)>,
    Query(query): Query<RenderQuery>,
) -> Result<Json<LineView>> {
    let service = PracticeService::new(state.db(), &state.config().markers);
    Ok(Json(service.render_line(id, line, query.mode).await?))
}

/// Check vocabulary answers
async fn check_vocab(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<CheckVocabRequest>,
) -> Result<Json<CheckVocabResponse>> {
    let service = PracticeService::new(state.db(), &state.config().markers);
    let results = service.validate_answers(id, &request.answers).await?;
    Ok(Json(CheckVocabResponse { results }))
}
