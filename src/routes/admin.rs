//! Authoring API: stories, lines and annotations

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::annotations::{
    Annotation, AnnotationClearer, AnnotationEdit, AnnotationEditor, AnnotationStore,
    EditOutcome, Footnote, NewAnnotation, NewLineAnnotations,
};
use crate::error::Result;
use crate::state::AppState;
use crate::stories::{NewStory, NewStoryLine, StoryStore};

/// Create the admin router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stories", post(create_story))
        .route("/stories/:id", delete(delete_story))
        .route("/stories/:id/lines", put(replace_lines))
        .route(
            "/stories/:id/annotations",
            put(edit_annotation).delete(clear_story_annotations),
        )
        .route(
            "/stories/:id/lines/:line/annotations",
            post(add_annotation).delete(clear_line_annotations),
        )
        .route("/stories/:id/lines/:line/annotations/batch", post(add_annotations))
        .route("/grammar-points", post(create_grammar_point))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatedStory {
    story_id: i64,
}

#[derive(Deserialize)]
struct ReplaceLinesRequest {
    lines: Vec<NewStoryLine>,
}

#[derive(Serialize)]
struct CreatedFootnotes {
    footnotes: Vec<Footnote>,
}

#[derive(Serialize)]
struct Cleared {
    deleted: u64,
}

#[derive(Deserialize)]
struct CreateGrammarPoint {
    name: String,
    description: Option<String>,
}

#[derive(Serialize)]
struct CreatedGrammarPoint {
    id: i64,
}

/// Create a story with its lines
async fn create_story(
    State(state): State<AppState>,
    Json(story): Json<NewStory>,
) -> Result<(StatusCode, Json<CreatedStory>)> {
    let story_id = StoryStore::new(state.db()).create_story(&story).await?;
    Ok((StatusCode::CREATED, Json(CreatedStory { story_id })))
}

/// Re-save a story's text
async fn replace_lines(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<ReplaceLinesRequest>,
) -> Result<StatusCode> {
    StoryStore::new(state.db())
        .replace_lines(id, &request.lines)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete a story and everything it owns
async fn delete_story(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode> {
    AnnotationClearer::new(state.db()).delete_story(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Add one annotation to a line
async fn add_annotation(
    State(state): State<AppState>,
    Path((id, line)): Path<(i64, i64)>,
    Json(annotation): Json<NewAnnotation>,
) -> Result<(StatusCode, Json<Annotation>)> {
    let store = AnnotationStore::new(state.db(), state.config().dedup);
    let created = store.insert(id, line, &annotation).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Add a batch of annotations to a line
async fn add_annotations(
    State(state): State<AppState>,
    Path((id, line)): Path<(i64, i64)>,
    Json(batch): Json<NewLineAnnotations>,
) -> Result<(StatusCode, Json<CreatedFootnotes>)> {
    let store = AnnotationStore::new(state.db(), state.config().dedup);
    let footnotes = store.add_line_annotations(id, line, &batch).await?;
    Ok((StatusCode::CREATED, Json(CreatedFootnotes { footnotes })))
}

/// Edit annotations selected by position, word or footnote ID
async fn edit_annotation(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(edit): Json<AnnotationEdit>,
) -> Result<Json<EditOutcome>> {
    let outcome = AnnotationEditor::new(state.db()).edit(id, &edit).await?;
    Ok(Json(outcome))
}

/// Clear every annotation of a story
async fn clear_story_annotations(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Cleared>> {
    let deleted = AnnotationClearer::new(state.db()).clear_story(id).await?;
    Ok(Json(Cleared { deleted }))
}

/// Clear every annotation on one line
async fn clear_line_annotations(
    State(state): State<AppState>,
    Path((id, line)): Path<(i64, i64)>,
) -> Result<Json<Cleared>> {
    let deleted = AnnotationClearer::new(state.db())
        .clear_line(id, line)
        .await?;
    Ok(Json(Cleared { deleted }))
}

async fn create_grammar_point(
    State(state): State<AppState>,
    Json(request): Json<CreateGrammarPoint>,
) -> Result<(StatusCode, Json<CreatedGrammarPoint>)> {
    let id = StoryStore::new(state.db())
        .create_grammar_point(&request.name, request.description.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(CreatedGrammarPoint { id })))
}
