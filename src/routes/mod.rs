//! Route modules for the Story Annotator server

pub mod admin;
pub mod health;
pub mod stories;

use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the full application router
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/stories", stories::router())
        .nest("/api/admin", admin::router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::db::test_support::memory_pool;

    async fn test_app() -> Router {
        app(AppState::new(Config::default(), memory_pool().await))
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn create_story(app: &Router) -> i64 {
        let (status, body) = send(
            app,
            "POST",
            "/api/admin/stories",
            Some(json!({
                "weekNumber": 1,
                "dayLetter": "a",
                "title": {"en": "Breakfast"},
                "author": {"id": "a1", "name": "Author"},
                "lines": [{"text": "I eat rice."}, {"text": "Good."}]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["storyId"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = test_app().await;
        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["database"], "ok");
    }

    #[tokio::test]
    async fn test_annotate_render_and_check() {
        let app = test_app().await;
        let id = create_story(&app).await;

        let vocab = json!({"kind": "vocabulary", "word": "eat", "lexicalForm": "eat (v.)", "position": [2, 5]});
        let uri = format!("/api/admin/stories/{}/lines/1/annotations", id);
        let (status, _) = send(&app, "POST", &uri, Some(vocab.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, body) = send(&app, "POST", &uri, Some(vocab)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "already_exists");

        let (status, body) = send(
            &app,
            "GET",
            &format!("/api/stories/{}/lines/1/render?mode=vocabulary", id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["segments"], json!(["I ", "<BLANK>", " rice."]));
        assert_eq!(body["vocabularyBank"], json!(["eat (v.)"]));

        let (status, body) = send(
            &app,
            "GET",
            &format!("/api/stories/{}/render", id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["lines"][0]["segments"], json!(["I eat rice."]));

        let check = format!("/api/stories/{}/check-vocab", id);
        let (status, body) = send(
            &app,
            "POST",
            &check,
            Some(json!({"answers": [{"lineNumber": 0, "answers": ["eat (v.)"]}]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["results"][0]["correct"], true);

        let (status, body) = send(
            &app,
            "POST",
            &check,
            Some(json!({"answers": [{"lineNumber": 0, "answers": []}]})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["expectedAnswers"], json!({"0": 1, "1": 0}));
    }

    #[tokio::test]
    async fn test_edit_clear_and_delete() {
        let app = test_app().await;
        let id = create_story(&app).await;

        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/admin/stories/{}/lines/1/annotations/batch", id),
            Some(json!({
                "vocabulary": [{"word": "rice", "lexicalForm": "rise", "position": [6, 10]}],
                "footnotes": [{"text": "staple", "references": ["1"]}]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let annotations = format!("/api/admin/stories/{}/annotations", id);
        let (status, body) = send(
            &app,
            "PUT",
            &annotations,
            Some(json!({"selector": "vocabularyByWord", "lineNumber": 1, "word": "rice", "lexicalForm": "rice (n.)"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["updated"], 1);

        let (_, story) = send(&app, "GET", &format!("/api/stories/{}", id), None).await;
        assert_eq!(story["lines"][0]["vocabulary"][0]["lexicalForm"], "rice (n.)");

        let (status, body) = send(&app, "DELETE", &annotations, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["deleted"], 3);

        let (status, _) = send(&app, "DELETE", &format!("/api/admin/stories/{}", id), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, body) = send(&app, "GET", &format!("/api/stories/{}", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
    }
}
