use axum::extract::State;
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::TextLimits;
use crate::pipeline::SentimentAnalyzer;
use crate::routes::{analysis, comments, users};

/// Shared by every handler. The analyzer is read-only once the server runs.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub analyzer: Arc<SentimentAnalyzer>,
    pub limits: TextLimits,
}

impl AppState {
    pub fn new(pool: SqlitePool, analyzer: SentimentAnalyzer, limits: TextLimits) -> Self {
        Self {
            pool,
            analyzer: Arc::new(analyzer),
            limits,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/users", post(users::create_user).get(users::list_users))
        .route(
            "/api/users/:id",
            get(users::get_user).delete(users::delete_user),
        )
        .route(
            "/api/comments",
            post(comments::create_comment).get(comments::list_comments),
        )
        .route("/api/comments/statistics", get(comments::statistics))
        .route("/api/comments/user/:id", get(comments::user_comments))
        .route(
            "/api/comments/sentiment/:sentiment",
            get(comments::comments_by_sentiment),
        )
        .route("/api/comments/:id", get(comments::get_comment))
        .route("/api/analyze", post(analysis::analyze_text))
        .route("/api/analyze/batch", post(analysis::analyze_batch))
        .route("/api/analyze/info", get(analysis::model_info))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "model_trained": state.analyzer.is_trained(),
    }))
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><title>Sentiment analysis</title></head>
<body>
<h1>Sentiment analysis system</h1>
<p>API working correctly</p>
<h2>Available endpoints:</h2>
<ul>
    <li>POST /api/users - Create user</li>
    <li>GET /api/users - List users</li>
    <li>GET /api/users/{id} - Get user</li>
    <li>DELETE /api/users/{id} - Delete user</li>
    <li>POST /api/comments - Create and analyze a comment</li>
    <li>GET /api/comments - List comments</li>
    <li>GET /api/comments/{id} - Get comment</li>
    <li>GET /api/comments/user/{id} - Comments of a user</li>
    <li>GET /api/comments/sentiment/{sentiment} - Filter by sentiment</li>
    <li>GET /api/comments/statistics - Statistics</li>
    <li>POST /api/analyze - Analyze text</li>
    <li>POST /api/analyze/batch - Analyze up to 100 texts</li>
    <li>GET /api/analyze/info - Model information</li>
    <li>GET /health - Health check</li>
</ul>
</body>
</html>
"#;
