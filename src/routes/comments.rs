use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::analysis::percent_map;
use super::ApiResult;
use crate::app::AppState;
use crate::error::Error;
use crate::models::{to_percent, Comment, NewComment, Statistics};
use crate::validators::validate_text_length;

#[derive(Debug, Deserialize)]
pub struct CreateComment {
    pub user_id: i64,
    pub text: String,
}

/// Analyzes the text and stores it with its sentiment in one step.
#[tracing::instrument(skip_all)]
pub async fn create_comment(
    State(state): State<AppState>,
    payload: Result<Json<CreateComment>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(body) = payload?;
    // Invalid text is rejected before it reaches the classifier.
    validate_text_length(&body.text, &state.limits)?;

    let analysis = state.analyzer.analyze(&body.text)?;
    let comment = Comment::create(
        &state.pool,
        NewComment {
            user_id: body.user_id,
            text: body.text,
            sentiment: Some(analysis.sentiment),
            confidence: Some(analysis.confidence),
        },
        &state.limits,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": comment,
            "analysis": {
                "sentiment": analysis.sentiment,
                "confidence": to_percent(analysis.confidence),
                "probabilities": percent_map(&analysis.probabilities),
            },
            "message": "Comment created and analyzed successfully",
        })),
    ))
}

pub async fn list_comments(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let comments = Comment::get_all(&state.pool).await?;
    Ok(Json(json!({ "total": comments.len(), "comments": comments })))
}

pub async fn get_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<i64>,
) -> ApiResult<Json<Comment>> {
    let comment = Comment::get(&state.pool, comment_id)
        .await?
        .ok_or(Error::NotFound("Comment"))?;
    Ok(Json(comment))
}

pub async fn user_comments(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let comments = Comment::get_by_user(&state.pool, user_id).await?;
    Ok(Json(json!({ "total": comments.len(), "comments": comments })))
}

/// Unknown labels match nothing and yield an empty list.
pub async fn comments_by_sentiment(
    State(state): State<AppState>,
    Path(sentiment): Path<String>,
) -> ApiResult<Json<Value>> {
    let comments = Comment::get_by_sentiment(&state.pool, &sentiment).await?;
    Ok(Json(json!({
        "total": comments.len(),
        "comments": comments,
        "sentiment": sentiment,
    })))
}

pub async fn statistics(State(state): State<AppState>) -> ApiResult<Json<Statistics>> {
    Ok(Json(Comment::get_statistics(&state.pool).await?))
}
