use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::ApiResult;
use crate::app::AppState;
use crate::error::Error;
use crate::models::User;

#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
}

#[tracing::instrument(skip_all)]
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUser>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(body) = payload?;
    let user = User::create(&state.pool, &body.name, &body.email).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": user,
            "message": "User created successfully",
        })),
    ))
}

pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let users = User::get_all(&state.pool).await?;
    Ok(Json(json!({ "total": users.len(), "users": users })))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> ApiResult<Json<User>> {
    let user = User::get(&state.pool, user_id)
        .await?
        .ok_or(Error::NotFound("User"))?;
    Ok(Json(user))
}

#[tracing::instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> ApiResult<Json<Value>> {
    if !User::delete(&state.pool, user_id).await? {
        return Err(Error::NotFound("User").into());
    }

    Ok(Json(json!({
        "success": true,
        "message": "User deleted successfully",
    })))
}
