//! User handlers

use super::ApiResult;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use postboard_core::{NewUser, User};
use serde::Deserialize;

pub async fn create(
    State(state): State<AppState>,
    Json(req_body): Json<NewUser>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let user = state.users.create(req_body).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<User>> {
    Ok(Json(state.users.get(&id).await?))
}

pub async fn by_username(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.users.get_by_username(&username).await?))
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    email: String,
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req_body): Json<UpdateUserRequest>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.users.update_email(&id, req_body.email).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.users.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
