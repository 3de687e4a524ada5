//! Post handlers

use super::{ApiResult, PageQuery};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use postboard_core::{NewPost, Post, PostUpdate};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct PostListResponse {
    posts: Vec<Post>,
    page: usize,
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<PostListResponse>> {
    let posts = state.posts.list(query.page).await?;
    Ok(Json(PostListResponse {
        posts,
        page: query.page,
    }))
}

pub async fn create(
    State(state): State<AppState>,
    Json(req_body): Json<NewPost>,
) -> ApiResult<(StatusCode, Json<Post>)> {
    let post = state.posts.create(req_body).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Post>> {
    Ok(Json(state.posts.get(&id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req_body): Json<PostUpdate>,
) -> ApiResult<Json<Post>> {
    Ok(Json(state.posts.update(&id, req_body).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.posts.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
