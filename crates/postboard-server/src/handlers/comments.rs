//! Comment handlers

use super::{ApiResult, PageQuery};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use postboard_core::{Comment, NewComment};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct CommentListResponse {
    comments: Vec<Comment>,
    page: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    author_id: String,
    #[serde(default)]
    parent_comment_id: Option<String>,
    body: String,
}

/// Top-level comments of a post
pub async fn list_for_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<CommentListResponse>> {
    let comments = state.comments.post_comments(&post_id, query.page).await?;
    Ok(Json(CommentListResponse {
        comments,
        page: query.page,
    }))
}

pub async fn create(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    Json(req_body): Json<CreateCommentRequest>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    let comment = state
        .comments
        .create_comment(NewComment {
            author_id: req_body.author_id,
            parent_post_id: post_id,
            parent_comment_id: req_body.parent_comment_id,
            body: req_body.body,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn replies(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<CommentListResponse>> {
    let comments = state.comments.replies(&id, query.page).await?;
    Ok(Json(CommentListResponse {
        comments,
        page: query.page,
    }))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Comment>> {
    Ok(Json(state.comments.get(&id).await?))
}

#[derive(Debug, Deserialize)]
pub struct UpdateCommentRequest {
    body: String,
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req_body): Json<UpdateCommentRequest>,
) -> ApiResult<Json<Comment>> {
    Ok(Json(state.comments.update_body(&id, req_body.body).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.comments.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
