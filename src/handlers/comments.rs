use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    AppState,
    auth::ActingUser,
    error::{AppError, Result},
    handlers::posts::GetCommentsQuery,
    models::{
        Comment, CreateCommentRequest, UpdateCommentRequest, VoteOutcome, VoteRequest, VoteTarget,
        VoteValue,
    },
    services::{comment_service, vote_service},
};

#[derive(Debug, Deserialize)]
pub struct GetThreadQuery {
    pub depth: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<u32>,
}

pub async fn create_comment(
    State(state): State<AppState>,
    user: ActingUser,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Comment>)> {
    let comment =
        comment_service::create_comment(state.store.as_ref(), user.user_id, &payload).await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn get_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
) -> Result<Json<Comment>> {
    let comment = comment_service::get_comment(state.store.as_ref(), comment_id).await?;
    Ok(Json(comment))
}

pub async fn update_comment(
    State(state): State<AppState>,
    user: ActingUser,
    Path(comment_id): Path<Uuid>,
    Json(payload): Json<UpdateCommentRequest>,
) -> Result<Json<Comment>> {
    let existing = comment_service::get_comment(state.store.as_ref(), comment_id).await?;

    // Check ownership
    if existing.author_id != user.user_id {
        return Err(AppError::Authorization(
            "You can only edit your own comments".to_string(),
        ));
    }

    let comment =
        comment_service::update_comment(state.store.as_ref(), comment_id, &payload).await?;
    Ok(Json(comment))
}

pub async fn remove_comment(
    State(state): State<AppState>,
    user: ActingUser,
    Path(comment_id): Path<Uuid>,
) -> Result<Json<Value>> {
    let existing = comment_service::get_comment(state.store.as_ref(), comment_id).await?;

    if existing.author_id != user.user_id {
        return Err(AppError::Authorization(
            "You can only remove your own comments".to_string(),
        ));
    }

    comment_service::remove_comment(state.store.as_ref(), comment_id).await?;

    Ok(Json(json!({
        "message": "Comment removed successfully"
    })))
}

pub async fn get_children(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
    Query(params): Query<GetCommentsQuery>,
) -> Result<Json<Value>> {
    let sort = params.sort.unwrap_or_default();
    let limit = state.config.page_limit(
        params.limit,
        comment_service::DEFAULT_CHILDREN_LIMIT as u32,
    );

    let comments =
        comment_service::get_children(state.store.as_ref(), comment_id, sort, limit).await?;

    Ok(Json(json!({
        "comments": comments,
        "parent_id": comment_id
    })))
}

pub async fn get_thread(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
    Query(params): Query<GetThreadQuery>,
) -> Result<Json<Value>> {
    let max_depth = params.depth.unwrap_or(state.config.thread_max_depth);

    let thread = comment_service::get_thread(state.store.as_ref(), comment_id, max_depth)
        .await?
        .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;

    Ok(Json(json!({
        "thread": thread,
        "root_id": comment_id,
        "max_depth": max_depth
    })))
}

pub async fn vote_comment(
    State(state): State<AppState>,
    user: ActingUser,
    Path(comment_id): Path<Uuid>,
    Json(payload): Json<VoteRequest>,
) -> Result<Json<VoteOutcome>> {
    let value = VoteValue::try_from(payload.vote_type)?;

    let outcome = vote_service::cast_vote(
        state.store.as_ref(),
        user.user_id,
        VoteTarget::comment(comment_id),
        value,
    )
    .await?;

    Ok(Json(outcome))
}

pub async fn get_user_comments(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(params): Query<LimitQuery>,
) -> Result<Json<Value>> {
    let limit = state.config.page_limit(
        params.limit,
        comment_service::DEFAULT_USER_COMMENTS_LIMIT as u32,
    );

    let comments =
        comment_service::get_user_comments(state.store.as_ref(), user_id, limit).await?;

    Ok(Json(json!({
        "comments": comments,
        "user_id": user_id
    })))
}
