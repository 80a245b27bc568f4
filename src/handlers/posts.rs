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
    models::{
        CommentSort, CreatePostRequest, Post, PostSort, UpdatePostRequest, VoteOutcome,
        VoteRequest, VoteTarget, VoteValue,
    },
    services::{listing_service, post_service, vote_service},
};

#[derive(Debug, Deserialize)]
pub struct GetPostsQuery {
    pub sort: Option<PostSort>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct GetCommentsQuery {
    pub sort: Option<CommentSort>,
    pub limit: Option<u32>,
}

pub async fn create_post(
    State(state): State<AppState>,
    user: ActingUser,
    Json(payload): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<Post>)> {
    let post = post_service::create_post(state.store.as_ref(), user.user_id, &payload).await?;

    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn get_front_page(
    State(state): State<AppState>,
    Query(params): Query<GetPostsQuery>,
) -> Result<Json<Value>> {
    let sort = params.sort.unwrap_or_default();
    let limit = state
        .config
        .page_limit(params.limit, state.config.default_page_size);

    let posts = listing_service::get_front_page(state.store.as_ref(), sort, limit).await?;

    Ok(Json(json!({
        "posts": posts,
        "sort": sort,
    })))
}

pub async fn get_subreddit_posts(
    State(state): State<AppState>,
    Path(subreddit): Path<String>,
    Query(params): Query<GetPostsQuery>,
) -> Result<Json<Value>> {
    let sort = params.sort.unwrap_or_default();
    let limit = state
        .config
        .page_limit(params.limit, state.config.default_page_size);

    let posts =
        listing_service::get_by_subreddit(state.store.as_ref(), &subreddit, sort, limit).await?;

    Ok(Json(json!({
        "posts": posts,
        "subreddit": subreddit,
        "sort": sort,
    })))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> Result<Json<Post>> {
    let post = post_service::get_post(state.store.as_ref(), post_id).await?;
    Ok(Json(post))
}

pub async fn update_post(
    State(state): State<AppState>,
    user: ActingUser,
    Path(post_id): Path<Uuid>,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<Json<Post>> {
    let existing = post_service::get_post(state.store.as_ref(), post_id).await?;

    // Check ownership
    if existing.author_id != user.user_id {
        return Err(AppError::Authorization(
            "You can only edit your own posts".to_string(),
        ));
    }

    let post = post_service::update_post(state.store.as_ref(), post_id, &payload).await?;
    Ok(Json(post))
}

pub async fn remove_post(
    State(state): State<AppState>,
    user: ActingUser,
    Path(post_id): Path<Uuid>,
) -> Result<Json<Value>> {
    let existing = post_service::get_post(state.store.as_ref(), post_id).await?;

    if existing.author_id != user.user_id {
        return Err(AppError::Authorization(
            "You can only remove your own posts".to_string(),
        ));
    }

    post_service::remove_post(state.store.as_ref(), post_id).await?;

    Ok(Json(json!({
        "message": "Post removed successfully"
    })))
}

pub async fn vote_post(
    State(state): State<AppState>,
    user: ActingUser,
    Path(post_id): Path<Uuid>,
    Json(payload): Json<VoteRequest>,
) -> Result<Json<VoteOutcome>> {
    let value = VoteValue::try_from(payload.vote_type)?;

    let outcome = vote_service::cast_vote(
        state.store.as_ref(),
        user.user_id,
        VoteTarget::post(post_id),
        value,
    )
    .await?;

    Ok(Json(outcome))
}

pub async fn get_post_comments(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Query(params): Query<GetCommentsQuery>,
) -> Result<Json<Value>> {
    let sort = params.sort.unwrap_or_default();
    let limit = state
        .config
        .page_limit(params.limit, listing_service::DEFAULT_COMMENTS_LIMIT as u32);

    let comments =
        listing_service::get_top_level_comments(state.store.as_ref(), post_id, sort, limit)
            .await?;

    Ok(Json(json!({
        "comments": comments,
        "post_id": post_id
    })))
}
