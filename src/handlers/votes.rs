use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    AppState, error::Result, handlers::comments::LimitQuery, services::vote_service,
};

pub async fn get_votes_by_target(
    State(state): State<AppState>,
    Path(target_id): Path<Uuid>,
    Query(params): Query<LimitQuery>,
) -> Result<Json<Value>> {
    let limit = state.config.page_limit(
        params.limit,
        vote_service::DEFAULT_TARGET_VOTES_LIMIT as u32,
    );

    let votes = vote_service::get_votes_by_target(state.store.as_ref(), target_id, limit).await?;

    Ok(Json(json!({
        "votes": votes,
        "target_id": target_id
    })))
}

pub async fn get_votes_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(params): Query<LimitQuery>,
) -> Result<Json<Value>> {
    let limit = state.config.page_limit(
        params.limit,
        vote_service::DEFAULT_USER_VOTES_LIMIT as u32,
    );

    let votes = vote_service::get_votes_by_user(state.store.as_ref(), user_id, limit).await?;

    Ok(Json(json!({
        "votes": votes,
        "user_id": user_id
    })))
}

pub async fn get_user_vote(
    State(state): State<AppState>,
    Path((user_id, target_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>> {
    let value = vote_service::get_user_vote(state.store.as_ref(), user_id, target_id).await?;

    Ok(Json(json!({
        "user_id": user_id,
        "target_id": target_id,
        "value": value
    })))
}
