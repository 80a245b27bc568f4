pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
pub mod storage;

use axum::{
    Json, Router,
    http::{
        HeaderName, HeaderValue, Method,
        header::{ACCEPT, CONTENT_TYPE},
    },
    routing::{get, post},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{auth::USER_ID_HEADER, config::Config, storage::Storage};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Storage>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn Storage>, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    let origins = state
        .config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect::<Vec<_>>();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            ACCEPT,
            CONTENT_TYPE,
            HeaderName::from_static(USER_ID_HEADER),
        ]);

    // Post routes
    let post_routes = Router::new()
        .route(
            "/api/posts",
            get(handlers::posts::get_front_page).post(handlers::posts::create_post),
        )
        .route(
            "/api/r/{subreddit}/posts",
            get(handlers::posts::get_subreddit_posts),
        )
        .route(
            "/api/posts/{post_id}",
            get(handlers::posts::get_post)
                .put(handlers::posts::update_post)
                .delete(handlers::posts::remove_post),
        )
        .route(
            "/api/posts/{post_id}/vote",
            post(handlers::posts::vote_post),
        )
        .route(
            "/api/posts/{post_id}/comments",
            get(handlers::posts::get_post_comments),
        );

    // Comment routes
    let comment_routes = Router::new()
        .route("/api/comments", post(handlers::comments::create_comment))
        .route(
            "/api/comments/{comment_id}",
            get(handlers::comments::get_comment)
                .put(handlers::comments::update_comment)
                .delete(handlers::comments::remove_comment),
        )
        .route(
            "/api/comments/{comment_id}/children",
            get(handlers::comments::get_children),
        )
        .route(
            "/api/comments/{comment_id}/thread",
            get(handlers::comments::get_thread),
        )
        .route(
            "/api/comments/{comment_id}/vote",
            post(handlers::comments::vote_comment),
        )
        .route(
            "/api/users/{user_id}/comments",
            get(handlers::comments::get_user_comments),
        );

    // Vote ledger routes
    let vote_routes = Router::new()
        .route(
            "/api/votes/{target_id}",
            get(handlers::votes::get_votes_by_target),
        )
        .route(
            "/api/users/{user_id}/votes",
            get(handlers::votes::get_votes_by_user),
        )
        .route(
            "/api/users/{user_id}/votes/{target_id}",
            get(handlers::votes::get_user_vote),
        );

    Router::new()
        .route("/health", get(health))
        .merge(post_routes)
        .merge(comment_routes)
        .merge(vote_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
