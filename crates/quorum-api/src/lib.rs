pub mod auth;
pub mod comments;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod polls;
pub mod posts;
pub mod users;
mod views;

use std::sync::Arc;

use axum::{
    Json, Router,
    middleware::from_fn_with_state,
    routing::{get, post, put},
};
use serde_json::{Value, json};
use tracing::error;

use quorum_db::Database;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
}

/// All REST routes. Reads are public, writes need a bearer token, and poll
/// results depend on who is asking.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/posts", get(posts::list_posts))
        .route("/api/posts/{id}", get(posts::get_post))
        .route("/api/comments/post/{post_id}", get(comments::list_comments))
        .route("/api/users/{id}", get(users::get_profile));

    let viewer_routes = Router::new()
        .route("/api/posts/{id}/poll", get(polls::get_results))
        .route_layer(from_fn_with_state(state.clone(), middleware::identify_viewer));

    let protected_routes = Router::new()
        .route("/api/posts", post(posts::create_post))
        .route("/api/posts/{id}/vote", post(posts::vote_post))
        .route("/api/posts/{id}/poll/vote", post(polls::cast_vote))
        .route("/api/comments", post(comments::create_comment))
        .route("/api/users/me", put(users::update_profile))
        .route_layer(from_fn_with_state(state.clone(), middleware::require_auth));

    Router::new()
        .route("/health", get(health))
        .merge(public_routes)
        .merge(viewer_routes)
        .merge(protected_routes)
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Run store work off the async runtime.
pub(crate) async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("blocking task failed: {e}"))
        })?
}
