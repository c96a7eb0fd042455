use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use quorum_db::queries::posts::{NewPost, PostFilter};
use quorum_types::api::{Claims, CreatePostRequest, PostResponse, PostVoteRequest, PostVoteResponse};
use quorum_types::{PostBody, PostKind, validate};

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::views::post_response;
use crate::{AppState, blocking};

const MAX_PAGE_SIZE: u32 = 200;

#[derive(Debug, Deserialize)]
pub struct PostQuery {
    /// Post kind or section name (`poll`, `polls`, `studies`, ...).
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Cursor-based pagination: pass the `created_at` of the oldest post from
    /// the previous page to fetch older posts. Must be an RFC 3339 timestamp.
    pub before: Option<DateTime<Utc>>,
}

fn default_limit() -> u32 {
    50
}

pub async fn list_posts(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PostQuery>,
) -> Result<Json<Vec<PostResponse>>, ApiError> {
    let kind = query
        .kind
        .as_deref()
        .filter(|k| !k.trim().is_empty())
        .map(str::parse::<PostKind>)
        .transpose()?;
    let limit = query.limit.clamp(1, MAX_PAGE_SIZE);
    let before = query.before;

    let rows = blocking(&state, move |db| {
        Ok(db.list_posts(&PostFilter {
            kind,
            limit,
            before,
        })?)
    })
    .await?;

    Ok(Json(rows.into_iter().map(post_response).collect()))
}

pub async fn get_post(
    State(state): State<AppState>,
    ApiPath(post_id): ApiPath<Uuid>,
) -> Result<Json<PostResponse>, ApiError> {
    let row = blocking(&state, move |db| Ok(db.get_post(&post_id.to_string())?))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("post {post_id} not found")))?;

    Ok(Json(post_response(row)))
}

pub async fn create_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let title = validate::title(&req.title)?;
    let body = PostBody::from_request(req.kind, &req.content)?;
    let image_url = validate::optional_url(req.image_url.as_deref())?;
    let source = validate::optional_url(req.source.as_deref())?;

    let post_id = Uuid::new_v4();
    let kind = req.kind;
    let author_id = claims.sub.to_string();
    let row = blocking(&state, move |db| {
        Ok(db.insert_post(&NewPost {
            id: &post_id.to_string(),
            author_id: &author_id,
            title: &title,
            body: &body,
            kind,
            image_url: image_url.as_deref(),
            source: source.as_deref(),
        })?)
    })
    .await?
    .ok_or_else(|| ApiError::NotFound("complete your profile before posting".into()))?;

    info!(%post_id, kind = %kind, author = %claims.username, "Post created");
    Ok((StatusCode::CREATED, Json(post_response(row))))
}

pub async fn vote_post(
    State(state): State<AppState>,
    ApiPath(post_id): ApiPath<Uuid>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<PostVoteRequest>,
) -> Result<Json<PostVoteResponse>, ApiError> {
    let delta = validate::vote_delta(req.delta)?;
    let caller = claims.sub.to_string();

    let votes = blocking(&state, move |db| {
        Ok(db.adjust_post_votes(&post_id.to_string(), &caller, delta)?)
    })
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("post {post_id} not found")))?;

    Ok(Json(PostVoteResponse { id: post_id, votes }))
}
