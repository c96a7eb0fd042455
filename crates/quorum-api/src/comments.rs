use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::info;
use uuid::Uuid;

use quorum_db::queries::comments::{CommentOutcome, NewComment};
use quorum_types::api::{Claims, CommentResponse, CreateCommentRequest};
use quorum_types::validate;

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::views::comment_response;
use crate::{AppState, blocking};

/// Every comment on a post in thread order: each parent is followed by its
/// replies, oldest first.
pub async fn list_comments(
    State(state): State<AppState>,
    ApiPath(post_id): ApiPath<Uuid>,
) -> Result<Json<Vec<CommentResponse>>, ApiError> {
    let rows = blocking(&state, move |db| {
        let id = post_id.to_string();
        if db.get_post(&id)?.is_none() {
            return Err(ApiError::NotFound(format!("post {post_id} not found")));
        }
        Ok(db.list_comments(&id)?)
    })
    .await?;

    Ok(Json(rows.into_iter().map(comment_response).collect()))
}

pub async fn create_comment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let content = validate::comment(&req.content)?;
    let post_id = req.post_id;
    let parent_id = req.parent_id;
    let author_id = claims.sub.to_string();

    let row = blocking(&state, move |db| {
        let parent = parent_id.map(|p| p.to_string());
        let outcome = db.insert_comment(&NewComment {
            post_id: &post_id.to_string(),
            author_id: &author_id,
            content: &content,
            parent_id: parent.as_deref(),
        })?;

        match outcome {
            CommentOutcome::Created(row) => Ok(row),
            CommentOutcome::PostNotFound => {
                Err(ApiError::NotFound(format!("post {post_id} not found")))
            }
            CommentOutcome::ParentNotFound => Err(ApiError::NotFound(
                "parent comment not found on this post".into(),
            )),
        }
    })
    .await?;

    info!(comment_id = %row.id, %post_id, depth = row.depth, "Comment posted");
    Ok((StatusCode::CREATED, Json(comment_response(row))))
}
