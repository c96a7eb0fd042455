use axum::{Extension, Json, extract::State};
use uuid::Uuid;

use quorum_db::Database;
use quorum_db::queries::polls::{PollOutcome, PollSnapshot, VoteOutcome};
use quorum_types::api::{Claims, PollChoice, PollResults, PollVoteRequest, PollVoteResponse};
use quorum_types::poll::results_for_viewer;

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::Viewer;
use crate::{AppState, blocking};

/// Poll options for anyone; counts and percentages only for viewers who voted.
pub async fn get_results(
    State(state): State<AppState>,
    ApiPath(post_id): ApiPath<Uuid>,
    Extension(viewer): Extension<Viewer>,
) -> Result<Json<PollResults>, ApiError> {
    let viewer_id = viewer.user_id().map(|id| id.to_string());
    let results = blocking(&state, move |db| {
        let snapshot = snapshot(db, post_id, viewer_id.as_deref())?;
        Ok(results_for_viewer(post_id, &snapshot.options, &snapshot.counts, snapshot.voted))
    })
    .await?;

    Ok(Json(results))
}

/// Vote once on a poll, either for a listed option or with a write-in.
/// Voting again is not an error; the response reports `already_voted`.
pub async fn cast_vote(
    State(state): State<AppState>,
    ApiPath(post_id): ApiPath<Uuid>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<PollVoteRequest>,
) -> Result<Json<PollVoteResponse>, ApiError> {
    let choice = req.into_choice()?;
    let caller = claims.sub.to_string();

    let response = blocking(&state, move |db| {
        let id = post_id.to_string();
        let outcome = match &choice {
            PollChoice::Option(option_id) => db.cast_poll_vote(&id, &caller, option_id)?,
            PollChoice::WriteIn(text) => db.cast_write_in(&id, &caller, text)?,
        };

        let already_voted = match unwrap_poll(outcome, post_id)? {
            VoteOutcome::Recorded { .. } => false,
            VoteOutcome::AlreadyVoted => true,
            VoteOutcome::UnknownOption => {
                return Err(ApiError::BadRequest("unknown poll option".into()));
            }
        };

        let snapshot = snapshot(db, post_id, Some(&caller))?;
        Ok(PollVoteResponse {
            already_voted,
            results: results_for_viewer(post_id, &snapshot.options, &snapshot.counts, snapshot.voted),
        })
    })
    .await?;

    Ok(Json(response))
}

fn snapshot(db: &Database, post_id: Uuid, viewer: Option<&str>) -> Result<PollSnapshot, ApiError> {
    unwrap_poll(db.poll_snapshot(&post_id.to_string(), viewer)?, post_id)
}

fn unwrap_poll<T>(outcome: PollOutcome<T>, post_id: Uuid) -> Result<T, ApiError> {
    match outcome {
        PollOutcome::Done(value) => Ok(value),
        PollOutcome::PostNotFound => Err(ApiError::NotFound(format!("post {post_id} not found"))),
        PollOutcome::NotAPoll => Err(ApiError::BadRequest(format!("post {post_id} is not a poll"))),
    }
}
