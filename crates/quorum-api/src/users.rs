use axum::{Extension, Json, extract::State};
use tracing::info;
use uuid::Uuid;

use quorum_db::queries::users::{ProfileOutcome, ProfileUpdate};
use quorum_types::api::{Claims, ProfileResponse, UpdateProfileRequest};
use quorum_types::validate;

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::views::profile_response;
use crate::{AppState, blocking};

pub async fn get_profile(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<Uuid>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let row = blocking(&state, move |db| Ok(db.get_user_by_id(&user_id.to_string())?))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user {user_id} not found")))?;

    Ok(Json(profile_response(row)))
}

/// Update the caller's own username, province and avatar. Empty province or
/// avatar clears the field.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let username = validate::username(&req.username)?;
    let province = validate::province(req.province.as_deref())?;
    let avatar = validate::optional_url(req.avatar.as_deref())?;
    let caller = claims.sub.to_string();

    let row = blocking(&state, move |db| {
        let outcome = db.update_profile(
            &caller,
            &ProfileUpdate {
                username: &username,
                province: province.as_deref(),
                avatar: avatar.as_deref(),
            },
        )?;

        match outcome {
            ProfileOutcome::Updated(row) => Ok(row),
            ProfileOutcome::UsernameTaken => {
                Err(ApiError::Conflict("username is already taken".into()))
            }
            ProfileOutcome::NotFound => Err(ApiError::NotFound("profile not found".into())),
        }
    })
    .await?;

    info!(user_id = %claims.sub, username = %row.username, "Profile updated");
    Ok(Json(profile_response(row)))
}
