use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::info;
use uuid::Uuid;

use quorum_db::queries::users::{NewAccount, SignUpOutcome};
use quorum_types::api::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};
use quorum_types::validate;

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::middleware::create_token;
use crate::{AppState, blocking};

/// Create an account: credentials and profile are written together, then a
/// session token is issued.
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = validate::username(&req.username)?;
    let email = validate::email(&req.email)?;
    validate::password(&req.password)?;

    let user_id = Uuid::new_v4();
    let name = username.clone();
    blocking(&state, move |db| {
        // Hash password with Argon2id
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(req.password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))?
            .to_string();

        let id = user_id.to_string();
        let outcome = db.create_account(&NewAccount {
            id: &id,
            username: &name,
            email: &email,
            password_hash: &password_hash,
        })?;

        match outcome {
            SignUpOutcome::Created(_) => Ok(()),
            SignUpOutcome::UsernameTaken => {
                Err(ApiError::Conflict("username is already taken".into()))
            }
            SignUpOutcome::EmailTaken => {
                Err(ApiError::Conflict("email is already registered".into()))
            }
        }
    })
    .await?;

    info!(%user_id, %username, "Account created");
    let token = create_token(&state.jwt_secret, user_id, &username)?;

    Ok((StatusCode::CREATED, Json(RegisterResponse { user_id, token })))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.trim().to_lowercase();
    let user = blocking(&state, move |db| {
        let user = db.get_user_by_email(&email)?.ok_or(ApiError::Unauthorized)?;

        let parsed_hash = PasswordHash::new(&user.password)
            .map_err(|e| anyhow::anyhow!("stored password hash unreadable: {e}"))?;
        Argon2::default()
            .verify_password(req.password.as_bytes(), &parsed_hash)
            .map_err(|_| ApiError::Unauthorized)?;

        Ok(user)
    })
    .await?;

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| anyhow::anyhow!("corrupt user id '{}': {e}", user.id))?;
    let token = create_token(&state.jwt_secret, user_id, &user.username)?;

    Ok(Json(LoginResponse {
        user_id,
        username: user.username,
        token,
    }))
}
