use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use quorum_types::api::Claims;

use crate::AppState;
use crate::error::ApiError;

const TOKEN_LIFETIME_DAYS: i64 = 30;

/// Who is looking at a public resource: a signed-in user, or nobody.
#[derive(Debug, Clone)]
pub struct Viewer(pub Option<Claims>);

impl Viewer {
    pub fn user_id(&self) -> Option<Uuid> {
        self.0.as_ref().map(|c| c.sub)
    }
}

/// Reject the request unless it carries a valid bearer token; the decoded
/// [`Claims`] become the caller identity for the handler.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = bearer_claims(&state.jwt_secret, req.headers())?.ok_or(ApiError::Unauthorized)?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Attach a [`Viewer`] to the request. No token means anonymous; a token that
/// fails validation is still rejected.
pub async fn identify_viewer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = bearer_claims(&state.jwt_secret, req.headers())?;
    req.extensions_mut().insert(Viewer(claims));
    Ok(next.run(req).await)
}

fn bearer_claims(secret: &str, headers: &HeaderMap) -> Result<Option<Claims>, ApiError> {
    let Some(auth) = headers.typed_get::<Authorization<Bearer>>() else {
        return Ok(None);
    };
    decode_token(secret, auth.token()).map(Some)
}

pub fn create_token(secret: &str, user_id: Uuid, username: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(TOKEN_LIFETIME_DAYS)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

pub fn decode_token(secret: &str, token: &str) -> Result<Claims, ApiError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| ApiError::Unauthorized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trips() {
        let user_id = Uuid::new_v4();
        let token = create_token("test-secret", user_id, "canuck").unwrap();
        let claims = decode_token("test-secret", &token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.username, "canuck");
    }

    #[test]
    fn wrong_secret_is_unauthorized() {
        let token = create_token("test-secret", Uuid::new_v4(), "canuck").unwrap();
        assert!(matches!(
            decode_token("other-secret", &token),
            Err(ApiError::Unauthorized)
        ));
    }

    #[test]
    fn missing_header_is_anonymous() {
        let headers = HeaderMap::new();
        assert!(bearer_claims("test-secret", &headers).unwrap().is_none());
    }
}
