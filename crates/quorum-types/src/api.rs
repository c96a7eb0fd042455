use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{PollOption, PostKind};
use crate::validate::ValidationError;

// -- JWT Claims --

/// Session token claims. `sub` is the caller identity handed to every store
/// operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub token: String,
}

// -- Profiles --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorSummary {
    pub id: Uuid,
    pub username: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub username: String,
    pub avatar: Option<String>,
    pub province: Option<String>,
    pub joined_at: DateTime<Utc>,
    pub reputation: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub username: String,
    #[serde(default)]
    pub province: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

// -- Posts --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePostRequest {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: PostKind,
    /// Plain text, or the poll's option list (array or JSON-encoded string).
    pub content: serde_json::Value,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PostResponse {
    pub id: Uuid,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: PostKind,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub options: Option<Vec<PollOption>>,
    pub author: AuthorSummary,
    pub image_url: Option<String>,
    pub source: Option<String>,
    pub votes: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PostVoteRequest {
    pub delta: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PostVoteResponse {
    pub id: Uuid,
    pub votes: i64,
}

// -- Polls --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PollVoteRequest {
    #[serde(default)]
    pub option_id: Option<String>,
    #[serde(default)]
    pub write_in: Option<String>,
}

/// What a voter picked: one of the listed options, or a new one of their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollChoice {
    Option(String),
    WriteIn(String),
}

impl PollVoteRequest {
    pub fn into_choice(self) -> Result<PollChoice, ValidationError> {
        match (self.option_id, self.write_in) {
            (Some(id), None) => Ok(PollChoice::Option(id)),
            (None, Some(text)) => {
                let text = text.trim();
                if text.is_empty() {
                    return Err(ValidationError::EmptyWriteIn);
                }
                Ok(PollChoice::WriteIn(text.to_string()))
            }
            _ => Err(ValidationError::AmbiguousPollChoice),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PollOptionResult {
    pub id: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub votes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub percentage: Option<f64>,
}

/// Poll state as one viewer is allowed to see it. Counts stay hidden until
/// that viewer has voted.
#[derive(Debug, Serialize, Deserialize)]
pub struct PollResults {
    pub post_id: Uuid,
    pub voted: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub total_votes: Option<u64>,
    pub options: Vec<PollOptionResult>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PollVoteResponse {
    pub already_voted: bool,
    pub results: PollResults,
}

// -- Comments --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCommentRequest {
    pub post_id: Uuid,
    pub content: String,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub post_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub path: String,
    pub depth: u32,
    pub content: String,
    pub author: AuthorSummary,
    pub created_at: DateTime<Utc>,
    pub can_reply: bool,
}
