//! Database row types. Ids and timestamps stay as stored text; the API layer
//! parses them. Post bodies and comment paths are decoded on the way out so
//! nothing above this crate handles the raw encodings.

use quorum_types::{CommentPath, PostBody, PostKind};

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub avatar: Option<String>,
    pub province: Option<String>,
    pub reputation: i64,
    pub joined_at: String,
}

pub struct PostRow {
    pub id: String,
    pub title: String,
    pub kind: PostKind,
    pub body: PostBody,
    pub author_id: String,
    pub author_username: String,
    pub author_avatar: Option<String>,
    pub image_url: Option<String>,
    pub source: Option<String>,
    pub votes: i64,
    pub created_at: String,
}

pub struct CommentRow {
    pub id: String,
    pub post_id: String,
    pub parent_id: Option<String>,
    pub path: CommentPath,
    pub depth: u32,
    pub content: String,
    pub author_id: String,
    pub author_username: String,
    pub author_avatar: Option<String>,
    pub created_at: String,
}
