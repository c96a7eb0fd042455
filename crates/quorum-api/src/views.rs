//! Row → response mapping. Stored ids and timestamps were written by this
//! service, so a parse failure means a corrupt row: log it and fall back to a
//! default rather than failing the whole listing.

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use quorum_db::models::{CommentRow, PostRow, UserRow};
use quorum_types::api::{AuthorSummary, CommentResponse, PostResponse, ProfileResponse};

fn uuid_or_default(raw: &str, field: &str, row_id: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}' on row '{}': {}", field, raw, row_id, e);
        Uuid::default()
    })
}

fn timestamp_or_default(raw: &str, row_id: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // Rows written by SQLite's datetime('now') carry no timezone.
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}' on row '{}': {}", raw, row_id, e);
            DateTime::default()
        })
}

pub(crate) fn post_response(row: PostRow) -> PostResponse {
    let (content, options) = match row.body {
        quorum_types::PostBody::Text(text) => (Some(text), None),
        quorum_types::PostBody::Poll(options) => (None, Some(options)),
    };

    PostResponse {
        id: uuid_or_default(&row.id, "id", &row.id),
        title: row.title,
        kind: row.kind,
        content,
        options,
        author: AuthorSummary {
            id: uuid_or_default(&row.author_id, "author_id", &row.id),
            username: row.author_username,
            avatar: row.author_avatar,
        },
        image_url: row.image_url,
        source: row.source,
        votes: row.votes,
        created_at: timestamp_or_default(&row.created_at, &row.id),
    }
}

pub(crate) fn comment_response(row: CommentRow) -> CommentResponse {
    CommentResponse {
        id: uuid_or_default(&row.id, "id", &row.id),
        post_id: uuid_or_default(&row.post_id, "post_id", &row.id),
        parent_id: row
            .parent_id
            .as_deref()
            .map(|p| uuid_or_default(p, "parent_id", &row.id)),
        can_reply: row.path.can_reply(),
        path: row.path.to_string(),
        depth: row.depth,
        content: row.content,
        author: AuthorSummary {
            id: uuid_or_default(&row.author_id, "author_id", &row.id),
            username: row.author_username,
            avatar: row.author_avatar,
        },
        created_at: timestamp_or_default(&row.created_at, &row.id),
    }
}

pub(crate) fn profile_response(row: UserRow) -> ProfileResponse {
    ProfileResponse {
        id: uuid_or_default(&row.id, "id", &row.id),
        joined_at: timestamp_or_default(&row.joined_at, &row.id),
        username: row.username,
        avatar: row.avatar,
        province: row.province,
        reputation: row.reputation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_accept_both_stored_formats() {
        let rfc = timestamp_or_default("2024-07-01T12:30:00.000000Z", "row");
        let naive = timestamp_or_default("2024-07-01 12:30:00", "row");
        assert_eq!(rfc, naive);
        assert_eq!(timestamp_or_default("yesterday", "row"), DateTime::<Utc>::default());
    }
}
