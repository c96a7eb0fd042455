use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior};
use tracing::debug;

use quorum_types::{PostBody, PostKind};

use crate::Database;
use crate::models::PostRow;
use crate::queries::{conversion_err, encode_timestamp, now};

// JOIN users to fetch the author summary in the same query
const POST_SELECT: &str = "
    SELECT p.id, p.title, p.kind, p.content, p.author_id, u.username, u.avatar,
           p.image_url, p.source, p.votes, p.created_at
    FROM posts p
    LEFT JOIN users u ON p.author_id = u.id";

pub struct NewPost<'a> {
    pub id: &'a str,
    pub author_id: &'a str,
    pub title: &'a str,
    pub body: &'a PostBody,
    pub kind: PostKind,
    pub image_url: Option<&'a str>,
    pub source: Option<&'a str>,
}

pub struct PostFilter {
    pub kind: Option<PostKind>,
    pub limit: u32,
    /// Only posts created strictly before this instant. Encoded the same way
    /// as stored `created_at` values before comparing.
    pub before: Option<DateTime<Utc>>,
}

impl Database {
    /// Insert a post with zero votes. Poll posts get a zeroed tally row per
    /// option in the same transaction. Returns `None` when the author has no
    /// profile.
    pub fn insert_post(&self, post: &NewPost<'_>) -> Result<Option<PostRow>> {
        let content = post.body.encode()?;
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let author_exists = tx
                .query_row("SELECT 1 FROM users WHERE id = ?1", [post.author_id], |_| Ok(()))
                .optional()?
                .is_some();
            if !author_exists {
                return Ok(None);
            }

            tx.execute(
                "INSERT INTO posts (id, title, content, kind, author_id, image_url, source, votes, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8)",
                rusqlite::params![
                    post.id,
                    post.title,
                    content,
                    post.kind.as_str(),
                    post.author_id,
                    post.image_url,
                    post.source,
                    now(),
                ],
            )?;

            if let Some(options) = post.body.options() {
                let mut seed = tx.prepare(
                    "INSERT OR IGNORE INTO poll_option_votes (post_id, option_id, vote_count)
                     VALUES (?1, ?2, 0)",
                )?;
                for option in options {
                    seed.execute((post.id, &option.id))?;
                }
            }

            let row = query_post(&tx, post.id)?
                .ok_or_else(|| anyhow!("Post vanished after insert: {}", post.id))?;
            tx.commit()?;
            Ok(Some(row))
        })
    }

    pub fn get_post(&self, id: &str) -> Result<Option<PostRow>> {
        self.with_conn(|conn| query_post(conn, id))
    }

    /// Newest first.
    pub fn list_posts(&self, filter: &PostFilter) -> Result<Vec<PostRow>> {
        let before = filter.before.map(encode_timestamp);
        self.with_conn(|conn| {
            let sql = format!(
                "{POST_SELECT}
                 WHERE (?1 IS NULL OR p.kind = ?1)
                   AND (?2 IS NULL OR p.created_at < ?2)
                 ORDER BY p.created_at DESC, p.id DESC
                 LIMIT ?3"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(
                    rusqlite::params![filter.kind.map(PostKind::as_str), before, filter.limit],
                    post_from_row,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Apply a ±1 vote as a single increment and return the new total, or
    /// `None` when the post does not exist.
    pub fn adjust_post_votes(&self, post_id: &str, caller: &str, delta: i64) -> Result<Option<i64>> {
        let votes = self.with_conn_mut(|conn| {
            Ok(conn
                .query_row(
                    "UPDATE posts SET votes = votes + ?1 WHERE id = ?2 RETURNING votes",
                    (delta, post_id),
                    |row| row.get::<_, i64>(0),
                )
                .optional()?)
        })?;

        if let Some(votes) = votes {
            debug!(post_id, caller, delta, votes, "Post vote applied");
        }
        Ok(votes)
    }
}

pub(crate) fn query_post(conn: &Connection, id: &str) -> Result<Option<PostRow>> {
    let sql = format!("{POST_SELECT} WHERE p.id = ?1");
    Ok(conn.query_row(&sql, [id], post_from_row).optional()?)
}

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    let kind: String = row.get(2)?;
    let kind = kind.parse::<PostKind>().map_err(|e| conversion_err(2, e))?;
    let content: String = row.get(3)?;
    let body = PostBody::decode(kind, &content).map_err(|e| conversion_err(3, e))?;

    Ok(PostRow {
        id: row.get(0)?,
        title: row.get(1)?,
        kind,
        body,
        author_id: row.get(4)?,
        author_username: row
            .get::<_, Option<String>>(5)?
            .unwrap_or_else(|| "unknown".to_string()),
        author_avatar: row.get(6)?,
        image_url: row.get(7)?,
        source: row.get(8)?,
        votes: row.get(9)?,
        created_at: row.get(10)?,
    })
}
