use std::collections::HashMap;

use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior};
use tracing::{debug, info};
use uuid::Uuid;

use quorum_types::models::WRITE_IN_OPTION_ID;
use quorum_types::{PollOption, PostBody, PostKind};

use crate::Database;
use crate::queries::now;

/// Result of an operation addressed at a poll post.
#[derive(Debug)]
pub enum PollOutcome<T> {
    Done(T),
    PostNotFound,
    NotAPoll,
}

#[derive(Debug, PartialEq, Eq)]
pub enum VoteOutcome {
    Recorded { option_id: String },
    /// The caller had already voted on this poll; nothing changed.
    AlreadyVoted,
    UnknownOption,
}

/// Everything needed to render a poll for one viewer.
#[derive(Debug)]
pub struct PollSnapshot {
    pub options: Vec<PollOption>,
    pub counts: HashMap<String, u64>,
    pub voted: bool,
}

impl Database {
    /// Vote for an existing option. The dedup insert and the tally increment
    /// commit together, so a second vote by the same caller is a no-op.
    pub fn cast_poll_vote(
        &self,
        post_id: &str,
        caller: &str,
        option_id: &str,
    ) -> Result<PollOutcome<VoteOutcome>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let options = match load_options(&tx, post_id)? {
                PollOutcome::Done(options) => options,
                PollOutcome::PostNotFound => return Ok(PollOutcome::PostNotFound),
                PollOutcome::NotAPoll => return Ok(PollOutcome::NotAPoll),
            };

            if !options.iter().any(|o| o.id == option_id) {
                return Ok(PollOutcome::Done(VoteOutcome::UnknownOption));
            }

            let outcome = if record_vote(&tx, post_id, caller, option_id)? {
                VoteOutcome::Recorded { option_id: option_id.to_string() }
            } else {
                VoteOutcome::AlreadyVoted
            };

            tx.commit()?;
            debug!(post_id, caller, option_id, ?outcome, "Poll vote");
            Ok(PollOutcome::Done(outcome))
        })
    }

    /// Vote for a new option of the caller's own wording.
    ///
    /// The option list rewrite, the zeroed tally row and the vote all happen
    /// in one immediate transaction, so concurrent write-ins serialize and
    /// none of them is lost. Text matching an existing option counts as a
    /// vote for that option.
    pub fn cast_write_in(
        &self,
        post_id: &str,
        caller: &str,
        text: &str,
    ) -> Result<PollOutcome<VoteOutcome>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let mut options = match load_options(&tx, post_id)? {
                PollOutcome::Done(options) => options,
                PollOutcome::PostNotFound => return Ok(PollOutcome::PostNotFound),
                PollOutcome::NotAPoll => return Ok(PollOutcome::NotAPoll),
            };

            if has_voted(&tx, post_id, caller)? {
                return Ok(PollOutcome::Done(VoteOutcome::AlreadyVoted));
            }

            let wanted = text.trim().to_lowercase();
            let existing = options
                .iter()
                .find(|o| o.text.trim().to_lowercase() == wanted)
                .map(|o| o.id.clone());

            let option_id = match existing {
                Some(id) => id,
                None => {
                    let id = allocate_write_in_id(&options, Utc::now().timestamp_millis());
                    options.push(PollOption { id: id.clone(), text: text.trim().to_string() });

                    let content = PostBody::Poll(options).encode()?;
                    tx.execute("UPDATE posts SET content = ?1 WHERE id = ?2", (&content, post_id))?;
                    tx.execute(
                        "INSERT OR IGNORE INTO poll_option_votes (post_id, option_id, vote_count)
                         VALUES (?1, ?2, 0)",
                        (post_id, &id),
                    )?;
                    info!(post_id, option_id = %id, "Write-in option added");
                    id
                }
            };

            let outcome = if record_vote(&tx, post_id, caller, &option_id)? {
                VoteOutcome::Recorded { option_id }
            } else {
                VoteOutcome::AlreadyVoted
            };

            tx.commit()?;
            Ok(PollOutcome::Done(outcome))
        })
    }

    /// Options, tallies and whether `viewer` has voted, read from one snapshot.
    pub fn poll_snapshot(
        &self,
        post_id: &str,
        viewer: Option<&str>,
    ) -> Result<PollOutcome<PollSnapshot>> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;

            let options = match load_options(&tx, post_id)? {
                PollOutcome::Done(options) => options,
                PollOutcome::PostNotFound => return Ok(PollOutcome::PostNotFound),
                PollOutcome::NotAPoll => return Ok(PollOutcome::NotAPoll),
            };

            let mut stmt = tx.prepare(
                "SELECT option_id, vote_count FROM poll_option_votes WHERE post_id = ?1",
            )?;
            let counts = stmt
                .query_map([post_id], |row| {
                    let count: i64 = row.get(1)?;
                    Ok((row.get::<_, String>(0)?, u64::try_from(count).unwrap_or(0)))
                })?
                .collect::<std::result::Result<HashMap<_, _>, _>>()?;
            drop(stmt);

            let voted = match viewer {
                Some(user) => has_voted(&tx, post_id, user)?,
                None => false,
            };

            Ok(PollOutcome::Done(PollSnapshot { options, counts, voted }))
        })
    }
}

fn load_options(conn: &Connection, post_id: &str) -> Result<PollOutcome<Vec<PollOption>>> {
    let row: Option<(String, String)> = conn
        .query_row(
            "SELECT kind, content FROM posts WHERE id = ?1",
            [post_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let Some((kind, content)) = row else {
        return Ok(PollOutcome::PostNotFound);
    };

    let kind = kind.parse::<PostKind>()?;
    match PostBody::decode(kind, &content)? {
        PostBody::Poll(options) => Ok(PollOutcome::Done(options)),
        PostBody::Text(_) => Ok(PollOutcome::NotAPoll),
    }
}

fn has_voted(conn: &Connection, post_id: &str, user_id: &str) -> Result<bool> {
    let voted = conn
        .query_row(
            "SELECT 1 FROM poll_votes WHERE post_id = ?1 AND user_id = ?2",
            (post_id, user_id),
            |_| Ok(()),
        )
        .optional()?
        .is_some();
    Ok(voted)
}

/// Insert the (post, user) vote row and bump the option's tally. Returns
/// `false` without touching the tally when the user already voted.
fn record_vote(conn: &Connection, post_id: &str, user_id: &str, option_id: &str) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO poll_votes (id, post_id, user_id, option_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        (Uuid::new_v4().to_string(), post_id, user_id, option_id, now()),
    )?;
    if inserted == 0 {
        return Ok(false);
    }

    conn.execute(
        "INSERT INTO poll_option_votes (post_id, option_id, vote_count) VALUES (?1, ?2, 1)
         ON CONFLICT(post_id, option_id) DO UPDATE SET vote_count = vote_count + 1",
        (post_id, option_id),
    )?;
    Ok(true)
}

/// Time-based id for a write-in option, bumped past any id already taken.
fn allocate_write_in_id(options: &[PollOption], mut millis: i64) -> String {
    loop {
        let candidate = format!("{WRITE_IN_OPTION_ID}_{millis}");
        if !options.iter().any(|o| o.id == candidate) {
            return candidate;
        }
        millis += 1;
    }
}
