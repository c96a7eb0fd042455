use anyhow::{Result, anyhow};
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior};

use crate::models::UserRow;
use crate::queries::now;
use crate::{Database, UsernameCase};

const USER_COLUMNS: &str =
    "id, username, email, password, avatar, province, reputation, joined_at";

pub struct NewAccount<'a> {
    pub id: &'a str,
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
}

pub enum SignUpOutcome {
    Created(UserRow),
    UsernameTaken,
    EmailTaken,
}

pub struct ProfileUpdate<'a> {
    pub username: &'a str,
    pub province: Option<&'a str>,
    pub avatar: Option<&'a str>,
}

pub enum ProfileOutcome {
    Updated(UserRow),
    UsernameTaken,
    NotFound,
}

impl Database {
    /// Create credentials and profile together. Either both rows exist
    /// afterwards or neither does.
    pub fn create_account(&self, account: &NewAccount<'_>) -> Result<SignUpOutcome> {
        let case = self.username_case;
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            if username_taken(&tx, case, account.username, None)? {
                return Ok(SignUpOutcome::UsernameTaken);
            }

            let email_taken = tx
                .query_row(
                    "SELECT 1 FROM users WHERE email = ?1 COLLATE NOCASE",
                    [account.email],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            if email_taken {
                return Ok(SignUpOutcome::EmailTaken);
            }

            tx.execute(
                "INSERT INTO users (id, username, email, password, joined_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (
                    account.id,
                    account.username,
                    account.email,
                    account.password_hash,
                    now(),
                ),
            )?;

            let row = query_user_by_id(&tx, account.id)?
                .ok_or_else(|| anyhow!("User vanished after insert: {}", account.id))?;
            tx.commit()?;
            Ok(SignUpOutcome::Created(row))
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1 COLLATE NOCASE");
            Ok(conn.query_row(&sql, [email], user_from_row).optional()?)
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    /// Update the caller's own profile. The collision check and the write
    /// share one transaction.
    pub fn update_profile(&self, caller: &str, update: &ProfileUpdate<'_>) -> Result<ProfileOutcome> {
        let case = self.username_case;
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            if username_taken(&tx, case, update.username, Some(caller))? {
                return Ok(ProfileOutcome::UsernameTaken);
            }

            let changed = tx.execute(
                "UPDATE users SET username = ?1, province = ?2, avatar = ?3 WHERE id = ?4",
                (update.username, update.province, update.avatar, caller),
            )?;
            if changed == 0 {
                return Ok(ProfileOutcome::NotFound);
            }

            let row = query_user_by_id(&tx, caller)?
                .ok_or_else(|| anyhow!("User vanished after update: {}", caller))?;
            tx.commit()?;
            Ok(ProfileOutcome::Updated(row))
        })
    }
}

fn username_taken(
    conn: &Connection,
    case: UsernameCase,
    username: &str,
    exclude_id: Option<&str>,
) -> Result<bool> {
    let sql = match case {
        UsernameCase::Insensitive => {
            "SELECT 1 FROM users
             WHERE username = ?1 COLLATE NOCASE AND (?2 IS NULL OR id <> ?2)
             LIMIT 1"
        }
        UsernameCase::Sensitive => {
            "SELECT 1 FROM users
             WHERE username = ?1 AND (?2 IS NULL OR id <> ?2)
             LIMIT 1"
        }
    };

    let taken = conn
        .query_row(sql, (username, exclude_id), |_| Ok(()))
        .optional()?
        .is_some();
    Ok(taken)
}

fn query_user_by_id(conn: &Connection, id: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    Ok(conn.query_row(&sql, [id], user_from_row).optional()?)
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        avatar: row.get(4)?,
        province: row.get(5)?,
        reputation: row.get(6)?,
        joined_at: row.get(7)?,
    })
}
