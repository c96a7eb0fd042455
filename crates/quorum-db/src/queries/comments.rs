use anyhow::{Result, anyhow};
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior};
use uuid::Uuid;

use quorum_types::CommentPath;

use crate::Database;
use crate::models::CommentRow;
use crate::queries::{conversion_err, now};

const COMMENT_SELECT: &str = "
    SELECT c.id, c.post_id, c.parent_id, c.path, c.depth, c.content,
           c.author_id, u.username, u.avatar, c.created_at
    FROM comments c
    LEFT JOIN users u ON c.author_id = u.id";

pub struct NewComment<'a> {
    pub post_id: &'a str,
    pub author_id: &'a str,
    pub content: &'a str,
    pub parent_id: Option<&'a str>,
}

pub enum CommentOutcome {
    Created(CommentRow),
    PostNotFound,
    /// The parent does not exist or belongs to a different post.
    ParentNotFound,
}

impl Database {
    /// Insert a comment, deriving its path and depth from the parent inside
    /// the same transaction.
    pub fn insert_comment(&self, comment: &NewComment<'_>) -> Result<CommentOutcome> {
        // v7 ids sort by creation time, which keeps siblings in posting order
        // when comments are listed by path.
        let id = Uuid::now_v7();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let post_exists = tx
                .query_row("SELECT 1 FROM posts WHERE id = ?1", [comment.post_id], |_| Ok(()))
                .optional()?
                .is_some();
            if !post_exists {
                return Ok(CommentOutcome::PostNotFound);
            }

            let path = match comment.parent_id {
                None => CommentPath::root(id),
                Some(parent_id) => {
                    let parent_path: Option<String> = tx
                        .query_row(
                            "SELECT path FROM comments WHERE id = ?1 AND post_id = ?2",
                            (parent_id, comment.post_id),
                            |row| row.get(0),
                        )
                        .optional()?;
                    let Some(parent_path) = parent_path else {
                        return Ok(CommentOutcome::ParentNotFound);
                    };
                    parent_path.parse::<CommentPath>()?.child(id)
                }
            };

            let id = id.to_string();
            tx.execute(
                "INSERT INTO comments (id, post_id, author_id, parent_id, path, depth, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    id,
                    comment.post_id,
                    comment.author_id,
                    comment.parent_id,
                    path.to_string(),
                    path.depth(),
                    comment.content,
                    now(),
                ],
            )?;

            let row = query_comment(&tx, &id)?
                .ok_or_else(|| anyhow!("Comment vanished after insert: {}", id))?;
            tx.commit()?;
            Ok(CommentOutcome::Created(row))
        })
    }

    /// All comments of a post in path order (a pre-order walk of the reply tree).
    pub fn list_comments(&self, post_id: &str) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            let sql = format!("{COMMENT_SELECT} WHERE c.post_id = ?1 ORDER BY c.path ASC");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([post_id], comment_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_comment(conn: &Connection, id: &str) -> Result<Option<CommentRow>> {
    let sql = format!("{COMMENT_SELECT} WHERE c.id = ?1");
    Ok(conn.query_row(&sql, [id], comment_from_row).optional()?)
}

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<CommentRow> {
    let path: String = row.get(3)?;
    let path = path.parse::<CommentPath>().map_err(|e| conversion_err(3, e))?;

    Ok(CommentRow {
        id: row.get(0)?,
        post_id: row.get(1)?,
        parent_id: row.get(2)?,
        path,
        depth: row.get(4)?,
        content: row.get(5)?,
        author_id: row.get(6)?,
        author_username: row
            .get::<_, Option<String>>(7)?
            .unwrap_or_else(|| "unknown".to_string()),
        author_avatar: row.get(8)?,
        created_at: row.get(9)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::posts::NewPost;
    use crate::test_support;
    use quorum_types::{PostBody, PostKind};

    fn post(db: &Database, author: &str) -> String {
        let id = Uuid::new_v4().to_string();
        let body = PostBody::Text("discuss".into());
        db.insert_post(&NewPost {
            id: &id,
            author_id: author,
            title: "Thread",
            body: &body,
            kind: PostKind::Study,
            image_url: None,
            source: None,
        })
        .unwrap()
        .expect("author exists");
        id
    }

    fn comment(db: &Database, post_id: &str, author: &str, parent: Option<&str>) -> CommentRow {
        let outcome = db
            .insert_comment(&NewComment {
                post_id,
                author_id: author,
                content: "reply",
                parent_id: parent,
            })
            .unwrap();
        match outcome {
            CommentOutcome::Created(row) => row,
            _ => panic!("expected comment to be created"),
        }
    }

    #[test]
    fn reply_path_extends_parent() {
        let db = test_support::db();
        let author = test_support::user(&db, "commenter");
        let post_id = post(&db, &author);

        let a = comment(&db, &post_id, &author, None);
        assert_eq!(a.depth, 0);
        assert_eq!(a.path.to_string(), a.id);

        let b = comment(&db, &post_id, &author, Some(&a.id));
        assert_eq!(b.depth, 1);
        assert_eq!(b.parent_id.as_deref(), Some(a.id.as_str()));

        let c = comment(&db, &post_id, &author, Some(&b.id));
        assert_eq!(c.depth, 2);
        assert_eq!(c.path.to_string(), format!("{}.{}", b.path, c.id));
        assert_eq!(c.path.depth(), c.depth);
    }

    #[test]
    fn listing_is_pre_order() {
        let db = test_support::db();
        let author = test_support::user(&db, "threader");
        let post_id = post(&db, &author);

        let first = comment(&db, &post_id, &author, None);
        let second = comment(&db, &post_id, &author, None);
        let first_reply = comment(&db, &post_id, &author, Some(&first.id));
        let second_reply = comment(&db, &post_id, &author, Some(&second.id));
        let nested = comment(&db, &post_id, &author, Some(&first_reply.id));
        let late_reply = comment(&db, &post_id, &author, Some(&first.id));

        let listed: Vec<String> = db
            .list_comments(&post_id)
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();

        assert_eq!(
            listed,
            vec![
                first.id,
                first_reply.id,
                nested.id,
                late_reply.id,
                second.id,
                second_reply.id,
            ]
        );
    }

    #[test]
    fn every_reply_follows_its_parent_subtree() {
        let db = test_support::db();
        let author = test_support::user(&db, "treewalker");
        let post_id = post(&db, &author);

        let mut ids = Vec::new();
        for i in 0..30 {
            let parent = match i % 3 {
                0 => None,
                _ => ids.get(i / 2).map(String::as_str),
            };
            let row = comment(&db, &post_id, &author, parent);
            ids.push(row.id);
        }

        let listed = db.list_comments(&post_id).unwrap();
        assert_eq!(listed.len(), 30);
        for (idx, row) in listed.iter().enumerate() {
            assert_eq!(row.path.depth(), row.depth);
            if let Some(parent_id) = &row.parent_id {
                let parent_idx = listed.iter().position(|c| &c.id == parent_id).unwrap();
                assert!(parent_idx < idx);
                // Everything between parent and child sits inside the parent's subtree.
                let prefix = format!("{}.", listed[parent_idx].path);
                for between in &listed[parent_idx + 1..idx] {
                    assert!(between.path.to_string().starts_with(&prefix));
                }
            }
        }
    }

    #[test]
    fn parent_must_belong_to_the_post() {
        let db = test_support::db();
        let author = test_support::user(&db, "crossposter");
        let post_a = post(&db, &author);
        let post_b = post(&db, &author);
        let on_a = comment(&db, &post_a, &author, None);

        let outcome = db
            .insert_comment(&NewComment {
                post_id: &post_b,
                author_id: &author,
                content: "wrong thread",
                parent_id: Some(&on_a.id),
            })
            .unwrap();
        assert!(matches!(outcome, CommentOutcome::ParentNotFound));

        let outcome = db
            .insert_comment(&NewComment {
                post_id: "no-such-post",
                author_id: &author,
                content: "orphan",
                parent_id: None,
            })
            .unwrap();
        assert!(matches!(outcome, CommentOutcome::PostNotFound));
    }
}
