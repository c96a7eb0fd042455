use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub const LATEST_VERSION: i64 = 1;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                username    TEXT NOT NULL UNIQUE,
                email       TEXT NOT NULL UNIQUE COLLATE NOCASE,
                password    TEXT NOT NULL,
                avatar      TEXT,
                province    TEXT,
                reputation  INTEGER NOT NULL DEFAULT 0,
                joined_at   TEXT NOT NULL
            );

            CREATE TABLE posts (
                id          TEXT PRIMARY KEY,
                title       TEXT NOT NULL,
                content     TEXT NOT NULL,
                kind        TEXT NOT NULL
                            CHECK (kind IN ('study', 'poll', 'data', 'visualization')),
                author_id   TEXT NOT NULL REFERENCES users(id),
                image_url   TEXT,
                source      TEXT,
                votes       INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_posts_created ON posts(created_at);
            CREATE INDEX idx_posts_kind_created ON posts(kind, created_at);

            CREATE TABLE comments (
                id          TEXT PRIMARY KEY,
                post_id     TEXT NOT NULL REFERENCES posts(id),
                author_id   TEXT NOT NULL REFERENCES users(id),
                parent_id   TEXT REFERENCES comments(id),
                path        TEXT NOT NULL,
                depth       INTEGER NOT NULL CHECK (depth >= 0),
                content     TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE UNIQUE INDEX idx_comments_post_path ON comments(post_id, path);

            CREATE TABLE poll_option_votes (
                post_id     TEXT NOT NULL REFERENCES posts(id),
                option_id   TEXT NOT NULL,
                vote_count  INTEGER NOT NULL DEFAULT 0 CHECK (vote_count >= 0),
                PRIMARY KEY (post_id, option_id)
            );

            CREATE TABLE poll_votes (
                id          TEXT PRIMARY KEY,
                post_id     TEXT NOT NULL REFERENCES posts(id),
                user_id     TEXT NOT NULL REFERENCES users(id),
                option_id   TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                UNIQUE(post_id, user_id)
            );

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
