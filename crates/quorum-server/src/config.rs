use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use quorum_db::UsernameCase;

/// Placeholder JWT secrets that must never reach production.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub username_case: UsernameCase,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup. Unset and empty values fall back
    /// to defaults, except the JWT secret which is required.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let jwt_secret = get("QUORUM_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("QUORUM_JWT_SECRET is unset or still a placeholder; set it in your .env file");
        }

        let port = match get("QUORUM_PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("QUORUM_PORT is not a port number: '{raw}'"))?,
            None => 5000,
        };

        let username_case = match get("QUORUM_USERNAME_CASE_INSENSITIVE").as_deref().map(str::trim) {
            None => UsernameCase::default(),
            Some("1" | "true" | "yes") => UsernameCase::Insensitive,
            Some("0" | "false" | "no") => UsernameCase::Sensitive,
            Some(other) => bail!("QUORUM_USERNAME_CASE_INSENSITIVE must be true or false, got '{other}'"),
        };

        Ok(Self {
            host: get("QUORUM_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            db_path: get("QUORUM_DB_PATH").unwrap_or_else(|| "quorum.db".into()).into(),
            jwt_secret,
            username_case,
        })
    }
}
