use thiserror::Error;

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 30;
pub const PASSWORD_MIN_LEN: usize = 6;
pub const TITLE_MAX_LEN: usize = 300;

/// Provinces and territories accepted on a profile.
pub const PROVINCES: &[&str] = &[
    "Alberta",
    "British Columbia",
    "Manitoba",
    "New Brunswick",
    "Newfoundland and Labrador",
    "Nova Scotia",
    "Ontario",
    "Prince Edward Island",
    "Quebec",
    "Saskatchewan",
    "Northwest Territories",
    "Nunavut",
    "Yukon",
];

/// Input rejected before it reaches the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unknown post type '{0}'")]
    UnknownPostKind(String),
    #[error("title must not be empty")]
    EmptyTitle,
    #[error("title must be at most {} characters", TITLE_MAX_LEN)]
    TitleTooLong,
    #[error("content must not be empty")]
    EmptyContent,
    #[error("content must be a string for non-poll posts")]
    ContentNotText,
    #[error("malformed poll content: {0}")]
    MalformedPoll(String),
    #[error("a poll needs between {min} and {max} options")]
    OptionCount { min: usize, max: usize },
    #[error("poll option ids must not be empty")]
    EmptyOptionId,
    #[error("duplicate poll option id '{0}'")]
    DuplicateOptionId(String),
    #[error("poll option id '{0}' is reserved")]
    ReservedOptionId(String),
    #[error("poll option text must not be empty")]
    EmptyOptionText,
    #[error("'{0}' is not an http(s) URL")]
    InvalidUrl(String),
    #[error(
        "username must be {}-{} characters of letters, digits, '_' or '-'",
        USERNAME_MIN_LEN,
        USERNAME_MAX_LEN
    )]
    InvalidUsername,
    #[error("invalid email address")]
    InvalidEmail,
    #[error("password must be at least {} characters", PASSWORD_MIN_LEN)]
    PasswordTooShort,
    #[error("unknown province '{0}'")]
    UnknownProvince(String),
    #[error("vote delta must be +1 or -1, got {0}")]
    InvalidVoteDelta(i32),
    #[error("comment must not be empty")]
    EmptyComment,
    #[error("write-in option must not be empty")]
    EmptyWriteIn,
    #[error("provide exactly one of option_id or write_in")]
    AmbiguousPollChoice,
    #[error("malformed comment path '{0}'")]
    InvalidPath(String),
}

pub fn username(raw: &str) -> Result<String, ValidationError> {
    let name = raw.trim();
    let len = name.chars().count();
    let charset_ok = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

    if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len) || !charset_ok {
        return Err(ValidationError::InvalidUsername);
    }
    Ok(name.to_string())
}

pub fn email(raw: &str) -> Result<String, ValidationError> {
    let email = raw.trim();
    match email.split_once('@') {
        Some((local, domain))
            if !local.is_empty() && !domain.is_empty() && !domain.contains('@') =>
        {
            Ok(email.to_lowercase())
        }
        _ => Err(ValidationError::InvalidEmail),
    }
}

pub fn password(raw: &str) -> Result<(), ValidationError> {
    if raw.chars().count() < PASSWORD_MIN_LEN {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(())
}

/// Empty strings collapse to `None`; anything else must name a known province.
pub fn province(raw: Option<&str>) -> Result<Option<String>, ValidationError> {
    match raw.map(str::trim).filter(|p| !p.is_empty()) {
        None => Ok(None),
        Some(p) => PROVINCES
            .iter()
            .find(|known| known.eq_ignore_ascii_case(p))
            .map(|known| Some(known.to_string()))
            .ok_or_else(|| ValidationError::UnknownProvince(p.to_string())),
    }
}

/// Empty strings collapse to `None`; anything else must be an http(s) URL.
pub fn optional_url(raw: Option<&str>) -> Result<Option<String>, ValidationError> {
    match raw.map(str::trim).filter(|u| !u.is_empty()) {
        None => Ok(None),
        Some(u) if u.starts_with("https://") || u.starts_with("http://") => Ok(Some(u.to_string())),
        Some(u) => Err(ValidationError::InvalidUrl(u.to_string())),
    }
}

pub fn title(raw: &str) -> Result<String, ValidationError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    if title.chars().count() > TITLE_MAX_LEN {
        return Err(ValidationError::TitleTooLong);
    }
    Ok(title.to_string())
}

pub fn vote_delta(delta: i32) -> Result<i64, ValidationError> {
    match delta {
        1 | -1 => Ok(i64::from(delta)),
        other => Err(ValidationError::InvalidVoteDelta(other)),
    }
}

pub fn comment(raw: &str) -> Result<String, ValidationError> {
    let body = raw.trim();
    if body.is_empty() {
        return Err(ValidationError::EmptyComment);
    }
    Ok(body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames_follow_charset_and_length() {
        assert_eq!(username("  mapleleaf_42 ").unwrap(), "mapleleaf_42");
        assert_eq!(username("ab"), Err(ValidationError::InvalidUsername));
        assert_eq!(username(&"x".repeat(31)), Err(ValidationError::InvalidUsername));
        assert_eq!(username("has space"), Err(ValidationError::InvalidUsername));
        assert_eq!(username("émile"), Err(ValidationError::InvalidUsername));
    }

    #[test]
    fn email_is_lowercased() {
        assert_eq!(email("Poll.Taker@Example.CA").unwrap(), "poll.taker@example.ca");
        assert_eq!(email("@example.ca"), Err(ValidationError::InvalidEmail));
        assert_eq!(email("nobody"), Err(ValidationError::InvalidEmail));
        assert_eq!(email("a@b@c"), Err(ValidationError::InvalidEmail));
    }

    #[test]
    fn province_matches_canonical_spelling() {
        assert_eq!(province(Some("ontario")).unwrap(), Some("Ontario".to_string()));
        assert_eq!(province(Some("  ")).unwrap(), None);
        assert_eq!(province(None).unwrap(), None);
        assert!(matches!(
            province(Some("Atlantis")),
            Err(ValidationError::UnknownProvince(_))
        ));
    }

    #[test]
    fn urls_must_be_http() {
        assert_eq!(optional_url(Some("")).unwrap(), None);
        assert_eq!(
            optional_url(Some("https://stats.example/fig.png")).unwrap().as_deref(),
            Some("https://stats.example/fig.png")
        );
        assert!(optional_url(Some("javascript:alert(1)")).is_err());
    }

    #[test]
    fn vote_delta_is_unit() {
        assert_eq!(vote_delta(1), Ok(1));
        assert_eq!(vote_delta(-1), Ok(-1));
        assert_eq!(vote_delta(2), Err(ValidationError::InvalidVoteDelta(2)));
        assert_eq!(vote_delta(0), Err(ValidationError::InvalidVoteDelta(0)));
    }
}
