use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::validate::ValidationError;

pub const POLL_MIN_OPTIONS: usize = 2;
pub const POLL_MAX_OPTIONS: usize = 6;

/// Id clients use for the "something else" button; never stored as a real option.
pub const WRITE_IN_OPTION_ID: &str = "other";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostKind {
    Study,
    Poll,
    Data,
    Visualization,
}

impl PostKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Study => "study",
            Self::Poll => "poll",
            Self::Data => "data",
            Self::Visualization => "visualization",
        }
    }
}

impl fmt::Display for PostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts the stored kind names plus the plural section names the client
/// routes use (`/studies`, `/polls`, ...).
impl FromStr for PostKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "study" | "studies" => Ok(Self::Study),
            "poll" | "polls" => Ok(Self::Poll),
            "data" => Ok(Self::Data),
            "visualization" | "visualizations" => Ok(Self::Visualization),
            _ => Err(ValidationError::UnknownPostKind(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOption {
    pub id: String,
    pub text: String,
}

/// What a post carries: free text, or the option list of a poll.
///
/// The store keeps this as a single text column (the option list JSON
/// encoded); everything above the store only ever sees this enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostBody {
    Text(String),
    Poll(Vec<PollOption>),
}

impl PostBody {
    /// Validate client-supplied content for a post of `kind`.
    ///
    /// Poll content may arrive either as a JSON array or as a string holding
    /// one (the shape older clients send).
    pub fn from_request(kind: PostKind, content: &Value) -> Result<Self, ValidationError> {
        match kind {
            PostKind::Poll => {
                let options: Vec<PollOption> = match content {
                    Value::String(raw) => serde_json::from_str(raw)
                        .map_err(|e| ValidationError::MalformedPoll(e.to_string()))?,
                    other => serde_json::from_value(other.clone())
                        .map_err(|e| ValidationError::MalformedPoll(e.to_string()))?,
                };
                Ok(Self::Poll(validate_options(options)?))
            }
            _ => match content {
                Value::String(text) if !text.trim().is_empty() => {
                    Ok(Self::Text(text.trim().to_string()))
                }
                Value::String(_) | Value::Null => Err(ValidationError::EmptyContent),
                _ => Err(ValidationError::ContentNotText),
            },
        }
    }

    /// Rebuild a body from its stored column.
    pub fn decode(kind: PostKind, stored: &str) -> Result<Self, ValidationError> {
        match kind {
            PostKind::Poll => serde_json::from_str(stored)
                .map(Self::Poll)
                .map_err(|e| ValidationError::MalformedPoll(e.to_string())),
            _ => Ok(Self::Text(stored.to_string())),
        }
    }

    pub fn encode(&self) -> serde_json::Result<String> {
        match self {
            Self::Text(text) => Ok(text.clone()),
            Self::Poll(options) => serde_json::to_string(options),
        }
    }

    pub fn options(&self) -> Option<&[PollOption]> {
        match self {
            Self::Poll(options) => Some(options),
            Self::Text(_) => None,
        }
    }
}

fn validate_options(options: Vec<PollOption>) -> Result<Vec<PollOption>, ValidationError> {
    if !(POLL_MIN_OPTIONS..=POLL_MAX_OPTIONS).contains(&options.len()) {
        return Err(ValidationError::OptionCount {
            min: POLL_MIN_OPTIONS,
            max: POLL_MAX_OPTIONS,
        });
    }

    let mut seen = HashSet::new();
    options
        .into_iter()
        .map(|option| {
            let id = option.id.trim().to_string();
            let text = option.text.trim().to_string();
            if id.is_empty() {
                return Err(ValidationError::EmptyOptionId);
            }
            if id == WRITE_IN_OPTION_ID {
                return Err(ValidationError::ReservedOptionId(id));
            }
            if text.is_empty() {
                return Err(ValidationError::EmptyOptionText);
            }
            if !seen.insert(id.clone()) {
                return Err(ValidationError::DuplicateOptionId(id));
            }
            Ok(PollOption { id, text })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kind_accepts_route_names() {
        assert_eq!("studies".parse::<PostKind>().unwrap(), PostKind::Study);
        assert_eq!("Poll".parse::<PostKind>().unwrap(), PostKind::Poll);
        assert_eq!("visualizations".parse::<PostKind>().unwrap(), PostKind::Visualization);
        assert!("rumours".parse::<PostKind>().is_err());
    }

    #[test]
    fn poll_content_accepts_array_or_encoded_string() {
        let array = json!([{ "id": "1", "text": "A" }, { "id": "2", "text": "B" }]);
        let from_array = PostBody::from_request(PostKind::Poll, &array).unwrap();
        let from_string =
            PostBody::from_request(PostKind::Poll, &Value::String(array.to_string())).unwrap();
        assert_eq!(from_array, from_string);
        assert_eq!(from_array.options().map(<[_]>::len), Some(2));
    }

    #[test]
    fn poll_content_is_validated() {
        let one = json!([{ "id": "1", "text": "A" }]);
        assert!(matches!(
            PostBody::from_request(PostKind::Poll, &one),
            Err(ValidationError::OptionCount { .. })
        ));

        let dup = json!([{ "id": "1", "text": "A" }, { "id": "1", "text": "B" }]);
        assert_eq!(
            PostBody::from_request(PostKind::Poll, &dup),
            Err(ValidationError::DuplicateOptionId("1".into()))
        );

        let reserved = json!([{ "id": "other", "text": "A" }, { "id": "2", "text": "B" }]);
        assert!(matches!(
            PostBody::from_request(PostKind::Poll, &reserved),
            Err(ValidationError::ReservedOptionId(_))
        ));

        let blank = json!([{ "id": "1", "text": "  " }, { "id": "2", "text": "B" }]);
        assert_eq!(
            PostBody::from_request(PostKind::Poll, &blank),
            Err(ValidationError::EmptyOptionText)
        );

        assert!(matches!(
            PostBody::from_request(PostKind::Poll, &json!("not json")),
            Err(ValidationError::MalformedPoll(_))
        ));
    }

    #[test]
    fn text_posts_reject_structured_content() {
        assert_eq!(
            PostBody::from_request(PostKind::Study, &json!(" findings ")).unwrap(),
            PostBody::Text("findings".into())
        );
        assert_eq!(
            PostBody::from_request(PostKind::Data, &json!([1, 2])),
            Err(ValidationError::ContentNotText)
        );
        assert_eq!(
            PostBody::from_request(PostKind::Data, &json!("")),
            Err(ValidationError::EmptyContent)
        );
    }

    #[test]
    fn stored_poll_decodes() {
        let body = PostBody::Poll(vec![
            PollOption { id: "1".into(), text: "Yes".into() },
            PollOption { id: "2".into(), text: "No".into() },
        ]);
        let stored = body.encode().unwrap();
        assert_eq!(PostBody::decode(PostKind::Poll, &stored).unwrap(), body);
        // A text post whose content happens to look like JSON stays text.
        assert_eq!(
            PostBody::decode(PostKind::Study, &stored).unwrap(),
            PostBody::Text(stored.clone())
        );
    }
}
