pub mod comments;
pub mod polls;
pub mod posts;
pub mod users;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;

/// Timestamps are stored as fixed-precision RFC 3339 UTC strings so that
/// text order is time order.
pub(crate) fn now() -> String {
    encode_timestamp(Utc::now())
}

pub(crate) fn encode_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Wrap a decoding failure for a text column as a rusqlite conversion error.
pub(crate) fn conversion_err<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}
