use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

use crate::validate::ValidationError;

/// Replies are offered down to this depth; deeper comments are still stored.
pub const MAX_REPLY_DEPTH: u32 = 4;

const SEPARATOR: char = '.';
const SEGMENT_LEN: usize = 36;

/// Position of a comment in its post's reply tree: the ids of every ancestor
/// from the root down, ending with the comment's own id.
///
/// Encoded as hyphenated lowercase UUIDs joined by `.`. Every segment has the
/// same width, so byte order on the encoded string matches the derived
/// element-wise order here, and sorting a post's comments by path yields a
/// pre-order walk of the tree. With time-ordered (v7) ids, siblings come out
/// in creation order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CommentPath(Vec<Uuid>);

impl CommentPath {
    pub fn root(id: Uuid) -> Self {
        Self(vec![id])
    }

    pub fn child(&self, id: Uuid) -> Self {
        let mut segments = self.0.clone();
        segments.push(id);
        Self(segments)
    }

    /// Number of ancestors; roots are at depth 0.
    pub fn depth(&self) -> u32 {
        (self.0.len() - 1) as u32
    }

    pub fn can_reply(&self) -> bool {
        can_reply(self.depth())
    }
}

pub fn can_reply(depth: u32) -> bool {
    depth < MAX_REPLY_DEPTH
}

impl fmt::Display for CommentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, id) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "{SEPARATOR}")?;
            }
            write!(f, "{}", id.hyphenated())?;
        }
        Ok(())
    }
}

impl FromStr for CommentPath {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidPath(s.to_string());
        let segments = s
            .split(SEPARATOR)
            .map(|seg| {
                if seg.len() != SEGMENT_LEN {
                    return Err(invalid());
                }
                Uuid::parse_str(seg).map_err(|_| invalid())
            })
            .collect::<Result<Vec<_>, _>>()?;

        // split() always yields at least one item, so an empty string fails the
        // width check above.
        Ok(Self(segments))
    }
}
