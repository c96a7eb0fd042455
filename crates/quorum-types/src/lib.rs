pub mod api;
pub mod models;
pub mod path;
pub mod poll;
pub mod validate;

pub use models::{PollOption, PostBody, PostKind};
pub use path::CommentPath;
pub use validate::ValidationError;
