//! Typed records for every persisted entity.

pub mod comment;
pub mod notification;
pub mod problem;
pub mod user;

use std::fmt;

pub use comment::{Comment, CommentStatus, NewComment};
pub use notification::{NewNotification, Notification, NotificationKind};
pub use problem::{Category, Frequency, NewProblem, Problem, ProblemPatch, Status};
pub use user::{NewProfile, ProfilePatch, UserProfile};

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: '{}'", self.expected, self.got)
    }
}

impl std::error::Error for ParseEnumError {}
