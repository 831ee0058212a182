use std::fmt;

use thiserror::Error;

use crate::store::StoreError;

/// Coarse classification of every failure an engine operation can raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Unauthenticated,
    Permission,
    Storage,
}

impl ErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not-found",
            Self::Unauthenticated => "unauthenticated",
            Self::Permission => "permission",
            Self::Storage => "storage",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Machine-readable error codes a presentation layer can map to localized text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Unauthenticated,
    InvalidUser,
    InvalidProblemId,
    InvalidProblemArgs,
    MissingProblemFields,
    InvalidCategory,
    InvalidFrequency,
    NoProblemUpdates,
    ProblemNotFound,
    InvalidCommentId,
    InvalidCommentArgs,
    EmptyComment,
    InvalidCommentProblem,
    CommentNotFound,
    InvalidNotificationId,
    NotificationNotFound,
    InvalidUserData,
    MissingDisplayName,
    MissingEmail,
    NotFound,
    PermissionDenied,
    StorageFailure,
}

impl ErrorCode {
    /// Stable code identifier (`area/reason`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Unauthenticated => "auth/unauthenticated",
            Self::InvalidUser => "auth/invalid-user",
            Self::InvalidProblemId => "problem/invalid-id",
            Self::InvalidProblemArgs => "problem/invalid-args",
            Self::MissingProblemFields => "problem/missing-fields",
            Self::InvalidCategory => "problem/invalid-category",
            Self::InvalidFrequency => "problem/invalid-frequency",
            Self::NoProblemUpdates => "problem/no-updates",
            Self::ProblemNotFound => "problem/not-found",
            Self::InvalidCommentId => "comment/invalid-id",
            Self::InvalidCommentArgs => "comment/invalid-args",
            Self::EmptyComment => "comment/empty",
            Self::InvalidCommentProblem => "comment/invalid-problem",
            Self::CommentNotFound => "comment/not-found",
            Self::InvalidNotificationId => "notification/invalid-id",
            Self::NotificationNotFound => "notification/not-found",
            Self::InvalidUserData => "user/invalid-data",
            Self::MissingDisplayName => "user/missing-displayname",
            Self::MissingEmail => "user/missing-email",
            Self::NotFound => "db/not-found",
            Self::PermissionDenied => "db/permission-denied",
            Self::StorageFailure => "db/storage-failure",
        }
    }

    /// Which of the error kinds this code belongs to.
    #[must_use]
    pub const fn kind(self) -> ErrorKind {
        match self {
            Self::Unauthenticated => ErrorKind::Unauthenticated,
            Self::ProblemNotFound
            | Self::CommentNotFound
            | Self::NotificationNotFound
            | Self::NotFound => ErrorKind::NotFound,
            Self::PermissionDenied => ErrorKind::Permission,
            Self::StorageFailure => ErrorKind::Storage,
            Self::InvalidUser
            | Self::InvalidProblemId
            | Self::InvalidProblemArgs
            | Self::MissingProblemFields
            | Self::InvalidCategory
            | Self::InvalidFrequency
            | Self::NoProblemUpdates
            | Self::InvalidCommentId
            | Self::InvalidCommentArgs
            | Self::EmptyComment
            | Self::InvalidCommentProblem
            | Self::InvalidNotificationId
            | Self::InvalidUserData
            | Self::MissingDisplayName
            | Self::MissingEmail => ErrorKind::Validation,
        }
    }

    /// Short human-facing summary for terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Unauthenticated => "You must be logged in",
            Self::InvalidUser => "Invalid user information",
            Self::InvalidProblemId => "Invalid problem ID",
            Self::InvalidProblemArgs => "Invalid problem data",
            Self::MissingProblemFields => "Please fill in all required fields",
            Self::InvalidCategory => "Invalid category",
            Self::InvalidFrequency => "Invalid frequency",
            Self::NoProblemUpdates => "Nothing to update",
            Self::ProblemNotFound => "Problem not found",
            Self::InvalidCommentId => "Invalid comment ID",
            Self::InvalidCommentArgs => "Invalid comment data",
            Self::EmptyComment => "Comment cannot be empty",
            Self::InvalidCommentProblem => "Invalid problem reference",
            Self::CommentNotFound => "Comment not found",
            Self::InvalidNotificationId => "Invalid notification ID",
            Self::NotificationNotFound => "Notification not found",
            Self::InvalidUserData => "User data is required",
            Self::MissingDisplayName => "Display name is required",
            Self::MissingEmail => "Email is required",
            Self::NotFound => "The requested item was not found",
            Self::PermissionDenied => "You do not have permission",
            Self::StorageFailure => "Storage backend failure",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// The error type returned by every engine operation.
#[derive(Debug, Error)]
pub enum BoardError {
    /// A required field is missing/blank or an argument is malformed.
    #[error("{code}: {detail}")]
    Validation { code: ErrorCode, detail: String },

    /// The referenced entity does not exist in the store.
    #[error("{code}: {entity} '{id}' does not exist")]
    NotFound {
        code: ErrorCode,
        entity: &'static str,
        id: String,
    },

    /// The operation requires an actor identity and none was supplied.
    #[error("{}: {}", ErrorCode::Unauthenticated, ErrorCode::Unauthenticated.message())]
    Unauthenticated,

    /// The actor is not allowed to touch the resource.
    #[error("{}: {detail}", ErrorCode::PermissionDenied)]
    Permission { detail: String },

    /// The document store failed underneath the engine.
    #[error("{}: {source}", ErrorCode::StorageFailure)]
    Storage {
        #[from]
        source: StoreError,
    },
}

impl BoardError {
    pub(crate) fn validation(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self::Validation {
            code,
            detail: detail.into(),
        }
    }

    pub(crate) fn not_found(code: ErrorCode, entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            code,
            entity,
            id: id.into(),
        }
    }

    /// Stable machine-readable code for this failure.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Validation { code, .. } | Self::NotFound { code, .. } => *code,
            Self::Unauthenticated => ErrorCode::Unauthenticated,
            Self::Permission { .. } => ErrorCode::PermissionDenied,
            Self::Storage { .. } => ErrorCode::StorageFailure,
        }
    }

    /// Coarse classification for callers that branch on the failure family.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.code().kind()
    }
}

pub type Result<T, E = BoardError> = std::result::Result<T, E>;
