//! The acting identity passed into every mutating operation.
//!
//! There is no ambient "current user": callers resolve an [`Actor`] from
//! their auth collaborator and hand it to the engines explicitly.

use serde::{Deserialize, Serialize};

use crate::error::{BoardError, ErrorCode, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub uid: String,
    pub display_name: String,
    #[serde(default)]
    pub email: String,
}

impl Actor {
    pub fn new(uid: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            display_name: display_name.into(),
            email: String::new(),
        }
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    /// Reject identities with a blank uid or display name.
    ///
    /// # Errors
    ///
    /// `auth/unauthenticated` for a blank uid, `auth/invalid-user` for a
    /// blank display name.
    pub fn validate(&self) -> Result<()> {
        if self.uid.trim().is_empty() {
            return Err(BoardError::Unauthenticated);
        }
        if self.display_name.trim().is_empty() {
            return Err(BoardError::validation(
                ErrorCode::InvalidUser,
                "display name is blank",
            ));
        }
        Ok(())
    }
}

/// Unwrap an optional identity for a mutating call.
///
/// # Errors
///
/// `auth/unauthenticated` when no actor is present, otherwise whatever
/// [`Actor::validate`] reports.
pub fn require_actor(actor: Option<&Actor>) -> Result<&Actor> {
    let actor = actor.ok_or(BoardError::Unauthenticated)?;
    actor.validate()?;
    Ok(actor)
}

/// Check that `actor` owns a resource before an owner-only edit.
///
/// Engines do not re-derive ownership; front ends call this before update,
/// delete, and accept.
///
/// # Errors
///
/// `db/permission-denied` when `owner_id` is not the actor's uid.
pub fn ensure_owned_by(owner_id: &str, actor: &Actor, what: &str) -> Result<()> {
    if owner_id == actor.uid {
        return Ok(());
    }
    Err(BoardError::Permission {
        detail: format!("{what} belongs to another user"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn missing_actor_is_unauthenticated() {
        let err = require_actor(None).expect_err("no actor");
        assert_eq!(err.kind(), ErrorKind::Unauthenticated);
        assert_eq!(err.code().code(), "auth/unauthenticated");
    }

    #[test]
    fn blank_uid_is_unauthenticated() {
        let actor = Actor::new("  ", "Ann");
        assert_eq!(
            require_actor(Some(&actor)).expect_err("blank uid").kind(),
            ErrorKind::Unauthenticated
        );
    }

    #[test]
    fn blank_name_is_invalid_user() {
        let actor = Actor::new("u1", "");
        assert_eq!(
            require_actor(Some(&actor)).expect_err("blank name").code(),
            ErrorCode::InvalidUser
        );
    }

    #[test]
    fn valid_actor_passes_through() {
        let actor = Actor::new("u1", "Ann").with_email("ann@example.com");
        let got = require_actor(Some(&actor)).expect("valid");
        assert_eq!(got.uid, "u1");
        assert_eq!(got.email, "ann@example.com");
    }

    #[test]
    fn ownership_check_rejects_other_users() {
        let actor = Actor::new("u1", "Ann");
        assert!(ensure_owned_by("u1", &actor, "problem").is_ok());
        let err = ensure_owned_by("u2", &actor, "problem").expect_err("not owner");
        assert_eq!(err.kind(), ErrorKind::Permission);
        assert_eq!(err.code().code(), "db/permission-denied");
    }
}
