use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;

use super::{decode_all, non_blank, require_id, store_error, to_document};
use crate::error::{BoardError, ErrorCode, Result};
use crate::identity::Actor;
use crate::model::{Comment, NewProfile, ProfilePatch, UserProfile};
use crate::store::{Collection, Document, DocumentStore, timestamp_value};

/// Counts reported by [`UserEngine::migrate_profiles_from_comments`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub migrated: usize,
    pub skipped: usize,
    pub errors: usize,
}

/// User profiles keyed by auth uid.
#[derive(Clone, Copy)]
pub struct UserEngine<'a> {
    store: &'a dyn DocumentStore,
}

fn validate_profile(profile: &NewProfile) -> Result<()> {
    if !non_blank(&profile.display_name) {
        return Err(BoardError::validation(
            ErrorCode::MissingDisplayName,
            "display name is blank",
        ));
    }
    if !non_blank(&profile.email) {
        return Err(BoardError::validation(
            ErrorCode::MissingEmail,
            "email is blank",
        ));
    }
    Ok(())
}

impl<'a> UserEngine<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Write `users/<uid>`, replacing any previous profile.
    pub fn create_profile(&self, uid: &str, profile: &NewProfile) -> Result<UserProfile> {
        let uid = require_id(uid, ErrorCode::InvalidUser)?;
        validate_profile(profile)?;

        let now = self.store.server_timestamp();
        let created = UserProfile {
            id: uid.to_string(),
            display_name: profile.display_name.trim().to_string(),
            email: profile.email.trim().to_string(),
            created_at: now,
            updated_at: now,
            accepted_solutions: None,
        };
        self.store
            .set(Collection::Users, uid, to_document(&created)?)?;
        tracing::info!(uid, "user profile created");
        Ok(created)
    }

    pub fn get_profile(&self, uid: &str) -> Result<UserProfile> {
        let uid = require_id(uid, ErrorCode::InvalidUser)?;
        self.find(uid)?
            .ok_or_else(|| BoardError::not_found(ErrorCode::NotFound, "user profile", uid))
    }

    fn find(&self, uid: &str) -> Result<Option<UserProfile>> {
        match self.store.get(Collection::Users, uid)? {
            Some(record) => Ok(Some(record.decode(Collection::Users)?)),
            None => Ok(None),
        }
    }

    pub fn update_profile(&self, uid: &str, patch: &ProfilePatch) -> Result<()> {
        let uid = require_id(uid, ErrorCode::InvalidUser)?;
        if patch.is_empty() {
            return Err(BoardError::validation(
                ErrorCode::InvalidUserData,
                "no profile field supplied",
            ));
        }

        let mut doc = Document::new();
        if let Some(name) = &patch.display_name {
            if !non_blank(name) {
                return Err(BoardError::validation(
                    ErrorCode::MissingDisplayName,
                    "display name is blank",
                ));
            }
            doc.insert("displayName".into(), json!(name.trim()));
        }
        if let Some(email) = &patch.email {
            if !non_blank(email) {
                return Err(BoardError::validation(
                    ErrorCode::MissingEmail,
                    "email is blank",
                ));
            }
            doc.insert("email".into(), json!(email.trim()));
        }
        if let Some(titles) = &patch.accepted_solutions {
            doc.insert("acceptedSolutions".into(), json!(titles));
        }
        doc.insert(
            "updatedAt".into(),
            timestamp_value(self.store.server_timestamp()),
        );

        self.store
            .update(Collection::Users, uid, doc)
            .map_err(|err| store_error(err, ErrorCode::NotFound, "user profile"))?;
        tracing::debug!(uid, "user profile updated");
        Ok(())
    }

    pub fn delete_profile(&self, uid: &str) -> Result<()> {
        let uid = require_id(uid, ErrorCode::InvalidUser)?;
        self.store
            .delete(Collection::Users, uid)
            .map_err(|err| store_error(err, ErrorCode::NotFound, "user profile"))?;
        tracing::info!(uid, "user profile deleted");
        Ok(())
    }

    /// Create the actor's profile on first sign-in. Returns `true` when a
    /// profile was created; an existing profile is left untouched.
    pub fn ensure_profile(&self, actor: &Actor) -> Result<bool> {
        actor.validate()?;
        if self.find(&actor.uid)?.is_some() {
            return Ok(false);
        }
        self.create_profile(
            &actor.uid,
            &NewProfile {
                display_name: actor.display_name.clone(),
                email: actor.email.clone(),
            },
        )?;
        Ok(true)
    }

    /// Append `problem_title` to the user's accepted solutions, without
    /// duplicates. Users without a profile are skipped; returns whether
    /// anything was written.
    pub fn record_accepted_solution(&self, uid: &str, problem_title: &str) -> Result<bool> {
        let Some(profile) = self.find(uid)? else {
            tracing::debug!(uid, "no profile; accepted solution not recorded");
            return Ok(false);
        };
        let mut titles = profile.accepted_solutions.unwrap_or_default();
        if titles.iter().any(|t| t == problem_title) {
            return Ok(false);
        }
        titles.push(problem_title.to_string());
        self.update_profile(
            uid,
            &ProfilePatch {
                accepted_solutions: Some(titles),
                ..ProfilePatch::default()
            },
        )?;
        Ok(true)
    }

    /// Backfill profiles for everyone who has commented but never got a
    /// profile. Names come from the comments; emails are placeholders.
    ///
    /// A failure for one user is counted and logged; the scan continues.
    pub fn migrate_profiles_from_comments(&self) -> Result<MigrationReport> {
        let comments: Vec<Comment> =
            decode_all(Collection::Comments, self.store.query(Collection::Comments, &[])?)?;

        let mut commenters: BTreeMap<String, String> = BTreeMap::new();
        for comment in comments {
            if non_blank(&comment.user_id) && non_blank(&comment.user_name) {
                commenters.insert(comment.user_id, comment.user_name);
            }
        }
        tracing::info!(users = commenters.len(), "migrating profiles from comments");

        let mut report = MigrationReport::default();
        for (uid, name) in commenters {
            match self.find(&uid) {
                Ok(Some(_)) => {
                    report.skipped += 1;
                    continue;
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(uid = %uid, error = %err, "profile lookup failed");
                    report.errors += 1;
                    continue;
                }
            }

            let profile = NewProfile {
                display_name: name,
                email: format!("migrated_{uid}@placeholder.com"),
            };
            match self.create_profile(&uid, &profile) {
                Ok(_) => report.migrated += 1,
                Err(err) => {
                    tracing::warn!(uid = %uid, error = %err, "profile migration failed");
                    report.errors += 1;
                }
            }
        }

        tracing::info!(
            migrated = report.migrated,
            skipped = report.skipped,
            errors = report.errors,
            "profile migration complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::store::{MemoryStore, fields};

    fn new_profile(name: &str, email: &str) -> NewProfile {
        NewProfile {
            display_name: name.into(),
            email: email.into(),
        }
    }

    #[test]
    fn create_validates_each_field() {
        let store = MemoryStore::new();
        let users = UserEngine::new(&store);

        assert_eq!(
            users
                .create_profile("", &new_profile("Ann", "a@x"))
                .expect_err("no uid")
                .code(),
            ErrorCode::InvalidUser
        );
        assert_eq!(
            users
                .create_profile("u1", &new_profile(" ", "a@x"))
                .expect_err("no name")
                .code(),
            ErrorCode::MissingDisplayName
        );
        assert_eq!(
            users
                .create_profile("u1", &new_profile("Ann", ""))
                .expect_err("no email")
                .code(),
            ErrorCode::MissingEmail
        );
    }

    #[test]
    fn profile_lifecycle() {
        let store = MemoryStore::new();
        let users = UserEngine::new(&store);

        let created = users
            .create_profile("u1", &new_profile("Ann", "ann@example.com"))
            .expect("create");
        assert_eq!(created.created_at, created.updated_at);
        assert_eq!(users.get_profile("u1").expect("get"), created);

        users
            .update_profile(
                "u1",
                &ProfilePatch {
                    display_name: Some("Annie".into()),
                    ..ProfilePatch::default()
                },
            )
            .expect("update");
        let updated = users.get_profile("u1").expect("get");
        assert_eq!(updated.display_name, "Annie");
        assert_eq!(updated.email, "ann@example.com");

        users.delete_profile("u1").expect("delete");
        let err = users.get_profile("u1").expect_err("gone");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.code().code(), "db/not-found");
    }

    #[test]
    fn update_missing_profile_is_not_found() {
        let store = MemoryStore::new();
        let users = UserEngine::new(&store);
        let patch = ProfilePatch {
            email: Some("x@y".into()),
            ..ProfilePatch::default()
        };
        assert_eq!(
            users.update_profile("ghost", &patch).expect_err("absent").code(),
            ErrorCode::NotFound
        );
        assert_eq!(
            users
                .update_profile("ghost", &ProfilePatch::default())
                .expect_err("empty")
                .code(),
            ErrorCode::InvalidUserData
        );
    }

    #[test]
    fn ensure_profile_creates_once() {
        let store = MemoryStore::new();
        let users = UserEngine::new(&store);
        let actor = Actor::new("u1", "Ann").with_email("ann@example.com");

        assert!(users.ensure_profile(&actor).expect("first"));
        let renamed = Actor::new("u1", "Someone Else").with_email("other@example.com");
        assert!(!users.ensure_profile(&renamed).expect("second"));
        assert_eq!(users.get_profile("u1").expect("get").display_name, "Ann");
    }

    #[test]
    fn accepted_solutions_append_without_duplicates() {
        let store = MemoryStore::new();
        let users = UserEngine::new(&store);
        assert!(!users.record_accepted_solution("u1", "Leaky tap").expect("no profile"));

        users
            .create_profile("u1", &new_profile("Ann", "ann@example.com"))
            .expect("create");
        assert!(users.record_accepted_solution("u1", "Leaky tap").expect("first"));
        assert!(!users.record_accepted_solution("u1", "Leaky tap").expect("dup"));
        assert!(users.record_accepted_solution("u1", "Slow wifi").expect("second"));
        assert_eq!(
            users.get_profile("u1").expect("get").accepted_solutions,
            Some(vec!["Leaky tap".to_string(), "Slow wifi".to_string()])
        );
    }

    #[test]
    fn migration_backfills_commenters() {
        let store = MemoryStore::new();
        let users = UserEngine::new(&store);
        users
            .create_profile("u1", &new_profile("Ann", "ann@example.com"))
            .expect("existing");

        for (uid, name) in [("u1", "Ann"), ("u2", "Bo"), ("u2", "Bo"), ("u3", "")] {
            store
                .create(
                    Collection::Comments,
                    fields([
                        ("problemId", json!("p1")),
                        ("userId", json!(uid)),
                        ("userName", json!(name)),
                        ("content", json!("hi")),
                        ("createdAt", json!("2026-01-02T03:04:05Z")),
                    ]),
                )
                .expect("seed comment");
        }

        let report = users.migrate_profiles_from_comments().expect("migrate");
        assert_eq!(
            report,
            MigrationReport {
                migrated: 1,
                skipped: 1,
                errors: 0
            }
        );
        let bo = users.get_profile("u2").expect("migrated");
        assert_eq!(bo.display_name, "Bo");
        assert_eq!(bo.email, "migrated_u2@placeholder.com");
        assert!(users.get_profile("u3").is_err());
    }
}
