use serde_json::{Value, json};

use super::{decode_all, newest_first, non_blank, require_id, store_error, to_document};
use crate::error::{BoardError, ErrorCode, Result};
use crate::model::{NewNotification, Notification, NotificationKind};
use crate::store::{Collection, DocumentStore, Filter, StoreError, fields};

/// Persists, retracts, and reads notifications.
///
/// The emitter does not filter self-notifications; the problem and comment
/// engines skip the call when the actor is the recipient.
#[derive(Clone, Copy)]
pub struct NotificationEngine<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> NotificationEngine<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Persist an unread notification with the templated message for its
    /// kind. Returns the new notification ID.
    pub fn emit(&self, new: &NewNotification) -> Result<String> {
        if !non_blank(&new.recipient_id) || !non_blank(&new.actor_id) {
            return Err(BoardError::validation(
                ErrorCode::InvalidUser,
                "recipient and actor are required",
            ));
        }
        let problem_id = require_id(&new.problem_id, ErrorCode::InvalidProblemId)?;

        let notification = Notification {
            id: String::new(),
            recipient_id: new.recipient_id.clone(),
            actor_id: new.actor_id.clone(),
            actor_name: new.actor_name.clone(),
            kind: new.kind,
            problem_id: problem_id.to_string(),
            problem_title: new.problem_title.clone(),
            message: new.kind.message(&new.actor_name),
            read: false,
            created_at: self.store.server_timestamp(),
        };
        let id = self
            .store
            .create(Collection::Notifications, to_document(&notification)?)?;
        tracing::debug!(
            id = %id,
            kind = %new.kind,
            recipient = %new.recipient_id,
            "notification emitted"
        );
        Ok(id)
    }

    /// Delete every notification matching `(actor, kind, problem)` exactly.
    /// Returns how many were removed.
    pub fn retract(&self, actor_id: &str, kind: NotificationKind, problem_id: &str) -> Result<usize> {
        let matches = self.store.query(
            Collection::Notifications,
            &[
                Filter::equals("actorId", actor_id),
                Filter::equals("type", kind.as_str()),
                Filter::equals("problemId", problem_id),
            ],
        )?;

        let mut removed = 0;
        for record in matches {
            match self.store.delete(Collection::Notifications, &record.id) {
                Ok(()) => removed += 1,
                // Already gone; the end state is what the caller asked for.
                Err(StoreError::Missing { .. }) => {}
                Err(err) => return Err(err.into()),
            }
        }
        tracing::debug!(actor = actor_id, %kind, problem = problem_id, removed, "notifications retracted");
        Ok(removed)
    }

    pub fn count_unread(&self, recipient_id: &str) -> Result<usize> {
        Ok(self.unread_records(recipient_id)?.len())
    }

    /// Unread notifications for `recipient_id`, newest first.
    pub fn list_unread(&self, recipient_id: &str) -> Result<Vec<Notification>> {
        let mut unread: Vec<Notification> =
            decode_all(Collection::Notifications, self.unread_records(recipient_id)?)?;
        newest_first(&mut unread, |n| n.created_at);
        Ok(unread)
    }

    /// Mark one notification read. Marking an already-read notification is
    /// a no-op success.
    pub fn mark_read(&self, notification_id: &str) -> Result<()> {
        let id = require_id(notification_id, ErrorCode::InvalidNotificationId)?;
        self.store
            .update(
                Collection::Notifications,
                id,
                fields([("read", Value::Bool(true))]),
            )
            .map_err(|err| store_error(err, ErrorCode::NotificationNotFound, "notification"))?;
        tracing::debug!(id, "notification marked read");
        Ok(())
    }

    fn unread_records(&self, recipient_id: &str) -> Result<Vec<crate::store::Record>> {
        Ok(self.store.query(
            Collection::Notifications,
            &[
                Filter::equals("recipientId", recipient_id),
                Filter::equals("read", json!(false)),
            ],
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::store::MemoryStore;

    fn watch_from(actor: &str) -> NewNotification {
        NewNotification {
            recipient_id: "owner".into(),
            kind: NotificationKind::Watch,
            problem_id: "p1".into(),
            problem_title: Some("Alarm".into()),
            actor_id: actor.into(),
            actor_name: actor.to_uppercase(),
        }
    }

    #[test]
    fn emit_renders_message_and_starts_unread() {
        let store = MemoryStore::new();
        let engine = NotificationEngine::new(&store);
        engine.emit(&watch_from("bo")).expect("emit");

        let unread = engine.list_unread("owner").expect("list");
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].message, "BO watched your problem.");
        assert_eq!(unread[0].problem_title.as_deref(), Some("Alarm"));
        assert!(!unread[0].read);
    }

    #[test]
    fn retract_removes_every_exact_match_only() {
        let store = MemoryStore::new();
        let engine = NotificationEngine::new(&store);
        engine.emit(&watch_from("bo")).expect("emit");
        engine.emit(&watch_from("bo")).expect("emit duplicate");
        engine.emit(&watch_from("cy")).expect("emit other actor");
        let mut empathy = watch_from("bo");
        empathy.kind = NotificationKind::Empathy;
        engine.emit(&empathy).expect("emit other kind");

        let removed = engine
            .retract("bo", NotificationKind::Watch, "p1")
            .expect("retract");
        assert_eq!(removed, 2);
        assert_eq!(engine.count_unread("owner").expect("count"), 2);
        assert_eq!(
            engine.retract("bo", NotificationKind::Watch, "p1").expect("again"),
            0
        );
    }

    #[test]
    fn mark_read_is_idempotent() {
        let store = MemoryStore::new();
        let engine = NotificationEngine::new(&store);
        let id = engine.emit(&watch_from("bo")).expect("emit");

        engine.mark_read(&id).expect("first");
        engine.mark_read(&id).expect("second");
        assert_eq!(engine.count_unread("owner").expect("count"), 0);
        assert!(engine.list_unread("owner").expect("list").is_empty());
    }

    #[test]
    fn mark_read_on_unknown_id_is_not_found() {
        let store = MemoryStore::new();
        let engine = NotificationEngine::new(&store);
        let err = engine.mark_read("missing").expect_err("unknown id");
        assert_eq!(err.code(), ErrorCode::NotificationNotFound);
        assert_eq!(
            engine.mark_read(" ").expect_err("blank").kind(),
            ErrorKind::Validation
        );
    }

    #[test]
    fn emit_requires_recipient() {
        let store = MemoryStore::new();
        let engine = NotificationEngine::new(&store);
        let mut bad = watch_from("bo");
        bad.recipient_id = String::new();
        assert_eq!(
            engine.emit(&bad).expect_err("blank recipient").code(),
            ErrorCode::InvalidUser
        );
        assert_eq!(store.len(Collection::Notifications).expect("len"), 0);
    }
}
