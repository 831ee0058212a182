use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeSet;

use super::notification::NotificationEngine;
use super::{
    decode_all, load, members_value, newest_first, non_blank, require_id, side_effect, store_error,
    to_document,
};
use crate::config::BoardConfig;
use crate::error::{BoardError, ErrorCode, Result};
use crate::identity::Actor;
use crate::model::{
    Category, Frequency, NewNotification, NewProblem, NotificationKind, Problem, ProblemPatch,
    Status,
};
use crate::store::{Collection, Document, DocumentStore, Filter, timestamp_value};

/// Outcome of [`ProblemEngine::toggle_watch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WatchToggle {
    pub watching: u64,
    pub watched: bool,
    pub status: Status,
}

/// Outcome of [`ProblemEngine::toggle_empathy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EmpathyToggle {
    pub empathy: u64,
    pub empathized: bool,
}

/// Problem lifecycle, engagement counters, and status derivation.
#[derive(Clone, Copy)]
pub struct ProblemEngine<'a> {
    store: &'a dyn DocumentStore,
    config: &'a BoardConfig,
}

fn parse_category(raw: &str) -> Result<Category> {
    raw.parse()
        .map_err(|err| BoardError::validation(ErrorCode::InvalidCategory, format!("{err}")))
}

fn parse_frequency(raw: &str) -> Result<Frequency> {
    raw.parse()
        .map_err(|err| BoardError::validation(ErrorCode::InvalidFrequency, format!("{err}")))
}

fn status_value(status: Status) -> Value {
    Value::String(status.as_str().to_string())
}

impl<'a> ProblemEngine<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore, config: &'a BoardConfig) -> Self {
        Self { store, config }
    }

    const fn threshold(&self) -> u64 {
        self.config.engagement.trending_threshold
    }

    fn notifier(&self) -> Option<NotificationEngine<'a>> {
        self.config
            .notifications
            .enabled
            .then(|| NotificationEngine::new(self.store))
    }

    /// Validate and persist a new problem owned by `owner`. Nothing is
    /// written when validation fails.
    pub fn create(&self, payload: &NewProblem, owner: &Actor) -> Result<String> {
        owner.validate()?;

        let missing: Vec<&str> = [
            ("title", &payload.title),
            ("description", &payload.description),
            ("category", &payload.category),
            ("frequency", &payload.frequency),
        ]
        .into_iter()
        .filter(|(_, value)| !non_blank(value))
        .map(|(name, _)| name)
        .collect();
        if !missing.is_empty() {
            return Err(BoardError::validation(
                ErrorCode::MissingProblemFields,
                format!("missing {}", missing.join(", ")),
            ));
        }

        let problem = Problem {
            id: String::new(),
            title: payload.title.trim().to_string(),
            description: payload.description.trim().to_string(),
            category: parse_category(&payload.category)?,
            frequency: parse_frequency(&payload.frequency)?,
            features: payload.features.clone(),
            user_id: owner.uid.clone(),
            user_name: owner.display_name.clone(),
            empathy: 0,
            empathized_by: BTreeSet::new(),
            views: 0,
            views_by: BTreeSet::new(),
            watching: 0,
            watching_by: BTreeSet::new(),
            status: Status::Open,
            created_at: self.store.server_timestamp(),
            updated_at: None,
        };

        let id = self
            .store
            .create(Collection::Problems, to_document(&problem)?)?;
        tracing::info!(id = %id, owner = %owner.uid, category = %problem.category, "problem created");
        Ok(id)
    }

    pub fn get(&self, id: &str) -> Result<Problem> {
        let id = require_id(id, ErrorCode::InvalidProblemId)?;
        load(
            self.store,
            Collection::Problems,
            id,
            ErrorCode::ProblemNotFound,
            "problem",
        )
    }

    /// Every problem, newest first.
    pub fn list_all(&self) -> Result<Vec<Problem>> {
        self.list(&[])
    }

    pub fn list_by_category(&self, category: Category) -> Result<Vec<Problem>> {
        self.list(&[Filter::equals("category", category.as_str())])
    }

    pub fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Problem>> {
        self.list(&[Filter::equals("userId", owner_id)])
    }

    fn list(&self, filters: &[Filter]) -> Result<Vec<Problem>> {
        let mut problems: Vec<Problem> = decode_all(
            Collection::Problems,
            self.store.query(Collection::Problems, filters)?,
        )?;
        newest_first(&mut problems, |p| p.created_at);
        Ok(problems)
    }

    /// Edit the descriptive fields of a problem. Counters and status are
    /// never touched here.
    pub fn update(&self, id: &str, patch: &ProblemPatch, actor: &Actor) -> Result<()> {
        actor.validate()?;
        let id = require_id(id, ErrorCode::InvalidProblemId)?;
        if patch.is_empty() {
            return Err(BoardError::validation(
                ErrorCode::NoProblemUpdates,
                "no editable field supplied",
            ));
        }

        let mut doc = Document::new();
        for (name, value) in [("title", &patch.title), ("description", &patch.description)] {
            if let Some(value) = value {
                if !non_blank(value) {
                    return Err(BoardError::validation(
                        ErrorCode::MissingProblemFields,
                        format!("{name} cannot be blank"),
                    ));
                }
                doc.insert(name.to_string(), json!(value.trim()));
            }
        }
        if let Some(raw) = &patch.category {
            doc.insert("category".into(), json!(parse_category(raw)?.as_str()));
        }
        if let Some(raw) = &patch.frequency {
            doc.insert("frequency".into(), json!(parse_frequency(raw)?.as_str()));
        }
        if let Some(features) = &patch.features {
            doc.insert("features".into(), json!(features));
        }
        doc.insert(
            "updatedAt".into(),
            timestamp_value(self.store.server_timestamp()),
        );

        self.store
            .update(Collection::Problems, id, doc)
            .map_err(|err| store_error(err, ErrorCode::ProblemNotFound, "problem"))?;
        tracing::debug!(id, actor = %actor.uid, "problem updated");
        Ok(())
    }

    /// Hard-delete a problem. Child comments are left in place.
    pub fn delete(&self, id: &str, actor: &Actor) -> Result<()> {
        actor.validate()?;
        let id = require_id(id, ErrorCode::InvalidProblemId)?;
        self.store
            .delete(Collection::Problems, id)
            .map_err(|err| store_error(err, ErrorCode::ProblemNotFound, "problem"))?;
        tracing::info!(id, actor = %actor.uid, "problem deleted");
        Ok(())
    }

    /// Flip the actor's watch on a problem and re-derive its status.
    ///
    /// Starting to watch notifies the owner (unless the actor is the owner);
    /// stopping retracts the actor's earlier watch notification.
    pub fn toggle_watch(&self, id: &str, actor: &Actor) -> Result<WatchToggle> {
        actor.validate()?;
        let problem = self.get(id)?;

        let toggled = problem.watchers().toggle(&actor.uid);
        let watching = toggled.membership.count;
        let status = problem.status.after_watch_change(watching, self.threshold());

        self.write(
            &problem.id,
            [
                ("watching", json!(watching)),
                ("watchingBy", members_value(&toggled.membership.members)),
                ("status", status_value(status)),
            ],
        )?;
        tracing::debug!(
            id = %problem.id,
            actor = %actor.uid,
            watching,
            %status,
            "watch toggled"
        );

        self.follow_up(
            &problem,
            actor,
            NotificationKind::Watch,
            toggled.is_member,
        )?;

        Ok(WatchToggle {
            watching,
            watched: toggled.is_member,
            status,
        })
    }

    /// Flip the actor's empathy on a problem. Status is unaffected.
    pub fn toggle_empathy(&self, id: &str, actor: &Actor) -> Result<EmpathyToggle> {
        actor.validate()?;
        let problem = self.get(id)?;

        let toggled = problem.empathizers().toggle(&actor.uid);
        self.write(
            &problem.id,
            [
                ("empathy", json!(toggled.membership.count)),
                ("empathizedBy", members_value(&toggled.membership.members)),
            ],
        )?;
        tracing::debug!(
            id = %problem.id,
            actor = %actor.uid,
            empathy = toggled.membership.count,
            "empathy toggled"
        );

        self.follow_up(
            &problem,
            actor,
            NotificationKind::Empathy,
            toggled.is_member,
        )?;

        Ok(EmpathyToggle {
            empathy: toggled.membership.count,
            empathized: toggled.is_member,
        })
    }

    /// Count a view from `viewer` once, ever. Returns the new view count, or
    /// `None` when this viewer was already counted.
    pub fn increase_view(&self, id: &str, viewer: &Actor) -> Result<Option<u64>> {
        viewer.validate()?;
        let problem = self.get(id)?;

        let Some(next) = problem.viewers().increase_once(&viewer.uid) else {
            return Ok(None);
        };
        self.write(
            &problem.id,
            [
                ("views", json!(next.count)),
                ("viewsBy", members_value(&next.members)),
            ],
        )?;
        Ok(Some(next.count))
    }

    /// Persist a status computed elsewhere (accept/unaccept, comment deletion).
    pub(crate) fn set_status(&self, id: &str, status: Status) -> Result<()> {
        self.write(id, [("status", status_value(status))])
    }

    fn write<const N: usize>(&self, id: &str, pairs: [(&str, Value); N]) -> Result<()> {
        self.store
            .update(Collection::Problems, id, crate::store::fields(pairs))
            .map_err(|err| store_error(err, ErrorCode::ProblemNotFound, "problem"))
    }

    /// Emit or retract the notification that pairs with a toggle.
    fn follow_up(
        &self,
        problem: &Problem,
        actor: &Actor,
        kind: NotificationKind,
        now_member: bool,
    ) -> Result<()> {
        let Some(notifier) = self.notifier() else {
            return Ok(());
        };

        if now_member {
            if problem.user_id == actor.uid {
                return Ok(());
            }
            let emitted = notifier.emit(&NewNotification {
                recipient_id: problem.user_id.clone(),
                kind,
                problem_id: problem.id.clone(),
                problem_title: Some(problem.title.clone()),
                actor_id: actor.uid.clone(),
                actor_name: actor.display_name.clone(),
            });
            side_effect("emit notification", &problem.id, emitted).map(|_| ())
        } else {
            let retracted = notifier.retract(&actor.uid, kind, &problem.id);
            side_effect("retract notification", &problem.id, retracted).map(|_| ())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::store::MemoryStore;

    fn payload() -> NewProblem {
        NewProblem {
            title: "Alarm never wakes me".into(),
            description: "I sleep through every alarm".into(),
            category: "Health".into(),
            frequency: "daily".into(),
            features: vec![String::new(), "louder".into()],
        }
    }

    fn owner() -> Actor {
        Actor::new("u1", "Ann")
    }

    #[test]
    fn create_starts_open_with_zeroed_counters() {
        let store = MemoryStore::new();
        let config = BoardConfig::default();
        let engine = ProblemEngine::new(&store, &config);

        let id = engine.create(&payload(), &owner()).expect("create");
        let problem = engine.get(&id).expect("get");

        assert_eq!(problem.status, Status::Open);
        assert_eq!((problem.watching, problem.empathy, problem.views), (0, 0, 0));
        assert!(problem.watching_by.is_empty());
        assert_eq!(problem.category, Category::Health);
        assert_eq!(problem.features, vec![String::new(), "louder".to_string()]);
        assert_eq!(problem.user_name, "Ann");
    }

    #[test]
    fn create_rejects_blank_fields_without_writing() {
        let store = MemoryStore::new();
        let config = BoardConfig::default();
        let engine = ProblemEngine::new(&store, &config);

        let mut bad = payload();
        bad.description = "   ".into();
        let err = engine.create(&bad, &owner()).expect_err("blank description");
        assert_eq!(err.code(), ErrorCode::MissingProblemFields);
        assert!(err.to_string().contains("description"));

        let mut bad = payload();
        bad.frequency = "hourly".into();
        assert_eq!(
            engine.create(&bad, &owner()).expect_err("bad frequency").code(),
            ErrorCode::InvalidFrequency
        );

        let nameless = Actor::new("u1", " ");
        assert_eq!(
            engine.create(&payload(), &nameless).expect_err("no name").kind(),
            ErrorKind::Validation
        );
        assert_eq!(store.len(Collection::Problems).expect("len"), 0);
    }

    #[test]
    fn update_touches_only_descriptive_fields() {
        let store = MemoryStore::new();
        let config = BoardConfig::default();
        let engine = ProblemEngine::new(&store, &config);
        let id = engine.create(&payload(), &owner()).expect("create");
        engine.toggle_watch(&id, &Actor::new("u2", "Bo")).expect("watch");

        let patch = ProblemPatch {
            title: Some("Alarm too quiet".into()),
            category: Some("study".into()),
            ..ProblemPatch::default()
        };
        engine.update(&id, &patch, &owner()).expect("update");

        let problem = engine.get(&id).expect("get");
        assert_eq!(problem.title, "Alarm too quiet");
        assert_eq!(problem.category, Category::Study);
        assert_eq!(problem.watching, 1);
        assert!(problem.updated_at.is_some());
    }

    #[test]
    fn update_errors() {
        let store = MemoryStore::new();
        let config = BoardConfig::default();
        let engine = ProblemEngine::new(&store, &config);
        let id = engine.create(&payload(), &owner()).expect("create");

        assert_eq!(
            engine
                .update(&id, &ProblemPatch::default(), &owner())
                .expect_err("empty patch")
                .code(),
            ErrorCode::NoProblemUpdates
        );
        let patch = ProblemPatch {
            title: Some("x".into()),
            ..ProblemPatch::default()
        };
        assert_eq!(
            engine.update("nope", &patch, &owner()).expect_err("absent").code(),
            ErrorCode::ProblemNotFound
        );
    }

    #[test]
    fn watch_notifies_owner_and_unwatch_retracts() {
        let store = MemoryStore::new();
        let config = BoardConfig::default();
        let engine = ProblemEngine::new(&store, &config);
        let notes = NotificationEngine::new(&store);
        let id = engine.create(&payload(), &owner()).expect("create");
        let bo = Actor::new("u2", "Bo");

        let on = engine.toggle_watch(&id, &bo).expect("watch");
        assert!(on.watched);
        assert_eq!(notes.count_unread("u1").expect("count"), 1);
        assert_eq!(
            notes.list_unread("u1").expect("list")[0].message,
            "Bo watched your problem."
        );

        let off = engine.toggle_watch(&id, &bo).expect("unwatch");
        assert!(!off.watched);
        assert_eq!(off.watching, 0);
        assert_eq!(notes.count_unread("u1").expect("count"), 0);
    }

    #[test]
    fn owner_actions_do_not_notify_themselves() {
        let store = MemoryStore::new();
        let config = BoardConfig::default();
        let engine = ProblemEngine::new(&store, &config);
        let id = engine.create(&payload(), &owner()).expect("create");

        engine.toggle_watch(&id, &owner()).expect("watch");
        engine.toggle_empathy(&id, &owner()).expect("empathy");
        assert_eq!(store.len(Collection::Notifications).expect("len"), 0);
    }

    #[test]
    fn disabled_notifications_skip_emission() {
        let store = MemoryStore::new();
        let mut config = BoardConfig::default();
        config.notifications.enabled = false;
        let engine = ProblemEngine::new(&store, &config);
        let id = engine.create(&payload(), &owner()).expect("create");

        engine.toggle_empathy(&id, &Actor::new("u2", "Bo")).expect("empathy");
        assert_eq!(store.len(Collection::Notifications).expect("len"), 0);
    }

    #[test]
    fn views_count_once_per_viewer() {
        let store = MemoryStore::new();
        let config = BoardConfig::default();
        let engine = ProblemEngine::new(&store, &config);
        let id = engine.create(&payload(), &owner()).expect("create");
        let bo = Actor::new("u2", "Bo");

        assert_eq!(engine.increase_view(&id, &bo).expect("first"), Some(1));
        assert_eq!(engine.increase_view(&id, &bo).expect("second"), None);
        assert_eq!(engine.get(&id).expect("get").views, 1);
    }

    #[test]
    fn configured_threshold_drives_trending() {
        let store = MemoryStore::new();
        let mut config = BoardConfig::default();
        config.engagement.trending_threshold = 1;
        let engine = ProblemEngine::new(&store, &config);
        let id = engine.create(&payload(), &owner()).expect("create");

        let first = engine.toggle_watch(&id, &Actor::new("a", "A")).expect("a");
        assert_eq!(first.status, Status::Open);
        let second = engine.toggle_watch(&id, &Actor::new("b", "B")).expect("b");
        assert_eq!(second.status, Status::Trending);
    }

    #[test]
    fn lists_are_newest_first_and_filtered() {
        let store = MemoryStore::new();
        let config = BoardConfig::default();
        let engine = ProblemEngine::new(&store, &config);
        let first = engine.create(&payload(), &owner()).expect("first");
        let mut work = payload();
        work.category = "work".into();
        let second = engine
            .create(&work, &Actor::new("u2", "Bo"))
            .expect("second");

        let all: Vec<_> = engine
            .list_all()
            .expect("all")
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(all, vec![second.clone(), first.clone()]);

        let work_only = engine.list_by_category(Category::Work).expect("work");
        assert_eq!(work_only.len(), 1);
        assert_eq!(work_only[0].id, second);

        let mine = engine.list_by_owner("u1").expect("mine");
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, first);
    }

    #[test]
    fn delete_missing_problem_is_not_found() {
        let store = MemoryStore::new();
        let config = BoardConfig::default();
        let engine = ProblemEngine::new(&store, &config);
        let err = engine.delete("ghost", &owner()).expect_err("absent");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
