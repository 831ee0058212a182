use anyhow::Result as AnyResult;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

use crate::config::{Backend, BoardConfig};
use crate::engine::{CommentEngine, NotificationEngine, ProblemEngine, UserEngine};
use crate::error::{ErrorCode, Result};
use crate::identity::Actor;
use crate::store::{DocumentStore, MemoryStore, SqliteStore};

/// What [`Board::delete_account`] removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AccountDeletion {
    pub comments: usize,
    pub problems: usize,
    pub profile: bool,
}

/// One store plus the effective configuration, handing out engines.
#[derive(Clone)]
pub struct Board {
    store: Arc<dyn DocumentStore>,
    config: BoardConfig,
}

impl Board {
    pub fn new(store: Arc<dyn DocumentStore>, config: BoardConfig) -> Self {
        Self { store, config }
    }

    /// A board over a fresh [`MemoryStore`].
    #[must_use]
    pub fn in_memory(config: BoardConfig) -> Self {
        Self::new(Arc::new(MemoryStore::new()), config)
    }

    /// Open the backend named in `config`, resolving relative store paths
    /// against `project_root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the `SQLite` database cannot be opened or migrated.
    pub fn open(config: BoardConfig, project_root: &Path) -> AnyResult<Self> {
        let store: Arc<dyn DocumentStore> = match config.store.backend {
            Backend::Memory => Arc::new(MemoryStore::new()),
            Backend::Sqlite => {
                let path = config.store.resolved_path(project_root);
                tracing::debug!(path = %path.display(), "opening sqlite store");
                Arc::new(SqliteStore::open(&path)?)
            }
        };
        Ok(Self::new(store, config))
    }

    #[must_use]
    pub const fn config(&self) -> &BoardConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    #[must_use]
    pub fn problems(&self) -> ProblemEngine<'_> {
        ProblemEngine::new(self.store.as_ref(), &self.config)
    }

    #[must_use]
    pub fn comments(&self) -> CommentEngine<'_> {
        CommentEngine::new(self.store.as_ref(), &self.config)
    }

    #[must_use]
    pub fn notifications(&self) -> NotificationEngine<'_> {
        NotificationEngine::new(self.store.as_ref())
    }

    #[must_use]
    pub fn users(&self) -> UserEngine<'_> {
        UserEngine::new(self.store.as_ref())
    }

    /// Remove everything the actor owns: their comments, their problems,
    /// then their profile. A missing profile is not an error.
    pub fn delete_account(&self, actor: &Actor) -> Result<AccountDeletion> {
        actor.validate()?;
        let comments = self.comments().delete_by_user(&actor.uid)?;

        let owned = self.problems().list_by_owner(&actor.uid)?;
        for problem in &owned {
            self.problems().delete(&problem.id, actor)?;
        }

        let profile = match self.users().delete_profile(&actor.uid) {
            Ok(()) => true,
            Err(err) if err.code() == ErrorCode::NotFound => false,
            Err(err) => return Err(err),
        };

        tracing::info!(
            uid = %actor.uid,
            comments,
            problems = owned.len(),
            profile,
            "account deleted"
        );
        Ok(AccountDeletion {
            comments,
            problems: owned.len(),
            profile,
        })
    }
}

impl std::fmt::Debug for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Board")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewComment, NewProblem, NewProfile};

    fn problem(title: &str) -> NewProblem {
        NewProblem {
            title: title.into(),
            description: "details".into(),
            category: "work".into(),
            frequency: "weekly".into(),
            features: Vec::new(),
        }
    }

    #[test]
    fn delete_account_cascades_comments_problems_and_profile() {
        let board = Board::in_memory(BoardConfig::default());
        let ann = Actor::new("u1", "Ann").with_email("ann@example.com");
        let bo = Actor::new("u2", "Bo");
        board.users().ensure_profile(&ann).expect("profile");

        let mine = board.problems().create(&problem("Mine"), &ann).expect("mine");
        let theirs = board.problems().create(&problem("Theirs"), &bo).expect("theirs");
        for pid in [&mine, &theirs] {
            board
                .comments()
                .add(
                    &NewComment {
                        problem_id: pid.clone(),
                        content: "hello".into(),
                        parent_id: None,
                    },
                    &ann,
                )
                .expect("comment");
        }

        let report = board.delete_account(&ann).expect("delete account");
        assert_eq!(
            report,
            AccountDeletion {
                comments: 2,
                problems: 1,
                profile: true
            }
        );
        assert!(board.problems().get(&mine).is_err());
        assert!(board.problems().get(&theirs).is_ok());
        assert!(board.comments().list(&theirs).expect("list").is_empty());
        assert!(board.users().get_profile("u1").is_err());
    }

    #[test]
    fn delete_account_without_profile_succeeds() {
        let board = Board::in_memory(BoardConfig::default());
        let report = board
            .delete_account(&Actor::new("u9", "Nobody"))
            .expect("delete");
        assert_eq!(report, AccountDeletion::default());
    }

    #[test]
    fn open_memory_backend_ignores_path() {
        let mut config = BoardConfig::default();
        config.store.backend = Backend::Memory;
        let board = Board::open(config, Path::new("/nonexistent")).expect("open");
        board
            .users()
            .create_profile(
                "u1",
                &NewProfile {
                    display_name: "Ann".into(),
                    email: "ann@example.com".into(),
                },
            )
            .expect("create");
    }

    #[test]
    fn open_sqlite_backend_creates_database_under_root() {
        let root = tempfile::tempdir().expect("tempdir");
        let board = Board::open(BoardConfig::default(), root.path()).expect("open");
        board
            .problems()
            .create(&problem("Persisted"), &Actor::new("u1", "Ann"))
            .expect("create");
        assert!(root.path().join(".board/board.sqlite3").exists());
    }
}
