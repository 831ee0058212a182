use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory under the project root that holds board state.
pub const BOARD_DIR: &str = ".board";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub engagement: EngagementConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    /// Preferred CLI output mode (`pretty`, `text`, `json`).
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: Backend,
    /// Database file, relative to the project root unless absolute.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            path: default_store_path(),
        }
    }
}

impl StoreConfig {
    #[must_use]
    pub fn resolved_path(&self, project_root: &Path) -> PathBuf {
        if self.path.is_absolute() {
            self.path.clone()
        } else {
            project_root.join(&self.path)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementConfig {
    /// A problem is `Trending` while its watch count is strictly above this.
    #[serde(default = "default_trending_threshold")]
    pub trending_threshold: u64,
    /// Liking clears the actor's dislike and vice versa.
    #[serde(default = "default_true")]
    pub exclusive_reactions: bool,
    /// Accepting a comment un-accepts every other comment on the problem.
    #[serde(default = "default_true")]
    pub single_accepted_solution: bool,
}

impl Default for EngagementConfig {
    fn default() -> Self {
        Self {
            trending_threshold: default_trending_threshold(),
            exclusive_reactions: default_true(),
            single_accepted_solution: default_true(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
        }
    }
}

fn read_config(path: &Path) -> Result<Option<BoardConfig>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<BoardConfig>(&content)
        .map(Some)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Load `<root>/.board/config.toml`, or defaults when the file is absent.
pub fn load_project_config(project_root: &Path) -> Result<BoardConfig> {
    let path = project_root.join(BOARD_DIR).join("config.toml");
    Ok(read_config(&path)?.unwrap_or_default())
}

/// Load `<config_dir>/board/config.toml`, or defaults when absent.
pub fn load_user_config() -> Result<BoardConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(BoardConfig::default());
    };
    Ok(read_config(&config_dir.join("board/config.toml"))?.unwrap_or_default())
}

/// The project file wins wholesale when present; otherwise the user file
/// applies; otherwise defaults.
pub fn resolve_config(project_root: &Path) -> Result<BoardConfig> {
    let project_path = project_root.join(BOARD_DIR).join("config.toml");
    if let Some(project) = read_config(&project_path)? {
        tracing::debug!(path = %project_path.display(), "using project config");
        return Ok(project);
    }
    load_user_config()
}

const fn default_true() -> bool {
    true
}

const fn default_trending_threshold() -> u64 {
    3
}

fn default_store_path() -> PathBuf {
    PathBuf::from(BOARD_DIR).join("board.sqlite3")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_project_config(root: &Path, body: &str) {
        let dir = root.join(BOARD_DIR);
        std::fs::create_dir_all(&dir).expect("create .board");
        std::fs::write(dir.join("config.toml"), body).expect("write config");
    }

    #[test]
    fn missing_project_config_uses_defaults() {
        let root = tempfile::tempdir().expect("tempdir");
        let cfg = load_project_config(root.path()).expect("load should succeed");
        assert_eq!(cfg.store.backend, Backend::Sqlite);
        assert_eq!(cfg.store.path, PathBuf::from(".board/board.sqlite3"));
        assert_eq!(cfg.engagement.trending_threshold, 3);
        assert!(cfg.engagement.exclusive_reactions);
        assert!(cfg.engagement.single_accepted_solution);
        assert!(cfg.notifications.enabled);
        assert_eq!(cfg.output, None);
    }

    #[test]
    fn partial_sections_fill_in_defaults() {
        let root = tempfile::tempdir().expect("tempdir");
        write_project_config(
            root.path(),
            r#"
[store]
backend = "memory"

[engagement]
trending_threshold = 10
"#,
        );

        let cfg = load_project_config(root.path()).expect("load");
        assert_eq!(cfg.store.backend, Backend::Memory);
        assert_eq!(cfg.store.path, default_store_path());
        assert_eq!(cfg.engagement.trending_threshold, 10);
        assert!(cfg.engagement.exclusive_reactions);
        assert!(cfg.notifications.enabled);
    }

    #[test]
    fn project_config_wins_over_user_config() {
        let root = tempfile::tempdir().expect("tempdir");
        write_project_config(root.path(), "[notifications]\nenabled = false\n");
        let cfg = resolve_config(root.path()).expect("resolve");
        assert!(!cfg.notifications.enabled);
    }

    #[test]
    fn malformed_config_reports_the_path() {
        let root = tempfile::tempdir().expect("tempdir");
        write_project_config(root.path(), "[store\nbackend = ");
        let err = load_project_config(root.path()).expect_err("parse must fail");
        assert!(format!("{err:#}").contains("config.toml"));
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let root = tempfile::tempdir().expect("tempdir");
        write_project_config(root.path(), "[store]\nbackend = \"postgres\"\n");
        assert!(load_project_config(root.path()).is_err());
    }

    #[test]
    fn relative_store_path_resolves_under_root() {
        let store = StoreConfig::default();
        assert_eq!(
            store.resolved_path(Path::new("/srv/board")),
            PathBuf::from("/srv/board/.board/board.sqlite3")
        );
        let absolute = StoreConfig {
            path: PathBuf::from("/var/lib/board.db"),
            ..StoreConfig::default()
        };
        assert_eq!(
            absolute.resolved_path(Path::new("/srv/board")),
            PathBuf::from("/var/lib/board.db")
        );
    }
}
