//! board-core library.
//!
//! Problems, comments, notifications, and user profiles for a community
//! problem board, over a pluggable document store.
//!
//! # Conventions
//!
//! - **Errors**: engine operations return [`error::Result`]; every failure
//!   carries a stable [`ErrorCode`]. Config loading and store opening use
//!   `anyhow::Result`.
//! - **Logging**: `tracing` macros only (`info!` for lifecycle events,
//!   `debug!` for store writes, `warn!` for failed side effects).
//! - **Identity**: mutating operations take an explicit [`Actor`].

pub mod board;
pub mod config;
pub mod counter;
pub mod engine;
pub mod error;
pub mod identity;
pub mod model;
pub mod store;

pub use board::{AccountDeletion, Board};
pub use config::BoardConfig;
pub use counter::{Membership, Toggled};
pub use engine::{
    AcceptToggle, CommentForest, EmpathyToggle, MigrationReport, ReactionToggle, ThreadNode,
    WatchToggle, build_threads,
};
pub use error::{BoardError, ErrorCode, ErrorKind};
pub use identity::{Actor, ensure_owned_by, require_actor};
