use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::counter::Membership;

/// Persisted comments are always `posted`; drafts never reach the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentStatus {
    #[default]
    Posted,
}

/// A comment on a problem, optionally replying to another comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub problem_id: String,
    pub user_id: String,
    pub user_name: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub status: CommentStatus,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub liked_by: BTreeSet<String>,
    #[serde(default)]
    pub dislikes: u64,
    #[serde(default)]
    pub disliked_by: BTreeSet<String>,
    #[serde(default)]
    pub accepted: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Comment {
    #[must_use]
    pub fn likers(&self) -> Membership {
        Membership::new(self.likes, self.liked_by.clone())
    }

    #[must_use]
    pub fn dislikers(&self) -> Membership {
        Membership::new(self.dislikes, self.disliked_by.clone())
    }
}

/// Caller-supplied payload for a new comment. The author comes from the
/// acting identity, not from the payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub problem_id: String,
    pub content: String,
    #[serde(default)]
    pub parent_id: Option<String>,
}
