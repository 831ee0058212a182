//! Membership-backed counters.
//!
//! Every engagement counter on the board (watching, empathy, views, likes,
//! dislikes) is a count plus the set of actor IDs that contributed to it.
//! The set enforces at most one contribution per actor; the count is what
//! readers display.
//!
//! All operations are pure: they take the current state and return the next
//! one, leaving persistence to the engines.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A count together with the actors that contributed to it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Membership {
    pub count: u64,
    pub members: BTreeSet<String>,
}

/// Result of [`Membership::toggle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toggled {
    pub membership: Membership,
    /// Whether the actor is a member after the toggle.
    pub is_member: bool,
}

impl Membership {
    #[must_use]
    pub const fn new(count: u64, members: BTreeSet<String>) -> Self {
        Self { count, members }
    }

    #[must_use]
    pub fn contains(&self, actor: &str) -> bool {
        self.members.contains(actor)
    }

    /// Add `actor` if absent, remove it if present.
    ///
    /// Removal never takes the count below zero, even when a stored count has
    /// drifted below the size of the member set.
    #[must_use]
    pub fn toggle(&self, actor: &str) -> Toggled {
        let mut members = self.members.clone();
        if members.remove(actor) {
            Toggled {
                membership: Self::new(self.count.saturating_sub(1), members),
                is_member: false,
            }
        } else {
            members.insert(actor.to_string());
            Toggled {
                membership: Self::new(self.count.saturating_add(1), members),
                is_member: true,
            }
        }
    }

    /// Count `actor` once, ever. Returns `None` when the actor was already
    /// counted.
    #[must_use]
    pub fn increase_once(&self, actor: &str) -> Option<Self> {
        if self.contains(actor) {
            return None;
        }
        let mut members = self.members.clone();
        members.insert(actor.to_string());
        Some(Self::new(self.count.saturating_add(1), members))
    }

    /// Remove `actor` if present. Returns `None` when the actor was not a
    /// member, so callers can skip the write.
    #[must_use]
    pub fn remove(&self, actor: &str) -> Option<Self> {
        if !self.contains(actor) {
            return None;
        }
        let mut members = self.members.clone();
        members.remove(actor);
        Some(Self::new(self.count.saturating_sub(1), members))
    }
}
