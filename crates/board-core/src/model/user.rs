use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Denormalized mirror of an authenticated identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub display_name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Titles of problems where this user's comment was accepted. Maintained
    /// on a best-effort basis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_solutions: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProfile {
    pub display_name: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub accepted_solutions: Option<Vec<String>>,
}

impl ProfilePatch {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.email.is_none() && self.accepted_solutions.is_none()
    }
}
