use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::ParseEnumError;

/// The event that produced a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Watch,
    Empathy,
    Accept,
    Comment,
}

impl NotificationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Watch => "watch",
            Self::Empathy => "empathy",
            Self::Accept => "accept",
            Self::Comment => "comment",
        }
    }

    /// Render the fixed message template for this kind.
    #[must_use]
    pub fn message(self, actor_name: &str) -> String {
        match self {
            Self::Watch => format!("{actor_name} watched your problem."),
            Self::Empathy => format!("{actor_name} empathized with your problem"),
            Self::Accept => "Your solution is accepted!".to_string(),
            Self::Comment => format!("{actor_name} commented on your problem."),
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "watch" => Ok(Self::Watch),
            "empathy" => Ok(Self::Empathy),
            "accept" => Ok(Self::Accept),
            "comment" => Ok(Self::Comment),
            _ => Err(ParseEnumError {
                expected: "notification type",
                got: s.to_string(),
            }),
        }
    }
}

/// An in-app notification delivered to a problem owner or comment author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub recipient_id: String,
    pub actor_id: String,
    pub actor_name: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub problem_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub problem_title: Option<String>,
    pub message: String,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Everything needed to emit a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub recipient_id: String,
    pub kind: NotificationKind,
    pub problem_id: String,
    pub problem_title: Option<String>,
    pub actor_id: String,
    pub actor_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn message_templates() {
        assert_eq!(
            NotificationKind::Watch.message("Bo"),
            "Bo watched your problem."
        );
        assert_eq!(
            NotificationKind::Empathy.message("Bo"),
            "Bo empathized with your problem"
        );
        assert_eq!(
            NotificationKind::Accept.message("Bo"),
            "Your solution is accepted!"
        );
        assert_eq!(
            NotificationKind::Comment.message("Bo"),
            "Bo commented on your problem."
        );
    }

    #[test]
    fn kind_is_stored_under_type() {
        let n: Notification = serde_json::from_value(json!({
            "id": "n1",
            "recipientId": "u1",
            "actorId": "u2",
            "actorName": "Bo",
            "type": "empathy",
            "problemId": "p1",
            "message": "Bo empathized with your problem",
            "createdAt": "2026-01-02T03:04:05Z"
        }))
        .expect("decode");
        assert_eq!(n.kind, NotificationKind::Empathy);
        assert!(!n.read);
        assert_eq!(serde_json::to_value(&n).expect("encode")["type"], json!("empathy"));
    }
}
