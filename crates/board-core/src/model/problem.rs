use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::{fmt, str::FromStr};

use super::ParseEnumError;
use crate::counter::Membership;

/// What area of life a problem belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    General,
    Work,
    Health,
    Study,
    Finance,
}

impl Category {
    pub const ALL: [Self; 5] = [
        Self::General,
        Self::Work,
        Self::Health,
        Self::Study,
        Self::Finance,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Work => "work",
            Self::Health => "health",
            Self::Study => "study",
            Self::Finance => "finance",
        }
    }
}

/// How often the poster runs into the problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Sometimes,
}

impl Frequency {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Sometimes => "sometimes",
        }
    }
}

/// Derived lifecycle status of a problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Status {
    #[default]
    Open,
    Trending,
    Resolved,
}

impl Status {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::Trending => "Trending",
            Self::Resolved => "Resolved",
        }
    }

    /// Compute status from scratch.
    ///
    /// Precedence: any accepted comment pins `Resolved`; otherwise the
    /// problem is `Trending` while `watching` is strictly above `threshold`.
    #[must_use]
    pub const fn derive(has_accepted: bool, watching: u64, threshold: u64) -> Self {
        if has_accepted {
            Self::Resolved
        } else if watching > threshold {
            Self::Trending
        } else {
            Self::Open
        }
    }

    /// Status after the watch count changed. `Resolved` stays pinned until a
    /// solution is explicitly un-accepted.
    #[must_use]
    pub const fn after_watch_change(self, watching: u64, threshold: u64) -> Self {
        Self::derive(matches!(self, Self::Resolved), watching, threshold)
    }
}

/// A posted problem with its engagement counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub frequency: Frequency,
    #[serde(default)]
    pub features: Vec<String>,
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub empathy: u64,
    #[serde(default)]
    pub empathized_by: BTreeSet<String>,
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub views_by: BTreeSet<String>,
    #[serde(default)]
    pub watching: u64,
    #[serde(default)]
    pub watching_by: BTreeSet<String>,
    #[serde(default)]
    pub status: Status,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Problem {
    #[must_use]
    pub fn watchers(&self) -> Membership {
        Membership::new(self.watching, self.watching_by.clone())
    }

    #[must_use]
    pub fn empathizers(&self) -> Membership {
        Membership::new(self.empathy, self.empathized_by.clone())
    }

    #[must_use]
    pub fn viewers(&self) -> Membership {
        Membership::new(self.views, self.views_by.clone())
    }

    #[must_use]
    pub fn is_watched_by(&self, uid: &str) -> bool {
        self.watching_by.contains(uid)
    }

    #[must_use]
    pub fn is_empathized_by(&self, uid: &str) -> bool {
        self.empathized_by.contains(uid)
    }
}

/// Caller-supplied payload for a new problem. Enum fields arrive as text and
/// are validated before anything is persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProblem {
    pub title: String,
    pub description: String,
    pub category: String,
    pub frequency: String,
    #[serde(default)]
    pub features: Vec<String>,
}

/// Partial edit of a problem. Counters and status are not editable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub frequency: Option<String>,
    pub features: Option<Vec<String>>,
}

impl ProblemPatch {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.frequency.is_none()
            && self.features.is_none()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn normalize(input: &str) -> String {
    input.trim().to_ascii_lowercase()
}

impl FromStr for Category {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "general" => Ok(Self::General),
            "work" => Ok(Self::Work),
            "health" => Ok(Self::Health),
            "study" => Ok(Self::Study),
            "finance" => Ok(Self::Finance),
            _ => Err(ParseEnumError {
                expected: "category",
                got: s.to_string(),
            }),
        }
    }
}

impl FromStr for Frequency {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "sometimes" => Ok(Self::Sometimes),
            _ => Err(ParseEnumError {
                expected: "frequency",
                got: s.to_string(),
            }),
        }
    }
}

impl FromStr for Status {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "open" => Ok(Self::Open),
            "trending" => Ok(Self::Trending),
            "resolved" => Ok(Self::Resolved),
            _ => Err(ParseEnumError {
                expected: "status",
                got: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn enums_parse_case_insensitively() {
        assert_eq!(" Work ".parse::<Category>().expect("parse"), Category::Work);
        assert_eq!("DAILY".parse::<Frequency>().expect("parse"), Frequency::Daily);
        assert_eq!("trending".parse::<Status>().expect("parse"), Status::Trending);
    }

    #[test]
    fn unknown_enum_values_report_what_was_expected() {
        let err = "hobby".parse::<Category>().expect_err("not a category");
        assert_eq!(err.to_string(), "invalid category: 'hobby'");
        assert!("hourly".parse::<Frequency>().is_err());
    }

    #[test]
    fn every_category_round_trips_through_display() {
        for category in Category::ALL {
            assert_eq!(category.to_string().parse::<Category>().expect("parse"), category);
        }
    }

    #[test]
    fn status_serializes_capitalized() {
        assert_eq!(json!(Status::Resolved), json!("Resolved"));
        let back: Status = serde_json::from_value(json!("Trending")).expect("decode");
        assert_eq!(back, Status::Trending);
    }

    #[test]
    fn trending_threshold_is_strict() {
        assert_eq!(Status::derive(false, 3, 3), Status::Open);
        assert_eq!(Status::derive(false, 4, 3), Status::Trending);
        assert_eq!(Status::derive(true, 0, 3), Status::Resolved);
    }

    #[test]
    fn resolved_survives_watch_changes() {
        assert_eq!(Status::Resolved.after_watch_change(10, 3), Status::Resolved);
        assert_eq!(Status::Resolved.after_watch_change(0, 3), Status::Resolved);
        assert_eq!(Status::Trending.after_watch_change(3, 3), Status::Open);
        assert_eq!(Status::Open.after_watch_change(4, 3), Status::Trending);
    }

    #[test]
    fn problem_documents_use_camel_case() {
        let problem: Problem = serde_json::from_value(json!({
            "id": "p1",
            "title": "Alarm never wakes me",
            "description": "I sleep through it",
            "category": "health",
            "frequency": "daily",
            "userId": "u1",
            "userName": "Ann",
            "watching": 2,
            "watchingBy": ["u2", "u3"],
            "createdAt": "2026-01-02T03:04:05Z"
        }))
        .expect("decode");

        assert_eq!(problem.status, Status::Open);
        assert_eq!(problem.empathy, 0);
        assert!(problem.features.is_empty());
        assert!(problem.is_watched_by("u3"));
        assert_eq!(problem.watchers().count, 2);

        let doc = serde_json::to_value(&problem).expect("encode");
        assert_eq!(doc["watchingBy"], json!(["u2", "u3"]));
        assert_eq!(doc["status"], json!("Open"));
        assert!(doc.get("updatedAt").is_none());
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(ProblemPatch::default().is_empty());
        let patch = ProblemPatch {
            features: Some(vec![String::new()]),
            ..ProblemPatch::default()
        };
        assert!(!patch.is_empty());
    }
}
