//! Records stored in the hosted service, and the payloads written to it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Server-assigned row identifier.
///
/// The service may hand out UUIDs or integer identities; both are kept as
/// their textual form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(i64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => RecordId(s),
            Raw::Number(n) => RecordId(n.to_string()),
        })
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Row of the `projects` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: RecordId,
    pub title: String,
    pub description: String,
    pub image_url: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tech_stack: Vec<String>,
    #[serde(default)]
    pub github_url: Option<String>,
    #[serde(default)]
    pub live_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Validated project payload for insert and update.
///
/// Optional URLs serialize as `null` so an edit can clear them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub tech_stack: Vec<String>,
    pub github_url: Option<String>,
    pub live_url: Option<String>,
}

/// Row of the `contact_messages` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactMessage {
    pub id: RecordId,
    pub name: String,
    pub email: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Contact form submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewContactMessage {
    pub name: String,
    pub email: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

/// Ordering and limit for a `created_at`-sorted select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListQuery {
    pub order: SortOrder,
    pub limit: Option<usize>,
}

impl ListQuery {
    pub fn newest_first() -> Self {
        Self::default()
    }

    pub fn oldest_first(limit: usize) -> Self {
        Self {
            order: SortOrder::Ascending,
            limit: Some(limit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_accepts_text_and_integer() {
        let text: RecordId = serde_json::from_str("\"a1b2\"").unwrap();
        let number: RecordId = serde_json::from_str("42").unwrap();
        assert_eq!(text.as_str(), "a1b2");
        assert_eq!(number.as_str(), "42");
    }

    #[test]
    fn test_project_null_tech_stack_is_empty() {
        let project: Project = serde_json::from_value(serde_json::json!({
            "id": 7,
            "title": "Site",
            "description": "d",
            "image_url": "https://cdn/x.png",
            "tech_stack": null,
            "github_url": null,
            "created_at": "2024-05-01T10:00:00.123456+00:00"
        }))
        .unwrap();
        assert!(project.tech_stack.is_empty());
        assert!(project.live_url.is_none());
        assert_eq!(project.id, RecordId::new("7"));
    }

    #[test]
    fn test_project_record_serializes_absent_urls_as_null() {
        let record = ProjectRecord {
            title: "t".into(),
            description: "d".into(),
            image_url: "u".into(),
            tech_stack: vec!["Rust".into()],
            github_url: None,
            live_url: None,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert!(json["github_url"].is_null());
        assert_eq!(json["tech_stack"][0], "Rust");
    }
}
