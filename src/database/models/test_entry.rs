use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Entity, ModelError};

/// Demo record behind `/test` and `/data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestEntry {
    #[serde(default)]
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Entity for TestEntry {
    const COLLECTION: &'static str = "tests";
}

impl TestEntry {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::nil(),
            name: name.into(),
            message: message.into(),
            created_at: Utc::now(),
        }
    }

    /// Fixed sample written by `GET /test` to prove the store accepts writes.
    pub fn sample() -> Self {
        Self::new("Team test user", "Test record written; the database connection works.")
    }
}

/// Body of `POST /data`
#[derive(Debug, Default, Deserialize)]
pub struct NewTestEntry {
    pub name: Option<String>,
    pub message: Option<String>,
}

impl NewTestEntry {
    pub fn into_entry(self) -> Result<TestEntry, ModelError> {
        match (non_blank(self.name), non_blank(self.message)) {
            (Some(name), Some(message)) => Ok(TestEntry::new(name, message)),
            (None, _) => Err(ModelError::Required("name".into())),
            (_, None) => Err(ModelError::Required("message".into())),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_fields_are_required() {
        let ok = NewTestEntry { name: Some("n".into()), message: Some("m".into()) };
        assert_eq!(ok.into_entry().unwrap().message, "m");

        let err = NewTestEntry { name: Some("n".into()), message: Some(String::new()) };
        assert_eq!(err.into_entry().unwrap_err(), ModelError::Required("message".into()));
    }
}
