use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One append-only record of something that happened to a contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub actor_email: String,
    pub actor_name: String,
    #[serde(default)]
    pub details: String,
}

impl TimelineEntry {
    pub fn new(
        timestamp: DateTime<Utc>,
        action: impl Into<String>,
        actor_email: impl Into<String>,
        actor_name: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp,
            action: action.into(),
            actor_email: actor_email.into(),
            actor_name: actor_name.into(),
            details: details.into(),
        }
    }
}

/// Caller-supplied wording that replaces the generic action/details text.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineNote {
    pub action: Option<String>,
    pub details: Option<String>,
}

impl TimelineNote {
    pub fn details(details: impl Into<String>) -> Self {
        Self { action: None, details: Some(details.into()) }
    }
}
