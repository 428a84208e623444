//! Read-side healing for persisted approver documents.
//!
//! Historical rows store approvers in several shapes: a bare object instead of
//! a one-element array, legacy key names, and boolean flags written as
//! strings. Everything is funnelled through [`normalize_approvers`] and
//! [`repair_approvers`] before the workflow sees it, and writes only ever use
//! the canonical [`ApproverSet`] shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::approver::{Approver, ApproverSet};

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("approver document is not valid: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// A boolean that may have been persisted as `"true"` / `"false"`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LooseFlag {
    Bool(bool),
    Text(String),
}

impl LooseFlag {
    pub fn resolve(&self) -> bool {
        match self {
            Self::Bool(value) => *value,
            Self::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
                "true" => true,
                "false" | "" => false,
                other => {
                    tracing::warn!(
                        event_name = "normalize.unrecognized_flag",
                        value = other,
                        "treating unrecognized approver flag as false"
                    );
                    false
                }
            },
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedApprover {
    #[serde(default)]
    pub email: String,
    #[serde(default, alias = "displayName", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved: Option<LooseFlag>,
    #[serde(default, alias = "sentBack", skip_serializing_if = "Option::is_none")]
    pub declined: Option<LooseFlag>,
    #[serde(default, alias = "approved_at", skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        alias = "declined_at",
        alias = "sentBackAt",
        skip_serializing_if = "Option::is_none"
    )]
    pub declined_at: Option<DateTime<Utc>>,
}

/// One role slot as it may appear on disk.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ApproverSlot {
    Many(Vec<PersistedApprover>),
    Single(PersistedApprover),
    #[default]
    Empty,
}

impl ApproverSlot {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Many(records) => records.is_empty(),
            Self::Single(_) => false,
            Self::Empty => true,
        }
    }

    pub fn records(&self) -> Vec<PersistedApprover> {
        match self {
            Self::Many(records) => records.clone(),
            Self::Single(record) => vec![record.clone()],
            Self::Empty => Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedApprovers {
    #[serde(
        default,
        alias = "legalApprovers",
        alias = "legal_approvers",
        skip_serializing_if = "ApproverSlot::is_empty"
    )]
    pub legal: ApproverSlot,
    #[serde(
        default,
        alias = "managementApprovers",
        alias = "management_approvers",
        skip_serializing_if = "ApproverSlot::is_empty"
    )]
    pub management: ApproverSlot,
    #[serde(
        default,
        alias = "approvers",
        alias = "finalApprover",
        alias = "final_approver",
        skip_serializing_if = "ApproverSlot::is_empty"
    )]
    pub approver: ApproverSlot,
}

/// Upconverts every slot to the array shape. Idempotent, never deduplicates.
pub fn normalize_approvers(raw: &PersistedApprovers) -> PersistedApprovers {
    PersistedApprovers {
        legal: ApproverSlot::Many(raw.legal.records()),
        management: ApproverSlot::Many(raw.management.records()),
        approver: ApproverSlot::Many(raw.approver.records()),
    }
}

/// Casts loose flags to booleans and lets approval win over a stale decline.
pub fn repair_approvers(records: Vec<PersistedApprover>) -> Vec<Approver> {
    records.into_iter().map(repair_record).collect()
}

fn repair_record(record: PersistedApprover) -> Approver {
    let approved = record.approved.as_ref().map(LooseFlag::resolve).unwrap_or(false);
    let declined = record.declined.as_ref().map(LooseFlag::resolve);

    let (declined, declined_at) = if approved {
        (false, None)
    } else {
        (declined.unwrap_or(false), record.declined_at)
    };

    Approver {
        email: record.email,
        name: record.name.unwrap_or_default(),
        approved,
        declined,
        approved_at: record.approved_at,
        declined_at,
    }
}

pub fn into_approver_set(raw: &PersistedApprovers) -> ApproverSet {
    let normalized = normalize_approvers(raw);
    ApproverSet {
        legal: repair_approvers(normalized.legal.records()),
        management: repair_approvers(normalized.management.records()),
        approver: repair_approvers(normalized.approver.records()),
    }
}

/// Full read path for a stored approvers document. `null` yields an empty set.
pub fn normalize_contract_approvers(
    value: &serde_json::Value,
) -> Result<ApproverSet, NormalizeError> {
    if value.is_null() {
        return Ok(ApproverSet::default());
    }

    let raw: PersistedApprovers = serde_json::from_value(value.clone())?;
    Ok(into_approver_set(&raw))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        normalize_approvers, normalize_contract_approvers, repair_approvers, ApproverSlot,
        LooseFlag, PersistedApprover, PersistedApprovers,
    };

    #[test]
    fn bare_object_slots_are_wrapped_in_arrays() {
        let raw: PersistedApprovers = serde_json::from_value(json!({
            "legal": { "email": "lee@x.com", "name": "Lee", "approved": true },
            "management": [{ "email": "max@x.com" }, { "email": "mia@x.com" }]
        }))
        .expect("legacy document should parse");

        assert!(matches!(raw.legal, ApproverSlot::Single(_)));
        assert!(matches!(raw.approver, ApproverSlot::Empty));

        let normalized = normalize_approvers(&raw);
        assert!(matches!(&normalized.legal, ApproverSlot::Many(records) if records.len() == 1));
        assert!(
            matches!(&normalized.management, ApproverSlot::Many(records) if records.len() == 2)
        );
        assert!(matches!(&normalized.approver, ApproverSlot::Many(records) if records.is_empty()));
    }

    #[test]
    fn normalization_is_idempotent_for_legacy_shapes() {
        let raw: PersistedApprovers = serde_json::from_value(json!({
            "legalApprovers": { "email": "lee@x.com" },
            "finalApprover": [{ "email": "fin@x.com" }]
        }))
        .expect("aliases should parse");

        let once = normalize_approvers(&raw);
        assert_eq!(normalize_approvers(&once), once);
    }

    #[test]
    fn string_flags_are_cast_to_booleans() {
        let repaired = repair_approvers(vec![PersistedApprover {
            email: "a@x.com".to_owned(),
            approved: Some(LooseFlag::Text("false".to_owned())),
            declined: Some(LooseFlag::Text("true".to_owned())),
            ..PersistedApprover::default()
        }]);

        assert!(!repaired[0].approved);
        assert!(repaired[0].declined);
    }

    #[test]
    fn approval_with_missing_decline_forces_decline_off() {
        let repaired = repair_approvers(vec![PersistedApprover {
            email: "a@x.com".to_owned(),
            approved: Some(LooseFlag::Text("true".to_owned())),
            declined: None,
            ..PersistedApprover::default()
        }]);

        assert!(repaired[0].approved);
        assert!(!repaired[0].declined);
        assert!(repaired[0].declined_at.is_none());
    }

    #[test]
    fn approval_and_decline_together_keeps_approval() {
        let set = normalize_contract_approvers(&json!({
            "management": {
                "email": "max@x.com",
                "approved": "true",
                "sentBack": true,
                "sentBackAt": "2024-03-01T10:00:00Z"
            }
        }))
        .expect("document should normalize");

        let record = &set.management[0];
        assert!(record.approved);
        assert!(!record.declined);
        assert!(record.declined_at.is_none());
    }

    #[test]
    fn approved_record_drops_stale_decline_timestamp() {
        let set = normalize_contract_approvers(&json!({
            "legal": [{
                "email": "lee@x.com",
                "approved": true,
                "declined": false,
                "declinedAt": "2024-03-01T10:00:00Z"
            }]
        }))
        .expect("document should normalize");

        assert!(set.legal[0].approved);
        assert!(set.legal[0].declined_at.is_none());
    }

    #[test]
    fn null_document_yields_empty_set() {
        let set = normalize_contract_approvers(&serde_json::Value::Null).expect("null is valid");
        assert!(set.legal.is_empty() && set.management.is_empty() && set.approver.is_empty());
    }

    #[test]
    fn malformed_document_is_reported() {
        let error = normalize_contract_approvers(&json!({ "legal": 42 }))
            .expect_err("numbers are not approvers");
        assert!(error.to_string().contains("approver document"));
    }
}
