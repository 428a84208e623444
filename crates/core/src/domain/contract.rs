use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::approver::{ApproverRole, ApproverSet};
use crate::domain::timeline::TimelineEntry;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContractId(pub String);

impl std::fmt::Display for ContractId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    Requested,
    Draft,
    LegalReview,
    ManagementReview,
    WwfSigning,
    CounterpartySigning,
    Implementation,
    Amendment,
    ContractEnd,
    Finished,
    LegalSendBack,
    ManagementSendBack,
    LegalDeclined,
    ManagementDeclined,
}

impl ContractStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::Draft => "draft",
            Self::LegalReview => "legal_review",
            Self::ManagementReview => "management_review",
            Self::WwfSigning => "wwf_signing",
            Self::CounterpartySigning => "counterparty_signing",
            Self::Implementation => "implementation",
            Self::Amendment => "amendment",
            Self::ContractEnd => "contract_end",
            Self::Finished => "finished",
            Self::LegalSendBack => "legal_send_back",
            Self::ManagementSendBack => "management_send_back",
            Self::LegalDeclined => "legal_declined",
            Self::ManagementDeclined => "management_declined",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "requested" => Some(Self::Requested),
            "draft" => Some(Self::Draft),
            "legal_review" => Some(Self::LegalReview),
            "management_review" => Some(Self::ManagementReview),
            "wwf_signing" => Some(Self::WwfSigning),
            "counterparty_signing" => Some(Self::CounterpartySigning),
            "implementation" => Some(Self::Implementation),
            "amendment" => Some(Self::Amendment),
            "contract_end" => Some(Self::ContractEnd),
            "finished" => Some(Self::Finished),
            "legal_send_back" => Some(Self::LegalSendBack),
            "management_send_back" => Some(Self::ManagementSendBack),
            "legal_declined" => Some(Self::LegalDeclined),
            "management_declined" => Some(Self::ManagementDeclined),
            _ => None,
        }
    }

    /// `*_declined` is the legacy spelling of `*_send_back`; both belong to the role.
    pub fn send_back_role(&self) -> Option<ApproverRole> {
        match self {
            Self::LegalSendBack | Self::LegalDeclined => Some(ApproverRole::Legal),
            Self::ManagementSendBack | Self::ManagementDeclined => Some(ApproverRole::Management),
            _ => None,
        }
    }

    pub fn is_sent_back(&self) -> bool {
        self.send_back_role().is_some()
    }

    /// Statuses where no reviewer has anything left to do.
    pub fn is_out_of_review(&self) -> bool {
        matches!(
            self,
            Self::Finished
                | Self::ContractEnd
                | Self::Implementation
                | Self::WwfSigning
                | Self::CounterpartySigning
        )
    }

    pub fn can_start_amendment(&self) -> bool {
        matches!(self, Self::Implementation | Self::WwfSigning | Self::CounterpartySigning)
    }
}

impl std::fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmendmentStage {
    Amendment,
    Legal,
    Wwf,
    Counterparty,
}

impl AmendmentStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Amendment => "amendment",
            Self::Legal => "legal",
            Self::Wwf => "wwf",
            Self::Counterparty => "counterparty",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "amendment" => Some(Self::Amendment),
            "legal" => Some(Self::Legal),
            "wwf" => Some(Self::Wwf),
            "counterparty" => Some(Self::Counterparty),
            _ => None,
        }
    }
}

impl std::fmt::Display for AmendmentStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    pub id: ContractId,
    pub title: String,
    pub status: ContractStatus,
    #[serde(default)]
    pub approvers: ApproverSet,
    #[serde(default)]
    pub is_amended: bool,
    #[serde(default)]
    pub amendment_stage: Option<AmendmentStage>,
    #[serde(default)]
    pub original_status: Option<ContractStatus>,
    #[serde(default)]
    pub timeline: Vec<TimelineEntry>,
    /// Optimistic-concurrency fingerprint, bumped by the store on every save.
    #[serde(default)]
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contract {
    pub fn new(id: ContractId, title: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: title.into(),
            status: ContractStatus::Draft,
            approvers: ApproverSet::default(),
            is_amended: false,
            amendment_stage: None,
            original_status: None,
            timeline: Vec::new(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_status(mut self, status: ContractStatus) -> Self {
        self.status = status;
        self
    }

    /// True while the amendment sub-workflow owns the contract.
    pub fn in_amendment(&self) -> bool {
        self.is_amended && self.status == ContractStatus::Amendment
    }

    pub fn summary(&self) -> ContractSummary {
        ContractSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            status: self.status,
            amendment_stage: self.amendment_stage,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractSummary {
    pub id: ContractId,
    pub title: String,
    pub status: ContractStatus,
    pub amendment_stage: Option<AmendmentStage>,
}

/// Capabilities supplied by the caller's identity provider for one call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleFlags {
    pub is_admin: bool,
    pub is_legal_team: bool,
    pub is_management_team: bool,
    pub is_approver: bool,
}

impl RoleFlags {
    pub fn admin() -> Self {
        Self { is_admin: true, ..Self::default() }
    }

    pub fn for_role(role: ApproverRole) -> Self {
        let mut flags = Self::default();
        match role {
            ApproverRole::Legal => flags.is_legal_team = true,
            ApproverRole::Management => flags.is_management_team = true,
            ApproverRole::Approver => flags.is_approver = true,
        }
        flags
    }

    pub fn holds(&self, role: ApproverRole) -> bool {
        match role {
            ApproverRole::Legal => self.is_legal_team,
            ApproverRole::Management => self.is_management_team,
            ApproverRole::Approver => self.is_approver,
        }
    }

    pub fn roles(&self) -> Vec<ApproverRole> {
        ApproverRole::ALL.into_iter().filter(|role| self.holds(*role)).collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub email: String,
    pub name: String,
    pub capabilities: RoleFlags,
}

impl Actor {
    pub fn new(email: impl Into<String>, name: impl Into<String>, capabilities: RoleFlags) -> Self {
        Self { email: email.into(), name: name.into(), capabilities }
    }
}

#[cfg(test)]
mod tests {
    use super::{AmendmentStage, ContractStatus, RoleFlags};
    use crate::domain::approver::ApproverRole;

    #[test]
    fn status_strings_round_trip() {
        for status in [
            ContractStatus::Requested,
            ContractStatus::LegalReview,
            ContractStatus::ManagementDeclined,
            ContractStatus::CounterpartySigning,
        ] {
            assert_eq!(ContractStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ContractStatus::parse("archived"), None);
    }

    #[test]
    fn declined_statuses_are_send_back_synonyms() {
        assert_eq!(ContractStatus::LegalDeclined.send_back_role(), Some(ApproverRole::Legal));
        assert_eq!(
            ContractStatus::ManagementSendBack.send_back_role(),
            Some(ApproverRole::Management)
        );
        assert!(!ContractStatus::LegalReview.is_sent_back());
    }

    #[test]
    fn amendment_only_starts_after_signing() {
        assert!(ContractStatus::Implementation.can_start_amendment());
        assert!(ContractStatus::WwfSigning.can_start_amendment());
        assert!(!ContractStatus::Draft.can_start_amendment());
        assert!(!ContractStatus::Amendment.can_start_amendment());
    }

    #[test]
    fn role_flags_list_held_roles() {
        let flags = RoleFlags { is_legal_team: true, is_approver: true, ..RoleFlags::default() };
        assert_eq!(flags.roles(), vec![ApproverRole::Legal, ApproverRole::Approver]);
        assert_eq!(AmendmentStage::parse("WWF"), Some(AmendmentStage::Wwf));
    }
}
