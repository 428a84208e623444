use serde::{Deserialize, Serialize};

use crate::domain::{
    AmendmentStage, ApproverRole, ApproverSet, Contract, ContractStatus, TimelineEntry,
    TimelineNote,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReviewVerb {
    Approve,
    SendBack,
    Withdraw,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub email: String,
    pub name: String,
}

impl TeamMember {
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self { email: email.into(), name: name.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkflowAction {
    Assign { role: ApproverRole, member: TeamMember },
    Remove { role: ApproverRole, email: String },
    Approve { role: ApproverRole },
    SendBack { role: ApproverRole },
    Withdraw { role: ApproverRole },
    StartAmendment,
    CompleteAmendment,
    Advance { to: ContractStatus },
}

impl WorkflowAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Assign { .. } => "assign",
            Self::Remove { .. } => "remove",
            Self::Approve { .. } => "approve",
            Self::SendBack { .. } => "send_back",
            Self::Withdraw { .. } => "withdraw",
            Self::StartAmendment => "start_amendment",
            Self::CompleteAmendment => "complete_amendment",
            Self::Advance { .. } => "advance",
        }
    }

    pub fn requires_admin(&self) -> bool {
        !matches!(self, Self::Approve { .. } | Self::SendBack { .. } | Self::Withdraw { .. })
    }
}

/// An action plus optional caller-supplied timeline wording.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub action: WorkflowAction,
    #[serde(default)]
    pub note: Option<TimelineNote>,
}

impl ActionRequest {
    pub fn new(action: WorkflowAction) -> Self {
        Self { action, note: None }
    }

    pub fn with_note(mut self, note: TimelineNote) -> Self {
        self.note = Some(note);
        self
    }
}

impl From<WorkflowAction> for ActionRequest {
    fn from(action: WorkflowAction) -> Self {
        Self::new(action)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkflowEffect {
    SentBack { role: ApproverRole },
    RoleFullyApproved { role: ApproverRole },
    WorkflowReset,
    AmendmentStarted,
    AmendmentReadyForCompletion,
    AmendmentCompleted,
}

/// Why a well-formed action changed nothing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IgnoreReason {
    ActorNotAssigned { role: ApproverRole, email: String },
    AlreadyResponded { role: ApproverRole },
    NothingToWithdraw { role: ApproverRole },
    AlreadyAssigned { role: ApproverRole, email: String },
    RoleSkippedDuringAmendment { role: ApproverRole },
}

impl IgnoreReason {
    pub fn reason(&self) -> String {
        match self {
            Self::ActorNotAssigned { role, email } => {
                format!("`{email}` is not assigned to the {role} slot")
            }
            Self::AlreadyResponded { role } => {
                format!("the {role} record already carries this response")
            }
            Self::NothingToWithdraw { role } => {
                format!("the {role} record has no response to withdraw")
            }
            Self::AlreadyAssigned { role, email } => {
                format!("`{email}` is already assigned to the {role} slot")
            }
            Self::RoleSkippedDuringAmendment { role } => {
                format!("the {role} role does not review amendments")
            }
        }
    }
}

/// Everything a caller must persist after an applied action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractPatch {
    pub previous_status: ContractStatus,
    pub status: ContractStatus,
    pub approvers: ApproverSet,
    pub is_amended: bool,
    pub amendment_stage: Option<AmendmentStage>,
    pub original_status: Option<ContractStatus>,
    pub timeline_entry: TimelineEntry,
    pub effects: Vec<WorkflowEffect>,
}

impl ContractPatch {
    pub fn has_effect(&self, effect: &WorkflowEffect) -> bool {
        self.effects.contains(effect)
    }

    pub fn apply_to(&self, contract: &mut Contract) {
        contract.status = self.status;
        contract.approvers = self.approvers.clone();
        contract.is_amended = self.is_amended;
        contract.amendment_stage = self.amendment_stage;
        contract.original_status = self.original_status;
        contract.timeline.push(self.timeline_entry.clone());
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ActionOutcome {
    Applied(ContractPatch),
    Ignored(IgnoreReason),
}

impl ActionOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}
