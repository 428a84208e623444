use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::audit::{AuditCategory, AuditContext, AuditOutcome, AuditSink};
use crate::domain::{
    Actor, AmendmentStage, Approver, ApproverRole, ApproverSet, Contract, ContractStatus,
    RoleLimits, TimelineEntry, TimelineNote,
};
use crate::workflow::action::{
    ActionOutcome, ActionRequest, ContractPatch, IgnoreReason, ReviewVerb, TeamMember,
    WorkflowAction, WorkflowEffect,
};
use crate::workflow::amendment::{self, DEFAULT_RESTORED_STATUS};
use crate::workflow::transitions::{self, StatusChange, TransitionFacts, TransitionVerb};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("{acting_role} cannot act until every {blocking_role} approver has approved")]
    GatingViolation { acting_role: ApproverRole, blocking_role: ApproverRole },
    #[error("the {role} slot already holds the maximum of {limit} approvers")]
    CapacityExceeded { role: ApproverRole, limit: usize },
    #[error("`{action}` requires the admin capability")]
    AdminRequired { action: &'static str },
    #[error("an amendment cannot start from status {status}")]
    InvalidAmendmentStart { status: ContractStatus },
    #[error("amendment is not ready to complete (stage {stage:?})")]
    AmendmentIncomplete { stage: Option<AmendmentStage> },
    #[error("cannot advance from {from} to {to}")]
    InvalidAdvance { from: ContractStatus, to: ContractStatus },
}

/// First role in `role`'s prerequisite chain that is not fully approved.
pub fn blocking_role(
    approvers: &ApproverSet,
    role: ApproverRole,
    in_amendment: bool,
) -> Option<ApproverRole> {
    transitions::prerequisites(role, in_amendment)
        .iter()
        .copied()
        .find(|prerequisite| !approvers.is_fully_approved(*prerequisite))
}

/// Applies one action to a contract snapshot and describes the result as a patch.
///
/// The engine never mutates its input and performs no I/O; persisting the
/// patch and dispatching notifications is left to the caller.
#[derive(Clone, Debug, Default)]
pub struct ApprovalEngine {
    limits: RoleLimits,
}

impl ApprovalEngine {
    pub fn new(limits: RoleLimits) -> Self {
        Self { limits }
    }

    pub fn apply(
        &self,
        contract: &Contract,
        actor: &Actor,
        request: &ActionRequest,
    ) -> Result<ActionOutcome, WorkflowError> {
        self.apply_at(contract, actor, request, Utc::now())
    }

    pub fn apply_at(
        &self,
        contract: &Contract,
        actor: &Actor,
        request: &ActionRequest,
        now: DateTime<Utc>,
    ) -> Result<ActionOutcome, WorkflowError> {
        let action = &request.action;
        if action.requires_admin() && !actor.capabilities.is_admin {
            return Err(WorkflowError::AdminRequired { action: action.name() });
        }

        let step = match action {
            WorkflowAction::Assign { role, member } => self.assign(contract, *role, member)?,
            WorkflowAction::Remove { role, email } => remove(contract, *role, email),
            WorkflowAction::Approve { role } => {
                review(contract, actor, *role, ReviewVerb::Approve, now)?
            }
            WorkflowAction::SendBack { role } => {
                review(contract, actor, *role, ReviewVerb::SendBack, now)?
            }
            WorkflowAction::Withdraw { role } => {
                review(contract, actor, *role, ReviewVerb::Withdraw, now)?
            }
            WorkflowAction::StartAmendment => start_amendment(contract)?,
            WorkflowAction::CompleteAmendment => complete_amendment(contract)?,
            WorkflowAction::Advance { to } => advance(contract, *to)?,
        };

        Ok(match step {
            Step::Ignore(reason) => ActionOutcome::Ignored(reason),
            Step::Change(change) => {
                ActionOutcome::Applied(change.finish(contract, actor, request.note.as_ref(), now))
            }
        })
    }

    pub fn apply_with_audit<S>(
        &self,
        contract: &Contract,
        actor: &Actor,
        request: &ActionRequest,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<ActionOutcome, WorkflowError>
    where
        S: AuditSink + ?Sized,
    {
        let result = self.apply(contract, actor, request);
        let action = request.action.name();
        match &result {
            Ok(ActionOutcome::Applied(patch)) => {
                sink.emit(
                    audit
                        .event(
                            "workflow.action_applied",
                            AuditCategory::Workflow,
                            AuditOutcome::Success,
                        )
                        .with_metadata("action", action)
                        .with_metadata("from", patch.previous_status.as_str())
                        .with_metadata("to", patch.status.as_str())
                        .with_metadata("effects", patch.effects.len().to_string()),
                );
            }
            Ok(ActionOutcome::Ignored(reason)) => {
                sink.emit(
                    audit
                        .event(
                            "workflow.action_ignored",
                            AuditCategory::Workflow,
                            AuditOutcome::Ignored,
                        )
                        .with_metadata("action", action)
                        .with_metadata("reason", reason.reason()),
                );
            }
            Err(error) => {
                sink.emit(
                    audit
                        .event(
                            "workflow.action_rejected",
                            AuditCategory::Workflow,
                            AuditOutcome::Rejected,
                        )
                        .with_metadata("action", action)
                        .with_metadata("error", error.to_string()),
                );
            }
        }
        result
    }

    fn assign(
        &self,
        contract: &Contract,
        role: ApproverRole,
        member: &TeamMember,
    ) -> Result<Step, WorkflowError> {
        if contract.approvers.find(role, &member.email).is_some() {
            return Ok(Step::Ignore(IgnoreReason::AlreadyAssigned {
                role,
                email: member.email.clone(),
            }));
        }

        let limit = self.limits.for_role(role);
        if contract.approvers.slot(role).len() >= limit {
            return Err(WorkflowError::CapacityExceeded { role, limit });
        }

        let mut change = PendingChange::from_contract(
            contract,
            "Approver Assigned",
            format!("Assigned {} <{}> as {}", member.name, member.email, role.label()),
        );
        change.approvers.slot_mut(role).push(Approver::new(member.email.trim(), &member.name));
        Ok(Step::Change(change))
    }
}

enum Step {
    Ignore(IgnoreReason),
    Change(PendingChange),
}

struct PendingChange {
    status: ContractStatus,
    approvers: ApproverSet,
    is_amended: bool,
    amendment_stage: Option<AmendmentStage>,
    original_status: Option<ContractStatus>,
    label: String,
    details: String,
    effects: Vec<WorkflowEffect>,
}

impl PendingChange {
    fn from_contract(
        contract: &Contract,
        label: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        let mut approvers = contract.approvers.clone();
        approvers.repair();
        Self {
            status: contract.status,
            approvers,
            is_amended: contract.is_amended,
            amendment_stage: contract.amendment_stage,
            original_status: contract.original_status,
            label: label.into(),
            details: details.into(),
            effects: Vec::new(),
        }
    }

    fn finish(
        mut self,
        contract: &Contract,
        actor: &Actor,
        note: Option<&TimelineNote>,
        now: DateTime<Utc>,
    ) -> ContractPatch {
        for role in ApproverRole::ALL {
            if !contract.approvers.is_fully_approved(role) && self.approvers.is_fully_approved(role)
            {
                self.effects.push(WorkflowEffect::RoleFullyApproved { role });
            }
        }

        let action = note.and_then(|note| note.action.clone()).unwrap_or(self.label);
        let details = note.and_then(|note| note.details.clone()).unwrap_or(self.details);

        ContractPatch {
            previous_status: contract.status,
            status: self.status,
            approvers: self.approvers,
            is_amended: self.is_amended,
            amendment_stage: self.amendment_stage,
            original_status: self.original_status,
            timeline_entry: TimelineEntry::new(now, action, &actor.email, &actor.name, details),
            effects: self.effects,
        }
    }
}

fn remove(contract: &Contract, role: ApproverRole, email: &str) -> Step {
    let Some(existing) = contract.approvers.find(role, email) else {
        return Step::Ignore(IgnoreReason::ActorNotAssigned { role, email: email.to_owned() });
    };

    let mut change = PendingChange::from_contract(
        contract,
        "Approver Removed",
        format!("Removed {} <{}> from {}", existing.name, existing.email, role.label()),
    );
    change.approvers.slot_mut(role).retain(|approver| !approver.matches(email));
    Step::Change(change)
}

fn review(
    contract: &Contract,
    actor: &Actor,
    role: ApproverRole,
    verb: ReviewVerb,
    now: DateTime<Utc>,
) -> Result<Step, WorkflowError> {
    let amending = contract.in_amendment();
    if amending && role == ApproverRole::Management {
        return Ok(Step::Ignore(IgnoreReason::RoleSkippedDuringAmendment { role }));
    }

    if verb != ReviewVerb::Withdraw {
        if let Some(blocking_role) = blocking_role(&contract.approvers, role, amending) {
            return Err(WorkflowError::GatingViolation { acting_role: role, blocking_role });
        }
    }

    let mut change = PendingChange::from_contract(contract, "", "");
    let Some(record) = change.approvers.find_mut(role, &actor.email) else {
        return Ok(Step::Ignore(IgnoreReason::ActorNotAssigned {
            role,
            email: actor.email.clone(),
        }));
    };

    let was_approved = record.approved;
    let was_declined = record.declined;
    let transition_verb = match verb {
        ReviewVerb::Approve => {
            if was_approved {
                return Ok(Step::Ignore(IgnoreReason::AlreadyResponded { role }));
            }
            record.mark_approved(now);
            TransitionVerb::Approve
        }
        ReviewVerb::SendBack => {
            if was_declined {
                return Ok(Step::Ignore(IgnoreReason::AlreadyResponded { role }));
            }
            record.mark_declined(now);
            TransitionVerb::SendBack
        }
        ReviewVerb::Withdraw => {
            let steps_back_a_stage = amending
                && role == ApproverRole::Approver
                && matches!(
                    contract.amendment_stage,
                    Some(AmendmentStage::Wwf | AmendmentStage::Counterparty)
                );
            if record.is_unactioned() && !steps_back_a_stage {
                return Ok(Step::Ignore(IgnoreReason::NothingToWithdraw { role }));
            }
            record.reset();
            if was_declined {
                TransitionVerb::WithdrawSendBack
            } else {
                TransitionVerb::WithdrawApproval
            }
        }
    };

    let facts = TransitionFacts {
        legal_fully_approved: change.approvers.is_fully_approved(ApproverRole::Legal),
        management_fully_approved: change.approvers.is_fully_approved(ApproverRole::Management),
        role_still_declined: change.approvers.any_declined(role),
        withdrew_sign_off: transition_verb == TransitionVerb::WithdrawApproval && was_approved,
    };

    change.label = transitions::review_label(role, transition_verb);
    let base_details = transitions::review_details(transition_verb, was_approved, was_declined);

    if amending {
        let stage = contract.amendment_stage.unwrap_or(AmendmentStage::Amendment);
        let next = amendment::stage_transition(stage, role, transition_verb, &facts);
        change.details = amendment::stage_details(base_details, stage, next);
        if let Some(next) = next {
            if role == ApproverRole::Approver
                && transition_verb == TransitionVerb::Approve
                && next != stage
            {
                change.approvers.slot_mut(role).iter_mut().for_each(Approver::reset);
            }
            change.amendment_stage = Some(next);
        }
        if role == ApproverRole::Approver
            && transition_verb == TransitionVerb::Approve
            && amendment::ready_for_completion(
                Some(stage),
                change.approvers.is_fully_approved(ApproverRole::Approver),
            )
        {
            change.effects.push(WorkflowEffect::AmendmentReadyForCompletion);
        }
    } else {
        change.details = base_details.to_owned();
        match transitions::status_transition(contract.status, role, transition_verb, &facts) {
            StatusChange::Keep => {}
            StatusChange::To(status) => change.status = status,
            StatusChange::ResetTo(status) => {
                change.status = status;
                change.approvers.reset_all();
                change.effects.push(WorkflowEffect::WorkflowReset);
            }
        }
    }

    if transition_verb == TransitionVerb::SendBack {
        change.effects.push(WorkflowEffect::SentBack { role });
    }

    Ok(Step::Change(change))
}

fn start_amendment(contract: &Contract) -> Result<Step, WorkflowError> {
    if contract.is_amended || !contract.status.can_start_amendment() {
        return Err(WorkflowError::InvalidAmendmentStart { status: contract.status });
    }

    let mut change = PendingChange::from_contract(
        contract,
        "Amendment Started",
        format!("Amendment started from {}", contract.status),
    );
    change.original_status = Some(contract.status);
    change.is_amended = true;
    change.status = ContractStatus::Amendment;
    change.amendment_stage = Some(AmendmentStage::Amendment);
    change.approvers.reset_all();
    change.effects.push(WorkflowEffect::AmendmentStarted);
    Ok(Step::Change(change))
}

fn complete_amendment(contract: &Contract) -> Result<Step, WorkflowError> {
    let ready = contract.in_amendment()
        && amendment::ready_for_completion(
            contract.amendment_stage,
            contract.approvers.is_fully_approved(ApproverRole::Approver),
        );
    if !ready {
        return Err(WorkflowError::AmendmentIncomplete { stage: contract.amendment_stage });
    }

    let restored = contract.original_status.unwrap_or(DEFAULT_RESTORED_STATUS);
    let mut change = PendingChange::from_contract(
        contract,
        "Amendment Completed",
        format!("Amendment completed, returned to {restored}"),
    );
    change.status = restored;
    change.is_amended = false;
    change.amendment_stage = None;
    change.original_status = None;
    change.effects.push(WorkflowEffect::AmendmentCompleted);
    Ok(Step::Change(change))
}

fn advance(contract: &Contract, to: ContractStatus) -> Result<Step, WorkflowError> {
    if !transitions::advance_allowed(contract.status, to) {
        return Err(WorkflowError::InvalidAdvance { from: contract.status, to });
    }

    let mut change = PendingChange::from_contract(
        contract,
        "Status Advanced",
        format!("{} -> {}", contract.status, to),
    );
    change.status = to;
    Ok(Step::Change(change))
}
