//! Work-queue classification: which contracts wait on a given reviewer.

use serde::{Deserialize, Serialize};

use crate::domain::{
    Actor, AmendmentStage, ApproverRole, Contract, ContractStatus, ContractSummary,
};
use crate::workflow::blocking_role;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eligibility {
    pub needs_action: bool,
    pub has_responded: bool,
}

fn reviews_status(role: ApproverRole, status: ContractStatus) -> bool {
    use ContractStatus::{
        Draft, LegalDeclined, LegalReview, LegalSendBack, ManagementDeclined, ManagementReview,
        ManagementSendBack, Requested,
    };

    match role {
        ApproverRole::Legal => {
            matches!(status, Requested | Draft | LegalReview | LegalSendBack | LegalDeclined)
        }
        ApproverRole::Management => matches!(
            status,
            Draft
                | LegalReview
                | LegalDeclined
                | ManagementReview
                | ManagementSendBack
                | ManagementDeclined
        ),
        ApproverRole::Approver => {
            matches!(status, ManagementReview | ManagementSendBack | ManagementDeclined)
        }
    }
}

fn reviews_stage(role: ApproverRole, stage: AmendmentStage) -> bool {
    match role {
        ApproverRole::Legal => stage == AmendmentStage::Amendment,
        ApproverRole::Management => false,
        ApproverRole::Approver => matches!(
            stage,
            AmendmentStage::Legal | AmendmentStage::Wwf | AmendmentStage::Counterparty
        ),
    }
}

/// Whether the contract is currently at a point where `role` reviews it.
pub fn in_review_window(contract: &Contract, role: ApproverRole) -> bool {
    if contract.status.is_out_of_review() {
        return false;
    }
    if contract.in_amendment() {
        return contract
            .amendment_stage
            .map(|stage| reviews_stage(role, stage))
            .unwrap_or(false);
    }
    reviews_status(role, contract.status)
}

pub fn evaluate(contract: &Contract, role: ApproverRole, actor_email: &str) -> Eligibility {
    let mut approvers = contract.approvers.clone();
    approvers.repair();

    let record = approvers.find(role, actor_email);
    let has_responded = record.map(|approver| approver.has_responded()).unwrap_or(false);

    let gate_open = blocking_role(&approvers, role, contract.in_amendment()).is_none();
    let open_to_actor = approvers.slot(role).is_empty()
        || record.map(|approver| approver.is_unactioned()).unwrap_or(false);

    Eligibility {
        needs_action: in_review_window(contract, role) && gate_open && open_to_actor,
        has_responded,
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkQueues {
    pub awaiting: Vec<ContractSummary>,
    pub responded: Vec<ContractSummary>,
}

impl WorkQueues {
    pub fn awaiting_count(&self) -> usize {
        self.awaiting.len()
    }
}

/// Splits contracts into disjoint "awaiting" and "responded" queues for every
/// review role the actor holds. Awaiting wins when roles disagree.
pub fn build_work_queues<'a, I>(contracts: I, actor: &Actor) -> WorkQueues
where
    I: IntoIterator<Item = &'a Contract>,
{
    let roles = actor.capabilities.roles();
    let mut queues = WorkQueues::default();

    for contract in contracts {
        let verdicts: Vec<Eligibility> =
            roles.iter().map(|role| evaluate(contract, *role, &actor.email)).collect();

        if verdicts.iter().any(|verdict| verdict.needs_action) {
            queues.awaiting.push(contract.summary());
        } else if verdicts.iter().any(|verdict| verdict.has_responded) {
            queues.responded.push(contract.summary());
        }
    }

    queues
}
