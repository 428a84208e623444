//! Stage table for the amendment sub-workflow.
//!
//! While a contract is being amended its status stays `amendment` and review
//! responses only move [`AmendmentStage`]. Management does not take part.
//!
//! The final approver signs off every stage separately: the approve that moves
//! the stage forward leaves their record unactioned for the next one, and a
//! withdrawal with nothing signed in the current stage steps back instead.

use crate::domain::{AmendmentStage, ApproverRole, ContractStatus};
use crate::workflow::transitions::{TransitionFacts, TransitionVerb};

/// Status restored when an amendment completes without a recorded origin.
pub const DEFAULT_RESTORED_STATUS: ContractStatus = ContractStatus::Implementation;

pub fn stage_transition(
    stage: AmendmentStage,
    role: ApproverRole,
    verb: TransitionVerb,
    facts: &TransitionFacts,
) -> Option<AmendmentStage> {
    use AmendmentStage::{Amendment, Counterparty, Legal, Wwf};
    use ApproverRole::{Approver, Legal as LegalRole};
    use TransitionVerb::{Approve, SendBack, WithdrawApproval};

    match (role, verb, stage) {
        (LegalRole, Approve, Amendment) if facts.legal_fully_approved => Some(Legal),
        (Approver, Approve, Amendment | Legal) => Some(Wwf),
        (Approver, Approve, Wwf) => Some(Counterparty),
        (LegalRole, SendBack, _) => Some(Amendment),
        (Approver, SendBack, Wwf | Counterparty) => Some(Legal),
        (LegalRole, WithdrawApproval, Legal) => Some(Amendment),
        (Approver, WithdrawApproval, Counterparty) if !facts.withdrew_sign_off => Some(Wwf),
        (Approver, WithdrawApproval, Wwf) if !facts.withdrew_sign_off => Some(Legal),
        _ => None,
    }
}

/// The final approver has signed off the counterparty stage.
pub fn ready_for_completion(stage: Option<AmendmentStage>, approver_fully_approved: bool) -> bool {
    stage == Some(AmendmentStage::Counterparty) && approver_fully_approved
}

pub fn stage_details(base: &str, from: AmendmentStage, to: Option<AmendmentStage>) -> String {
    match to {
        Some(to) if to != from => format!("{base} (amendment stage {from} -> {to})"),
        _ => base.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::{ready_for_completion, stage_details, stage_transition};
    use crate::domain::{AmendmentStage, ApproverRole};
    use crate::workflow::transitions::{TransitionFacts, TransitionVerb};

    #[test]
    fn approver_send_back_after_wwf_returns_to_legal() {
        let facts = TransitionFacts::default();
        for stage in [AmendmentStage::Wwf, AmendmentStage::Counterparty] {
            assert_eq!(
                stage_transition(stage, ApproverRole::Approver, TransitionVerb::SendBack, &facts),
                Some(AmendmentStage::Legal)
            );
        }
        assert_eq!(
            stage_transition(
                AmendmentStage::Amendment,
                ApproverRole::Approver,
                TransitionVerb::SendBack,
                &facts
            ),
            None
        );
    }

    #[test]
    fn legal_only_advances_once_every_legal_record_approved() {
        let partial = TransitionFacts::default();
        assert_eq!(
            stage_transition(
                AmendmentStage::Amendment,
                ApproverRole::Legal,
                TransitionVerb::Approve,
                &partial
            ),
            None
        );

        let complete = TransitionFacts { legal_fully_approved: true, ..TransitionFacts::default() };
        assert_eq!(
            stage_transition(
                AmendmentStage::Amendment,
                ApproverRole::Legal,
                TransitionVerb::Approve,
                &complete
            ),
            Some(AmendmentStage::Legal)
        );
    }

    #[test]
    fn approver_walks_through_signing_stages() {
        let facts = TransitionFacts::default();
        let approve = |stage| {
            stage_transition(stage, ApproverRole::Approver, TransitionVerb::Approve, &facts)
        };
        assert_eq!(approve(AmendmentStage::Legal), Some(AmendmentStage::Wwf));
        assert_eq!(approve(AmendmentStage::Wwf), Some(AmendmentStage::Counterparty));
        assert_eq!(approve(AmendmentStage::Counterparty), None);
    }

    #[test]
    fn approver_withdrawal_steps_back_one_stage() {
        let facts = TransitionFacts::default();
        let withdraw = |stage| {
            let verb = TransitionVerb::WithdrawApproval;
            stage_transition(stage, ApproverRole::Approver, verb, &facts)
        };
        assert_eq!(withdraw(AmendmentStage::Counterparty), Some(AmendmentStage::Wwf));
        assert_eq!(withdraw(AmendmentStage::Wwf), Some(AmendmentStage::Legal));
        assert_eq!(withdraw(AmendmentStage::Amendment), None);
    }

    #[test]
    fn withdrawing_counterparty_sign_off_keeps_the_stage() {
        let facts = TransitionFacts { withdrew_sign_off: true, ..TransitionFacts::default() };
        assert_eq!(
            stage_transition(
                AmendmentStage::Counterparty,
                ApproverRole::Approver,
                TransitionVerb::WithdrawApproval,
                &facts
            ),
            None
        );
    }

    #[test]
    fn legal_send_back_returns_to_amendment_from_any_stage() {
        let facts = TransitionFacts::default();
        for stage in [
            AmendmentStage::Amendment,
            AmendmentStage::Legal,
            AmendmentStage::Wwf,
            AmendmentStage::Counterparty,
        ] {
            assert_eq!(
                stage_transition(stage, ApproverRole::Legal, TransitionVerb::SendBack, &facts),
                Some(AmendmentStage::Amendment)
            );
        }
        assert_eq!(
            stage_transition(
                AmendmentStage::Legal,
                ApproverRole::Legal,
                TransitionVerb::WithdrawApproval,
                &facts
            ),
            Some(AmendmentStage::Amendment)
        );
    }

    #[test]
    fn completion_requires_counterparty_sign_off() {
        assert!(ready_for_completion(Some(AmendmentStage::Counterparty), true));
        assert!(!ready_for_completion(Some(AmendmentStage::Counterparty), false));
        assert!(!ready_for_completion(Some(AmendmentStage::Wwf), true));
        assert_eq!(
            stage_details("Approved", AmendmentStage::Wwf, Some(AmendmentStage::Counterparty)),
            "Approved (amendment stage wwf -> counterparty)"
        );
    }
}
