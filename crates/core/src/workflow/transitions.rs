//! Status transition table for the regular review path.
//!
//! The engine mutates the acting approver record first and then asks this
//! table for the contract-level consequence, so every fact in
//! [`TransitionFacts`] describes the approvers *after* the response landed.

use crate::domain::{ApproverRole, ContractStatus};

/// What a review action did to the acting record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionVerb {
    Approve,
    SendBack,
    WithdrawApproval,
    WithdrawSendBack,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransitionFacts {
    pub legal_fully_approved: bool,
    pub management_fully_approved: bool,
    /// Some record of the acting role is still sent back.
    pub role_still_declined: bool,
    /// The withdrawal cleared an approval recorded in the current amendment stage.
    pub withdrew_sign_off: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusChange {
    Keep,
    To(ContractStatus),
    /// Move and clear every approver response.
    ResetTo(ContractStatus),
}

/// Roles whose full approval unlocks `role`.
pub fn prerequisites(role: ApproverRole, in_amendment: bool) -> &'static [ApproverRole] {
    match (role, in_amendment) {
        (ApproverRole::Legal, _) => &[],
        (ApproverRole::Management, _) => &[ApproverRole::Legal],
        (ApproverRole::Approver, false) => &[ApproverRole::Legal, ApproverRole::Management],
        (ApproverRole::Approver, true) => &[ApproverRole::Legal],
    }
}

pub fn status_transition(
    current: ContractStatus,
    role: ApproverRole,
    verb: TransitionVerb,
    facts: &TransitionFacts,
) -> StatusChange {
    use ApproverRole::{Approver, Legal, Management};
    use ContractStatus::{
        Draft, LegalDeclined, LegalReview, LegalSendBack, ManagementDeclined, ManagementReview,
        ManagementSendBack, Requested, WwfSigning,
    };
    use TransitionVerb::{Approve, SendBack, WithdrawApproval, WithdrawSendBack};

    match (role, verb, current) {
        (Legal, Approve, Requested | Draft) => StatusChange::To(LegalReview),
        (Legal, Approve, LegalSendBack | LegalDeclined) if !facts.role_still_declined => {
            if facts.management_fully_approved {
                StatusChange::To(ManagementReview)
            } else {
                StatusChange::To(LegalReview)
            }
        }
        (Management, Approve, Draft | LegalReview | LegalDeclined) => {
            StatusChange::To(ManagementReview)
        }
        (Management, Approve, ManagementSendBack | ManagementDeclined)
            if !facts.role_still_declined =>
        {
            StatusChange::To(ManagementReview)
        }
        (Approver, Approve, _) => StatusChange::To(WwfSigning),

        (Legal, SendBack, _) => StatusChange::To(LegalSendBack),
        (Management, SendBack, _) => StatusChange::To(ManagementSendBack),
        (Approver, SendBack, _) => StatusChange::Keep,

        (role, WithdrawSendBack, status) if status.send_back_role() == Some(role) => {
            StatusChange::ResetTo(Draft)
        }
        (_, WithdrawApproval, WwfSigning) => {
            if facts.legal_fully_approved {
                StatusChange::To(LegalReview)
            } else {
                StatusChange::To(Draft)
            }
        }
        (_, WithdrawApproval, LegalReview | ManagementReview) => StatusChange::To(Draft),

        _ => StatusChange::Keep,
    }
}

/// Timeline action label for a review response.
pub fn review_label(role: ApproverRole, verb: TransitionVerb) -> String {
    match (verb, role) {
        (TransitionVerb::Approve, ApproverRole::Approver) => "Final Approval".to_owned(),
        (TransitionVerb::Approve, role) => format!("{} Approval", role.label()),
        (TransitionVerb::SendBack, role) => format!("{} Send Back", role.label()),
        (TransitionVerb::WithdrawApproval | TransitionVerb::WithdrawSendBack, role) => {
            format!("{} Withdrawal", role.label())
        }
    }
}

pub fn review_details(
    verb: TransitionVerb,
    was_approved: bool,
    was_declined: bool,
) -> &'static str {
    match verb {
        TransitionVerb::Approve if was_declined => "Changed from Sent Back to Approved",
        TransitionVerb::Approve => "Approved",
        TransitionVerb::SendBack if was_approved => "Changed from Approved to Sent Back",
        TransitionVerb::SendBack => "Sent back for revision",
        TransitionVerb::WithdrawApproval => "Approval withdrawn",
        TransitionVerb::WithdrawSendBack => "Send back withdrawn",
    }
}

/// Forward moves an admin may make outside the review path.
pub fn advance_allowed(from: ContractStatus, to: ContractStatus) -> bool {
    use ContractStatus::{
        ContractEnd, CounterpartySigning, Draft, Finished, Implementation, Requested, WwfSigning,
    };

    matches!(
        (from, to),
        (Requested, Draft)
            | (WwfSigning, CounterpartySigning)
            | (CounterpartySigning, Implementation)
            | (Implementation, ContractEnd)
            | (ContractEnd, Finished)
    )
}

#[cfg(test)]
mod tests {
    use super::{
        advance_allowed, prerequisites, review_details, review_label, status_transition,
        StatusChange, TransitionFacts, TransitionVerb,
    };
    use crate::domain::{ApproverRole, ContractStatus};

    #[test]
    fn first_legal_approval_opens_legal_review() {
        for status in [ContractStatus::Requested, ContractStatus::Draft] {
            assert_eq!(
                status_transition(
                    status,
                    ApproverRole::Legal,
                    TransitionVerb::Approve,
                    &TransitionFacts::default()
                ),
                StatusChange::To(ContractStatus::LegalReview)
            );
        }
    }

    #[test]
    fn legal_reapproval_skips_ahead_when_management_already_signed() {
        let facts =
            TransitionFacts { management_fully_approved: true, ..TransitionFacts::default() };
        assert_eq!(
            status_transition(
                ContractStatus::LegalDeclined,
                ApproverRole::Legal,
                TransitionVerb::Approve,
                &facts
            ),
            StatusChange::To(ContractStatus::ManagementReview)
        );

        let blocked = TransitionFacts { role_still_declined: true, ..facts };
        assert_eq!(
            status_transition(
                ContractStatus::LegalSendBack,
                ApproverRole::Legal,
                TransitionVerb::Approve,
                &blocked
            ),
            StatusChange::Keep
        );
    }

    #[test]
    fn send_backs_route_to_the_role_status() {
        let facts = TransitionFacts::default();
        assert_eq!(
            status_transition(
                ContractStatus::ManagementReview,
                ApproverRole::Management,
                TransitionVerb::SendBack,
                &facts
            ),
            StatusChange::To(ContractStatus::ManagementSendBack)
        );
        assert_eq!(
            status_transition(
                ContractStatus::ManagementReview,
                ApproverRole::Approver,
                TransitionVerb::SendBack,
                &facts
            ),
            StatusChange::Keep
        );
    }

    #[test]
    fn withdrawing_own_send_back_resets_to_draft() {
        let facts = TransitionFacts::default();
        assert_eq!(
            status_transition(
                ContractStatus::LegalDeclined,
                ApproverRole::Legal,
                TransitionVerb::WithdrawSendBack,
                &facts
            ),
            StatusChange::ResetTo(ContractStatus::Draft)
        );
        assert_eq!(
            status_transition(
                ContractStatus::ManagementSendBack,
                ApproverRole::Legal,
                TransitionVerb::WithdrawSendBack,
                &facts
            ),
            StatusChange::Keep
        );
    }

    #[test]
    fn withdrawing_approval_at_signing_depends_on_legal() {
        let legal_done =
            TransitionFacts { legal_fully_approved: true, ..TransitionFacts::default() };
        assert_eq!(
            status_transition(
                ContractStatus::WwfSigning,
                ApproverRole::Approver,
                TransitionVerb::WithdrawApproval,
                &legal_done
            ),
            StatusChange::To(ContractStatus::LegalReview)
        );
        assert_eq!(
            status_transition(
                ContractStatus::WwfSigning,
                ApproverRole::Legal,
                TransitionVerb::WithdrawApproval,
                &TransitionFacts::default()
            ),
            StatusChange::To(ContractStatus::Draft)
        );
        assert_eq!(
            status_transition(
                ContractStatus::Implementation,
                ApproverRole::Approver,
                TransitionVerb::WithdrawApproval,
                &legal_done
            ),
            StatusChange::Keep
        );
    }

    #[test]
    fn gating_order_changes_during_amendment() {
        assert!(prerequisites(ApproverRole::Legal, false).is_empty());
        assert_eq!(prerequisites(ApproverRole::Approver, false).len(), 2);
        assert_eq!(prerequisites(ApproverRole::Approver, true), &[ApproverRole::Legal]);
    }

    #[test]
    fn labels_and_details_follow_timeline_wording() {
        assert_eq!(review_label(ApproverRole::Approver, TransitionVerb::Approve), "Final Approval");
        assert_eq!(
            review_label(ApproverRole::Approver, TransitionVerb::SendBack),
            "Final Approver Send Back"
        );
        assert_eq!(
            review_label(ApproverRole::Management, TransitionVerb::WithdrawApproval),
            "Management Withdrawal"
        );
        assert_eq!(
            review_details(TransitionVerb::Approve, false, true),
            "Changed from Sent Back to Approved"
        );
    }

    #[test]
    fn advance_only_moves_forward_along_the_signing_path() {
        assert!(advance_allowed(ContractStatus::Requested, ContractStatus::Draft));
        assert!(advance_allowed(ContractStatus::ContractEnd, ContractStatus::Finished));
        assert!(!advance_allowed(ContractStatus::Draft, ContractStatus::WwfSigning));
        assert!(!advance_allowed(ContractStatus::Amendment, ContractStatus::Implementation));
    }
}
