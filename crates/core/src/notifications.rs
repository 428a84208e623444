//! Maps committed workflow effects to e-mail requests and hands them to a sink.
//!
//! The dispatcher decides *whether* and *to whom*; delivery belongs to the
//! injected [`NotificationSink`]. Delivery failures are reported in a
//! [`DispatchReport`] and never undo the committed contract change.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{normalize_email, ApproverRole, Contract, ContractSummary};
use crate::workflow::{ContractPatch, WorkflowEffect};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    SentBack,
    ManagementReviewRequested,
    FinalApprovalRequested,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SentBack => "sent_back",
            Self::ManagementReviewRequested => "management_review_requested",
            Self::FinalApprovalRequested => "final_approval_requested",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    pub recipient_email: String,
    pub kind: NotificationKind,
    pub contract: ContractSummary,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotificationDispatcher {
    admin_email: String,
}

impl NotificationDispatcher {
    pub fn new(admin_email: impl Into<String>) -> Self {
        Self { admin_email: admin_email.into() }
    }

    /// Notifications owed for `patch`, addressed using the committed contract.
    pub fn plan(&self, patch: &ContractPatch, committed: &Contract) -> Vec<NotificationRequest> {
        let amending = committed.in_amendment();
        let mut planned = Vec::new();

        for effect in &patch.effects {
            match effect {
                WorkflowEffect::SentBack { .. } => {
                    planned.push((self.admin_email.clone(), NotificationKind::SentBack));
                }
                WorkflowEffect::RoleFullyApproved { role: ApproverRole::Legal } if amending => {
                    planned.extend(
                        members(committed, ApproverRole::Approver)
                            .map(|email| (email, NotificationKind::FinalApprovalRequested)),
                    );
                }
                WorkflowEffect::RoleFullyApproved { role: ApproverRole::Legal } => {
                    planned.extend(
                        members(committed, ApproverRole::Management)
                            .map(|email| (email, NotificationKind::ManagementReviewRequested)),
                    );
                }
                WorkflowEffect::RoleFullyApproved { role: ApproverRole::Management }
                    if !amending =>
                {
                    planned.extend(
                        members(committed, ApproverRole::Approver)
                            .map(|email| (email, NotificationKind::FinalApprovalRequested)),
                    );
                }
                _ => {}
            }
        }

        let summary = committed.summary();
        let mut seen = HashSet::new();
        planned
            .into_iter()
            .filter(|(email, kind)| seen.insert((normalize_email(email), *kind)))
            .map(|(recipient_email, kind)| NotificationRequest {
                recipient_email,
                kind,
                contract: summary.clone(),
            })
            .collect()
    }
}

fn members(contract: &Contract, role: ApproverRole) -> impl Iterator<Item = String> + '_ {
    contract.approvers.slot(role).iter().map(|approver| approver.email.clone())
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotificationError {
    #[error("delivery to `{recipient}` failed: {message}")]
    Delivery { recipient: String, message: String },
    #[error("notification transport unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, request: &NotificationRequest) -> Result<(), NotificationError>;
}

/// Logs each request instead of delivering it.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotificationSink;

#[async_trait]
impl NotificationSink for TracingNotificationSink {
    async fn send(&self, request: &NotificationRequest) -> Result<(), NotificationError> {
        tracing::info!(
            event_name = "notification.requested",
            recipient = %request.recipient_email,
            kind = request.kind.as_str(),
            contract_id = %request.contract.id,
            "notification requested"
        );
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryNotificationSink {
    sent: Arc<Mutex<Vec<NotificationRequest>>>,
    failing_recipients: Arc<Mutex<HashSet<String>>>,
}

impl InMemoryNotificationSink {
    pub fn sent(&self) -> Vec<NotificationRequest> {
        match self.sent.lock() {
            Ok(sent) => sent.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Makes every later delivery to `email` fail.
    pub fn fail_for(&self, email: &str) {
        match self.failing_recipients.lock() {
            Ok(mut failing) => failing.insert(normalize_email(email)),
            Err(poisoned) => poisoned.into_inner().insert(normalize_email(email)),
        };
    }

    fn is_failing(&self, email: &str) -> bool {
        match self.failing_recipients.lock() {
            Ok(failing) => failing.contains(&normalize_email(email)),
            Err(poisoned) => poisoned.into_inner().contains(&normalize_email(email)),
        }
    }
}

#[async_trait]
impl NotificationSink for InMemoryNotificationSink {
    async fn send(&self, request: &NotificationRequest) -> Result<(), NotificationError> {
        if self.is_failing(&request.recipient_email) {
            return Err(NotificationError::Delivery {
                recipient: request.recipient_email.clone(),
                message: "recipient rejected by test sink".to_owned(),
            });
        }

        match self.sent.lock() {
            Ok(mut sent) => sent.push(request.clone()),
            Err(poisoned) => poisoned.into_inner().push(request.clone()),
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReport {
    pub attempted: usize,
    pub delivered: usize,
    pub failed: Vec<String>,
}

/// Sends every request; a failure is logged and recorded, then skipped.
pub async fn dispatch<N>(
    sink: &N,
    requests: &[NotificationRequest],
    correlation_id: &str,
) -> DispatchReport
where
    N: NotificationSink + ?Sized,
{
    let mut report = DispatchReport { attempted: requests.len(), ..DispatchReport::default() };

    for request in requests {
        match sink.send(request).await {
            Ok(()) => report.delivered += 1,
            Err(error) => {
                tracing::warn!(
                    event_name = "notification.delivery_failed",
                    correlation_id,
                    recipient = %request.recipient_email,
                    kind = request.kind.as_str(),
                    contract_id = %request.contract.id,
                    error = %error,
                    "notification delivery failed"
                );
                report.failed.push(request.recipient_email.clone());
            }
        }
    }

    report
}
