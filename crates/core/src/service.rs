//! Load, apply, save, notify.
//!
//! [`ApprovalService`] is the only place where the pure engine meets I/O. It
//! owns the optimistic-concurrency retry: when the store reports a version
//! conflict the contract is fetched again and the same intent is re-applied
//! once before the conflict is surfaced.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::audit::{AuditCategory, AuditContext, AuditOutcome, AuditSink, NoopAuditSink};
use crate::config::AppConfig;
use crate::domain::{Actor, Contract, ContractId};
use crate::eligibility::{build_work_queues, WorkQueues};
use crate::errors::ApplicationError;
use crate::notifications::{dispatch, DispatchReport, NotificationDispatcher, NotificationSink};
use crate::store::{ContractStore, StoreError};
use crate::workflow::{ActionOutcome, ActionRequest, ApprovalEngine};

const MAX_ATTEMPTS: usize = 2;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ServiceResponse {
    pub correlation_id: String,
    pub contract: Contract,
    pub outcome: ActionOutcome,
    /// The first save hit a concurrent update and the action was re-applied.
    pub refreshed: bool,
    pub notifications: DispatchReport,
}

pub struct ApprovalService<S, N> {
    store: S,
    sink: N,
    engine: ApprovalEngine,
    dispatcher: Option<NotificationDispatcher>,
    audit: Arc<dyn AuditSink>,
}

impl<S, N> ApprovalService<S, N>
where
    S: ContractStore,
    N: NotificationSink,
{
    pub fn new(
        store: S,
        sink: N,
        engine: ApprovalEngine,
        dispatcher: Option<NotificationDispatcher>,
    ) -> Self {
        Self { store, sink, engine, dispatcher, audit: Arc::new(NoopAuditSink) }
    }

    pub fn from_config(store: S, sink: N, config: &AppConfig) -> Self {
        let dispatcher = config
            .notifications
            .enabled
            .then(|| NotificationDispatcher::new(config.notifications.admin_email.clone()));
        Self::new(store, sink, ApprovalEngine::new(config.workflow.role_limits()), dispatcher)
    }

    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub async fn create(&self, title: &str) -> Result<Contract, ApplicationError> {
        let id = ContractId(format!("C-{}", Uuid::new_v4().simple()));
        let contract = Contract::new(id, title.trim(), Utc::now());
        let created = self.store.create(contract).await?;
        tracing::info!(
            event_name = "service.contract_created",
            contract_id = %created.id,
            "contract created"
        );
        Ok(created)
    }

    pub async fn contract(&self, id: &ContractId) -> Result<Contract, ApplicationError> {
        Ok(self.store.load(id).await?)
    }

    pub async fn execute(
        &self,
        id: &ContractId,
        actor: &Actor,
        request: &ActionRequest,
    ) -> Result<ServiceResponse, ApplicationError> {
        let correlation_id = Uuid::new_v4().to_string();
        let audit =
            AuditContext::new(Some(id.clone()), correlation_id.clone(), actor.email.clone());
        let mut refreshed = false;

        for attempt in 1..=MAX_ATTEMPTS {
            let current = self.store.load(id).await?;
            let outcome = self
                .engine
                .apply_with_audit(&current, actor, request, self.audit.as_ref(), &audit)
                .map_err(|error| {
                    tracing::info!(
                        event_name = "workflow.action_rejected",
                        correlation_id = %correlation_id,
                        contract_id = %id,
                        action = request.action.name(),
                        error = %error,
                        "action rejected"
                    );
                    ApplicationError::from(error)
                })?;

            let patch = match &outcome {
                ActionOutcome::Applied(patch) => patch,
                ActionOutcome::Ignored(reason) => {
                    tracing::info!(
                        event_name = "workflow.action_ignored",
                        correlation_id = %correlation_id,
                        contract_id = %id,
                        action = request.action.name(),
                        reason = %reason.reason(),
                        "action changed nothing"
                    );
                    return Ok(ServiceResponse {
                        correlation_id,
                        contract: current,
                        outcome,
                        refreshed,
                        notifications: DispatchReport::default(),
                    });
                }
            };

            let mut next = current.clone();
            patch.apply_to(&mut next);

            match self.store.save(next, current.version).await {
                Ok(saved) => {
                    tracing::info!(
                        event_name = "workflow.action_applied",
                        correlation_id = %correlation_id,
                        contract_id = %id,
                        action = request.action.name(),
                        from = patch.previous_status.as_str(),
                        to = patch.status.as_str(),
                        version = saved.version,
                        "action applied"
                    );

                    let notifications = match &self.dispatcher {
                        Some(dispatcher) => {
                            let requests = dispatcher.plan(patch, &saved);
                            dispatch(&self.sink, &requests, &correlation_id).await
                        }
                        None => DispatchReport::default(),
                    };
                    if !notifications.failed.is_empty() {
                        self.audit.emit(
                            audit
                                .event(
                                    "notification.delivery_failed",
                                    AuditCategory::Notification,
                                    AuditOutcome::Failed,
                                )
                                .with_metadata("recipients", notifications.failed.join(",")),
                        );
                    }

                    return Ok(ServiceResponse {
                        correlation_id,
                        contract: saved,
                        outcome,
                        refreshed,
                        notifications,
                    });
                }
                Err(StoreError::VersionConflict { expected, found, .. })
                    if attempt < MAX_ATTEMPTS =>
                {
                    tracing::warn!(
                        event_name = "service.concurrent_update_detected",
                        correlation_id = %correlation_id,
                        contract_id = %id,
                        expected,
                        found,
                        "contract changed underneath the action; re-applying to fresh copy"
                    );
                    self.audit.emit(
                        audit
                            .event(
                                "service.concurrent_update_detected",
                                AuditCategory::Persistence,
                                AuditOutcome::Failed,
                            )
                            .with_metadata("expected_version", expected.to_string())
                            .with_metadata("found_version", found.to_string()),
                    );
                    refreshed = true;
                }
                Err(error) => return Err(error.into()),
            }
        }

        Err(ApplicationError::ConcurrentModification(id.clone()))
    }

    pub async fn work_queues(&self, actor: &Actor) -> Result<WorkQueues, ApplicationError> {
        let contracts = self.store.list().await?;
        Ok(build_work_queues(&contracts, actor))
    }
}
