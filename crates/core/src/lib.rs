pub mod audit;
pub mod config;
pub mod domain;
pub mod eligibility;
pub mod errors;
pub mod normalize;
pub mod notifications;
pub mod service;
pub mod store;
pub mod workflow;

pub use domain::{
    Actor, AmendmentStage, Approver, ApproverRole, ApproverSet, Contract, ContractId,
    ContractStatus, ContractSummary, RoleFlags, RoleLimits, TimelineEntry, TimelineNote,
};
pub use eligibility::{build_work_queues, evaluate, Eligibility, WorkQueues};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use normalize::{normalize_approvers, normalize_contract_approvers, repair_approvers};
pub use notifications::{
    DispatchReport, NotificationDispatcher, NotificationError, NotificationKind,
    NotificationRequest, NotificationSink,
};
pub use service::{ApprovalService, ServiceResponse};
pub use store::{ContractStore, StoreError};
pub use workflow::{
    ActionOutcome, ActionRequest, ApprovalEngine, ContractPatch, IgnoreReason, WorkflowAction,
    WorkflowEffect, WorkflowError,
};
