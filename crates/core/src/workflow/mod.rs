pub mod action;
pub mod amendment;
pub mod engine;
pub mod transitions;

pub use action::{
    ActionOutcome, ActionRequest, ContractPatch, IgnoreReason, TeamMember, WorkflowAction,
    WorkflowEffect,
};
pub use engine::{blocking_role, ApprovalEngine, WorkflowError};
pub use transitions::{StatusChange, TransitionFacts, TransitionVerb};
