pub mod approver;
pub mod contract;
pub mod timeline;

pub use approver::{normalize_email, Approver, ApproverRole, ApproverSet, RoleLimits};
pub use contract::{
    Actor, AmendmentStage, Contract, ContractId, ContractStatus, ContractSummary, RoleFlags,
};
pub use timeline::{TimelineEntry, TimelineNote};
