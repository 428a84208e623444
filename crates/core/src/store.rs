use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Contract, ContractId};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("contract `{0}` was not found")]
    NotFound(ContractId),
    #[error("contract `{0}` already exists")]
    AlreadyExists(ContractId),
    #[error("contract `{id}` is at version {found}, expected {expected}")]
    VersionConflict { id: ContractId, expected: u32, found: u32 },
    #[error("store backend failure: {0}")]
    Backend(String),
}

/// Persistence port for contracts.
///
/// `save` is a compare-and-swap on [`Contract::version`]: it succeeds only when
/// the stored version still equals `expected_version`, and returns the stored
/// contract with the version and `updated_at` bumped.
#[async_trait]
pub trait ContractStore: Send + Sync {
    async fn load(&self, id: &ContractId) -> Result<Contract, StoreError>;
    async fn list(&self) -> Result<Vec<Contract>, StoreError>;
    async fn create(&self, contract: Contract) -> Result<Contract, StoreError>;
    async fn save(&self, contract: Contract, expected_version: u32)
        -> Result<Contract, StoreError>;
}
