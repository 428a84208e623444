use thiserror::Error;

use signoff_core::StoreError;

pub mod contract;
pub mod memory;

pub use contract::SqlContractRepository;
pub use memory::InMemoryContractRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for StoreError {
    fn from(error: RepositoryError) -> Self {
        StoreError::Backend(error.to_string())
    }
}
