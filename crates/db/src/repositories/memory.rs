use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;

use signoff_core::domain::{Contract, ContractId};
use signoff_core::{ContractStore, StoreError};

/// Process-local store with the same compare-and-swap semantics as the SQL one.
#[derive(Default)]
pub struct InMemoryContractRepository {
    contracts: RwLock<HashMap<String, Contract>>,
}

impl InMemoryContractRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.contracts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.contracts.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl ContractStore for InMemoryContractRepository {
    async fn load(&self, id: &ContractId) -> Result<Contract, StoreError> {
        let contracts = self.contracts.read().await;
        contracts.get(&id.0).cloned().ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    async fn list(&self) -> Result<Vec<Contract>, StoreError> {
        let contracts = self.contracts.read().await;
        let mut listed: Vec<Contract> = contracts.values().cloned().collect();
        listed.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.0.cmp(&b.id.0)));
        Ok(listed)
    }

    async fn create(&self, contract: Contract) -> Result<Contract, StoreError> {
        let mut contracts = self.contracts.write().await;
        if contracts.contains_key(&contract.id.0) {
            return Err(StoreError::AlreadyExists(contract.id));
        }
        contracts.insert(contract.id.0.clone(), contract.clone());
        Ok(contract)
    }

    async fn save(
        &self,
        contract: Contract,
        expected_version: u32,
    ) -> Result<Contract, StoreError> {
        let mut contracts = self.contracts.write().await;
        let Some(stored) = contracts.get_mut(&contract.id.0) else {
            return Err(StoreError::NotFound(contract.id));
        };
        if stored.version != expected_version {
            return Err(StoreError::VersionConflict {
                id: contract.id,
                expected: expected_version,
                found: stored.version,
            });
        }

        let saved = Contract {
            version: expected_version.saturating_add(1),
            updated_at: Utc::now(),
            ..contract
        };
        *stored = saved.clone();
        Ok(saved)
    }
}
