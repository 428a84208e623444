use chrono::{DateTime, Utc};
use sqlx::Row;

use signoff_core::domain::{AmendmentStage, Contract, ContractId, ContractStatus, TimelineEntry};
use signoff_core::{normalize_contract_approvers, ContractStore, StoreError};

use super::RepositoryError;
use crate::DbPool;

const CONTRACT_COLUMNS: &str = "id, title, status, is_amended, amendment_stage, original_status,
     approvers_json, timeline_json, version, created_at, updated_at";

pub struct SqlContractRepository {
    pool: DbPool,
}

impl SqlContractRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, id: &ContractId) -> Result<Option<Contract>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {CONTRACT_COLUMNS} FROM contract WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_contract(r)?)),
            None => Ok(None),
        }
    }

    async fn stored_version(&self, id: &ContractId) -> Result<Option<u32>, RepositoryError> {
        let row = sqlx::query("SELECT version FROM contract WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| {
            let version: i64 = r.try_get("version").map_err(decode)?;
            version_from_column(version)
        })
        .transpose()
    }
}

fn decode(error: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}

fn parse_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("{column}: {e}")))
}

fn parse_status(column: &str, value: &str) -> Result<ContractStatus, RepositoryError> {
    ContractStatus::parse(value)
        .ok_or_else(|| RepositoryError::Decode(format!("{column}: unknown status `{value}`")))
}

fn version_from_column(value: i64) -> Result<u32, RepositoryError> {
    u32::try_from(value)
        .map_err(|_| RepositoryError::Decode(format!("version out of range: {value}")))
}

fn row_to_contract(row: &sqlx::sqlite::SqliteRow) -> Result<Contract, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode)?;
    let title: String = row.try_get("title").map_err(decode)?;
    let status_str: String = row.try_get("status").map_err(decode)?;
    let is_amended: bool = row.try_get("is_amended").map_err(decode)?;
    let stage_str: Option<String> = row.try_get("amendment_stage").map_err(decode)?;
    let original_status_str: Option<String> = row.try_get("original_status").map_err(decode)?;
    let approvers_json: String = row.try_get("approvers_json").map_err(decode)?;
    let timeline_json: String = row.try_get("timeline_json").map_err(decode)?;
    let version: i64 = row.try_get("version").map_err(decode)?;
    let created_at_str: String = row.try_get("created_at").map_err(decode)?;
    let updated_at_str: String = row.try_get("updated_at").map_err(decode)?;

    // Rows written before approvers were stored as arrays go through the normalizer.
    let approvers_value: serde_json::Value =
        serde_json::from_str(&approvers_json).map_err(decode)?;
    let approvers = normalize_contract_approvers(&approvers_value).map_err(decode)?;

    let timeline: Vec<TimelineEntry> = if timeline_json.trim().is_empty() {
        Vec::new()
    } else {
        serde_json::from_str::<Option<Vec<TimelineEntry>>>(&timeline_json)
            .map_err(decode)?
            .unwrap_or_default()
    };

    let amendment_stage = stage_str
        .map(|stage| {
            AmendmentStage::parse(&stage).ok_or_else(|| {
                RepositoryError::Decode(format!("amendment_stage: unknown stage `{stage}`"))
            })
        })
        .transpose()?;
    let original_status =
        original_status_str.map(|s| parse_status("original_status", &s)).transpose()?;

    Ok(Contract {
        id: ContractId(id),
        title,
        status: parse_status("status", &status_str)?,
        approvers,
        is_amended,
        amendment_stage,
        original_status,
        timeline,
        version: version_from_column(version)?,
        created_at: parse_timestamp("created_at", &created_at_str)?,
        updated_at: parse_timestamp("updated_at", &updated_at_str)?,
    })
}

struct EncodedContract {
    approvers_json: String,
    timeline_json: String,
    amendment_stage: Option<&'static str>,
    original_status: Option<&'static str>,
}

fn encode(contract: &Contract) -> Result<EncodedContract, RepositoryError> {
    Ok(EncodedContract {
        approvers_json: serde_json::to_string(&contract.approvers).map_err(decode)?,
        timeline_json: serde_json::to_string(&contract.timeline).map_err(decode)?,
        amendment_stage: contract.amendment_stage.map(|stage| stage.as_str()),
        original_status: contract.original_status.map(|status| status.as_str()),
    })
}

#[async_trait::async_trait]
impl ContractStore for SqlContractRepository {
    async fn load(&self, id: &ContractId) -> Result<Contract, StoreError> {
        self.fetch(id).await?.ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    async fn list(&self) -> Result<Vec<Contract>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {CONTRACT_COLUMNS} FROM contract ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        let contracts =
            rows.iter().map(row_to_contract).collect::<Result<Vec<_>, RepositoryError>>()?;
        Ok(contracts)
    }

    async fn create(&self, contract: Contract) -> Result<Contract, StoreError> {
        let encoded = encode(&contract)?;

        let result = sqlx::query(
            "INSERT INTO contract (id, title, status, is_amended, amendment_stage, original_status,
                                   approvers_json, timeline_json, version, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO NOTHING",
        )
        .bind(&contract.id.0)
        .bind(&contract.title)
        .bind(contract.status.as_str())
        .bind(contract.is_amended)
        .bind(encoded.amendment_stage)
        .bind(encoded.original_status)
        .bind(&encoded.approvers_json)
        .bind(&encoded.timeline_json)
        .bind(i64::from(contract.version))
        .bind(contract.created_at.to_rfc3339())
        .bind(contract.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AlreadyExists(contract.id));
        }
        Ok(contract)
    }

    async fn save(
        &self,
        contract: Contract,
        expected_version: u32,
    ) -> Result<Contract, StoreError> {
        let encoded = encode(&contract)?;
        let next_version = expected_version.saturating_add(1);
        let updated_at = Utc::now();

        let result = sqlx::query(
            "UPDATE contract SET
                 title = ?,
                 status = ?,
                 is_amended = ?,
                 amendment_stage = ?,
                 original_status = ?,
                 approvers_json = ?,
                 timeline_json = ?,
                 version = ?,
                 updated_at = ?
             WHERE id = ? AND version = ?",
        )
        .bind(&contract.title)
        .bind(contract.status.as_str())
        .bind(contract.is_amended)
        .bind(encoded.amendment_stage)
        .bind(encoded.original_status)
        .bind(&encoded.approvers_json)
        .bind(&encoded.timeline_json)
        .bind(i64::from(next_version))
        .bind(updated_at.to_rfc3339())
        .bind(&contract.id.0)
        .bind(i64::from(expected_version))
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        if result.rows_affected() == 0 {
            return match self.stored_version(&contract.id).await? {
                Some(found) => {
                    tracing::debug!(
                        event_name = "persistence.version_conflict",
                        contract_id = %contract.id,
                        expected = expected_version,
                        found,
                        "compare-and-swap save lost the race"
                    );
                    Err(StoreError::VersionConflict {
                        id: contract.id,
                        expected: expected_version,
                        found,
                    })
                }
                None => Err(StoreError::NotFound(contract.id)),
            };
        }

        Ok(Contract { version: next_version, updated_at, ..contract })
    }
}
