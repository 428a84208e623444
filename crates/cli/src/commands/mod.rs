pub mod act;
pub mod config;
pub mod create;
pub mod migrate;
pub mod queue;
pub mod show;

use std::future::Future;

use clap::Args;
use serde::Serialize;
use serde_json::Value;
use signoff_core::config::{AppConfig, LoadOptions};
use signoff_core::notifications::TracingNotificationSink;
use signoff_core::{Actor, ApplicationError, ApprovalService, InterfaceError, RoleFlags};
use signoff_db::{connect_with_config, migrations, SqlContractRepository};
use uuid::Uuid;

pub type CliService = ApprovalService<SqlContractRepository, TracingNotificationSink>;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::success_with_data(command, message, None)
    }

    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    /// Maps an application error through the interface layer so the caller
    /// sees the same classes an HTTP adapter would.
    pub fn from_application_error(command: &str, error: ApplicationError) -> Self {
        let interface = error.into_interface(Uuid::new_v4().to_string());
        let (error_class, exit_code) = match &interface {
            InterfaceError::BadRequest { .. } => ("rejected", 6),
            InterfaceError::NotFound { .. } => ("not_found", 7),
            InterfaceError::Conflict { .. } => ("conflict", 8),
            InterfaceError::ServiceUnavailable { .. } => ("unavailable", 9),
            InterfaceError::Internal { .. } => ("internal", 10),
        };
        Self::failure(
            command,
            error_class,
            format!(
                "{} ({interface}; correlation_id={})",
                interface.user_message(),
                interface.correlation_id()
            ),
            exit_code,
        )
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\
             \"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Caller identity. Capabilities come from flags because the CLI has no
/// identity provider of its own.
#[derive(Debug, Clone, Args)]
pub struct ActorArgs {
    #[arg(long = "as", value_name = "EMAIL", help = "Email of the acting user")]
    pub email: String,
    #[arg(long, help = "Display name of the acting user (defaults to the email)")]
    pub name: Option<String>,
    #[arg(long, help = "Act with contract administrator rights")]
    pub admin: bool,
    #[arg(long, help = "Act as a legal team member")]
    pub legal: bool,
    #[arg(long, help = "Act as a management team member")]
    pub management: bool,
    #[arg(long, help = "Act as a final approver")]
    pub approver: bool,
}

impl ActorArgs {
    pub fn to_actor(&self) -> Actor {
        let name = self.name.clone().unwrap_or_else(|| self.email.clone());
        Actor::new(
            self.email.trim(),
            name,
            RoleFlags {
                is_admin: self.admin,
                is_legal_team: self.legal,
                is_management_team: self.management,
                is_approver: self.approver,
            },
        )
    }
}

pub(crate) fn to_data<T: Serialize>(command: &str, value: &T) -> Result<Value, CommandResult> {
    serde_json::to_value(value).map_err(|error| {
        CommandResult::failure(command, "serialization", error.to_string(), 11)
    })
}

/// Loads config, migrates the database and hands a ready service to `body`.
pub(crate) fn with_service<F, Fut>(command: &str, options: LoadOptions, body: F) -> CommandResult
where
    F: FnOnce(CliService) -> Fut,
    Fut: Future<Output = CommandResult>,
{
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                command,
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                command,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    runtime.block_on(async {
        let pool = match connect_with_config(&config.database).await {
            Ok(pool) => pool,
            Err(error) => {
                return CommandResult::failure(command, "db_connectivity", error.to_string(), 4)
            }
        };
        if let Err(error) = migrations::run_pending(&pool).await {
            pool.close().await;
            return CommandResult::failure(command, "migration", error.to_string(), 5);
        }

        let service = ApprovalService::from_config(
            SqlContractRepository::new(pool.clone()),
            TracingNotificationSink,
            &config,
        );
        let result = body(service).await;
        pool.close().await;
        result
    })
}
