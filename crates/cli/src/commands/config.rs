use std::env;
use std::fs;
use std::path::Path;

use signoff_core::config::{resolve_config_path, AppConfig, LoadOptions};
use toml::Value;

struct Field<'a> {
    key_path: &'a str,
    value: String,
    env_keys: &'a [&'a str],
}

pub fn run(options: LoadOptions) -> String {
    let config_file_path = resolve_config_path(options.config_path.as_deref());
    let database_url_flag = options.overrides.database_url.is_some();

    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let fields = [
        Field {
            key_path: "database.url",
            value: config.database.url.clone(),
            env_keys: &["SIGNOFF_DATABASE_URL"],
        },
        Field {
            key_path: "database.max_connections",
            value: config.database.max_connections.to_string(),
            env_keys: &["SIGNOFF_DATABASE_MAX_CONNECTIONS"],
        },
        Field {
            key_path: "database.timeout_secs",
            value: config.database.timeout_secs.to_string(),
            env_keys: &["SIGNOFF_DATABASE_TIMEOUT_SECS"],
        },
        Field {
            key_path: "workflow.legal_limit",
            value: config.workflow.legal_limit.to_string(),
            env_keys: &["SIGNOFF_WORKFLOW_LEGAL_LIMIT"],
        },
        Field {
            key_path: "workflow.management_limit",
            value: config.workflow.management_limit.to_string(),
            env_keys: &["SIGNOFF_WORKFLOW_MANAGEMENT_LIMIT"],
        },
        Field {
            key_path: "workflow.approver_limit",
            value: config.workflow.approver_limit.to_string(),
            env_keys: &["SIGNOFF_WORKFLOW_APPROVER_LIMIT"],
        },
        Field {
            key_path: "notifications.enabled",
            value: config.notifications.enabled.to_string(),
            env_keys: &["SIGNOFF_NOTIFICATIONS_ENABLED"],
        },
        Field {
            key_path: "notifications.admin_email",
            value: config.notifications.admin_email.clone(),
            env_keys: &["SIGNOFF_NOTIFICATIONS_ADMIN_EMAIL"],
        },
        Field {
            key_path: "logging.level",
            value: config.logging.level.clone(),
            env_keys: &["SIGNOFF_LOGGING_LEVEL", "SIGNOFF_LOG_LEVEL"],
        },
        Field {
            key_path: "logging.format",
            value: format!("{:?}", config.logging.format),
            env_keys: &["SIGNOFF_LOGGING_FORMAT", "SIGNOFF_LOG_FORMAT"],
        },
    ];

    let mut lines =
        vec!["effective config (source precedence: flag > env > file > default):".to_string()];
    for field in &fields {
        let source = if field.key_path == "database.url" && database_url_flag {
            "flag (--database-url)".to_string()
        } else {
            field_source(
                field.key_path,
                field.env_keys,
                config_file_doc.as_ref(),
                config_file_path.as_deref(),
            )
        };
        lines.push(render_line(field.key_path, &field.value, source));
    }

    lines.join("\n")
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
