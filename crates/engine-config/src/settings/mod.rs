//! Poll step configuration as written by the user, before validation.

use crate::{env::EnvManager, error::ConfigurationError};
use connectors::settings::TlsMode;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

pub mod validated;
pub mod validator;

pub const DEFAULT_POLL_DELAY_MS: u64 = 1_000;
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;

const SQL_POINTER: &str = "/query/sql";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PollStepConfig {
    #[serde(default = "default_name")]
    pub name: String,
    pub connection: ConnectionConfig,
    pub query: QueryConfig,
    #[serde(default = "default_poll_delay_ms")]
    pub poll_delay_ms: u64,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Defaults to `poll_delay_ms`.
    #[serde(default)]
    pub max_backoff_ms: Option<u64>,
    #[serde(default)]
    pub output: OutputMode,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Required fields are optional here so validation can name the missing one.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    pub dialect: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    #[serde(default)]
    pub tls: TlsMode,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueryConfig {
    /// Taken verbatim: `${NAME}` is not expanded here, so dollar-quoted
    /// bodies survive. Pass values through `parameters` instead.
    pub sql: Option<String>,
    #[serde(default)]
    pub parameters: Vec<serde_json::Value>,
    pub tiebreaker: Option<String>,
    #[serde(default)]
    pub strict: bool,
}

/// How converted rows are handed downstream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// One message per poll carrying every row.
    #[default]
    Batch,
    /// One message per row.
    Flattened,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub events: bool,
}

impl PollStepConfig {
    /// Parses a JSON document, resolving `${NAME}` references in every string
    /// value except `query.sql` first.
    pub fn from_json_str(input: &str, env: &EnvManager) -> Result<Self, ConfigurationError> {
        let mut raw: serde_json::Value = serde_json::from_str(input)?;

        let sql = raw.pointer_mut(SQL_POINTER).map(serde_json::Value::take);
        interpolate_strings(&mut raw, env)?;
        if let (Some(sql), Some(slot)) = (sql, raw.pointer_mut(SQL_POINTER)) {
            *slot = sql;
        }

        Ok(serde_json::from_value(raw)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P, env: &EnvManager) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigurationError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content, env)
    }
}

fn interpolate_strings(
    value: &mut serde_json::Value,
    env: &EnvManager,
) -> Result<(), ConfigurationError> {
    match value {
        serde_json::Value::String(s) => *s = env.interpolate(s)?,
        serde_json::Value::Array(items) => {
            for item in items {
                interpolate_strings(item, env)?;
            }
        }
        serde_json::Value::Object(map) => {
            for item in map.values_mut() {
                interpolate_strings(item, env)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn default_name() -> String {
    "poll".to_string()
}

fn default_poll_delay_ms() -> u64 {
    DEFAULT_POLL_DELAY_MS
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

fn default_timezone() -> String {
    "UTC".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const MINIMAL: &str = r#"{
        "connection": { "dialect": "postgres", "host": "localhost", "database": "shop", "user": "app" },
        "query": { "sql": "SELECT id FROM orders ORDER BY id", "tiebreaker": "id" }
    }"#;

    #[test]
    fn test_defaults() {
        let config = PollStepConfig::from_json_str(MINIMAL, &EnvManager::default()).unwrap();
        assert_eq!(config.name, "poll");
        assert_eq!(config.poll_delay_ms, DEFAULT_POLL_DELAY_MS);
        assert_eq!(config.queue_capacity, DEFAULT_QUEUE_CAPACITY);
        assert_eq!(config.max_backoff_ms, None);
        assert_eq!(config.output, OutputMode::Batch);
        assert_eq!(config.timezone, "UTC");
        assert_eq!(config.connection.tls, TlsMode::Prefer);
        assert!(!config.query.strict);
        assert!(config.query.parameters.is_empty());
        assert!(!config.metrics.enabled && !config.metrics.events);
    }

    #[test]
    fn test_interpolates_nested_strings() {
        let input = r#"{
            "connection": { "dialect": "mysql", "host": "${DB_HOST}", "database": "shop", "user": "app", "password": "${DB_PASS}" },
            "query": { "sql": "SELECT id FROM t WHERE region = ? ORDER BY id", "parameters": ["${REGION}"], "tiebreaker": "id", "strict": true },
            "output": "flattened"
        }"#;
        let env = EnvManager::from_vars([("DB_HOST", "db"), ("DB_PASS", "s3cret"), ("REGION", "eu")]);
        let config = PollStepConfig::from_json_str(input, &env).unwrap();
        assert_eq!(config.connection.host.as_deref(), Some("db"));
        assert_eq!(config.connection.password.as_deref(), Some("s3cret"));
        assert_eq!(config.query.parameters, vec![json!("eu")]);
        assert_eq!(config.output, OutputMode::Flattened);
    }

    #[test]
    fn test_query_sql_is_not_interpolated() {
        let input = r#"{
            "connection": { "dialect": "postgres", "host": "${DB_HOST}", "database": "shop", "user": "app" },
            "query": {
                "sql": "SELECT id, $$a$$ || '${literal}' AS tag FROM t WHERE region = ? ORDER BY id",
                "parameters": ["${REGION}"],
                "tiebreaker": "id"
            }
        }"#;
        let env = EnvManager::from_vars([("DB_HOST", "db"), ("REGION", "eu")]);
        let config = PollStepConfig::from_json_str(input, &env).unwrap();

        assert_eq!(
            config.query.sql.as_deref(),
            Some("SELECT id, $$a$$ || '${literal}' AS tag FROM t WHERE region = ? ORDER BY id")
        );
        assert_eq!(config.connection.host.as_deref(), Some("db"));
        assert_eq!(config.query.parameters, vec![json!("eu")]);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let input = MINIMAL.replacen("\"query\"", "\"poll_delay\": 5, \"query\"", 1);
        assert!(matches!(
            PollStepConfig::from_json_str(&input, &EnvManager::default()),
            Err(ConfigurationError::Parse(_))
        ));
    }

    #[test]
    fn test_from_missing_file() {
        let err = PollStepConfig::from_file("/nonexistent/poll.json", &EnvManager::default())
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::Read { .. }));
    }
}
