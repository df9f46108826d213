use crate::{
    error::ConfigurationError,
    settings::{PollStepConfig, validated::ValidatedPollSettings},
};
use chrono_tz::Tz;
use connectors::settings::ConnectionSettings;
use model::core::value::Value;
use planner::query::dialect::Dialect;
use std::time::Duration;
use tracing::debug;

impl TryFrom<PollStepConfig> for ValidatedPollSettings {
    type Error = ConfigurationError;

    fn try_from(config: PollStepConfig) -> Result<Self, Self::Error> {
        validate(config)
    }
}

/// Checks every field and builds the statement once so query errors surface
/// here rather than when the reader starts.
pub fn validate(config: PollStepConfig) -> Result<ValidatedPollSettings, ConfigurationError> {
    let conn = config.connection;

    let dialect = required(conn.dialect, "connection.dialect")?
        .parse::<Dialect>()
        .map_err(|reason| ConfigurationError::Invalid {
            field: "connection.dialect",
            reason,
        })?;
    let port = conn.port.unwrap_or_else(|| dialect.default_port());
    if port == 0 {
        return Err(invalid("connection.port", "must be greater than 0"));
    }

    let connection = ConnectionSettings {
        dialect,
        host: required(conn.host, "connection.host")?,
        port,
        database: required(conn.database, "connection.database")?,
        user: required(conn.user, "connection.user")?,
        password: conn.password,
        tls: conn.tls,
        connect_timeout: Duration::from_millis(conn.connect_timeout_ms),
    };

    let sql = required(config.query.sql, "query.sql")?;
    let tiebreaker = required(config.query.tiebreaker, "query.tiebreaker")?;

    if config.poll_delay_ms == 0 {
        return Err(invalid("poll_delay_ms", "must be greater than 0"));
    }
    if config.queue_capacity == 0 {
        return Err(invalid("queue_capacity", "must be at least 1"));
    }

    let poll_delay = Duration::from_millis(config.poll_delay_ms);
    let max_backoff = config
        .max_backoff_ms
        .map(Duration::from_millis)
        .unwrap_or(poll_delay);
    if max_backoff < poll_delay {
        return Err(invalid("max_backoff_ms", "must not be below poll_delay_ms"));
    }

    let timezone = config
        .timezone
        .parse::<Tz>()
        .map_err(|e| invalid("timezone", &e.to_string()))?;

    let settings = ValidatedPollSettings {
        name: config.name,
        connection,
        sql,
        parameters: config.query.parameters.iter().map(Value::from_json).collect(),
        tiebreaker,
        strict: config.query.strict,
        poll_delay,
        queue_capacity: config.queue_capacity,
        max_backoff,
        output: config.output,
        timezone,
        metrics: config.metrics.enabled,
        events: config.metrics.events,
    };

    let statement = settings.statement()?;
    debug!(
        step = %settings.name,
        dialect = %dialect,
        tiebreaker = %statement.tiebreaker(),
        operator = %statement.operator(),
        "Validated poll step"
    );

    Ok(settings)
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ConfigurationError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigurationError::MissingField(field))
}

fn invalid(field: &'static str, reason: &str) -> ConfigurationError {
    ConfigurationError::Invalid {
        field,
        reason: reason.to_string(),
    }
}
