use crate::{error::ConfigurationError, settings::OutputMode};
use chrono_tz::Tz;
use connectors::settings::ConnectionSettings;
use model::core::value::Value;
use planner::query::statement::PollStatement;
use std::time::Duration;

/// Immutable, validated configuration for one poll step.
#[derive(Debug, Clone)]
pub struct ValidatedPollSettings {
    pub name: String,
    pub connection: ConnectionSettings,
    pub sql: String,
    pub parameters: Vec<Value>,
    pub tiebreaker: String,
    pub strict: bool,
    pub poll_delay: Duration,
    pub queue_capacity: usize,
    pub max_backoff: Duration,
    pub output: OutputMode,
    pub timezone: Tz,
    pub metrics: bool,
    pub events: bool,
}

impl ValidatedPollSettings {
    /// Builds a fresh statement. Each reader gets its own.
    pub fn statement(&self) -> Result<PollStatement, ConfigurationError> {
        Ok(PollStatement::new(
            self.connection.dialect,
            self.sql.clone(),
            self.parameters.clone(),
            &self.tiebreaker,
            self.strict,
        )?)
    }
}
