use crate::{
    error::ConfigurationError,
    settings::{OutputMode, validated::ValidatedPollSettings},
};
use planner::query::placeholders::bind_placeholders;
use serde::Serialize;

/// What a poll step will send to the database, for `check` output.
#[derive(Serialize, Debug, Clone)]
pub struct StatementPlan {
    pub step: String,
    pub dialect: String,
    pub endpoint: String,
    pub tiebreaker: String,
    pub cursor_column: String,
    pub direction: String,
    pub operator: String,
    pub strict: bool,
    pub parameters: Vec<serde_json::Value>,
    /// Query for the first poll, before any cursor is known.
    pub base_sql: String,
    /// Query once a cursor is set, with the dialect's native placeholders.
    pub cursor_sql: String,
    pub poll_delay_ms: u64,
    pub max_backoff_ms: u64,
    pub queue_capacity: usize,
    pub output: OutputMode,
    pub timezone: String,
}

impl StatementPlan {
    pub fn new(settings: &ValidatedPollSettings) -> Result<Self, ConfigurationError> {
        let statement = settings.statement()?;
        let dialect = statement.dialect();

        Ok(StatementPlan {
            step: settings.name.clone(),
            dialect: dialect.name().to_string(),
            endpoint: settings.connection.target(),
            tiebreaker: statement.tiebreaker(),
            cursor_column: statement.cursor_column().to_string(),
            direction: statement.direction().to_string(),
            operator: statement.operator().to_string(),
            strict: statement.is_strict(),
            parameters: settings.parameters.iter().map(|v| v.to_json()).collect(),
            base_sql: bind_placeholders(statement.base_query(), dialect)?,
            cursor_sql: bind_placeholders(statement.injected_query(), dialect)?,
            poll_delay_ms: settings.poll_delay.as_millis() as u64,
            max_backoff_ms: settings.max_backoff.as_millis() as u64,
            queue_capacity: settings.queue_capacity,
            output: settings.output,
            timezone: settings.timezone.name().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        env::EnvManager,
        settings::{PollStepConfig, validator::validate},
    };

    fn settings(sql: &str, dialect: &str) -> ValidatedPollSettings {
        let json = serde_json::json!({
            "name": "orders",
            "connection": { "dialect": dialect, "host": "db", "database": "shop", "user": "app" },
            "query": { "sql": sql, "parameters": [10], "tiebreaker": "id", "strict": true }
        });
        let config = PollStepConfig::from_json_str(&json.to_string(), &EnvManager::default()).unwrap();
        validate(config).unwrap()
    }

    #[test]
    fn test_postgres_plan_uses_numbered_placeholders() {
        let plan = StatementPlan::new(&settings(
            "SELECT id, total FROM orders WHERE total > ? ORDER BY id DESC",
            "postgres",
        ))
        .unwrap();

        assert_eq!(plan.endpoint, "db:5432/shop");
        assert_eq!(plan.direction, "DESC");
        assert_eq!(plan.operator, "<");
        assert_eq!(plan.base_sql, "SELECT id, total FROM orders WHERE total > $1 ORDER BY id DESC");
        assert_eq!(
            plan.cursor_sql,
            r#"SELECT id, total FROM orders WHERE total > $1 AND "id" < $2 ORDER BY id DESC"#
        );
        assert_eq!(plan.parameters, vec![serde_json::json!(10)]);
    }

    #[test]
    fn test_mysql_plan_keeps_question_marks() {
        let plan = StatementPlan::new(&settings(
            "SELECT id FROM orders WHERE total > ? ORDER BY id",
            "mysql",
        ))
        .unwrap();

        assert_eq!(plan.dialect, "MySQL");
        assert_eq!(
            plan.cursor_sql,
            "SELECT id FROM orders WHERE total > ? AND `id` > ? ORDER BY id"
        );
    }
}
