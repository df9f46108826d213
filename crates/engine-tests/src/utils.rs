use connectors::factory::SqlConnectionFactory;
use connectors::sql::base::connection::ConnectionFactory;
use engine_config::{
    env::EnvManager,
    settings::{PollStepConfig, validated::ValidatedPollSettings, validator::validate},
};
use engine_processing::converter::{ConvertedRecord, Output};
use engine_runtime::{
    error::RuntimeError,
    execution::executor::{PollStep, StepSummary},
};
use model::{core::value::Value, records::row::RowData};
use std::{env, time::Duration};
use tokio::{sync::mpsc, task::JoinHandle, time::timeout};
use tokio_util::sync::CancellationToken;

/// Upper bound for anything a test waits on.
pub const WAIT: Duration = Duration::from_secs(10);

/// Validated settings from a JSON document that only needs the `query` part;
/// connection details and a short poll delay are filled in.
pub fn settings(mut patch: serde_json::Value) -> ValidatedPollSettings {
    let mut base = serde_json::json!({
        "name": "events",
        "connection": { "dialect": "postgres", "host": "memory", "database": "test", "user": "test" },
        "poll_delay_ms": 5,
        "max_backoff_ms": 20
    });
    if let (Some(base), Some(patch)) = (base.as_object_mut(), patch.as_object_mut()) {
        base.append(patch);
    }
    let config = PollStepConfig::from_json_str(&base.to_string(), &EnvManager::default())
        .expect("parse poll step config");
    validate(config).expect("valid poll step config")
}

pub fn query(sql: &str, tiebreaker: &str, strict: bool) -> serde_json::Value {
    serde_json::json!({ "sql": sql, "tiebreaker": tiebreaker, "strict": strict })
}

pub fn event(id: i64) -> RowData {
    RowData::from_pairs([
        ("id", Value::Int(id)),
        ("payload", Value::String(format!("event-{id}"))),
    ])
}

pub fn ids(records: &[ConvertedRecord]) -> Vec<i64> {
    records
        .iter()
        .filter_map(|r| r.get("id").and_then(Value::as_i64))
        .collect()
}

pub fn ordinals(records: &[ConvertedRecord]) -> Vec<i64> {
    records.iter().map(|r| r.ordinal).collect()
}

/// Receives outputs until `count` records have arrived, flattening batches.
pub async fn recv_records(rx: &mut mpsc::Receiver<Output>, count: usize) -> Vec<ConvertedRecord> {
    let mut records = Vec::new();
    while records.len() < count {
        let output = timeout(WAIT, rx.recv())
            .await
            .expect("timed out waiting for output")
            .expect("output channel closed");
        match output {
            Output::Batch(batch) => records.extend(batch.records),
            Output::Record(record) => records.push(record),
        }
    }
    records
}

/// Polls `condition` until it holds or `WAIT` elapses.
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + WAIT;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

pub type RunHandle = JoinHandle<(PollStep, Result<StepSummary, RuntimeError>)>;

/// Runs the step on a separate task, returning the output receiver.
pub fn spawn_step(
    mut step: PollStep,
    cancel: CancellationToken,
) -> (RunHandle, mpsc::Receiver<Output>) {
    let (mut tx, rx) = mpsc::channel::<Output>(32);
    let handle = tokio::spawn(async move {
        let result = step.run(&mut tx, cancel).await;
        (step, result)
    });
    (handle, rx)
}

/// Settings for a live database, overridable through `SLUICE_TEST_*`
/// variables.
pub fn live_settings(dialect: &str, sql: &str) -> ValidatedPollSettings {
    let prefix = match dialect {
        "postgres" => "SLUICE_TEST_PG",
        _ => "SLUICE_TEST_MYSQL",
    };
    let var = |name: &str, default: &str| {
        env::var(format!("{prefix}_{name}")).unwrap_or_else(|_| default.to_string())
    };
    let port: u16 = var("PORT", if dialect == "postgres" { "5432" } else { "3306" })
        .parse()
        .expect("numeric port");

    settings(serde_json::json!({
        "name": format!("{dialect}-live"),
        "connection": {
            "dialect": dialect,
            "host": var("HOST", "localhost"),
            "port": port,
            "database": var("DATABASE", "testdb"),
            "user": var("USER", "user"),
            "password": var("PASSWORD", "password"),
            "tls": "disable"
        },
        "query": query(sql, "id", true),
        "output": "flattened"
    }))
}

/// Runs each statement on a fresh connection to the configured database.
pub async fn execute(settings: &ValidatedPollSettings, statements: &[&str]) {
    let factory = SqlConnectionFactory::new(settings.connection.clone());
    let mut connection = factory.create();
    connection.connect().await.expect("connect to test database");
    for sql in statements {
        connection
            .execute(sql, &[])
            .await
            .unwrap_or_else(|e| panic!("failed to execute `{sql}`: {e}"));
    }
    connection.disconnect().await;
}
