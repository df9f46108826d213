//! Iterative reader: a background task that repeatedly runs a keyset-paginated
//! query and hands non-empty batches to the consumer through a bounded queue.
//!
//! Delivery is at-least-once. The cursor advances when a batch is queued, not
//! when it is consumed, and a non-strict comparison re-reads rows that share
//! the last tie-breaker value. Use a unique tie-breaker with `strict` to avoid
//! duplicates.

use crate::{error::ReaderError, producer::config::ReaderConfig};
use chrono::Utc;
use connectors::{
    error::ConnectorError,
    sql::base::connection::{ConnectionFactory, PollConnection},
};
use engine_core::{backoff::Backoff, event_bus::EventBus, metrics::Metrics};
use model::{
    events::{PollFailed, ReaderStarted, ReaderStopped},
    records::batch::RawBatch,
};
use planner::query::statement::PollStatement;
use std::{sync::Arc, time::Duration};
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

struct PollTask {
    receiver: mpsc::Receiver<RawBatch>,
    cancel: CancellationToken,
    handle: JoinHandle<PollStatement>,
}

/// Polls one statement over one connection.
///
/// While running, the statement and the connection belong to the background
/// task; `stop()` joins the task and takes the statement back.
pub struct IterativeReader {
    step: String,
    config: ReaderConfig,
    factory: Arc<dyn ConnectionFactory>,
    metrics: Option<Metrics>,
    events: Option<EventBus>,
    statement: Option<PollStatement>,
    task: Option<PollTask>,
}

impl IterativeReader {
    pub fn new(
        step: impl Into<String>,
        statement: PollStatement,
        factory: Arc<dyn ConnectionFactory>,
        config: ReaderConfig,
    ) -> Self {
        Self {
            step: step.into(),
            config,
            factory,
            metrics: None,
            events: None,
            statement: Some(statement),
            task: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn step(&self) -> &str {
        &self.step
    }

    /// The statement, while the reader is idle.
    pub fn statement(&self) -> Option<&PollStatement> {
        self.statement.as_ref()
    }

    /// Allocates a fresh queue and launches the poll task. The connection is
    /// opened by the task, so an unreachable database shows up as failed polls.
    pub async fn start(&mut self) -> Result<(), ReaderError> {
        if self.task.is_some() {
            return Err(ReaderError::AlreadyRunning(self.step.clone()));
        }
        let statement = self
            .statement
            .take()
            .ok_or_else(|| ReaderError::TaskFailed {
                step: self.step.clone(),
                reason: "statement was lost by an earlier poll task".to_string(),
            })?;

        let (sender, receiver) = mpsc::channel(self.config.queue_capacity.max(1));
        let cancel = CancellationToken::new();

        let poller = Poller {
            step: self.step.clone(),
            statement,
            connection: self.factory.create(),
            sender,
            backoff: Backoff::new(self.config.poll_delay, self.config.max_backoff),
            poll_delay: self.config.poll_delay,
            connect_attempts: 0,
            metrics: self.metrics.clone(),
            events: self.events.clone(),
        };
        let handle = tokio::spawn(poller.run(cancel.clone()));

        self.task = Some(PollTask {
            receiver,
            cancel,
            handle,
        });

        info!(step = %self.step, dialect = %self.factory.dialect(), "Reader started");
        if let Some(events) = &self.events {
            events
                .publish(ReaderStarted {
                    step: self.step.clone(),
                    timestamp: Utc::now(),
                })
                .await;
        }
        Ok(())
    }

    /// True while the reader is running.
    pub fn has_next(&self) -> bool {
        self.task.is_some()
    }

    /// Waits for the next batch.
    ///
    /// Callers check `has_next()` first. Returns `None` when the reader is
    /// idle or its poll task has ended.
    pub async fn next(&mut self) -> Option<RawBatch> {
        match self.task.as_mut() {
            Some(task) => task.receiver.recv().await,
            None => None,
        }
    }

    /// Cancels the poll task and waits for it to finish. The connection is
    /// closed, queued batches are discarded and the cursor is reset. A no-op
    /// when idle.
    pub async fn stop(&mut self) -> Result<(), ReaderError> {
        let Some(PollTask {
            receiver,
            cancel,
            handle,
        }) = self.task.take()
        else {
            return Ok(());
        };

        cancel.cancel();
        let joined = handle.await;
        drop(receiver);

        let mut statement = joined.map_err(|e| ReaderError::TaskFailed {
            step: self.step.clone(),
            reason: e.to_string(),
        })?;
        statement.reset();
        self.statement = Some(statement);

        info!(step = %self.step, "Reader stopped");
        if let Some(events) = &self.events {
            events
                .publish(ReaderStopped {
                    step: self.step.clone(),
                    timestamp: Utc::now(),
                })
                .await;
        }
        Ok(())
    }
}

impl Drop for IterativeReader {
    fn drop(&mut self) {
        if let Some(task) = &self.task {
            task.cancel.cancel();
        }
    }
}

enum Tick {
    Wait(Duration),
    Closed,
}

/// State owned by the background task.
struct Poller {
    step: String,
    statement: PollStatement,
    connection: Box<dyn PollConnection>,
    sender: mpsc::Sender<RawBatch>,
    backoff: Backoff,
    poll_delay: Duration,
    connect_attempts: u64,
    metrics: Option<Metrics>,
    events: Option<EventBus>,
}

impl Poller {
    async fn run(mut self, cancel: CancellationToken) -> PollStatement {
        loop {
            let tick = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                tick = self.poll_once() => tick,
            };

            let delay = match tick {
                Tick::Wait(delay) => delay,
                Tick::Closed => break,
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.connection.disconnect().await;
        debug!(step = %self.step, "Poll task finished");
        self.statement
    }

    async fn poll_once(&mut self) -> Tick {
        if !self.connection.is_connected() {
            if let Err(error) = self.connect().await {
                return self.failed(ReaderError::Connect(error)).await;
            }
        }

        if let Some(metrics) = &self.metrics {
            metrics.increment_polls();
        }

        let sql = self.statement.query().to_string();
        let params = self.statement.parameters();

        match self.connection.execute(&sql, &params).await {
            Ok(batch) if batch.is_empty() => {
                debug!(
                    step = %self.step,
                    elapsed_ms = batch.elapsed.as_millis() as u64,
                    "Empty poll"
                );
                if let Some(metrics) = &self.metrics {
                    metrics.increment_empty_polls();
                }
                self.backoff.record_success();
                Tick::Wait(self.poll_delay)
            }
            Ok(batch) => self.deliver(batch).await,
            Err(error) => {
                if error.is_connection_lost() {
                    self.connection.disconnect().await;
                }
                self.failed(ReaderError::Query(error)).await
            }
        }
    }

    async fn connect(&mut self) -> Result<(), ConnectorError> {
        if self.connect_attempts > 0 {
            warn!(
                step = %self.step,
                attempt = self.connect_attempts + 1,
                "Reconnecting to database"
            );
            if let Some(metrics) = &self.metrics {
                metrics.increment_reconnects();
            }
        }
        self.connect_attempts += 1;

        self.connection.connect().await?;
        debug!(step = %self.step, dialect = %self.connection.dialect(), "Connection opened");
        Ok(())
    }

    /// Queues the batch, then advances the cursor from its last row.
    async fn deliver(&mut self, batch: RawBatch) -> Tick {
        let rows = batch.row_count;
        let cursor = batch
            .last_row()
            .and_then(|row| self.statement.cursor_from(row));

        debug!(
            step = %self.step,
            rows,
            elapsed_ms = batch.elapsed.as_millis() as u64,
            "Polled batch"
        );

        if self.sender.send(batch).await.is_err() {
            debug!(step = %self.step, "Result queue closed");
            return Tick::Closed;
        }

        if let Some(metrics) = &self.metrics {
            metrics.increment_batches(1);
            metrics.increment_rows(rows as u64);
        }

        match cursor {
            Some(value) => self.statement.set_cursor(value),
            None => warn!(
                step = %self.step,
                column = self.statement.cursor_column(),
                "Last row has no tie-breaker column, cursor not advanced"
            ),
        }

        self.backoff.record_success();
        Tick::Wait(self.poll_delay)
    }

    async fn failed(&mut self, error: ReaderError) -> Tick {
        let delay = self.backoff.record_failure();
        let consecutive_failures = self.backoff.consecutive_failures();

        if let Some(metrics) = &self.metrics {
            metrics.increment_failed_polls();
        }
        error!(
            step = %self.step,
            %error,
            consecutive_failures,
            retry_in_ms = delay.as_millis() as u64,
            "Poll failed"
        );

        if let Some(events) = &self.events {
            events
                .publish(PollFailed {
                    step: self.step.clone(),
                    error: error.to_string(),
                    consecutive_failures,
                    timestamp: Utc::now(),
                })
                .await;
        }
        Tick::Wait(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use connectors::memory::MemoryTable;
    use model::{core::value::Value, records::row::RowData};
    use planner::query::dialect::Dialect;
    use tokio::time::timeout;
    use tracing_test::traced_test;

    const WAIT: Duration = Duration::from_secs(5);

    fn row(id: i64) -> RowData {
        RowData::from_pairs([("id", Value::Int(id)), ("label", Value::String(format!("r{id}")))])
    }

    fn ids(batch: &RawBatch) -> Vec<Value> {
        batch.rows.iter().map(|r| r.get_value("id")).collect()
    }

    fn reader(table: &MemoryTable, strict: bool) -> IterativeReader {
        let statement = PollStatement::new(
            Dialect::Postgres,
            "SELECT id, label FROM events ORDER BY id",
            vec![],
            "id",
            strict,
        )
        .unwrap();
        let config = ReaderConfig::default()
            .with_poll_delay(Duration::from_millis(5))
            .with_max_backoff(Duration::from_millis(20))
            .with_queue_capacity(4);
        IterativeReader::new("events", statement, Arc::new(table.factory(Dialect::Postgres)), config)
    }

    #[tokio::test]
    async fn test_cursor_advances_between_batches() {
        let table = MemoryTable::new("id");
        table.insert((1..=3).map(row));
        let mut reader = reader(&table, true);

        reader.start().await.unwrap();
        assert!(reader.has_next());

        let first = timeout(WAIT, reader.next()).await.unwrap().unwrap();
        assert_eq!(ids(&first), [1, 2, 3].map(Value::Int).to_vec());

        table.insert((4..=5).map(row));
        let second = timeout(WAIT, reader.next()).await.unwrap().unwrap();
        assert_eq!(ids(&second), [4, 5].map(Value::Int).to_vec());

        reader.stop().await.unwrap();
        assert!(!reader.has_next());

        let executed = table.executed();
        assert_eq!(executed[0].0, "SELECT id, label FROM events ORDER BY id");
        assert!(executed[0].1.is_empty());
        assert!(executed.iter().any(|(sql, params)| {
            sql == r#"SELECT id, label FROM events WHERE "id" > ? ORDER BY id"#
                && params == &vec![Value::Int(3)]
        }));
    }

    #[tokio::test]
    async fn test_non_strict_redelivers_boundary_row() {
        let table = MemoryTable::new("id");
        table.insert((1..=2).map(row));
        let mut reader = reader(&table, false);

        reader.start().await.unwrap();
        let first = timeout(WAIT, reader.next()).await.unwrap().unwrap();
        let second = timeout(WAIT, reader.next()).await.unwrap().unwrap();
        reader.stop().await.unwrap();

        assert_eq!(ids(&first), [1, 2].map(Value::Int).to_vec());
        assert_eq!(ids(&second), vec![Value::Int(2)]);
    }

    #[tokio::test]
    async fn test_start_while_running_fails() {
        let table = MemoryTable::new("id");
        let mut reader = reader(&table, true);

        reader.start().await.unwrap();
        assert!(matches!(
            reader.start().await,
            Err(ReaderError::AlreadyRunning(step)) if step == "events"
        ));
        reader.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_when_idle_is_noop() {
        let table = MemoryTable::new("id");
        let mut reader = reader(&table, true);

        reader.stop().await.unwrap();
        assert!(!reader.has_next());
        assert!(reader.next().await.is_none());
    }

    #[tokio::test]
    async fn test_restart_replays_from_the_beginning() {
        let table = MemoryTable::new("id");
        table.insert((1..=3).map(row));
        let mut reader = reader(&table, true);

        reader.start().await.unwrap();
        let first = timeout(WAIT, reader.next()).await.unwrap().unwrap();
        reader.stop().await.unwrap();

        let statement = reader.statement().unwrap();
        assert!(statement.cursor().is_none());
        assert_eq!(statement.query(), statement.base_query());

        reader.start().await.unwrap();
        let again = timeout(WAIT, reader.next()).await.unwrap().unwrap();
        reader.stop().await.unwrap();

        assert_eq!(ids(&first), ids(&again));
    }

    #[traced_test]
    #[tokio::test]
    async fn test_recovers_from_connect_and_query_failures() {
        let table = MemoryTable::new("id");
        table.insert((1..=2).map(row));
        table.fail_next_connects(2);
        table.fail_next_queries(1);

        let metrics = Metrics::new();
        let mut reader = reader(&table, true).with_metrics(metrics.clone());

        reader.start().await.unwrap();
        let batch = timeout(WAIT, reader.next()).await.unwrap().unwrap();
        reader.stop().await.unwrap();

        assert_eq!(ids(&batch), [1, 2].map(Value::Int).to_vec());
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.failed_polls, 3);
        assert!(snapshot.reconnects >= 3);
        assert_eq!(table.connects(), 2);
        assert!(logs_contain("Poll failed"));
        assert!(logs_contain("Reconnecting to database"));
    }

    #[traced_test]
    #[tokio::test]
    async fn test_missing_tiebreaker_column_keeps_cursor() {
        let table = MemoryTable::new("id");
        table.insert([RowData::from_pairs([("label", Value::String("x".into()))])]);
        let mut reader = reader(&table, true);

        reader.start().await.unwrap();
        timeout(WAIT, reader.next()).await.unwrap().unwrap();
        reader.stop().await.unwrap();

        assert!(logs_contain("Last row has no tie-breaker column"));
        let executed = table.executed();
        assert!(executed.iter().all(|(sql, _)| !sql.contains("WHERE")));
    }

    #[tokio::test]
    async fn test_publishes_failures_on_event_bus() {
        let table = MemoryTable::new("id");
        table.fail_next_connects(1);
        let events = EventBus::new();
        let (tx, mut rx) = mpsc::channel(8);
        events.subscribe::<PollFailed>(tx).await;

        let mut reader = reader(&table, true).with_events(events);
        reader.start().await.unwrap();
        let failed = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        reader.stop().await.unwrap();

        assert_eq!(failed.step, "events");
        assert_eq!(failed.consecutive_failures, 1);
    }
}
