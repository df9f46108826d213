use crate::{error::RuntimeError, execution::factory::connection_factory};
use connectors::sql::base::connection::ConnectionFactory;
use engine_config::settings::validated::ValidatedPollSettings;
use engine_core::{
    event_bus::EventBus,
    metrics::{Metrics, MetricsSnapshot},
};
use engine_processing::{
    converter::{OrdinalCounter, OutputSink, ResultConverter, transform::TemporalNormalizer},
    producer::{config::ReaderConfig, poller::IterativeReader},
};
use planner::query::statement::PollStatement;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Totals for one `run`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepSummary {
    pub batches: u64,
    pub records: u64,
    pub dropped: u64,
    pub elapsed: Duration,
    pub metrics: Option<MetricsSnapshot>,
}

/// One configured poll: a reader feeding a converter feeding a sink.
pub struct PollStep {
    name: String,
    reader: IterativeReader,
    converter: ResultConverter,
    counter: OrdinalCounter,
    metrics: Option<Metrics>,
    events: Option<EventBus>,
}

impl PollStep {
    /// Builds the step against the configured database.
    pub fn from_settings(settings: ValidatedPollSettings) -> Result<Self, RuntimeError> {
        let factory = connection_factory(&settings);
        Self::build(settings, factory)
    }

    /// Builds the statement, reader and converter. Every configuration
    /// problem is reported here, before anything is started.
    pub fn build(
        settings: ValidatedPollSettings,
        factory: Arc<dyn ConnectionFactory>,
    ) -> Result<Self, RuntimeError> {
        let expected = settings.connection.dialect;
        if factory.dialect() != expected {
            return Err(RuntimeError::DialectMismatch {
                expected,
                found: factory.dialect(),
            });
        }

        let statement = settings.statement()?;
        let metrics = settings.metrics.then(Metrics::new);
        let events = settings.events.then(EventBus::new);

        let mut reader = IterativeReader::new(
            settings.name.clone(),
            statement,
            factory,
            ReaderConfig::from_settings(&settings),
        );
        let mut converter = ResultConverter::new(settings.name.clone(), settings.output)
            .with_transform(TemporalNormalizer::new(settings.timezone));

        if let Some(metrics) = &metrics {
            reader = reader.with_metrics(metrics.clone());
            converter = converter.with_metrics(metrics.clone());
        }
        if let Some(events) = &events {
            reader = reader.with_events(events.clone());
            converter = converter.with_events(events.clone());
        }

        Ok(PollStep {
            name: settings.name,
            reader,
            converter,
            counter: OrdinalCounter::new(),
            metrics,
            events,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Event bus to subscribe to before `run`, when events are enabled.
    pub fn events(&self) -> Option<&EventBus> {
        self.events.as_ref()
    }

    pub fn metrics(&self) -> Option<MetricsSnapshot> {
        self.metrics.as_ref().map(Metrics::snapshot)
    }

    /// The statement, while the step is not running.
    pub fn statement(&self) -> Option<&PollStatement> {
        self.reader.statement()
    }

    /// Polls and forwards converted output to `sink` until `cancel` fires.
    /// The reader is always stopped before returning. Ordinals continue
    /// across runs of the same step.
    pub async fn run(
        &mut self,
        sink: &mut dyn OutputSink,
        cancel: CancellationToken,
    ) -> Result<StepSummary, RuntimeError> {
        let started = Instant::now();
        self.reader.start().await?;

        let mut summary = StepSummary::default();
        let outcome = self.pump(sink, &cancel, &mut summary).await;
        self.reader.stop().await?;

        summary.elapsed = started.elapsed();
        summary.metrics = self.metrics();
        info!(
            step = %self.name,
            batches = summary.batches,
            records = summary.records,
            dropped = summary.dropped,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Poll step finished"
        );

        outcome.map(|_| summary)
    }

    async fn pump(
        &mut self,
        sink: &mut dyn OutputSink,
        cancel: &CancellationToken,
        summary: &mut StepSummary,
    ) -> Result<(), RuntimeError> {
        while self.reader.has_next() {
            let batch = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                batch = self.reader.next() => batch,
            };
            let Some(batch) = batch else {
                return Err(RuntimeError::ReaderTerminated(self.name.clone()));
            };

            let supplied = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                supplied = self.converter.supply(&self.counter, batch, None, &mut *sink) => supplied,
            }?;

            summary.batches += 1;
            summary.records += supplied.records as u64;
            summary.dropped += supplied.dropped as u64;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use connectors::memory::MemoryTable;
    use engine_config::{
        env::EnvManager,
        settings::{PollStepConfig, validator::validate},
    };
    use engine_processing::converter::Output;
    use model::{core::value::Value, records::row::RowData};
    use planner::query::dialect::Dialect;
    use tokio::sync::mpsc;
    use tracing_test::traced_test;

    fn settings(dialect: &str) -> ValidatedPollSettings {
        let json = config_json(dialect);
        let config = PollStepConfig::from_json_str(&json, &EnvManager::default()).unwrap();
        validate(config).unwrap()
    }

    fn config_json(dialect: &str) -> String {
        format!(
            r#"{{
                "name": "orders",
                "connection": {{ "dialect": "{dialect}", "host": "db", "database": "shop", "user": "app" }},
                "query": {{ "sql": "SELECT id, total FROM orders ORDER BY id", "tiebreaker": "id", "strict": true }},
                "poll_delay_ms": 5,
                "metrics": {{ "enabled": true }}
            }}"#
        )
    }

    #[test]
    fn test_dialect_mismatch_is_rejected() {
        let table = MemoryTable::new("id");
        let result = PollStep::build(settings("postgres"), Arc::new(table.factory(Dialect::MySql)));
        assert!(matches!(
            result,
            Err(RuntimeError::DialectMismatch {
                expected: Dialect::Postgres,
                found: Dialect::MySql
            })
        ));
    }

    #[traced_test]
    #[tokio::test]
    async fn test_run_until_cancelled() {
        let table = MemoryTable::new("id");
        table.insert((1..=3).map(|id| {
            RowData::from_pairs([("id", Value::Int(id)), ("total", Value::Int(id * 10))])
        }));

        let mut step =
            PollStep::build(settings("postgres"), Arc::new(table.factory(Dialect::Postgres)))
                .unwrap();
        let (mut tx, mut rx) = mpsc::channel::<Output>(8);
        let cancel = CancellationToken::new();

        let stopper = cancel.clone();
        let consumer = tokio::spawn(async move {
            let first = rx.recv().await;
            stopper.cancel();
            first
        });

        let summary = step.run(&mut tx, cancel).await.unwrap();
        let first = consumer.await.unwrap();

        let Some(Output::Batch(batch)) = first else {
            panic!("expected a batch");
        };
        assert_eq!(batch.records.len(), 3);
        assert_eq!(summary.batches, 1);
        assert_eq!(summary.records, 3);
        assert_eq!(summary.metrics.unwrap().rows, 3);
        assert!(step.statement().unwrap().cursor().is_none());
        assert!(logs_contain("Poll step finished"));
    }
}
