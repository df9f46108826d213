//! Turns raw batches into ordered records with ordinals and forwards them to
//! an output sink, either as one message per batch or one per record.

use crate::{
    converter::transform::{Passthrough, ValueTransform},
    error::{ConversionError, ConverterError, SinkError},
};
use async_trait::async_trait;
use chrono::Utc;
use engine_config::settings::OutputMode;
use engine_core::{event_bus::EventBus, metrics::Metrics};
use model::{
    core::value::Value,
    events::RowsPolled,
    records::{batch::RawBatch, row::RowData},
};
use serde::{Serialize, Serializer, ser::SerializeMap};
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::mpsc;
use tracing::warn;

pub mod transform;

/// Source of record ordinals for one reader. Never reset.
#[derive(Debug, Default)]
pub struct OrdinalCounter {
    next: AtomicI64,
}

impl OrdinalCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current value and increments it.
    pub fn next_ordinal(&self) -> i64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }

    pub fn peek(&self) -> i64 {
        self.next.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConvertedRecord {
    pub ordinal: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_ordinal: Option<i64>,
    #[serde(serialize_with = "ordered_fields")]
    pub fields: Vec<(String, Value)>,
}

impl ConvertedRecord {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(column))
            .map(|(_, value)| value)
    }
}

fn ordered_fields<S: Serializer>(
    fields: &[(String, Value)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(fields.len()))?;
    for (name, value) in fields {
        map.serialize_entry(name, &value.to_json())?;
    }
    map.end()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchMetrics {
    pub row_count: usize,
    pub elapsed_ms: u64,
    pub dropped: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConvertedBatch {
    pub records: Vec<ConvertedRecord>,
    pub metrics: BatchMetrics,
}

/// A message forwarded downstream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Output {
    Batch(ConvertedBatch),
    Record(ConvertedRecord),
}

#[async_trait]
pub trait OutputSink: Send {
    async fn emit(&mut self, output: Output) -> Result<(), SinkError>;
}

#[async_trait]
impl OutputSink for mpsc::Sender<Output> {
    async fn emit(&mut self, output: Output) -> Result<(), SinkError> {
        self.send(output).await.map_err(|_| SinkError::Closed)
    }
}

/// Counts for one supplied batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SupplyOutcome {
    pub records: usize,
    pub dropped: usize,
}

pub struct ResultConverter {
    step: String,
    mode: OutputMode,
    transform: Box<dyn ValueTransform>,
    metrics: Option<Metrics>,
    events: Option<EventBus>,
}

impl ResultConverter {
    pub fn new(step: impl Into<String>, mode: OutputMode) -> Self {
        Self {
            step: step.into(),
            mode,
            transform: Box::new(Passthrough),
            metrics: None,
            events: None,
        }
    }

    pub fn with_transform(mut self, transform: impl ValueTransform + 'static) -> Self {
        self.transform = Box::new(transform);
        self
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Converts `batch` and forwards it. Rows that fail conversion are
    /// logged and dropped; ordinals are only taken for rows that convert, so
    /// emitted ordinals stay gap-free. `input` marks the record this batch was
    /// derived from.
    pub async fn supply(
        &self,
        counter: &OrdinalCounter,
        batch: RawBatch,
        input: Option<&ConvertedRecord>,
        output: &mut dyn OutputSink,
    ) -> Result<SupplyOutcome, ConverterError> {
        if batch.is_empty() {
            return Ok(SupplyOutcome::default());
        }

        let parent_ordinal = input.map(|record| record.ordinal);
        let mut records = Vec::with_capacity(batch.row_count);
        let mut dropped = 0;

        for (position, row) in batch.rows.iter().enumerate() {
            match self.convert_row(row) {
                Ok(fields) => records.push(ConvertedRecord {
                    ordinal: counter.next_ordinal(),
                    parent_ordinal,
                    fields,
                }),
                Err(error) => {
                    dropped += 1;
                    warn!(step = %self.step, position, %error, "Dropping row that failed conversion");
                }
            }
        }

        if let Some(metrics) = &self.metrics {
            metrics.increment_dropped(dropped as u64);
        }
        if let Some(events) = &self.events {
            events
                .publish(RowsPolled {
                    step: self.step.clone(),
                    row_count: batch.row_count,
                    timestamp: Utc::now(),
                })
                .await;
        }

        let outcome = SupplyOutcome {
            records: records.len(),
            dropped,
        };

        match self.mode {
            OutputMode::Batch => {
                let metrics = BatchMetrics {
                    row_count: batch.row_count,
                    elapsed_ms: batch.elapsed.as_millis() as u64,
                    dropped,
                };
                self.forward(output, Output::Batch(ConvertedBatch { records, metrics }))
                    .await?;
            }
            OutputMode::Flattened => {
                for record in records {
                    self.forward(output, Output::Record(record)).await?;
                }
            }
        }

        Ok(outcome)
    }

    fn convert_row(&self, row: &RowData) -> Result<Vec<(String, Value)>, ConversionError> {
        row.field_values
            .iter()
            .map(|field| {
                let value = field.value.clone().unwrap_or(Value::Null);
                let value = self.transform.apply(&field.name, value)?;
                Ok((field.name.clone(), value))
            })
            .collect()
    }

    async fn forward(&self, sink: &mut dyn OutputSink, output: Output) -> Result<(), ConverterError> {
        sink.emit(output).await.map_err(|source| ConverterError::Sink {
            step: self.step.clone(),
            source,
        })
    }
}
