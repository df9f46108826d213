use chrono::{DateTime, Utc};
use std::fmt::Debug;

/// A trait for events that can be published on the EventBus.
pub trait Event: Send + Sync + Debug + 'static {
    /// Returns a unique identifier for this event type.
    fn event_type(&self) -> &'static str;
}

/// Emitted when a reader's background task has started.
#[derive(Debug, Clone)]
pub struct ReaderStarted {
    pub step: String,
    pub timestamp: DateTime<Utc>,
}

impl Event for ReaderStarted {
    fn event_type(&self) -> &'static str {
        "reader.started"
    }
}

/// Emitted when a reader has been stopped and its statement reset.
#[derive(Debug, Clone)]
pub struct ReaderStopped {
    pub step: String,
    pub timestamp: DateTime<Utc>,
}

impl Event for ReaderStopped {
    fn event_type(&self) -> &'static str {
        "reader.stopped"
    }
}

/// Emitted by the converter for every non-empty batch it supplies downstream.
#[derive(Debug, Clone)]
pub struct RowsPolled {
    pub step: String,
    pub row_count: usize,
    pub timestamp: DateTime<Utc>,
}

impl Event for RowsPolled {
    fn event_type(&self) -> &'static str {
        "rows.polled"
    }
}

/// Emitted for a poll that failed and will be retried.
#[derive(Debug, Clone)]
pub struct PollFailed {
    pub step: String,
    pub error: String,
    pub consecutive_failures: u32,
    pub timestamp: DateTime<Utc>,
}

impl Event for PollFailed {
    fn event_type(&self) -> &'static str {
        "poll.failed"
    }
}
