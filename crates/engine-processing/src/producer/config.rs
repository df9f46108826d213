use engine_config::settings::validated::ValidatedPollSettings;
use std::time::Duration;

/// Configuration for reader behavior.
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// How long to wait after a successful poll before the next one
    pub poll_delay: Duration,

    /// Batches buffered between the poll task and the consumer
    pub queue_capacity: usize,

    /// Upper bound for the delay after consecutive failed polls
    pub max_backoff: Duration,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            poll_delay: Duration::from_secs(1),
            queue_capacity: 16,
            max_backoff: Duration::from_secs(1),
        }
    }
}

impl ReaderConfig {
    pub fn from_settings(settings: &ValidatedPollSettings) -> Self {
        Self {
            poll_delay: settings.poll_delay,
            queue_capacity: settings.queue_capacity,
            max_backoff: settings.max_backoff,
        }
    }

    pub fn with_poll_delay(mut self, delay: Duration) -> Self {
        self.poll_delay = delay;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    pub fn with_max_backoff(mut self, max: Duration) -> Self {
        self.max_backoff = max;
        self
    }
}
