pub mod backoff;
pub mod event_bus;
pub mod metrics;
