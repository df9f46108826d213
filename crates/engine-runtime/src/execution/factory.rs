use connectors::{factory::SqlConnectionFactory, sql::base::connection::ConnectionFactory};
use engine_config::settings::validated::ValidatedPollSettings;
use std::sync::Arc;

/// Connection factory for the database the step is configured against.
pub fn connection_factory(settings: &ValidatedPollSettings) -> Arc<dyn ConnectionFactory> {
    Arc::new(SqlConnectionFactory::new(settings.connection.clone()))
}
