use crate::{
    settings::ConnectionSettings,
    sql::{
        base::connection::{ConnectionFactory, PollConnection},
        mysql::connection::MySqlConnection,
        postgres::connection::PgConnection,
    },
};
use planner::query::dialect::Dialect;

/// Builds driver connections for the configured dialect.
#[derive(Debug, Clone)]
pub struct SqlConnectionFactory {
    settings: ConnectionSettings,
}

impl SqlConnectionFactory {
    pub fn new(settings: ConnectionSettings) -> Self {
        SqlConnectionFactory { settings }
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }
}

impl ConnectionFactory for SqlConnectionFactory {
    fn create(&self) -> Box<dyn PollConnection> {
        match self.settings.dialect {
            Dialect::Postgres => Box::new(PgConnection::new(self.settings.clone())),
            Dialect::MySql | Dialect::MariaDb => {
                Box::new(MySqlConnection::new(self.settings.clone()))
            }
        }
    }

    fn dialect(&self) -> Dialect {
        self.settings.dialect
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::TlsMode;
    use std::time::Duration;

    fn settings(dialect: Dialect) -> ConnectionSettings {
        ConnectionSettings {
            dialect,
            host: "localhost".into(),
            port: dialect.default_port(),
            database: "db".into(),
            user: "u".into(),
            password: None,
            tls: TlsMode::Disable,
            connect_timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn test_create_matches_dialect() {
        for dialect in [Dialect::Postgres, Dialect::MySql, Dialect::MariaDb] {
            let conn = SqlConnectionFactory::new(settings(dialect)).create();
            assert_eq!(conn.dialect(), dialect);
            assert!(!conn.is_connected());
        }
    }
}
