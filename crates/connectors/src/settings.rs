use planner::query::dialect::Dialect;
use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
    Disable,
    /// Try TLS first and fall back to plaintext if the handshake fails.
    #[default]
    Prefer,
    Require,
}

/// Everything needed to open one database session for a reader.
#[derive(Clone, PartialEq)]
pub struct ConnectionSettings {
    pub dialect: Dialect,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: Option<String>,
    pub tls: TlsMode,
    pub connect_timeout: Duration,
}

impl ConnectionSettings {
    /// `host:port/database`, safe to log.
    pub fn target(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.database)
    }
}

impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("dialect", &self.dialect)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("tls", &self.tls)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_masks_password() {
        let settings = ConnectionSettings {
            dialect: Dialect::Postgres,
            host: "db".into(),
            port: 5432,
            database: "shop".into(),
            user: "app".into(),
            password: Some("hunter2".into()),
            tls: TlsMode::Disable,
            connect_timeout: Duration::from_secs(5),
        };
        let rendered = format!("{settings:?}");
        assert!(!rendered.contains("hunter2"));
        assert_eq!(settings.target(), "db:5432/shop");
    }
}
