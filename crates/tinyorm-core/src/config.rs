//! Engine configuration.

use std::collections::HashMap;

/// Connection settings handed to a driver when the engine opens connections.
///
/// Which fields matter depends on the backend: a server-based backend reads
/// host, port and credentials, while an embedded one only needs `database`
/// (the file path). Unknown backend-specific settings go in `options`.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Login user name
    pub user: String,
    /// Login password
    pub password: String,
    /// Database name, or file path for embedded backends
    pub database: String,
    /// Server host
    pub host: String,
    /// Server port, 0 for the backend default
    pub port: u16,
    /// Backend-specific extra options
    pub options: HashMap<String, String>,
}

impl EngineConfig {
    /// Create a config for the named database.
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            ..Default::default()
        }
    }

    /// Set the login user.
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Set the login password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Set the server host.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the server port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Add a backend-specific option.
    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_settings() {
        let config = EngineConfig::new("app.db")
            .user("www-data")
            .password("secret")
            .host("localhost")
            .port(3306)
            .option("busy_timeout_ms", "1000");

        assert_eq!(config.database, "app.db");
        assert_eq!(config.user, "www-data");
        assert_eq!(config.port, 3306);
        assert_eq!(
            config.options.get("busy_timeout_ms").map(String::as_str),
            Some("1000")
        );
    }
}
