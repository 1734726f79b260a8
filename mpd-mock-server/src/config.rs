//! Configuration for the fake server.

use crate::error::ServerError;

/// Configuration for a [`crate::Server`] instance.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind, `host:port`. Tests pass port 0 and read the
    /// bound address back from the handle so parallel test processes
    /// never collide.
    /// Default: `127.0.0.1:6600`
    pub addr: String,

    /// Protocol version advertised in the `OK MPD <version>` greeting.
    /// Default: `0.23.5`
    pub version: String,

    /// Number of synthetic songs (`song0000.ogg` …) in the database.
    /// Default: 100
    pub database_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:6600".to_string(),
            version: "0.23.5".to_string(),
            database_size: 100,
        }
    }
}

impl ServerConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config suitable for tests: an ephemeral port on
    /// loopback.
    pub fn ephemeral() -> Self {
        Self {
            addr: "127.0.0.1:0".to_string(),
            ..Self::default()
        }
    }

    pub fn with_addr(mut self, addr: impl Into<String>) -> Self {
        self.addr = addr.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_database_size(mut self, size: usize) -> Self {
        self.database_size = size;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.addr.is_empty() {
            return Err(ServerError::Config("bind address must not be empty".into()));
        }
        if self.version.is_empty() {
            return Err(ServerError::Config("version must not be empty".into()));
        }
        if self.database_size == 0 {
            return Err(ServerError::Config(
                "database size must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}
