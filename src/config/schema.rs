//! Typed settings read from the merged configuration.
//!
//! Every section has defaults so a configuration set only needs the
//! connection string. Values are looked up through [`Configuration`] so key
//! casing and source precedence behave the same as raw lookups.

use std::net::SocketAddr;
use std::path::PathBuf;

use serde::Serialize;

use crate::config::loader::{ConfigError, Configuration};

/// Name of the connection string the data-access context is bound to.
pub const DEFAULT_CONNECTION: &str = "Default";

/// Root settings for the host.
#[derive(Debug, Clone, Serialize, Default)]
pub struct AppSettings {
    pub host: HostSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub metrics: MetricsSettings,
}

impl AppSettings {
    /// Read every section, failing on values that do not parse.
    pub fn from_configuration(config: &Configuration) -> Result<Self, ConfigError> {
        Ok(Self {
            host: HostSettings::from_configuration(config)?,
            logging: LoggingSettings::from_configuration(config),
            database: DatabaseSettings::from_configuration(config)?,
            metrics: MetricsSettings::from_configuration(config)?,
        })
    }
}

/// `Host` section.
#[derive(Debug, Clone, Serialize)]
pub struct HostSettings {
    /// Listen address (e.g., "127.0.0.1:5000").
    pub bind_address: SocketAddr,

    /// Directory served by the static file stage, relative to the content root.
    pub web_root: PathBuf,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 5000)),
            web_root: PathBuf::from("wwwroot"),
        }
    }
}

impl HostSettings {
    fn from_configuration(config: &Configuration) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            bind_address: config
                .get_parsed("Host:BindAddress")?
                .unwrap_or(defaults.bind_address),
            web_root: config
                .get("Host:WebRoot")
                .map(PathBuf::from)
                .unwrap_or(defaults.web_root),
        })
    }
}

/// `Logging` section.
#[derive(Debug, Clone, Serialize)]
pub struct LoggingSettings {
    /// Logging configuration file, relative to the content root.
    pub config_file: PathBuf,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            config_file: PathBuf::from("logging.toml"),
        }
    }
}

impl LoggingSettings {
    fn from_configuration(config: &Configuration) -> Self {
        Self {
            config_file: config
                .get("Logging:ConfigFile")
                .map(PathBuf::from)
                .unwrap_or_else(|| Self::default().config_file),
        }
    }
}

/// `Database` section.
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseSettings {
    /// Create the schema when the host starts.
    pub ensure_created: bool,

    /// Upper bound for pooled connections.
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            ensure_created: true,
            max_connections: 5,
        }
    }
}

impl DatabaseSettings {
    fn from_configuration(config: &Configuration) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let max_connections = config
            .get_parsed::<u32>("Database:MaxConnections")?
            .unwrap_or(defaults.max_connections);
        if max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                key: "Database:MaxConnections".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(Self {
            ensure_created: config
                .get_bool("Database:EnsureCreated")?
                .unwrap_or(defaults.ensure_created),
            max_connections,
        })
    }
}

/// `Metrics` section.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSettings {
    pub enabled: bool,

    /// Prometheus scrape endpoint bind address.
    pub address: SocketAddr,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            address: SocketAddr::from(([127, 0, 0, 1], 9090)),
        }
    }
}

impl MetricsSettings {
    fn from_configuration(config: &Configuration) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            enabled: config.get_bool("Metrics:Enabled")?.unwrap_or(defaults.enabled),
            address: config
                .get_parsed("Metrics:Address")?
                .unwrap_or(defaults.address),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigurationBuilder;

    #[test]
    fn test_defaults_when_sections_absent() {
        let config = ConfigurationBuilder::new().build().unwrap();
        let settings = AppSettings::from_configuration(&config).unwrap();

        assert_eq!(settings.host.bind_address.to_string(), "127.0.0.1:5000");
        assert_eq!(settings.host.web_root, PathBuf::from("wwwroot"));
        assert_eq!(settings.logging.config_file, PathBuf::from("logging.toml"));
        assert!(settings.database.ensure_created);
        assert!(!settings.metrics.enabled);
    }

    #[test]
    fn test_values_from_any_casing() {
        let config = ConfigurationBuilder::new()
            .add_in_memory(
                "t",
                [
                    ("HOST:BINDADDRESS", "0.0.0.0:8080"),
                    ("database:ensurecreated", "false"),
                    ("Metrics:Enabled", "TRUE"),
                ],
            )
            .build()
            .unwrap();
        let settings = AppSettings::from_configuration(&config).unwrap();

        assert_eq!(settings.host.bind_address.port(), 8080);
        assert!(!settings.database.ensure_created);
        assert!(settings.metrics.enabled);
    }

    #[test]
    fn test_invalid_bind_address_is_error() {
        let config = ConfigurationBuilder::new()
            .add_in_memory("t", [("Host:BindAddress", "not-an-address")])
            .build()
            .unwrap();
        let err = AppSettings::from_configuration(&config).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "Host:BindAddress"));
    }

    #[test]
    fn test_zero_pool_size_rejected() {
        let config = ConfigurationBuilder::new()
            .add_in_memory("t", [("Database:MaxConnections", "0")])
            .build()
            .unwrap();
        assert!(AppSettings::from_configuration(&config).is_err());
    }
}
