//! Structured logging.
//!
//! # Responsibilities
//! - Read the logging config file (TOML)
//! - Build the `tracing` subscriber it describes
//! - Hold the non-blocking writer guard for the life of the process
//!
//! # Design Decisions
//! - Filter defaults to `demo_host=info,tower_http=info`
//! - `RUST_LOG` overrides the configured filter
//! - Installation is `try_init`: a second facility in the same process
//!   (tests) leaves the first subscriber in place

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "demo_host=info,tower_http=info";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to read logging config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed logging config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid log filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("failed to open log file {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

/// Contents of the logging config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub filter: String,
    pub format: LogFormat,
    /// Write to this file instead of stdout. Relative to the config file.
    pub file: Option<PathBuf>,
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_string(),
            format: LogFormat::default(),
            file: None,
            ansi: true,
        }
    }
}

impl LoggingConfig {
    pub fn parse(path: &Path, raw: &str) -> Result<Self, LoggingError> {
        let config: Self = toml::from_str(raw).map_err(|source| LoggingError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        EnvFilter::try_new(&config.filter).map_err(|e| LoggingError::InvalidFilter {
            filter: config.filter.clone(),
            reason: e.to_string(),
        })?;
        Ok(config)
    }
}

/// The process logging facility, registered as a singleton.
#[derive(Debug)]
pub struct LoggingFacility {
    config: LoggingConfig,
    source: Option<PathBuf>,
    guard: Mutex<Option<WorkerGuard>>,
}

impl LoggingFacility {
    /// Load from `path`. A missing file yields the defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LoggingError> {
        let path = path.as_ref();
        let (config, source) = match fs::read_to_string(path) {
            Ok(raw) => {
                let mut config = LoggingConfig::parse(path, &raw)?;
                if let Some(dir) = path.parent() {
                    config.file = config.file.take().map(|file| dir.join(file));
                }
                (config, Some(path.to_path_buf()))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => (LoggingConfig::default(), None),
            Err(source) => {
                return Err(LoggingError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Ok(Self::new(config, source))
    }

    pub fn new(config: LoggingConfig, source: Option<PathBuf>) -> Self {
        Self {
            config,
            source,
            guard: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &LoggingConfig {
        &self.config
    }

    /// The file the config came from, if one existed.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Filter in effect: `RUST_LOG` if set, else the configured one.
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.config.filter))
    }

    /// Install as the process subscriber.
    ///
    /// Returns `false` if another subscriber was already installed.
    pub fn install(&self) -> Result<bool, LoggingError> {
        let (writer, ansi) = match &self.config.file {
            Some(path) => {
                let file = fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|source| LoggingError::File {
                        path: path.clone(),
                        source,
                    })?;
                let (non_blocking, guard) = tracing_appender::non_blocking(file);
                if let Ok(mut slot) = self.guard.lock() {
                    *slot = Some(guard);
                }
                (BoxMakeWriter::new(non_blocking), false)
            }
            None => (BoxMakeWriter::new(io::stdout), self.config.ansi),
        };

        let builder = tracing_subscriber::fmt()
            .with_env_filter(self.env_filter())
            .with_target(true)
            .with_ansi(ansi)
            .with_writer(writer);

        let installed = match self.config.format {
            LogFormat::Pretty => builder.pretty().finish().try_init().is_ok(),
            LogFormat::Compact => builder.compact().finish().try_init().is_ok(),
            LogFormat::Json => builder.json().finish().try_init().is_ok(),
        };

        if installed {
            tracing::info!(
                format = ?self.config.format,
                file = ?self.config.file,
                source = ?self.source,
                "Logging initialized"
            );
        }
        Ok(installed)
    }
}
