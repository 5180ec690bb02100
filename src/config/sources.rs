//! Configuration sources.
//!
//! Every source flattens what it reads into `(key, value)` pairs where the key
//! is a colon-separated path. Merging and precedence live in the loader.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::config::loader::ConfigError;

/// Separator between path segments in configuration keys.
pub const KEY_DELIMITER: &str = ":";

/// Separator used in environment variable names in place of `:`.
pub const ENV_DELIMITER: &str = "__";

/// A provider of flat configuration entries.
pub trait ConfigurationSource: Send + Sync + std::fmt::Debug {
    /// Human readable name used in diagnostics.
    fn name(&self) -> String;

    /// Read the source and return its entries in source order.
    fn load(&self) -> Result<Vec<(String, String)>, ConfigError>;
}

/// A JSON file such as `appsettings.json`.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
    optional: bool,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>, optional: bool) -> Self {
        Self {
            path: path.into(),
            optional,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigurationSource for JsonFileSource {
    fn name(&self) -> String {
        format!("json:{}", self.path.display())
    }

    fn load(&self) -> Result<Vec<(String, String)>, ConfigError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && self.optional => {
                tracing::debug!(path = %self.path.display(), "Optional configuration file not found");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(ConfigError::Io {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };

        // An empty file is treated like an empty object.
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let root: Value = serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
            path: self.path.clone(),
            source: e,
        })?;

        if !root.is_object() {
            return Err(ConfigError::InvalidRoot {
                path: self.path.clone(),
            });
        }

        let mut entries = Vec::new();
        flatten(None, &root, &mut entries);
        Ok(entries)
    }
}

/// Flatten a JSON document into colon-separated keys.
///
/// Arrays are addressed by index (`Urls:0`), `null` becomes an empty string.
pub(crate) fn flatten(prefix: Option<&str>, value: &Value, out: &mut Vec<(String, String)>) {
    let join = |segment: &str| match prefix {
        Some(p) => format!("{p}{KEY_DELIMITER}{segment}"),
        None => segment.to_string(),
    };

    match value {
        Value::Object(map) => {
            for (k, v) in map {
                flatten(Some(&join(k.as_str())), v, out);
            }
        }
        Value::Array(items) => {
            for (i, v) in items.iter().enumerate() {
                flatten(Some(&join(i.to_string().as_str())), v, out);
            }
        }
        Value::String(s) => push_scalar(prefix, s.clone(), out),
        Value::Bool(b) => push_scalar(prefix, b.to_string(), out),
        Value::Number(n) => push_scalar(prefix, n.to_string(), out),
        Value::Null => push_scalar(prefix, String::new(), out),
    }
}

fn push_scalar(key: Option<&str>, value: String, out: &mut Vec<(String, String)>) {
    if let Some(key) = key {
        out.push((key.to_string(), value));
    }
}

/// Process environment variables, `SECTION__KEY` mapping to `Section:Key`.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentVariablesSource {
    prefix: Option<String>,
    snapshot: Option<Vec<(String, String)>>,
}

impl EnvironmentVariablesSource {
    /// Read every variable of the current process.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only read variables starting with `prefix`; the prefix is stripped.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Use a fixed set of variables instead of the process environment.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            prefix: None,
            snapshot: Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect()),
        }
    }
}

impl ConfigurationSource for EnvironmentVariablesSource {
    fn name(&self) -> String {
        match &self.prefix {
            Some(p) => format!("env:{p}*"),
            None => "env".to_string(),
        }
    }

    fn load(&self) -> Result<Vec<(String, String)>, ConfigError> {
        let vars: Vec<(String, String)> = match &self.snapshot {
            Some(vars) => vars.clone(),
            None => std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                .collect(),
        };

        let entries = vars
            .into_iter()
            .filter_map(|(key, value)| {
                let key = match &self.prefix {
                    Some(p) => key.strip_prefix(p.as_str())?.to_string(),
                    None => key,
                };
                if key.is_empty() {
                    return None;
                }
                Some((key.replace(ENV_DELIMITER, KEY_DELIMITER), value))
            })
            .collect();

        Ok(entries)
    }
}

/// Fixed in-memory entries, used for command-line overrides and tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    name: String,
    entries: Vec<(String, String)>,
}

impl MemorySource {
    pub fn new<I, K, V>(name: impl Into<String>, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            name: name.into(),
            entries: entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl ConfigurationSource for MemorySource {
    fn name(&self) -> String {
        format!("memory:{}", self.name)
    }

    fn load(&self) -> Result<Vec<(String, String)>, ConfigError> {
        Ok(self.entries.clone())
    }
}
