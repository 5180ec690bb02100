//! Layered configuration loading.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

use crate::config::sources::{
    ConfigurationSource, EnvironmentVariablesSource, JsonFileSource, MemorySource, KEY_DELIMITER,
};

/// Error type for configuration loading and lookup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed configuration file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("configuration file {} must contain a JSON object at the top level", path.display())]
    InvalidRoot { path: PathBuf },

    #[error("required configuration key '{key}' is missing")]
    MissingKey { key: String },

    #[error("configuration key '{key}' has invalid value '{value}': {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

/// A single merged entry.
#[derive(Debug, Clone)]
struct Entry {
    key: String,
    value: String,
    source: String,
}

/// Builder collecting sources in precedence order.
#[derive(Debug, Default)]
pub struct ConfigurationBuilder {
    base_path: PathBuf,
    sources: Vec<Box<dyn ConfigurationSource>>,
}

impl ConfigurationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory relative file paths are resolved against.
    pub fn set_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = path.into();
        self
    }

    pub fn add_json_file(self, path: impl AsRef<Path>, optional: bool) -> Self {
        let path = self.base_path.join(path);
        self.add_source(JsonFileSource::new(path, optional))
    }

    pub fn add_environment_variables(self) -> Self {
        self.add_source(EnvironmentVariablesSource::new())
    }

    pub fn add_in_memory<I, K, V>(self, name: &str, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.add_source(MemorySource::new(name, entries))
    }

    pub fn add_source(mut self, source: impl ConfigurationSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Load every source in order. Later sources override earlier ones.
    pub fn build(self) -> Result<Configuration, ConfigError> {
        let mut entries: BTreeMap<String, Entry> = BTreeMap::new();
        let mut source_names = Vec::with_capacity(self.sources.len());

        for source in &self.sources {
            let name = source.name();
            let loaded = source.load()?;
            tracing::debug!(source = %name, keys = loaded.len(), "Configuration source loaded");

            for (key, value) in loaded {
                entries.insert(
                    normalize(&key),
                    Entry {
                        key,
                        value,
                        source: name.clone(),
                    },
                );
            }
            source_names.push(name);
        }

        Ok(Configuration {
            entries,
            sources: source_names,
        })
    }
}

fn normalize(key: &str) -> String {
    key.to_ascii_lowercase()
}

/// Merged, immutable configuration set.
#[derive(Debug, Clone, Default)]
pub struct Configuration {
    entries: BTreeMap<String, Entry>,
    sources: Vec<String>,
}

impl Configuration {
    /// Look up a value by colon-separated key, ignoring case.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(&normalize(key)).map(|e| e.value.as_str())
    }

    /// Like [`get`](Self::get) but an absent key is an error.
    pub fn require(&self, key: &str) -> Result<&str, ConfigError> {
        self.get(key).ok_or_else(|| ConfigError::MissingKey {
            key: key.to_string(),
        })
    }

    /// `ConnectionStrings:<name>`, empty values count as missing.
    pub fn connection_string(&self, name: &str) -> Option<&str> {
        self.get(&format!("ConnectionStrings{KEY_DELIMITER}{name}"))
            .filter(|v| !v.trim().is_empty())
    }

    /// Parse a value with `FromStr`. Absent keys yield `Ok(None)`.
    pub fn get_parsed<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    /// Boolean lookup accepting `true`/`false` in any case.
    pub fn get_bool(&self, key: &str) -> Result<Option<bool>, ConfigError> {
        match self.get(key).map(str::trim) {
            None => Ok(None),
            Some(v) if v.eq_ignore_ascii_case("true") => Ok(Some(true)),
            Some(v) if v.eq_ignore_ascii_case("false") => Ok(Some(false)),
            Some(v) => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                value: v.to_string(),
                reason: "expected true or false".to_string(),
            }),
        }
    }

    /// Immediate children of a section as `(child key, value)`, keeping the
    /// casing of the source that supplied them. Only leaf children are returned.
    pub fn section(&self, name: &str) -> Vec<(&str, &str)> {
        let prefix = format!("{}{KEY_DELIMITER}", normalize(name));
        self.entries
            .range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&prefix))
            .filter_map(|(k, e)| {
                let rest = &k[prefix.len()..];
                if rest.contains(KEY_DELIMITER) {
                    return None;
                }
                Some((&e.key[e.key.len() - rest.len()..], e.value.as_str()))
            })
            .collect()
    }

    /// True when any key lives under `name`.
    pub fn has_section(&self, name: &str) -> bool {
        let prefix = format!("{}{KEY_DELIMITER}", normalize(name));
        self.entries
            .range(prefix.clone()..)
            .next()
            .is_some_and(|(k, _)| k.starts_with(&prefix))
    }

    /// Name of the source that supplied the winning value for `key`.
    pub fn provenance(&self, key: &str) -> Option<&str> {
        self.entries.get(&normalize(key)).map(|e| e.source.as_str())
    }

    /// Source names in precedence order (lowest first).
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_later_sources_override_earlier() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "appsettings.json",
            r#"{ "ConnectionStrings": { "Default": "sqlite://base.db" }, "Host": { "BindAddress": "127.0.0.1:5000" } }"#,
        );
        write(
            dir.path(),
            "appsettings.Development.json",
            r#"{ "ConnectionStrings": { "Default": "sqlite://dev.db" } }"#,
        );

        let config = ConfigurationBuilder::new()
            .set_base_path(dir.path())
            .add_json_file("appsettings.json", true)
            .add_json_file("appsettings.Development.json", true)
            .add_source(EnvironmentVariablesSource::from_vars([(
                "Host__BindAddress",
                "0.0.0.0:8080",
            )]))
            .build()
            .unwrap();

        assert_eq!(config.connection_string("Default"), Some("sqlite://dev.db"));
        assert_eq!(config.get("Host:BindAddress"), Some("0.0.0.0:8080"));
        assert_eq!(config.provenance("host:bindaddress"), Some("env"));
        assert_eq!(config.sources().len(), 3);
    }

    #[test]
    fn test_keys_are_case_insensitive() {
        let config = ConfigurationBuilder::new()
            .add_in_memory("a", [("ConnectionStrings:Default", "one")])
            .add_in_memory("b", [("CONNECTIONSTRINGS:DEFAULT", "two")])
            .build()
            .unwrap();

        assert_eq!(config.len(), 1);
        assert_eq!(config.get("connectionstrings:default"), Some("two"));
        assert_eq!(config.connection_string("Default"), Some("two"));
    }

    #[test]
    fn test_empty_connection_string_is_missing() {
        let config = ConfigurationBuilder::new()
            .add_in_memory("t", [("ConnectionStrings:Default", "  ")])
            .build()
            .unwrap();
        assert_eq!(config.connection_string("Default"), None);
        assert!(config.require("Missing:Key").is_err());
    }

    #[test]
    fn test_typed_lookups() {
        let config = ConfigurationBuilder::new()
            .add_in_memory(
                "t",
                [("Metrics:Enabled", "True"), ("Host:Port", "5000"), ("Host:Bad", "abc")],
            )
            .build()
            .unwrap();

        assert_eq!(config.get_bool("Metrics:Enabled").unwrap(), Some(true));
        assert_eq!(config.get_parsed::<u16>("Host:Port").unwrap(), Some(5000));
        assert_eq!(config.get_parsed::<u16>("Host:Missing").unwrap(), None);

        let err = config.get_parsed::<u16>("Host:Bad").unwrap_err();
        assert!(err.to_string().contains("Host:Bad"));
    }

    #[test]
    fn test_section_children() {
        let config = ConfigurationBuilder::new()
            .add_in_memory(
                "t",
                [
                    ("ConnectionStrings:Default", "a"),
                    ("ConnectionStrings:Reporting", "b"),
                    ("ConnectionStrings:Nested:Deep", "c"),
                    ("ConnectionStringsX", "d"),
                ],
            )
            .build()
            .unwrap();

        let mut children = config.section("connectionstrings");
        children.sort();
        assert_eq!(children, vec![("Default", "a"), ("Reporting", "b")]);
        assert!(config.has_section("ConnectionStrings"));
        assert!(!config.has_section("Logging"));
    }

    #[test]
    fn test_malformed_file_fails_build() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "appsettings.json", "{ not json");
        let result = ConfigurationBuilder::new()
            .set_base_path(dir.path())
            .add_json_file("appsettings.json", true)
            .build();
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }
}
