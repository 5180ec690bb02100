//! Hosting environment.

use std::fmt;
use std::path::{Path, PathBuf};

pub const DEVELOPMENT: &str = "Development";
pub const PRODUCTION: &str = "Production";

/// Environment variable naming the environment when no CLI flag is given.
pub const ENVIRONMENT_VAR: &str = "APP_ENVIRONMENT";

/// Name of the running environment and the directory content is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    name: String,
    content_root: PathBuf,
}

impl Environment {
    pub fn new(name: impl Into<String>, content_root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            content_root: content_root.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content_root(&self) -> &Path {
        &self.content_root
    }

    /// `path` resolved against the content root unless already absolute.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.content_root.join(path)
        }
    }

    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    pub fn is_development(&self) -> bool {
        self.is(DEVELOPMENT)
    }

    pub fn is_production(&self) -> bool {
        self.is(PRODUCTION)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
