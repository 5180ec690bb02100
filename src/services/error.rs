//! Service resolution errors.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    #[error("no service registered for {name}")]
    NotRegistered { name: &'static str },

    #[error("dependency cycle detected: {path}")]
    Cycle { path: String },

    #[error("scoped service {name} cannot be resolved outside a request scope (resolution path: {path})")]
    ScopedFromRoot { name: &'static str, path: String },

    #[error("failed to construct {name}: {reason}")]
    Construction { name: &'static str, reason: String },
}

impl ServiceError {
    /// Wrap a factory failure for service `T`.
    pub fn construction<T: ?Sized>(reason: impl std::fmt::Display) -> Self {
        ServiceError::Construction {
            name: std::any::type_name::<T>(),
            reason: reason.to_string(),
        }
    }
}
