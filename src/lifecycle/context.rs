//! Explicit application context.
//!
//! Created by `use_application_context` during Phase 2, started by the host
//! before it accepts traffic and shut down after serving stops.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::config::DatabaseSettings;
use crate::data::{DataError, DbContextFactory};
use crate::services::ServiceProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ContextState {
    Created = 0,
    Initialized = 1,
    Started = 2,
    ShutDown = 3,
}

impl ContextState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ContextState::Created,
            1 => ContextState::Initialized,
            2 => ContextState::Started,
            _ => ContextState::ShutDown,
        }
    }
}

#[derive(Debug)]
pub struct ApplicationContext {
    provider: Arc<ServiceProvider>,
    database: DatabaseSettings,
    state: AtomicU8,
}

impl ApplicationContext {
    pub fn new(provider: Arc<ServiceProvider>, database: DatabaseSettings) -> Self {
        Self {
            provider,
            database,
            state: AtomicU8::new(ContextState::Created as u8),
        }
    }

    pub fn state(&self) -> ContextState {
        ContextState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_initialized(&self) -> bool {
        self.state() != ContextState::Created
    }

    pub fn provider(&self) -> &Arc<ServiceProvider> {
        &self.provider
    }

    /// Mark the context ready for handler registration. Idempotent.
    pub fn initialize(&self) {
        if self
            .state
            .compare_exchange(
                ContextState::Created as u8,
                ContextState::Initialized as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
        {
            tracing::debug!(services = self.provider.descriptors().len(), "Application context initialized");
        }
    }

    /// Prepare runtime resources before serving.
    pub async fn start(&self) -> Result<(), DataError> {
        if self.database.ensure_created {
            if let Ok(Some(factory)) = self.provider.get_optional::<DbContextFactory>() {
                factory.ensure_created().await?;
            }
        }
        self.state.store(ContextState::Started as u8, Ordering::Release);
        Ok(())
    }

    /// Release runtime resources. Safe to call more than once.
    pub async fn shutdown(&self) {
        let previous = self.state.swap(ContextState::ShutDown as u8, Ordering::AcqRel);
        if ContextState::from_u8(previous) == ContextState::ShutDown {
            return;
        }
        if let Ok(Some(factory)) = self.provider.get_optional::<DbContextFactory>() {
            factory.close().await;
        }
        tracing::info!("Application context shut down");
    }
}
