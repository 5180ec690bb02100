//! MVC registration on a [`ServiceCollection`].

use std::sync::Arc;

use thiserror::Error;

use crate::mvc::catalog::HandlerCatalog;
use crate::mvc::parts::{ApplicationPart, ApplicationPartManager, ControllerFeatureProvider, FeatureProvider};
use crate::services::ServiceCollection;

#[derive(Debug, Clone, Error)]
pub enum MvcError {
    #[error("handler name '{group}' is claimed by both {first} and {second}")]
    DuplicateHandler {
        group: String,
        first: String,
        second: String,
    },
}

/// Configures handler discovery. Returned by [`ServiceCollection::add_mvc`].
///
/// Nothing is registered until [`build`](Self::build) runs the feature
/// providers and adds the resulting [`HandlerCatalog`] as a singleton.
pub struct MvcBuilder<'a> {
    services: &'a mut ServiceCollection,
    manager: ApplicationPartManager,
    as_services: bool,
}

impl ServiceCollection {
    /// Start MVC registration with the default controllers part.
    pub fn add_mvc(&mut self) -> MvcBuilder<'_> {
        MvcBuilder {
            services: self,
            manager: ApplicationPartManager {
                parts: vec![crate::controllers::part()],
                feature_providers: vec![Box::new(ControllerFeatureProvider)],
            },
            as_services: false,
        }
    }
}

impl<'a> MvcBuilder<'a> {
    pub fn add_application_part(mut self, part: ApplicationPart) -> Self {
        self.manager.parts.push(part);
        self
    }

    pub fn add_feature_provider(mut self, provider: impl FeatureProvider + 'static) -> Self {
        self.manager.feature_providers.push(Box::new(provider));
        self
    }

    /// Register every discovered handler as a transient service and resolve
    /// handlers through the registry.
    pub fn add_controllers_as_services(mut self) -> Self {
        self.as_services = true;
        self
    }

    pub fn part_manager(&self) -> &ApplicationPartManager {
        &self.manager
    }

    pub fn build(mut self) -> Result<Arc<HandlerCatalog>, MvcError> {
        let discovered = self.manager.populate()?;

        if self.as_services {
            for handler in &discovered {
                (handler.descriptor.register)(&mut *self.services);
            }
        }

        for handler in &discovered {
            tracing::debug!(
                handler = %handler.group,
                part = %handler.part,
                "Handler discovered"
            );
        }

        let catalog = Arc::new(HandlerCatalog::new(discovered, self.as_services));
        tracing::info!(
            handlers = catalog.len(),
            as_services = self.as_services,
            "MVC registered"
        );
        self.services.add_singleton(catalog.clone());
        Ok(catalog)
    }
}
