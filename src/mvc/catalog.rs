//! Discovered handlers, keyed by group name.

use std::collections::HashMap;
use std::sync::Arc;

use crate::mvc::handler::Handler;
use crate::mvc::parts::{DiscoveredHandler, HandlerDescriptor};
use crate::services::{Resolver, ServiceError};

#[derive(Debug, Clone)]
pub struct CatalogEntry {
    group: String,
    part: String,
    descriptor: HandlerDescriptor,
}

impl CatalogEntry {
    /// Name the handler is routed by.
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Application part the handler came from.
    pub fn part(&self) -> &str {
        &self.part
    }

    pub fn descriptor(&self) -> &HandlerDescriptor {
        &self.descriptor
    }
}

/// Immutable lookup table from group name to handler activation.
#[derive(Debug, Default)]
pub struct HandlerCatalog {
    entries: Vec<CatalogEntry>,
    index: HashMap<String, usize>,
    as_services: bool,
}

impl HandlerCatalog {
    pub(crate) fn new(discovered: Vec<DiscoveredHandler>, as_services: bool) -> Self {
        let entries: Vec<CatalogEntry> = discovered
            .into_iter()
            .map(|h| CatalogEntry {
                group: h.group,
                part: h.part,
                descriptor: h.descriptor,
            })
            .collect();
        let index = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.group.to_ascii_lowercase(), i))
            .collect();
        Self {
            entries,
            index,
            as_services,
        }
    }

    /// Case-insensitive lookup.
    pub fn get(&self, group: &str) -> Option<&CatalogEntry> {
        self.index
            .get(&group.to_ascii_lowercase())
            .map(|&i| &self.entries[i])
    }

    pub fn contains(&self, group: &str) -> bool {
        self.get(group).is_some()
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when handlers are resolved through the service registry.
    pub fn handlers_as_services(&self) -> bool {
        self.as_services
    }

    /// Create the handler for one invocation.
    pub fn activate(
        &self,
        entry: &CatalogEntry,
        resolver: &Resolver<'_>,
    ) -> Result<Arc<dyn Handler>, ServiceError> {
        if self.as_services {
            (entry.descriptor.resolve)(resolver)
        } else {
            (entry.descriptor.construct)(resolver)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mvc::parts::tests::{mixed_part, OrdersController};
    use crate::mvc::parts::{AppServiceFeatureProvider, ApplicationPartManager, ControllerFeatureProvider};
    use crate::services::ServiceCollection;

    fn catalog(as_services: bool) -> HandlerCatalog {
        let manager = ApplicationPartManager {
            parts: vec![mixed_part()],
            feature_providers: vec![
                Box::new(ControllerFeatureProvider),
                Box::new(AppServiceFeatureProvider),
            ],
        };
        HandlerCatalog::new(manager.populate().unwrap(), as_services)
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let catalog = catalog(false);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("orders").unwrap().group(), "Orders");
        assert!(catalog.contains("REPORTAPPSERVICE"));
        assert!(!catalog.contains("MapperHelper"));
        assert_eq!(catalog.get("Orders").unwrap().part(), "tests");
    }

    #[test]
    fn test_activate_directly() {
        let catalog = catalog(false);
        let provider = Arc::new(ServiceCollection::new().build().unwrap());
        let scope = provider.create_scope();
        let entry = catalog.get("Orders").unwrap();
        assert!(catalog.activate(entry, &scope.resolver()).is_ok());
    }

    #[test]
    fn test_activate_as_service_requires_registration() {
        let catalog = catalog(true);
        let entry = catalog.get("Orders").unwrap();

        let empty = Arc::new(ServiceCollection::new().build().unwrap());
        let err = catalog.activate(entry, &empty.create_scope().resolver()).err().unwrap();
        assert!(matches!(err, ServiceError::NotRegistered { .. }));

        let mut services = ServiceCollection::new();
        (entry.descriptor().register)(&mut services);
        assert!(services.contains::<OrdersController>());
        let provider = Arc::new(services.build().unwrap());
        assert!(catalog.activate(entry, &provider.create_scope().resolver()).is_ok());
    }
}
