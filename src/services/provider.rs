//! Service resolution.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::OnceCell;

use crate::services::collection::{Instance, Lifetime, ServiceDescriptor};
use crate::services::error::ServiceError;

/// Immutable registry produced by [`ServiceCollection::build`](crate::services::ServiceCollection::build).
#[derive(Debug)]
pub struct ServiceProvider {
    descriptors: Vec<ServiceDescriptor>,
    index: HashMap<TypeId, usize>,
    singletons: HashMap<TypeId, OnceCell<Instance>>,
}

impl ServiceProvider {
    pub(crate) fn new(descriptors: Vec<ServiceDescriptor>) -> Result<Self, ServiceError> {
        let index = descriptors
            .iter()
            .enumerate()
            .map(|(i, d)| (d.id, i))
            .collect();
        let singletons = descriptors
            .iter()
            .filter(|d| d.lifetime() == Lifetime::Singleton)
            .map(|d| (d.id, OnceCell::new()))
            .collect();

        let provider = Self {
            descriptors,
            index,
            singletons,
        };

        // Construct singletons now so construction failures surface at startup.
        for descriptor in provider
            .descriptors
            .iter()
            .filter(|d| d.lifetime() == Lifetime::Singleton)
        {
            Resolver::root(&provider).resolve(descriptor.id, descriptor.name())?;
        }

        tracing::debug!(services = provider.descriptors.len(), "Service provider built");
        Ok(provider)
    }

    /// Resolve a singleton or transient service.
    pub fn get<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, ServiceError> {
        Resolver::root(self).get::<T>()
    }

    /// Resolve a service that may not be registered.
    pub fn get_optional<T: ?Sized + Send + Sync + 'static>(
        &self,
    ) -> Result<Option<Arc<T>>, ServiceError> {
        if !self.contains::<T>() {
            return Ok(None);
        }
        self.get::<T>().map(Some)
    }

    pub fn contains<T: ?Sized + 'static>(&self) -> bool {
        self.index.contains_key(&TypeId::of::<T>())
    }

    /// Registrations in registration order.
    pub fn descriptors(&self) -> &[ServiceDescriptor] {
        &self.descriptors
    }

    /// Open a scope for one unit of work (one request).
    pub fn create_scope(self: &Arc<Self>) -> RequestScope {
        RequestScope {
            provider: self.clone(),
            instances: DashMap::new(),
        }
    }

    fn lookup(&self, id: TypeId) -> Option<&ServiceDescriptor> {
        self.index.get(&id).map(|&i| &self.descriptors[i])
    }
}

/// Per-request resolution scope. Scoped instances live as long as the scope.
#[derive(Debug)]
pub struct RequestScope {
    provider: Arc<ServiceProvider>,
    instances: DashMap<TypeId, Instance>,
}

impl RequestScope {
    pub fn get<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, ServiceError> {
        self.resolver().get::<T>()
    }

    /// A resolver bound to this scope.
    pub fn resolver(&self) -> Resolver<'_> {
        Resolver {
            provider: &self.provider,
            scope: Some(self),
            path: Vec::new(),
        }
    }

    pub fn provider(&self) -> &Arc<ServiceProvider> {
        &self.provider
    }
}

/// Handle passed to factories for resolving their dependencies.
///
/// Tracks the resolution path for cycle detection and knows whether a request
/// scope is available.
#[derive(Debug)]
pub struct Resolver<'a> {
    provider: &'a ServiceProvider,
    scope: Option<&'a RequestScope>,
    path: Vec<(TypeId, &'static str)>,
}

impl<'a> Resolver<'a> {
    fn root(provider: &'a ServiceProvider) -> Self {
        Self {
            provider,
            scope: None,
            path: Vec::new(),
        }
    }

    pub fn get<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, ServiceError> {
        let name = std::any::type_name::<T>();
        let instance = self.resolve(TypeId::of::<T>(), name)?;
        instance
            .downcast_ref::<Arc<T>>()
            .cloned()
            .ok_or_else(|| ServiceError::construction::<T>("registered instance has a different type"))
    }

    /// True when resolving inside a request scope.
    pub fn in_scope(&self) -> bool {
        self.scope.is_some()
    }

    fn child(&self, id: TypeId, name: &'static str, scope: Option<&'a RequestScope>) -> Result<Resolver<'a>, ServiceError> {
        if self.path.iter().any(|(seen, _)| *seen == id) {
            return Err(ServiceError::Cycle {
                path: self.render_path(name),
            });
        }
        let mut path = self.path.clone();
        path.push((id, name));
        Ok(Resolver {
            provider: self.provider,
            scope,
            path,
        })
    }

    fn render_path(&self, last: &str) -> String {
        self.path
            .iter()
            .map(|(_, n)| *n)
            .chain(std::iter::once(last))
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    pub(crate) fn resolve(&self, id: TypeId, name: &'static str) -> Result<Instance, ServiceError> {
        let descriptor = self
            .provider
            .lookup(id)
            .ok_or(ServiceError::NotRegistered { name })?;

        match descriptor.lifetime() {
            Lifetime::Singleton => {
                // Singletons never see the request scope.
                let child = self.child(id, name, None)?;
                let cell = self
                    .provider
                    .singletons
                    .get(&id)
                    .ok_or(ServiceError::NotRegistered { name })?;
                cell.get_or_try_init(|| (descriptor.factory)(&child))
                    .cloned()
            }
            Lifetime::Scoped => {
                let scope = self.scope.ok_or_else(|| ServiceError::ScopedFromRoot {
                    name,
                    path: self.render_path(name),
                })?;
                if let Some(existing) = scope.instances.get(&id) {
                    return Ok(existing.value().clone());
                }
                let child = self.child(id, name, Some(scope))?;
                let created = (descriptor.factory)(&child)?;
                // First writer wins if two resolutions raced.
                let instance = scope.instances.entry(id).or_insert(created).value().clone();
                Ok(instance)
            }
            Lifetime::Transient => {
                let child = self.child(id, name, self.scope)?;
                (descriptor.factory)(&child)
            }
        }
    }
}
