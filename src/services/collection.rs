//! Service registration.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::services::error::ServiceError;
use crate::services::provider::{Resolver, ServiceProvider};

/// Type-erased instance. The `Any` payload is always an `Arc<T>`.
pub(crate) type Instance = Arc<dyn Any + Send + Sync>;

pub(crate) type Factory =
    Arc<dyn Fn(&Resolver<'_>) -> Result<Instance, ServiceError> + Send + Sync>;

/// How long a resolved instance lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifetime {
    /// One instance for the whole process, built with the provider.
    Singleton,
    /// One instance per request scope.
    Scoped,
    /// A new instance on every resolution.
    Transient,
}

/// A registered capability.
#[derive(Clone)]
pub struct ServiceDescriptor {
    pub(crate) id: TypeId,
    name: &'static str,
    lifetime: Lifetime,
    pub(crate) factory: Factory,
}

impl ServiceDescriptor {
    fn new<T, F>(lifetime: Lifetime, factory: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&Resolver<'_>) -> Result<Arc<T>, ServiceError> + Send + Sync + 'static,
    {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            lifetime,
            factory: Arc::new(move |resolver| {
                let instance: Instance = Arc::new(factory(resolver)?);
                Ok(instance)
            }),
        }
    }

    /// Fully qualified type name of the capability.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl fmt::Debug for ServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDescriptor")
            .field("name", &self.name)
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

/// Mutable list of registrations, consumed by [`build`](Self::build).
///
/// Registering a capability twice replaces the earlier factory but keeps the
/// original position.
#[derive(Debug, Default)]
pub struct ServiceCollection {
    descriptors: Vec<ServiceDescriptor>,
    positions: HashMap<TypeId, usize>,
}

impl ServiceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an already constructed singleton.
    pub fn add_singleton<T>(&mut self, instance: Arc<T>) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.add(ServiceDescriptor::new::<T, _>(Lifetime::Singleton, move |_| {
            Ok(instance.clone())
        }))
    }

    /// Register a singleton built from its dependencies when the provider is built.
    pub fn add_singleton_with<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&Resolver<'_>) -> Result<Arc<T>, ServiceError> + Send + Sync + 'static,
    {
        self.add(ServiceDescriptor::new::<T, _>(Lifetime::Singleton, factory))
    }

    pub fn add_scoped<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&Resolver<'_>) -> Result<Arc<T>, ServiceError> + Send + Sync + 'static,
    {
        self.add(ServiceDescriptor::new::<T, _>(Lifetime::Scoped, factory))
    }

    pub fn add_transient<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&Resolver<'_>) -> Result<Arc<T>, ServiceError> + Send + Sync + 'static,
    {
        self.add(ServiceDescriptor::new::<T, _>(Lifetime::Transient, factory))
    }

    pub fn add(&mut self, descriptor: ServiceDescriptor) -> &mut Self {
        match self.positions.get(&descriptor.id) {
            Some(&pos) => {
                tracing::debug!(service = descriptor.name, "Replacing service registration");
                self.descriptors[pos] = descriptor;
            }
            None => {
                self.positions.insert(descriptor.id, self.descriptors.len());
                self.descriptors.push(descriptor);
            }
        }
        self
    }

    pub fn contains<T: ?Sized + 'static>(&self) -> bool {
        self.positions.contains_key(&TypeId::of::<T>())
    }

    pub fn descriptors(&self) -> &[ServiceDescriptor] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Freeze the registrations and construct every singleton.
    pub fn build(self) -> Result<ServiceProvider, ServiceError> {
        ServiceProvider::new(self.descriptors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Clock;

    #[test]
    fn test_replacement_keeps_position() {
        let mut services = ServiceCollection::new();
        services
            .add_singleton(Arc::new(Clock))
            .add_transient::<String, _>(|_| Ok(Arc::new("first".to_string())))
            .add_transient::<String, _>(|_| Ok(Arc::new("second".to_string())));

        assert_eq!(services.len(), 2);
        assert!(services.descriptors()[0].is::<Clock>());
        assert!(services.descriptors()[1].is::<String>());
        assert_eq!(services.descriptors()[1].lifetime(), Lifetime::Transient);

        let provider = services.build().unwrap();
        assert_eq!(provider.get::<String>().unwrap().as_str(), "second");
    }

    #[test]
    fn test_contains() {
        let mut services = ServiceCollection::new();
        assert!(!services.contains::<Clock>());
        services.add_singleton(Arc::new(Clock));
        assert!(services.contains::<Clock>());
        assert!(!services.is_empty());
    }
}
