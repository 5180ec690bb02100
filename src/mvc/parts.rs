//! Application parts and feature providers.
//!
//! A part is an explicit list of candidate types from one code module. Feature
//! providers look at each candidate and decide whether it is a handler and
//! under which name it is routed.

use std::any::TypeId;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::mvc::builder::MvcError;
use crate::mvc::handler::{ApplicationService, Handler, Injectable};
use crate::services::{Resolver, ServiceCollection, ServiceError};

pub(crate) type Activator = fn(&Resolver<'_>) -> Result<Arc<dyn Handler>, ServiceError>;
type Registrar = fn(&mut ServiceCollection);

/// What a candidate type declares itself to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    /// Routed by its name minus the `Controller` suffix.
    Controller,
    /// Routed by its full type name.
    ApplicationService,
    /// Listed in a part but never routed.
    Plain,
}

/// One candidate type of an application part.
#[derive(Clone)]
pub struct HandlerDescriptor {
    type_id: TypeId,
    type_name: &'static str,
    kind: HandlerKind,
    pub(crate) construct: Activator,
    pub(crate) resolve: Activator,
    pub(crate) register: Registrar,
}

impl HandlerDescriptor {
    pub fn controller<T: Handler + Injectable>() -> Self {
        Self::of::<T>(HandlerKind::Controller)
    }

    pub fn application_service<T: ApplicationService + Injectable>() -> Self {
        Self::of::<T>(HandlerKind::ApplicationService)
    }

    pub fn plain<T: Handler + Injectable>() -> Self {
        Self::of::<T>(HandlerKind::Plain)
    }

    fn of<T: Handler + Injectable>(kind: HandlerKind) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: short_type_name::<T>(),
            kind,
            construct: |r| {
                let handler: Arc<dyn Handler> = Arc::new(T::inject(r)?);
                Ok(handler)
            },
            resolve: |r| {
                let handler: Arc<dyn Handler> = r.get::<T>()?;
                Ok(handler)
            },
            register: |services| {
                services.add_transient::<T, _>(|r| Ok(Arc::new(T::inject(r)?)));
            },
        }
    }

    /// Type name without its module path.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn kind(&self) -> HandlerKind {
        self.kind
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }
}

impl fmt::Debug for HandlerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDescriptor")
            .field("type_name", &self.type_name)
            .field("kind", &self.kind)
            .finish()
    }
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

/// A named code module contributing handler candidates.
#[derive(Debug, Clone)]
pub struct ApplicationPart {
    name: String,
    descriptors: Vec<HandlerDescriptor>,
}

impl ApplicationPart {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            descriptors: Vec::new(),
        }
    }

    pub fn with(mut self, descriptor: HandlerDescriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptors(&self) -> &[HandlerDescriptor] {
        &self.descriptors
    }
}

/// Decides which candidates are handlers.
pub trait FeatureProvider: Send + Sync + fmt::Debug {
    /// Routing name for `descriptor`, or `None` if it is not a handler.
    fn group_name(&self, descriptor: &HandlerDescriptor) -> Option<String>;
}

/// Default discovery: `Controller` kind with a `Controller` name suffix.
#[derive(Debug, Clone, Copy, Default)]
pub struct ControllerFeatureProvider;

impl FeatureProvider for ControllerFeatureProvider {
    fn group_name(&self, descriptor: &HandlerDescriptor) -> Option<String> {
        if descriptor.kind() != HandlerKind::Controller {
            return None;
        }
        descriptor
            .type_name()
            .strip_suffix("Controller")
            .filter(|name| !name.is_empty())
            .map(str::to_string)
    }
}

/// Discovers application services; the group name is the full type name.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppServiceFeatureProvider;

impl FeatureProvider for AppServiceFeatureProvider {
    fn group_name(&self, descriptor: &HandlerDescriptor) -> Option<String> {
        (descriptor.kind() == HandlerKind::ApplicationService)
            .then(|| descriptor.type_name().to_string())
    }
}

/// A handler found by a feature provider.
#[derive(Debug, Clone)]
pub struct DiscoveredHandler {
    pub group: String,
    pub part: String,
    pub descriptor: HandlerDescriptor,
}

/// Parts plus the providers applied to them.
#[derive(Debug, Default)]
pub struct ApplicationPartManager {
    pub parts: Vec<ApplicationPart>,
    pub feature_providers: Vec<Box<dyn FeatureProvider>>,
}

impl ApplicationPartManager {
    /// Run every provider over every part.
    ///
    /// The first provider that claims a candidate names it. A type listed in
    /// two parts is discovered once; two different types with the same group
    /// name are an error.
    pub fn populate(&self) -> Result<Vec<DiscoveredHandler>, MvcError> {
        let mut by_group: BTreeMap<String, usize> = BTreeMap::new();
        let mut discovered: Vec<DiscoveredHandler> = Vec::new();

        for part in &self.parts {
            for descriptor in part.descriptors() {
                let Some(group) = self
                    .feature_providers
                    .iter()
                    .find_map(|p| p.group_name(descriptor))
                else {
                    continue;
                };

                match by_group.get(&group.to_ascii_lowercase()) {
                    Some(&i) if discovered[i].descriptor.type_id() == descriptor.type_id() => {}
                    Some(&i) => {
                        return Err(MvcError::DuplicateHandler {
                            group,
                            first: format!("{}::{}", discovered[i].part, discovered[i].descriptor.type_name()),
                            second: format!("{}::{}", part.name(), descriptor.type_name()),
                        });
                    }
                    None => {
                        by_group.insert(group.to_ascii_lowercase(), discovered.len());
                        discovered.push(DiscoveredHandler {
                            group,
                            part: part.name().to_string(),
                            descriptor: descriptor.clone(),
                        });
                    }
                }
            }
        }

        Ok(discovered)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::mvc::handler::ActionContext;
    use async_trait::async_trait;
    use axum::response::{IntoResponse, Response};

    macro_rules! test_handler {
        ($name:ident) => {
            #[derive(Debug)]
            pub(crate) struct $name;

            #[async_trait]
            impl Handler for $name {
                async fn invoke(&self, action: &str, _ctx: ActionContext) -> Result<Response, AppError> {
                    Ok(format!("{}:{}", stringify!($name), action).into_response())
                }
            }

            impl Injectable for $name {
                fn inject(_: &Resolver<'_>) -> Result<Self, ServiceError> {
                    Ok($name)
                }
            }
        };
    }

    test_handler!(OrdersController);
    test_handler!(ReportAppService);
    test_handler!(Controller);
    test_handler!(MapperHelper);
    test_handler!(OtherReportAppService);

    impl ApplicationService for ReportAppService {}

    pub(crate) fn mixed_part() -> ApplicationPart {
        ApplicationPart::new("tests")
            .with(HandlerDescriptor::controller::<OrdersController>())
            .with(HandlerDescriptor::application_service::<ReportAppService>())
            .with(HandlerDescriptor::controller::<Controller>())
            .with(HandlerDescriptor::plain::<MapperHelper>())
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(HandlerDescriptor::controller::<OrdersController>().type_name(), "OrdersController");
    }

    #[test]
    fn test_controller_provider() {
        let part = mixed_part();
        let names: Vec<_> = part
            .descriptors()
            .iter()
            .filter_map(|d| ControllerFeatureProvider.group_name(d))
            .collect();
        // A bare "Controller" has no name left after stripping the suffix.
        assert_eq!(names, vec!["Orders".to_string()]);
    }

    #[test]
    fn test_app_service_provider() {
        let part = mixed_part();
        let names: Vec<_> = part
            .descriptors()
            .iter()
            .filter_map(|d| AppServiceFeatureProvider.group_name(d))
            .collect();
        assert_eq!(names, vec!["ReportAppService".to_string()]);
    }

    #[test]
    fn test_populate_uses_every_provider() {
        let manager = ApplicationPartManager {
            parts: vec![mixed_part(), mixed_part()],
            feature_providers: vec![
                Box::new(ControllerFeatureProvider),
                Box::new(AppServiceFeatureProvider),
            ],
        };
        let found = manager.populate().unwrap();
        let groups: Vec<_> = found.iter().map(|h| h.group.as_str()).collect();
        assert_eq!(groups, vec!["Orders", "ReportAppService"]);
    }

    #[test]
    fn test_populate_rejects_name_collision() {
        #[derive(Debug)]
        struct Renamed;
        impl FeatureProvider for Renamed {
            fn group_name(&self, d: &HandlerDescriptor) -> Option<String> {
                (d.kind() == HandlerKind::ApplicationService).then(|| "Reports".to_string())
            }
        }
        impl ApplicationService for OtherReportAppService {}

        let manager = ApplicationPartManager {
            parts: vec![ApplicationPart::new("a")
                .with(HandlerDescriptor::application_service::<ReportAppService>())
                .with(HandlerDescriptor::application_service::<OtherReportAppService>())],
            feature_providers: vec![Box::new(Renamed)],
        };
        let err = manager.populate().unwrap_err();
        assert!(matches!(err, MvcError::DuplicateHandler { ref group, .. } if group == "Reports"));
    }
}
