//! Route table and lookup.
//!
//! # Responsibilities
//! - Collect named routes during startup
//! - Validate templates and defaults, fail on the first bad route
//! - Resolve a request path to route values
//!
//! # Design Decisions
//! - Immutable after construction (shared without locks)
//! - Ordered by specificity: more literal segments first, ties keep
//!   registration order
//! - First match wins; explicit `None` instead of a silent default

use std::collections::{BTreeMap, HashSet};

use thiserror::Error;

use crate::routing::matcher::{split_path, RouteTemplate, Segment};

pub const CONTROLLER_KEY: &str = "controller";
pub const ACTION_KEY: &str = "action";
pub const ID_KEY: &str = "id";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("route '{route}' has invalid template '{template}': {reason}")]
    InvalidTemplate {
        route: String,
        template: String,
        reason: String,
    },

    #[error("route name '{name}' is registered more than once")]
    DuplicateName { name: String },

    #[error("route '{route}' sets a default for '{parameter}' both inline and in its defaults")]
    ConflictingDefault { route: String, parameter: String },
}

/// A named, validated route.
#[derive(Debug, Clone)]
pub struct Route {
    name: String,
    template: RouteTemplate,
    defaults: BTreeMap<String, String>,
    order: usize,
}

impl Route {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn template(&self) -> &RouteTemplate {
        &self.template
    }

    /// Defaults that do not correspond to a template parameter.
    pub fn defaults(&self) -> &BTreeMap<String, String> {
        &self.defaults
    }

    /// Position in registration order.
    pub fn order(&self) -> usize {
        self.order
    }

    /// Value `key` takes when the path does not supply it: an extra default
    /// or an inline template default.
    pub fn default_value(&self, key: &str) -> Option<&str> {
        self.defaults
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
            .or_else(|| {
                self.template.segments().iter().find_map(|segment| match segment {
                    Segment::Parameter {
                        name,
                        default: Some(default),
                        ..
                    } if name.eq_ignore_ascii_case(key) => Some(default.as_str()),
                    _ => None,
                })
            })
    }
}

/// Result of a successful lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub route_name: String,
    values: BTreeMap<String, String>,
}

impl RouteMatch {
    pub fn value(&self, key: &str) -> Option<&str> {
        self.values
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn controller(&self) -> Option<&str> {
        self.value(CONTROLLER_KEY)
    }

    pub fn action(&self) -> Option<&str> {
        self.value(ACTION_KEY)
    }

    pub fn id(&self) -> Option<&str> {
        self.value(ID_KEY)
    }

    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }
}

#[derive(Debug, Clone)]
struct PendingRoute {
    name: String,
    template: String,
    defaults: Vec<(String, String)>,
}

/// Collects `map_route` calls; validated by [`build`](Self::build).
#[derive(Debug, Clone, Default)]
pub struct RouteTableBuilder {
    pending: Vec<PendingRoute>,
}

impl RouteTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map_route(&mut self, name: &str, template: &str) -> &mut Self {
        self.map_route_with_defaults(name, template, &[])
    }

    pub fn map_route_with_defaults(
        &mut self,
        name: &str,
        template: &str,
        defaults: &[(&str, &str)],
    ) -> &mut Self {
        self.pending.push(PendingRoute {
            name: name.to_string(),
            template: template.to_string(),
            defaults: defaults
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn build(&self) -> Result<RouteTable, RouteError> {
        let mut names = HashSet::new();
        let mut routes = Vec::with_capacity(self.pending.len());

        for (order, pending) in self.pending.iter().enumerate() {
            if !names.insert(pending.name.to_ascii_lowercase()) {
                return Err(RouteError::DuplicateName {
                    name: pending.name.clone(),
                });
            }

            let template =
                RouteTemplate::parse(&pending.template).map_err(|reason| RouteError::InvalidTemplate {
                    route: pending.name.clone(),
                    template: pending.template.clone(),
                    reason,
                })?;

            let mut defaults = BTreeMap::new();
            for (key, value) in &pending.defaults {
                if template.has_parameter(key) {
                    return Err(RouteError::ConflictingDefault {
                        route: pending.name.clone(),
                        parameter: key.clone(),
                    });
                }
                defaults.insert(key.to_ascii_lowercase(), value.clone());
            }

            routes.push(Route {
                name: pending.name.clone(),
                template,
                defaults,
                order,
            });
        }

        // Stable sort keeps registration order among equally specific routes.
        routes.sort_by(|a, b| b.template.literal_count().cmp(&a.template.literal_count()));

        for route in &routes {
            tracing::debug!(
                route = %route.name,
                template = %route.template.raw(),
                "Route registered"
            );
        }

        Ok(RouteTable { routes })
    }
}

/// Immutable, ordered route table.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Routes in resolution order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn resolve(&self, path: &str) -> Option<RouteMatch> {
        let decoded = split_path(path)?;
        let segments: Vec<&str> = decoded.iter().map(|s| s.as_ref()).collect();

        self.routes.iter().find_map(|route| {
            let captured = route.template.matches(&segments)?;
            let mut values = route.defaults.clone();
            values.extend(captured);
            Some(RouteMatch {
                route_name: route.name.clone(),
                values,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_table() -> RouteTable {
        RouteTableBuilder::new()
            .map_route("default", "{controller=Home}/{action=Index}/{id?}")
            .map_route_with_defaults(
                "service-1",
                "api/services/app/demo/{action}",
                &[("controller", "MyDemoAppService")],
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_demo_service_route() {
        let m = demo_table().resolve("api/services/app/demo/foo").unwrap();
        assert_eq!(m.route_name, "service-1");
        assert_eq!(m.controller(), Some("MyDemoAppService"));
        assert_eq!(m.action(), Some("foo"));
        assert_eq!(m.id(), None);
    }

    #[test]
    fn test_encoded_segments_are_decoded() {
        let m = demo_table().resolve("/api/services/app/demo/%70ing").unwrap();
        assert_eq!(m.route_name, "service-1");
        assert_eq!(m.action(), Some("ping"));

        let m = demo_table().resolve("/Home/About/a%20b").unwrap();
        assert_eq!(m.id(), Some("a b"));
    }

    #[test]
    fn test_fallback_route() {
        let m = demo_table().resolve("/widgets/list/7").unwrap();
        assert_eq!(m.route_name, "default");
        assert_eq!(m.controller(), Some("widgets"));
        assert_eq!(m.action(), Some("list"));
        assert_eq!(m.id(), Some("7"));
    }

    #[test]
    fn test_root_uses_defaults() {
        let m = demo_table().resolve("/").unwrap();
        assert_eq!(m.controller(), Some("Home"));
        assert_eq!(m.action(), Some("Index"));
    }

    #[test]
    fn test_specific_route_wins_regardless_of_order() {
        // A catch-all that could shadow the prefix route if order alone decided.
        let table = RouteTableBuilder::new()
            .map_route("catch-all", "{a}/{b}/{c}/{d}/{e}")
            .map_route_with_defaults(
                "service-1",
                "api/services/app/demo/{action}",
                &[("controller", "MyDemoAppService")],
            )
            .build()
            .unwrap();

        assert_eq!(table.routes()[0].name(), "service-1");
        assert_eq!(table.routes()[0].order(), 1);
        let m = table.resolve("api/services/app/demo/foo").unwrap();
        assert_eq!(m.route_name, "service-1");
        assert_eq!(table.resolve("x/y/z/w/v").unwrap().route_name, "catch-all");
    }

    #[test]
    fn test_equal_specificity_keeps_registration_order() {
        let table = RouteTableBuilder::new()
            .map_route("first", "{controller}/{action}")
            .map_route("second", "{x}/{y}")
            .build()
            .unwrap();
        assert_eq!(table.resolve("a/b").unwrap().route_name, "first");
    }

    #[test]
    fn test_default_value() {
        let table = demo_table();
        let by_name = |name: &str| table.routes().iter().find(|r| r.name() == name).unwrap();
        assert_eq!(by_name("default").default_value("Controller"), Some("Home"));
        assert_eq!(by_name("default").default_value("id"), None);
        assert_eq!(by_name("service-1").default_value("controller"), Some("MyDemoAppService"));
        assert_eq!(by_name("service-1").default_value("action"), None);
    }

    #[test]
    fn test_no_match() {
        let table = demo_table();
        assert!(table.resolve("a/b/c/d").is_none());
        assert!(table.resolve("api/services/app/demo/foo/bar").is_none());
        assert!(table.resolve("a//b").is_none());
    }

    #[test]
    fn test_build_errors() {
        let err = RouteTableBuilder::new()
            .map_route("r", "{controller}")
            .map_route("R", "{action}")
            .build()
            .unwrap_err();
        assert_eq!(err, RouteError::DuplicateName { name: "R".into() });

        let err = RouteTableBuilder::new()
            .map_route("bad", "{id?}/{action}")
            .build()
            .unwrap_err();
        assert!(matches!(err, RouteError::InvalidTemplate { ref route, .. } if route == "bad"));

        let err = RouteTableBuilder::new()
            .map_route_with_defaults("conflict", "{controller=Home}", &[("controller", "Other")])
            .build()
            .unwrap_err();
        assert!(matches!(err, RouteError::ConflictingDefault { .. }));
    }
}
