//! Ordered route table.
//!
//! # Responsibilities
//! - Store compiled routes in registration order
//! - Look up the first route matching method and path
//! - Add, remove and replace routes at runtime
//!
//! # Design Decisions
//! - Lock-free reads via ArcSwap; writers publish a new list (RCU)
//! - O(n) scan (acceptable for typical route counts)
//! - Explicit None rather than silent default

use arc_swap::ArcSwap;
use std::sync::Arc;

use crate::config::{validate_route, RouteConfig, ValidationError};
use crate::routing::matcher::{Matcher, MethodMatcher, PathMatcher, RequestHead};

/// A compiled route.
#[derive(Debug)]
pub struct Route {
    pub config: RouteConfig,
    path: PathMatcher,
    methods: MethodMatcher,
}

impl Route {
    pub fn compile(config: RouteConfig) -> Self {
        Self {
            path: PathMatcher::new(&config.path),
            methods: MethodMatcher::new(&config.methods),
            config,
        }
    }

    pub fn matches(&self, method: &str, path: &str) -> bool {
        let head = RequestHead { method, path };
        self.methods.matches(&head) && self.path.matches(&head)
    }
}

#[derive(Debug, Default)]
pub struct RouteTable {
    routes: ArcSwap<Vec<Arc<Route>>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from configs, validating each one.
    pub fn from_configs(configs: Vec<RouteConfig>) -> Result<Self, Vec<ValidationError>> {
        let table = Self::new();
        table.replace(configs)?;
        Ok(table)
    }

    /// First route matching method and path, in registration order.
    pub fn match_request(&self, method: &str, path: &str) -> Option<Arc<Route>> {
        self.routes
            .load()
            .iter()
            .find(|route| route.matches(method, path))
            .cloned()
    }

    /// Append a route at the end of the list.
    pub fn add(&self, config: RouteConfig) -> Result<(), Vec<ValidationError>> {
        validate_route(&config)?;
        let route = Arc::new(Route::compile(config));
        self.routes.rcu(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(route.clone());
            next
        });
        tracing::info!(path = %route.config.path, service = %route.config.service, "Route added");
        Ok(())
    }

    /// Remove every route registered under `path`. Returns true if any was removed.
    pub fn remove(&self, path: &str) -> bool {
        let previous = self.routes.rcu(|current| {
            current
                .iter()
                .filter(|route| route.config.path != path)
                .cloned()
                .collect::<Vec<_>>()
        });
        let removed = previous.iter().any(|route| route.config.path == path);
        if removed {
            tracing::info!(path = %path, "Route removed");
        }
        removed
    }

    /// Swap in a whole new list. Nothing changes if any route is invalid.
    pub fn replace(&self, configs: Vec<RouteConfig>) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        for config in &configs {
            if let Err(mut route_errors) = validate_route(config) {
                errors.append(&mut route_errors);
            }
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        let count = configs.len();
        let compiled = configs.into_iter().map(|c| Arc::new(Route::compile(c))).collect();
        self.routes.store(Arc::new(compiled));
        tracing::info!(routes = count, "Route table replaced");
        Ok(())
    }

    /// Route configs in match order.
    pub fn list(&self) -> Vec<RouteConfig> {
        self.routes
            .load()
            .iter()
            .map(|route| route.config.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.routes.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.load().is_empty()
    }
}
