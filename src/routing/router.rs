//! Route registration and lookup.
//!
//! # Responsibilities
//! - Store compiled routes in registration order
//! - Look up the first route accepting a method and path
//! - Return the matched handler with its named segments, or an explicit miss

use std::collections::HashMap;

use axum::http::Method;

use crate::routing::matcher::PathPattern;

/// A registered route.
#[derive(Debug)]
pub struct Route<H> {
    pattern: PathPattern,
    methods: Vec<Method>,
    handler: H,
}

impl<H> Route<H> {
    pub fn template(&self) -> &str {
        self.pattern.template()
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    fn accepts(&self, method: &Method) -> bool {
        self.methods.iter().any(|m| m == method)
    }
}

/// Result of a successful lookup.
#[derive(Debug)]
pub struct RouteMatch<'a, H> {
    pub route: &'a Route<H>,
    pub params: HashMap<String, String>,
}

impl<'a, H> RouteMatch<'a, H> {
    pub fn handler(&self) -> &'a H {
        &self.route.handler
    }
}

/// Append-only ordered route registry.
#[derive(Debug)]
pub struct RouteTable<H> {
    routes: Vec<Route<H>>,
}

impl<H> RouteTable<H> {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Compile `template` and append a route for `methods`.
    pub fn register(
        &mut self,
        template: &str,
        methods: Vec<Method>,
        handler: H,
    ) -> Result<(), regex::Error> {
        let pattern = PathPattern::compile(template)?;
        tracing::debug!(template = %template, methods = ?methods, "Route registered");
        self.routes.push(Route {
            pattern,
            methods,
            handler,
        });
        Ok(())
    }

    /// Find the first route (in registration order) accepting `method` and `path`.
    pub fn find(&self, method: &Method, path: &str) -> Option<RouteMatch<'_, H>> {
        self.routes
            .iter()
            .filter(|route| route.accepts(method))
            .find_map(|route| {
                route
                    .pattern
                    .matches(path)
                    .map(|params| RouteMatch { route, params })
            })
    }

    pub fn routes(&self) -> &[Route<H>] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl<H> Default for RouteTable<H> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_registered_route_wins() {
        let mut table = RouteTable::new();
        table.register("/a/:id", vec![Method::GET], "by-id").unwrap();
        table.register("/a/static", vec![Method::GET], "static").unwrap();

        let found = table.find(&Method::GET, "/a/static").unwrap();
        assert_eq!(*found.handler(), "by-id");
        assert_eq!(found.params["id"], "static");
    }

    #[test]
    fn method_mismatch_is_a_miss() {
        let mut table = RouteTable::new();
        table.register("/items", vec![Method::GET], "list").unwrap();

        assert!(table.find(&Method::POST, "/items").is_none());
        assert!(table.find(&Method::GET, "/nothing").is_none());
    }

    #[test]
    fn skips_to_route_accepting_method() {
        let mut table = RouteTable::new();
        table.register("/items/:id", vec![Method::GET], "get").unwrap();
        table
            .register("/items/:id", vec![Method::PUT, Method::PATCH], "update")
            .unwrap();

        assert_eq!(*table.find(&Method::PATCH, "/items/1").unwrap().handler(), "update");
        assert_eq!(*table.find(&Method::GET, "/items/1").unwrap().handler(), "get");
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn static_route_has_empty_params() {
        let mut table = RouteTable::new();
        table.register("/", vec![Method::GET], "root").unwrap();
        let found = table.find(&Method::GET, "/").unwrap();
        assert!(found.params.is_empty());
        assert_eq!(found.route.template(), "/");
    }
}
