//! Declarative route directives and their translation into the trie.
//!
//! A [`Routes`] value describes one scope: method bindings, filters, exemptions,
//! an optional route name and nested scopes under path prefixes. Filters flow
//! downwards: a scope's effective filters are its parent's followed by its own,
//! minus anything it exempts, and each binding adds and exempts on top of that.
//!
//! ```rust
//! use strip::router::{get, post, Routes, RouteTable};
//! use strip::dispatcher::Filter;
//!
//! let auth = Filter::new(|| ());
//! let routes = Routes::new()
//!     .filter(auth.clone())
//!     .nest("/user", Routes::new()
//!         .handle(get(|| ()))
//!         .nest("/:uid", Routes::new().name("user").handle(get(|| ())))
//!         .nest("/login", Routes::new().exempt(&auth).handle(post(|| ()))));
//!
//! let mut table = RouteTable::new();
//! table.configure(routes).unwrap();
//! assert_eq!(table.path_for("user", &[("uid", "42")]).as_deref(), Some("/user/42"));
//! ```

use http::Method;
use std::sync::Arc;
use tracing::{error, info};

use super::core::{default_action_name, RouteAction, RouteTable};
use super::error::ConfigError;
use super::radix::RouteNode;
use crate::dispatcher::{Filter, IntoTarget, Target};

#[derive(Debug, Clone)]
enum Binding {
    Method(Method),
    All,
    Any,
}

/// One handler binding inside a [`Routes`] scope.
#[must_use]
pub struct MethodRoute {
    binding: Binding,
    target: Target,
    action: Option<String>,
    filters: Vec<Filter>,
    exempts: Vec<Filter>,
}

impl MethodRoute {
    fn new(binding: Binding, target: Target) -> Self {
        Self {
            binding,
            target,
            action: None,
            filters: Vec::new(),
            exempts: Vec::new(),
        }
    }

    /// Controller action to call instead of the method's default.
    pub fn action(mut self, name: impl Into<String>) -> Self {
        self.action = Some(name.into());
        self
    }

    /// Filter that only applies to this binding.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Drop an inherited filter for this binding.
    pub fn exempt(mut self, filter: &Filter) -> Self {
        self.exempts.push(filter.clone());
        self
    }
}

pub fn method<M>(method: Method, target: impl IntoTarget<M>) -> MethodRoute {
    MethodRoute::new(Binding::Method(method), target.into_target())
}

pub fn get<M>(target: impl IntoTarget<M>) -> MethodRoute {
    method(Method::GET, target)
}

pub fn post<M>(target: impl IntoTarget<M>) -> MethodRoute {
    method(Method::POST, target)
}

pub fn put<M>(target: impl IntoTarget<M>) -> MethodRoute {
    method(Method::PUT, target)
}

pub fn patch<M>(target: impl IntoTarget<M>) -> MethodRoute {
    method(Method::PATCH, target)
}

pub fn delete<M>(target: impl IntoTarget<M>) -> MethodRoute {
    method(Method::DELETE, target)
}

/// Explicit `HEAD` binding; without one `HEAD` is served by `GET`.
pub fn head<M>(target: impl IntoTarget<M>) -> MethodRoute {
    method(Method::HEAD, target)
}

pub fn options<M>(target: impl IntoTarget<M>) -> MethodRoute {
    method(Method::OPTIONS, target)
}

/// Fallback for every method without its own binding.
///
/// A function always serves; a controller serves when it has the requested
/// method's default action (`Get`, `Post`, ...), otherwise the configured action
/// (`All` when the controller has one) is called.
pub fn all<M>(target: impl IntoTarget<M>) -> MethodRoute {
    MethodRoute::new(Binding::All, target.into_target())
}

/// Last fallback; controllers call `Any` unless another action is configured.
pub fn any<M>(target: impl IntoTarget<M>) -> MethodRoute {
    MethodRoute::new(Binding::Any, target.into_target())
}

/// A scope of route directives.
#[derive(Default)]
#[must_use]
pub struct Routes {
    filters: Vec<Filter>,
    exempts: Vec<Filter>,
    bindings: Vec<MethodRoute>,
    nested: Vec<(String, Routes)>,
    name: Option<String>,
}

impl Routes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a filter to this scope and every scope nested in it.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Remove an inherited filter from this scope.
    pub fn exempt(mut self, filter: &Filter) -> Self {
        self.exempts.push(filter.clone());
        self
    }

    pub fn handle(mut self, binding: MethodRoute) -> Self {
        self.bindings.push(binding);
        self
    }

    /// Nest a scope under `path` (relative to this scope, may span several
    /// segments).
    pub fn nest(mut self, path: impl Into<String>, routes: Routes) -> Self {
        self.nested.push((path.into(), routes));
        self
    }

    /// Name the node this scope configures, for [`RouteTable::path_for`].
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

fn without(filters: Vec<Filter>, exempts: &[Filter]) -> Vec<Filter> {
    if exempts.is_empty() {
        return filters;
    }
    filters
        .into_iter()
        .filter(|f| !exempts.iter().any(|e| e.same(f)))
        .collect()
}

fn joined(base: &[Filter], extra: &[Filter]) -> Vec<Filter> {
    base.iter().chain(extra).cloned().collect()
}

impl RouteTable {
    /// Apply `routes` to the trie.
    ///
    /// May be called several times; later calls merge into the same trie and
    /// replace bindings for the same node and method.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`]. The trie may be partially updated when an error is
    /// returned.
    pub fn configure(&mut self, routes: Routes) -> Result<(), ConfigError> {
        if let Err(err) = configure_node(&mut self.root, &mut self.names, routes, &[]) {
            error!(error = %err, "Route configuration failed");
            return Err(err);
        }
        info!(
            routes_count = self.len(),
            named_routes = self.names.len(),
            "Routing table loaded"
        );
        Ok(())
    }
}

fn configure_node(
    node: &mut RouteNode,
    names: &mut std::collections::HashMap<Arc<str>, Arc<str>>,
    routes: Routes,
    inherited: &[Filter],
) -> Result<(), ConfigError> {
    let Routes {
        filters,
        exempts,
        bindings,
        nested,
        name,
    } = routes;
    let scope = without(joined(inherited, &filters), &exempts);

    if let Some(name) = name {
        let name: Arc<str> = Arc::from(name);
        if names.contains_key(&name) {
            return Err(ConfigError::DuplicateRouteName {
                name: name.to_string(),
            });
        }
        names.insert(Arc::clone(&name), Arc::clone(node.pattern()));
        node.name = Some(name);
    }

    for binding in bindings {
        let MethodRoute {
            binding,
            target,
            action,
            filters,
            exempts,
        } = binding;
        let effective = without(joined(&scope, &filters), &exempts);

        let action = match &binding {
            Binding::Method(method) => Some(action.unwrap_or_else(|| default_action_name(method))),
            Binding::All => action.or_else(|| {
                (!target.is_function() && target.has_action("All")).then(|| "All".to_owned())
            }),
            Binding::Any => action.or_else(|| (!target.is_function()).then(|| "Any".to_owned())),
        };
        if let Some(action) = &action {
            if !target.is_function() && !target.has_action(action) {
                return Err(ConfigError::UnknownAction {
                    action: action.clone(),
                });
            }
        }

        let route = Arc::new(RouteAction::new(target, action.map(Arc::from), effective));
        match binding {
            Binding::Method(method) => {
                node.methods.insert(method, route);
            }
            Binding::All => node.all = Some(route),
            Binding::Any => node.any = Some(route),
        }
    }

    for (path, routes) in nested {
        let trimmed = path.trim();
        let segments: Vec<&str> = trimmed
            .trim_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();
        if segments.is_empty() {
            return Err(ConfigError::EmptyRouterPath {
                path: trimmed.to_owned(),
            });
        }

        let last = segments.len() - 1;
        let mut target = &mut *node;
        for (i, raw) in segments.iter().enumerate() {
            let child = target.child_mut(raw)?;
            if child.is_wildcard() && i != last {
                return Err(ConfigError::WildcardNotLast {
                    path: trimmed.to_owned(),
                    param: child
                        .capture_name()
                        .map(ToString::to_string)
                        .unwrap_or_default(),
                });
            }
            target = child;
        }
        target.mark_terminal();
        configure_node(target, names, routes, &scope)?;
    }

    Ok(())
}
