//! Route table and match results.

use http::Method;
use smallvec::SmallVec;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::radix::{RouteNode, Segment};
use crate::dispatcher::{Filter, Target};

/// Maximum number of captures before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated capture storage for the match path.
///
/// Names are shared with the trie (`Arc<str>`); values are per-request data.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// A handler binding at a trie node: target, effective filters and the action
/// name used for controllers.
pub struct RouteAction {
    pub(crate) target: Target,
    /// Configured or default action name; `None` only for ALL/ANY bindings that
    /// did not pick one
    pub(crate) action: Option<Arc<str>>,
    pub(crate) filters: Arc<[Filter]>,
}

impl RouteAction {
    pub(crate) fn new(target: Target, action: Option<Arc<str>>, filters: Vec<Filter>) -> Self {
        Self {
            target,
            action,
            filters: filters.into(),
        }
    }

    #[must_use]
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Filters run before the target, parent filters first.
    #[must_use]
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    #[must_use]
    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }
}

impl std::fmt::Debug for RouteAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteAction")
            .field("target", &self.target)
            .field("action", &self.action)
            .field("filters", &self.filters.len())
            .finish()
    }
}

/// Per-request description of the matched route.
///
/// Provided into the request scope as `Arc<RouteInfo>` before the route's
/// filters run.
#[derive(Debug, Clone, Default)]
pub struct RouteInfo {
    /// Template of the matched node, e.g. `/user/:uid`
    pub path: Arc<str>,
    /// Captures in declaration order
    pub params: ParamVec,
}

impl RouteInfo {
    /// Get a capture by name
    ///
    /// Uses "last write wins" semantics when the same name is captured at
    /// several depths.
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Capture names in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|(k, _)| k.as_ref())
    }

    /// Captured values in declaration order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Note: this allocates
    #[must_use]
    pub fn to_map(&self) -> HashMap<String, String> {
        self.params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }
}

/// Successful match: the binding to run, the action name to call on it and the
/// captures.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub action: Arc<RouteAction>,
    pub action_name: Arc<str>,
    pub info: RouteInfo,
}

/// Default controller action for a method: `GET` → `Get`, `CUSTOM` → `Custom`.
#[must_use]
pub fn default_action_name(method: &Method) -> String {
    let mut chars = method.as_str().chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Trim slashes, split on `/` and percent-decode every segment. The root path
/// yields no segments.
pub(crate) fn split_path(path: &str) -> SmallVec<[Cow<'_, str>; MAX_INLINE_PARAMS]> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return SmallVec::new();
    }
    trimmed
        .split('/')
        .map(|segment| urlencoding::decode(segment).unwrap_or(Cow::Borrowed(segment)))
        .collect()
}

/// The route trie plus named routes.
///
/// Built with [`RouteTable::configure`] and read-only afterwards.
pub struct RouteTable {
    pub(crate) root: RouteNode,
    pub(crate) names: HashMap<Arc<str>, Arc<str>>,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteTable {
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: RouteNode::root(),
            names: HashMap::new(),
        }
    }

    /// Match a request to a route binding.
    ///
    /// `method` is expected in upper case. Returns `None` both when no node
    /// matches the path and when the node has no binding for the method.
    #[must_use]
    pub fn route(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        debug!(method = %method, path = %path, "Route match attempt");

        let segments = split_path(path);
        let mut params = ParamVec::new();
        let Some(node) = self.root.search(&segments[..], &mut params) else {
            debug!(method = %method, path = %path, "No route matched");
            return None;
        };

        let Some((action, action_name)) = resolve_method(node, method) else {
            debug!(
                method = %method,
                path = %path,
                route_pattern = %node.pattern(),
                "Path matched but no action for method"
            );
            return None;
        };

        debug!(
            method = %method,
            path = %path,
            route_pattern = %node.pattern(),
            action = %action_name,
            path_params = ?params,
            "Route matched"
        );

        Some(RouteMatch {
            action,
            action_name,
            info: RouteInfo {
                path: Arc::clone(node.pattern()),
                params,
            },
        })
    }

    /// Rebuild a concrete path for a named route.
    ///
    /// Param values are percent-encoded, custom verbs are kept and wildcard
    /// values are inserted verbatim. Returns `None` for an unknown name or a
    /// missing capture.
    #[must_use]
    pub fn path_for(&self, name: &str, params: &[(&str, &str)]) -> Option<String> {
        let pattern = self.names.get(name)?;
        let lookup = |key: &str| params.iter().rfind(|(k, _)| *k == key).map(|(_, v)| *v);

        let mut out = String::with_capacity(pattern.len());
        for raw in pattern.split('/').filter(|s| !s.is_empty()) {
            out.push('/');
            match Segment::parse(raw) {
                Segment::Static => out.push_str(raw),
                Segment::Param { name, verb } => {
                    out.push_str(&urlencoding::encode(lookup(name.as_ref())?));
                    if let Some(verb) = verb {
                        out.push_str(&verb);
                    }
                }
                Segment::Wildcard { name } => {
                    out.push_str(lookup(name.as_ref())?.trim_matches('/'));
                }
            }
        }
        if out.is_empty() {
            out.push('/');
        }
        Some(out)
    }

    /// Every binding as `(method, template)`, with `ALL`/`ANY` for the
    /// fallbacks. Stable order: parents first, static children sorted.
    #[must_use]
    pub fn routes(&self) -> Vec<(String, Arc<str>)> {
        let mut out = Vec::new();
        self.root.walk(&mut |node| {
            let mut methods: Vec<&str> = node.methods.keys().map(Method::as_str).collect();
            methods.sort_unstable();
            for method in methods {
                out.push((method.to_owned(), Arc::clone(node.pattern())));
            }
            if node.all.is_some() {
                out.push(("ALL".to_owned(), Arc::clone(node.pattern())));
            }
            if node.any.is_some() {
                out.push(("ANY".to_owned(), Arc::clone(node.pattern())));
            }
        });
        out
    }

    /// Number of method bindings, fallbacks included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Pick the binding for `method` at a matched node.
///
/// Order: the method's own binding, `GET` for `HEAD`, the ALL fallback when its
/// target can serve the method's default action (or names an action of its
/// own), then the ANY fallback.
fn resolve_method(node: &RouteNode, method: &Method) -> Option<(Arc<RouteAction>, Arc<str>)> {
    let direct = node.methods.get(method).or_else(|| {
        if *method == Method::HEAD {
            node.methods.get(&Method::GET)
        } else {
            None
        }
    });
    if let Some(action) = direct {
        let name = action
            .action
            .clone()
            .unwrap_or_else(|| Arc::from(default_action_name(method)));
        return Some((Arc::clone(action), name));
    }

    let default_name: Arc<str> = Arc::from(default_action_name(method));
    if let Some(all) = &node.all {
        if all.target.is_function() || all.target.has_action(&default_name) {
            return Some((Arc::clone(all), default_name));
        }
        if let Some(name) = &all.action {
            return Some((Arc::clone(all), Arc::clone(name)));
        }
    }

    if let Some(any) = &node.any {
        let name = any.action.clone().unwrap_or_else(|| Arc::from("Any"));
        if any.target.is_function() || any.target.has_action(&name) {
            return Some((Arc::clone(any), name));
        }
    }

    None
}
