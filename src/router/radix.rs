//! Segment trie for route matching
//!
//! Paths are split on `/` and every segment becomes a node. A node owns three kinds
//! of children:
//!
//! - **static** children, keyed by their literal text (`users`)
//! - **param** children (`:id`, or `:id:archive` with a custom verb suffix), tried in
//!   stored order; custom verb nodes are kept in front
//! - at most one **wildcard** child (`*:rest`) which swallows every remaining segment
//!
//! ## Matching
//!
//! Search is depth first with backtracking. At each level the static child is tried
//! first; if it cannot reach a terminal node the param children are tried in order,
//! and the wildcard is the match of last resort. Captures are pushed while
//! descending and truncated when a branch is abandoned, so the surviving captures
//! are in left-to-right declaration order.
//!
//! ```text
//! /user/dashboard     static precedence
//! /user/:uid          {uid: "42"}        for /user/42
//! /item/:id:archive   {id: "55"}         for /item/55:archive, but not /item/55
//! /files/*:splat      {splat: "a/b/c"}   for /files/a/b/c
//! ```

use http::Method;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use super::core::{ParamVec, RouteAction};
use super::error::ConfigError;

/// Parsed form of one registered path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment {
    Static,
    Param {
        name: Arc<str>,
        /// Literal suffix including its leading `:`, e.g. `":archive"`
        verb: Option<Arc<str>>,
    },
    Wildcard {
        name: Arc<str>,
    },
}

impl Segment {
    /// `:name` is a parameter, `*:name` a wildcard, anything else is literal. A
    /// further `:suffix` after the name is a custom verb.
    pub(crate) fn parse(raw: &str) -> Self {
        let (name, wildcard) = if let Some(rest) = raw.strip_prefix("*:") {
            (rest, true)
        } else if let Some(rest) = raw.strip_prefix(':') {
            (rest, false)
        } else {
            return Segment::Static;
        };

        let (name, verb) = match name.find(':') {
            Some(i) => (&name[..i], Some(Arc::from(&name[i..]))),
            None => (name, None),
        };

        if wildcard {
            Segment::Wildcard {
                name: Arc::from(name),
            }
        } else {
            Segment::Param {
                name: Arc::from(name),
                verb,
            }
        }
    }

    fn capture_name(&self) -> Option<&Arc<str>> {
        match self {
            Segment::Static => None,
            Segment::Param { name, .. } | Segment::Wildcard { name } => Some(name),
        }
    }

    /// Value captured from `segment` by a param node, if it applies.
    fn capture<'s>(&self, segment: &'s str) -> Option<&'s str> {
        let Segment::Param { verb, .. } = self else {
            return None;
        };
        let value = match verb {
            Some(verb) => segment.strip_suffix(verb.as_ref())?,
            None => segment,
        };
        (!value.is_empty()).then_some(value)
    }
}

/// One node of the trie.
pub(crate) struct RouteNode {
    /// Segment text as registered (`""` for the root)
    raw: Cow<'static, str>,
    segment: Segment,
    /// Template from the root, e.g. `/user/:uid`
    pattern: Arc<str>,
    /// A registration path ends here
    terminal: bool,
    pub(crate) methods: HashMap<Method, Arc<RouteAction>>,
    pub(crate) all: Option<Arc<RouteAction>>,
    pub(crate) any: Option<Arc<RouteAction>>,
    pub(crate) name: Option<Arc<str>>,
    static_children: HashMap<String, RouteNode>,
    param_children: Vec<RouteNode>,
    wildcard: Option<Box<RouteNode>>,
}

impl RouteNode {
    pub(crate) fn root() -> Self {
        let mut root = Self::new(Cow::Borrowed(""), Segment::Static, Arc::from("/"));
        root.terminal = true;
        root
    }

    fn new(raw: Cow<'static, str>, segment: Segment, pattern: Arc<str>) -> Self {
        Self {
            raw,
            segment,
            pattern,
            terminal: false,
            methods: HashMap::new(),
            all: None,
            any: None,
            name: None,
            static_children: HashMap::new(),
            param_children: Vec::new(),
            wildcard: None,
        }
    }

    pub(crate) fn pattern(&self) -> &Arc<str> {
        &self.pattern
    }

    pub(crate) fn is_terminal(&self) -> bool {
        self.terminal
    }

    pub(crate) fn mark_terminal(&mut self) {
        self.terminal = true;
    }

    pub(crate) fn is_wildcard(&self) -> bool {
        matches!(self.segment, Segment::Wildcard { .. })
    }

    pub(crate) fn capture_name(&self) -> Option<&Arc<str>> {
        self.segment.capture_name()
    }

    fn child_pattern(&self, raw: &str) -> Arc<str> {
        if self.raw.is_empty() {
            Arc::from(format!("/{raw}"))
        } else {
            Arc::from(format!("{}/{raw}", self.pattern))
        }
    }

    /// Child for the registered segment `raw`, created if missing.
    ///
    /// Fails when a sibling parameter (or wildcard) already uses another name, and
    /// on a wildcard node, which swallows the rest of the path and has no children.
    pub(crate) fn child_mut(&mut self, raw: &str) -> Result<&mut RouteNode, ConfigError> {
        let segment = Segment::parse(raw);
        let pattern = self.child_pattern(raw);
        if let Segment::Wildcard { name } = &self.segment {
            return Err(ConfigError::WildcardNotLast {
                path: pattern.to_string(),
                param: name.to_string(),
            });
        }
        let owned = || Cow::Owned(raw.to_owned());

        match segment.clone() {
            Segment::Static => Ok(self
                .static_children
                .entry(raw.to_owned())
                .or_insert_with(|| RouteNode::new(owned(), segment, pattern))),
            Segment::Param { name, verb } => {
                if let Some(existing) = self
                    .param_children
                    .iter()
                    .filter_map(RouteNode::capture_name)
                    .find(|existing| **existing != name)
                {
                    return Err(ConfigError::ParamConflict {
                        setting: name.to_string(),
                        existing: existing.to_string(),
                    });
                }

                let index = match self.param_children.iter().position(|c| c.raw == raw) {
                    Some(index) => index,
                    None if verb.is_some() => {
                        let node = RouteNode::new(owned(), segment, pattern);
                        self.param_children.insert(0, node);
                        0
                    }
                    None => {
                        let node = RouteNode::new(owned(), segment, pattern);
                        self.param_children.push(node);
                        self.param_children.len() - 1
                    }
                };
                Ok(&mut self.param_children[index])
            }
            Segment::Wildcard { name } => {
                if let Some(existing) = self.wildcard.as_ref().and_then(|w| w.capture_name()) {
                    if *existing != name {
                        return Err(ConfigError::WildcardConflict {
                            setting: name.to_string(),
                            existing: existing.to_string(),
                        });
                    }
                }
                let node = self
                    .wildcard
                    .get_or_insert_with(|| Box::new(RouteNode::new(owned(), segment, pattern)));
                Ok(&mut **node)
            }
        }
    }

    /// Find the terminal node for `segments`, pushing captures into `params`.
    pub(crate) fn search<'n, S: AsRef<str>>(
        &'n self,
        segments: &[S],
        params: &mut ParamVec,
    ) -> Option<&'n RouteNode> {
        let Some((first, rest)) = segments.split_first() else {
            return self.terminal.then_some(self);
        };
        let first = first.as_ref();
        let mark = params.len();

        if let Some(child) = self.static_children.get(first) {
            if let Some(hit) = child.search(rest, params) {
                return Some(hit);
            }
            params.truncate(mark);
        }

        for child in &self.param_children {
            let (Some(name), Some(value)) = (child.capture_name(), child.segment.capture(first))
            else {
                continue;
            };
            params.push((Arc::clone(name), value.to_owned()));
            if let Some(hit) = child.search(rest, params) {
                return Some(hit);
            }
            params.truncate(mark);
        }

        let wildcard = self.wildcard.as_deref()?;
        let name = wildcard.capture_name()?;
        let joined = segments
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<&str>>()
            .join("/");
        params.push((Arc::clone(name), joined));
        Some(wildcard)
    }

    /// Visit every terminal node, parents before children.
    pub(crate) fn walk<'n>(&'n self, visit: &mut dyn FnMut(&'n RouteNode)) {
        if self.terminal {
            visit(self);
        }
        let mut statics: Vec<&RouteNode> = self.static_children.values().collect();
        statics.sort_by(|a, b| a.raw.cmp(&b.raw));
        for child in statics {
            child.walk(visit);
        }
        for child in &self.param_children {
            child.walk(visit);
        }
        if let Some(wildcard) = &self.wildcard {
            wildcard.walk(visit);
        }
    }
}
