use std::fmt;

/// Failure while resolving a dependency.
///
/// Returned by [`Injector::find`](super::Injector::find),
/// [`Injector::invoke`](super::Injector::invoke) and
/// [`Injector::apply`](super::Injector::apply). None of these are fatal by
/// themselves; the dispatch pipeline turns them into a `DispatchError` and leaves
/// the decision to the recovery filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// No provider for the key exists in the scope or any of its parents
    NotFound {
        /// Type that was requested
        type_name: &'static str,
        /// Provider name, if a named provider was requested
        name: Option<String>,
    },
    /// A factory (transitively) requires the value it is producing
    ///
    /// `path` lists the keys from the first occurrence of the repeated key down to
    /// the repeated key itself, e.g. `["Service", "dyn Logger", "Service"]`.
    Cycle {
        /// Resolution path that closes the cycle
        path: Vec<String>,
    },
    /// The stored value does not have the type its key promises
    TypeMismatch {
        /// Type that was requested
        type_name: &'static str,
    },
    /// A pipeline-only value (`Context`, `Next`, `Path`) was requested outside
    /// of a running filter chain
    NoContext {
        /// Type that was requested
        type_name: &'static str,
    },
    /// A typed route capture could not be produced
    Capture {
        /// Capture key, or the expected position when counts differ
        key: String,
        /// Human readable reason
        reason: String,
    },
}

impl ResolveError {
    /// `true` for [`ResolveError::Cycle`]
    #[must_use]
    pub fn is_cycle(&self) -> bool {
        matches!(self, ResolveError::Cycle { .. })
    }

    /// `true` for [`ResolveError::NotFound`]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, ResolveError::NotFound { .. })
    }
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::NotFound {
                type_name,
                name: Some(name),
            } => write!(f, "value not found for type `{type_name}` named `{name}`"),
            ResolveError::NotFound {
                type_name,
                name: None,
            } => write!(f, "value not found for type `{type_name}`"),
            ResolveError::Cycle { path } => {
                write!(f, "cycle dependencies detected: {}", path.join(" -> "))
            }
            ResolveError::TypeMismatch { type_name } => {
                write!(f, "provider registered for `{type_name}` holds a different type")
            }
            ResolveError::NoContext { type_name } => write!(
                f,
                "`{type_name}` can only be resolved inside a running filter chain"
            ),
            ResolveError::Capture { key, reason } => {
                write!(f, "route capture `{key}` is invalid: {reason}")
            }
        }
    }
}

impl std::error::Error for ResolveError {}
