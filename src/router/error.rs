use std::fmt;

/// Route configuration failure.
///
/// Returned by [`RouteTable::configure`](super::RouteTable::configure) and
/// `App::routers`. These are startup errors: the route topology is static, so
/// callers usually fail fast on them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A nested router was declared with an empty path or `/`
    EmptyRouterPath {
        /// The path as written
        path: String,
    },
    /// Two sibling parameter segments use different names
    ParamConflict {
        /// Name in the registration being applied
        setting: String,
        /// Name already present in the trie
        existing: String,
    },
    /// Two sibling wildcard segments use different names
    WildcardConflict {
        setting: String,
        existing: String,
    },
    /// A wildcard segment is followed by more segments
    WildcardNotLast {
        /// Router path as written
        path: String,
        /// Wildcard capture name
        param: String,
    },
    /// A controller binding names an action the controller does not have
    UnknownAction {
        /// Action name
        action: String,
    },
    /// Two routers carry the same route name
    DuplicateRouteName {
        name: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EmptyRouterPath { path } => write!(f, "path can not be `{path}`"),
            ConfigError::ParamConflict { setting, existing }
            | ConfigError::WildcardConflict { setting, existing } => write!(
                f,
                "route param conflict, please change `:{setting}` to `:{existing}`"
            ),
            ConfigError::WildcardNotLast { path, param } => write!(
                f,
                "wild route `{path}` must end with route param `:{param}`"
            ),
            ConfigError::UnknownAction { action } => {
                write!(f, "controller has no action named `{action}`")
            }
            ConfigError::DuplicateRouteName { name } => {
                write!(f, "route name `{name}` is already in use")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
