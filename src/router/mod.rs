//! # Router Module
//!
//! The router maps a method and a path to a handler binding. It is built once at
//! startup from declarative [`Routes`] and is read-only while serving.
//!
//! ## Overview
//!
//! - **Trie**: one node per path segment, with static, parameter (`:id`,
//!   `:id:verb`) and wildcard (`*:rest`) children
//! - **Registrar**: walks [`Routes`] scopes, merges filter lists and stores one
//!   [`RouteAction`] per method, plus the `ALL` and `ANY` fallbacks
//! - **Matching**: depth first with backtracking (static, then params, then
//!   wildcard) followed by method resolution at the terminal node
//!
//! ## Method resolution
//!
//! 1. The binding for the method itself
//! 2. For `HEAD`, the `GET` binding
//! 3. The `ALL` binding, if its target can serve the method
//! 4. The `ANY` binding
//!
//! A path that matches a node with no usable binding is a miss, exactly like a
//! path that matches nothing.
//!
//! ## Configuration errors
//!
//! Conflicting sibling parameter names, conflicting wildcard names, a wildcard
//! that is not the last segment of its router path, an empty router path and
//! unknown controller actions are reported as [`ConfigError`] by
//! [`RouteTable::configure`].

mod core;
mod error;
mod radix;
mod registrar;

pub use core::{
    default_action_name, ParamVec, RouteAction, RouteInfo, RouteMatch, RouteTable,
    MAX_INLINE_PARAMS,
};
pub(crate) use core::split_path;
pub use error::ConfigError;
pub use registrar::{all, any, delete, get, head, method, options, patch, post, put, MethodRoute, Routes};
