//! # Dispatcher Module
//!
//! Runs a request through an ordered chain of filters and a terminal action.
//!
//! ## Overview
//!
//! A [`Context`] owns the request scope (an [`Injector`](crate::inject::Injector)
//! whose parent is the enclosing scope), the response writer, the filter list and
//! the action. Running the chain invokes every handler through the injector, so
//! handlers simply declare what they need:
//!
//! ```rust,ignore
//! fn show(Path(uid): Path<u64>, rw: Arc<ResponseWriter>, users: Arc<dyn UserStore>) {
//!     // ...
//! }
//! ```
//!
//! ## Continuations
//!
//! The chain is a flat list walked by position. A filter that declares a
//! [`Next`] parameter takes over the rest of the walk and can run code before and
//! after it, which gives onion-style wrapping:
//!
//! ```text
//! timing(next)     start ──────────────────────────────── elapsed
//! auth()                   check
//! action()                         write body
//! ```
//!
//! Filters without `Next` are advanced automatically. Every step stops the walk
//! once the response has been written.
//!
//! ## Errors
//!
//! Resolution failures and handler errors become [`DispatchError`] and unwind
//! through every enclosing `Next::run`. The
//! [`recovery`](crate::middleware::recovery) filter, placed first, turns them
//! (and panics) into a 500 response.
//!
//! ## Targets
//!
//! A route binding runs a [`Target`]: either a function or a [`Controller`]
//! prototype that is cloned, field-injected and asked to run a named action.

mod context;
mod error;
mod handler;
mod path;

pub use context::{Context, Next};
pub use error::DispatchError;
pub(crate) use handler::{handler, into_handler, Handler};
pub use handler::{
    Controller, ControllerTarget, Filter, FunctionTarget, IntoOutcome, IntoTarget, Target,
};
pub use path::{FromCaptures, Path};
