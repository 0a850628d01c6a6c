//! # Inject Module
//!
//! Hierarchical dependency injection keyed by type and optional name.
//!
//! ## Overview
//!
//! An [`Injector`] is a scope of providers. A provider is either a ready value or a
//! factory whose own parameters are resolved on demand. Scopes form a chain: the
//! application scope is the root, every request gets a child of it, and the matched
//! route's filter chain runs in a child of the request scope. Lookups walk the chain
//! and stop at the first hit, so nested scopes shadow their parents.
//!
//! Three operations consume a scope:
//!
//! - [`Injector::find`] returns one value
//! - [`Injector::invoke`] calls a function with every parameter resolved
//! - [`Injector::apply`] fills the marked fields of a struct (see
//!   [`derive@crate::Injectable`])
//!
//! ## Factories and cycles
//!
//! Factory inputs are resolved against the scope that requested the value, which
//! lets a request scope feed a factory registered on the application. Each top level
//! operation opens a [`Resolver`] pass: a factory runs at most once per pass, and a
//! factory that needs its own output fails with [`ResolveError::Cycle`] instead of
//! recursing.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use strip::inject::Injector;
//!
//! struct Database(&'static str);
//! struct Repo { db: Arc<Database> }
//!
//! let app = Injector::new();
//! app.provide(Database("primary"));
//! app.provide_factory(|db: Arc<Database>| Arc::new(Repo { db }));
//!
//! let request = app.child();
//! let name = request
//!     .invoke(|repo: Arc<Repo>| repo.db.0)
//!     .unwrap();
//! assert_eq!(name, "primary");
//! ```

mod core;
mod error;
mod resolve;
#[cfg(test)]
mod tests;

pub use core::{Injector, ProviderKey};
pub use error::ResolveError;
pub(crate) use resolve::Frame;
pub use resolve::{InjectField, Injectable, Invoke, Named, ProviderName, Resolve, Resolver};
