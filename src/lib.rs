//! # strip
//!
//! **strip** is an embeddable HTTP toolkit for the `may` coroutine runtime: a
//! segment-trie router, a hierarchical dependency injector and re-entrant filter
//! pipelines whose handlers declare what they need as parameters.
//!
//! ## Architecture
//!
//! - **[`inject`]** - scoped providers (values, trait objects, factories), cycle
//!   detection, parameter resolution and `#[derive(Injectable)]` field injection
//! - **[`router`]** - route trie with static, `:param`, `:param:verb` and `*:rest`
//!   segments, nested route scopes, filter inheritance and exemptions
//! - **[`dispatcher`]** - [`Context`] and [`Next`]: ordered filters plus an action,
//!   function or controller targets, typed [`Path`] captures
//! - **[`middleware`]** - recovery, request logging and the default not-found
//! - **[`server`]** - request/response types and the `may_minihttp` adapter
//! - **[`config`]** - `section::key` lookup over TOML, environment and a parent
//! - **[`store`]** - key-value boundary for sessions and caches
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant Server as HttpServer<br/>(may_minihttp)
//!     participant Service
//!     participant Global as Global filters
//!     participant Trie as RouteTable
//!     participant Route as Route filters + action
//!
//!     Client->>Server: GET /user/42
//!     Server->>Service: handle(Request)
//!     Service->>Service: child scope: Arc<Request>, Arc<ResponseWriter>
//!     Service->>Global: run
//!     Global->>Trie: route(GET, /user/42)
//!     alt miss
//!         Trie-->>Global: not-found chain
//!     else hit
//!         Trie-->>Route: nested context + Arc<RouteInfo>
//!         Route->>Route: filters, then action
//!     end
//!     Service-->>Server: Response (200 if nothing written)
//!     Server-->>Client: HTTP response
//! ```
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use http::Method;
//! use strip::router::{get, Routes};
//! use strip::server::{Request, ResponseWriter};
//! use strip::{App, Path};
//!
//! trait Greeter: Send + Sync {
//!     fn greet(&self, uid: u64) -> String;
//! }
//!
//! struct Plain;
//! impl Greeter for Plain {
//!     fn greet(&self, uid: u64) -> String {
//!         format!("hi user {uid}")
//!     }
//! }
//!
//! fn show(Path(uid): Path<u64>, greeter: Arc<dyn Greeter>, rw: Arc<ResponseWriter>) {
//!     rw.write(greeter.greet(uid).as_bytes());
//! }
//!
//! let mut app = App::new();
//! app.provide_as::<dyn Greeter>(Arc::new(Plain));
//! app.routers(Routes::new().nest("/user/:uid", Routes::new().handle(get(show))))
//!     .unwrap();
//!
//! let res = app.build().handle(Request::new(Method::GET, "/user/42"));
//! assert_eq!(res.body_str(), "hi user 42");
//! ```
//!
//! ## Runtime
//!
//! `strip serve` (see [`cli`]) initialises logging from `STRIP_LOG_*`, applies
//! [`RuntimeConfig`](runtime_config::RuntimeConfig) to `may`, and serves through
//! [`HttpServer`](server::HttpServer).

// the Injectable derive refers to this crate as `::strip`
extern crate self as strip;

pub mod app;
pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod ids;
pub mod inject;
pub mod logging;
pub mod middleware;
pub mod router;
pub mod runtime_config;
pub mod server;
pub mod store;

pub use app::{App, Service};
pub use dispatcher::{Context, DispatchError, Filter, Next, Path};
pub use router::{RouteInfo, Routes};
pub use strip_macros::Injectable;
