//! # Server Module
//!
//! Transport boundary between the network and the dispatch pipeline.
//!
//! - [`Request`] and [`ResponseWriter`] are what filters and actions see
//! - [`Response`] is the buffered result of [`Service::handle`](crate::Service::handle)
//! - [`AppService`] adapts a [`Service`](crate::Service) to `may_minihttp`
//! - [`HttpServer`] binds a listener and returns a [`ServerHandle`]

mod http_server;
mod request;
mod response;
mod service;

pub use http_server::{HttpServer, ServerHandle, MAX_HEADERS};
pub use request::Request;
pub use response::{Response, ResponseWriter};
pub use service::AppService;
