//! # Middleware Module
//!
//! Built-in filters for the dispatch pipeline.
//!
//! | Filter | Placement | Behaviour |
//! |--------|-----------|-----------|
//! | [`recovery`] | first global filter | turns errors and panics from the rest of the chain into a 500 |
//! | [`request_logger`] | after recovery | request id, `[REQ_BEG]`/`[REQ_END]` lines, `X-Response-Time` |
//! | [`not_found`] | not-found chain | `404 page not found` |
//! | [`gzip`] | wraps handlers that write compressible bodies | gzips the buffered body for `Accept-Encoding: gzip` clients |
//! | [`serve_static`] | global, before routing | serves files under a path prefix, 404 for missing ones |
//!
//! The response writer is a single buffered `Arc<ResponseWriter>` per request, so
//! a filter cannot swap in a wrapping writer. Filters that transform output run
//! `Next::run` first and then rewrite the buffered body, as [`gzip`] does.
//!
//! ```rust
//! use strip::{middleware, App};
//!
//! let mut app = App::new();
//! app.filter(middleware::recovery())
//!     .filter(middleware::request_logger());
//! ```

mod gzip;
mod not_found;
mod recovery;
mod request_logger;
mod serve_static;

pub use gzip::{gzip, gzip_with_level};
pub use not_found::{not_found, NOT_FOUND_BODY};
pub use recovery::{recovery, INTERNAL_ERROR_BODY};
pub use request_logger::{
    request_logger, RequestLogger, HEADER_REAL_IP, HEADER_REQID, HEADER_RESPONSE_TIME,
    HEADER_X_FORWARDED_FOR,
};
pub use serve_static::{serve_static, serve_static_with, StaticOptions};
