use http::StatusCode;
use std::sync::Arc;

use crate::dispatcher::Filter;
use crate::server::ResponseWriter;

/// Body of the default not-found response.
pub const NOT_FOUND_BODY: &str = "404 page not found";

fn write_not_found(rw: Arc<ResponseWriter>) {
    rw.set_header_str("content-type", "text/plain; charset=utf-8");
    rw.write_header(StatusCode::NOT_FOUND);
    rw.write(NOT_FOUND_BODY.as_bytes());
}

/// Default not-found action: `404` with [`NOT_FOUND_BODY`].
#[must_use]
pub fn not_found() -> Filter {
    Filter::new(write_not_found).named("not_found")
}
