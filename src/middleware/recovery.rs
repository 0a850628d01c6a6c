use http::StatusCode;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::error;

use crate::dispatcher::{DispatchError, Filter, Next};
use crate::logging::Logger;

/// Body written when the chain fails before writing anything.
pub const INTERNAL_ERROR_BODY: &str = "500 Internal Server Error";

fn recover(next: Next, logger: Option<Arc<dyn Logger>>) {
    let context = next.context().clone();

    let err = match panic::catch_unwind(AssertUnwindSafe(|| next.run())) {
        Ok(Ok(())) => return,
        Ok(Err(err)) => err,
        Err(payload) => DispatchError::from_panic(&*payload),
    };

    match &logger {
        Some(logger) => logger.error(&format!("request failed: {err}")),
        None => error!(error = %err, "Request failed"),
    }

    if !context.written() {
        let rw = context.response();
        rw.set_header_str("content-type", "text/plain; charset=utf-8");
        rw.write_header(StatusCode::INTERNAL_SERVER_ERROR);
        rw.write(INTERNAL_ERROR_BODY.as_bytes());
    }
}

/// Filter that runs the rest of the chain and converts a returned
/// [`DispatchError`] or a panic into a `500` response.
///
/// Place it first so that it wraps every other filter. Failures are reported
/// through the resolved [`Logger`]; an already written response is left alone.
#[must_use]
pub fn recovery() -> Filter {
    Filter::new(recover).named("recovery")
}
