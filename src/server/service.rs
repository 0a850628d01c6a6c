use http::StatusCode;
use may_minihttp::{HttpService, Request as WireRequest, Response as WireResponse};
use std::io;
use std::panic::{self, AssertUnwindSafe};
use tracing::{error, warn};

use super::request::from_wire;
use super::response::Response;
use crate::app::Service;

/// `may_minihttp` adapter around a built [`Service`].
#[derive(Clone)]
pub struct AppService {
    service: Service,
    max_body_bytes: usize,
}

impl std::fmt::Debug for AppService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppService")
            .field("service", &self.service)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish()
    }
}

impl AppService {
    /// Body limit is taken from the service's `AppConfig`.
    #[must_use]
    pub fn new(service: Service) -> Self {
        let max_body_bytes = service.config().max_body_bytes;
        Self {
            service,
            max_body_bytes,
        }
    }

    #[must_use]
    pub fn service(&self) -> &Service {
        &self.service
    }
}

/// Reason phrase for the status line.
fn status_reason(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("Unknown")
}

fn write_plain(res: &mut WireResponse, status: StatusCode, body: &str) {
    res.status_code(usize::from(status.as_u16()), status_reason(status));
    res.header("Content-Type: text/plain; charset=utf-8");
    res.body_vec(body.as_bytes().to_vec());
}

/// Copy a buffered [`Response`] onto the wire.
fn write_response(res: &mut WireResponse, response: Response) {
    res.status_code(usize::from(response.status.as_u16()), status_reason(response.status));
    for (name, value) in &response.headers {
        let Ok(value) = value.to_str() else {
            warn!(header = %name, "Dropping non-ASCII response header");
            continue;
        };
        // TODO: drop the leak once may_minihttp accepts owned header lines
        let line = format!("{}: {}", name.as_str(), value).into_boxed_str();
        res.header(Box::leak(line));
    }
    res.body_vec(response.body);
}

impl HttpService for AppService {
    fn call(&mut self, req: WireRequest, res: &mut WireResponse) -> io::Result<()> {
        let request = match from_wire(req, self.max_body_bytes) {
            Ok(request) => request,
            Err(err) => {
                warn!(error = %err, "Rejecting malformed request");
                write_plain(res, StatusCode::BAD_REQUEST, "400 Bad Request");
                return Ok(());
            }
        };

        let service = &self.service;
        match panic::catch_unwind(AssertUnwindSafe(|| service.handle(request))) {
            Ok(response) => write_response(res, response),
            Err(payload) => {
                let err = crate::dispatcher::DispatchError::from_panic(&*payload);
                error!(error = %err, "Handler panicked outside a recovery filter");
                write_plain(
                    res,
                    StatusCode::INTERNAL_SERVER_ERROR,
                    crate::middleware::INTERNAL_ERROR_BODY,
                );
            }
        }
        Ok(())
    }
}
