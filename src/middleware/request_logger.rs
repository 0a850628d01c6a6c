use std::sync::Arc;
use std::time::Instant;
use tracing::Level;

use crate::dispatcher::{Context, DispatchError, Filter, Next};
use crate::ids::RequestId;
use crate::logging::Logger;
use crate::server::{Request, ResponseWriter};

pub const HEADER_REQID: &str = "X-Reqid";
pub const HEADER_RESPONSE_TIME: &str = "X-Response-Time";
pub const HEADER_REAL_IP: &str = "X-Real-Ip";
pub const HEADER_X_FORWARDED_FOR: &str = "X-Forwarded-For";

/// [`Logger`] bound to one request id.
///
/// Provided as `dyn Logger` in the request scope by [`request_logger`], so
/// anything resolving the logger after that filter gets request-tagged lines.
#[derive(Debug, Clone)]
pub struct RequestLogger {
    id: RequestId,
}

impl RequestLogger {
    #[must_use]
    pub fn new(id: RequestId) -> Self {
        Self { id }
    }

    #[must_use]
    pub fn request_id(&self) -> &RequestId {
        &self.id
    }
}

impl Logger for RequestLogger {
    fn log(&self, level: Level, message: &str) {
        let reqid = self.id.as_str();
        match level {
            Level::ERROR => tracing::error!(target: "strip::request", reqid, "{message}"),
            Level::WARN => tracing::warn!(target: "strip::request", reqid, "{message}"),
            Level::INFO => tracing::info!(target: "strip::request", reqid, "{message}"),
            Level::DEBUG => tracing::debug!(target: "strip::request", reqid, "{message}"),
            _ => tracing::trace!(target: "strip::request", reqid, "{message}"),
        }
    }
}

/// Client address from `X-Real-Ip`, else the first `X-Forwarded-For` hop.
fn real_ip(req: &Request) -> Option<String> {
    if let Some(ip) = req.header(HEADER_REAL_IP).map(str::trim) {
        if !ip.is_empty() {
            return Some(ip.to_owned());
        }
    }
    let first = req.header(HEADER_X_FORWARDED_FOR)?.split(',').next()?.trim();
    // drop a port, but not from a bare IPv6 address
    let host = match first.rsplit_once(':') {
        Some((host, _)) if !host.contains(':') => host,
        _ => first,
    };
    (!host.is_empty()).then(|| host.to_owned())
}

fn elapsed_ms(start: Instant) -> String {
    format!("{:.3}ms", start.elapsed().as_secs_f64() * 1000.0)
}

fn log_request(
    next: Next,
    ctx: Context,
    req: Arc<Request>,
    rw: Arc<ResponseWriter>,
) -> Result<(), DispatchError> {
    let id = RequestId::from_header_or_new(req.header(HEADER_REQID));
    rw.set_header_str(HEADER_REQID, id.as_str());

    let logger = RequestLogger::new(id.clone());
    ctx.provide(id);
    ctx.provide_as::<dyn Logger>(Arc::new(logger.clone()));

    let start = Instant::now();
    logger.info(&format!(
        "[REQ_BEG] {} {}{} {}",
        req.method(),
        req.path(),
        req.query().map(|q| format!("?{q}")).unwrap_or_default(),
        real_ip(&req).as_deref().unwrap_or("-"),
    ));

    let outcome = next.run();

    let elapsed = elapsed_ms(start);
    rw.set_header_str(HEADER_RESPONSE_TIME, &elapsed);
    logger.info(&format!(
        "[REQ_END] {} {:.3}k {}",
        rw.status().as_u16(),
        rw.size() as f64 / 1024.0,
        elapsed,
    ));
    outcome
}

/// Filter that tags the request with a [`RequestId`] and logs its start and end.
///
/// An incoming `X-Reqid` of 10 to 32 characters is reused, otherwise a ULID is
/// generated. The id is echoed in the `X-Reqid` response header, provided as
/// `Arc<RequestId>`, and a [`RequestLogger`] replaces `dyn Logger` for the rest
/// of the request. `X-Response-Time` is set once the chain returns.
#[must_use]
pub fn request_logger() -> Filter {
    Filter::new(log_request).named("request_logger")
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    #[test]
    fn test_real_ip_prefers_real_ip_header() {
        let req = Request::new(Method::GET, "/")
            .with_header(HEADER_REAL_IP, " 10.0.0.1 ")
            .with_header(HEADER_X_FORWARDED_FOR, "10.0.0.2");
        assert_eq!(real_ip(&req).as_deref(), Some("10.0.0.1"));
    }

    #[test]
    fn test_real_ip_forwarded_for_first_hop() {
        let req = Request::new(Method::GET, "/")
            .with_header(HEADER_X_FORWARDED_FOR, "192.168.1.7:5120, 10.0.0.2");
        assert_eq!(real_ip(&req).as_deref(), Some("192.168.1.7"));
        let req = Request::new(Method::GET, "/").with_header(HEADER_X_FORWARDED_FOR, "::1");
        assert_eq!(real_ip(&req).as_deref(), Some("::1"));
        assert_eq!(real_ip(&Request::new(Method::GET, "/")), None);
    }

    #[test]
    fn test_elapsed_format() {
        let text = elapsed_ms(Instant::now());
        assert!(text.ends_with("ms"));
        assert_eq!(text.split('.').nth(1).map(|s| s.len()), Some(5));
    }
}
