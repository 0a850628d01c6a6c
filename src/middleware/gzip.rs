use flate2::write::GzEncoder;
use flate2::Compression;
use http::header::{HeaderValue, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, VARY};
use std::io::{self, Write};
use std::sync::Arc;
use tracing::debug;

use crate::dispatcher::{DispatchError, Filter, Next};
use crate::server::{Request, ResponseWriter};

fn accepts_gzip(req: &Request) -> bool {
    req.header("accept-encoding")
        .is_some_and(|value| value.contains("gzip"))
}

fn sniff_content_type(body: &[u8]) -> &'static str {
    match std::str::from_utf8(body) {
        Ok(text) if text.trim_start().starts_with('<') => "text/html; charset=utf-8",
        Ok(_) => "text/plain; charset=utf-8",
        Err(_) => "application/octet-stream",
    }
}

fn compress(body: &[u8], level: Compression) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(body.len() / 2), level);
    encoder.write_all(body)?;
    encoder.finish()
}

fn gzip_response(
    level: Compression,
    next: Next,
    req: Arc<Request>,
    rw: Arc<ResponseWriter>,
) -> Result<(), DispatchError> {
    if !accepts_gzip(&req) {
        return next.run();
    }

    let outcome = next.run();

    if rw.header(CONTENT_ENCODING.as_str()).is_some() {
        return outcome;
    }
    let body = rw.replace_body(Vec::new());
    if body.is_empty() {
        return outcome;
    }

    match compress(&body, level) {
        Ok(packed) => {
            debug!(plain = body.len(), packed = packed.len(), "Compressed response");
            if rw.header(CONTENT_TYPE.as_str()).is_none() {
                rw.set_header(CONTENT_TYPE, HeaderValue::from_static(sniff_content_type(&body)));
            }
            rw.remove_header(&CONTENT_LENGTH);
            rw.set_header(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
            rw.append_header(VARY, HeaderValue::from_static("Accept-Encoding"));
            rw.replace_body(packed);
        }
        Err(err) => {
            debug!(error = %err, "Compression failed, sending plain body");
            rw.replace_body(body);
        }
    }
    outcome
}

/// Filter that gzips the response body when the client sends
/// `Accept-Encoding: gzip`.
///
/// The rest of the chain runs first and writes into the buffered response; the
/// body is then compressed in place, `Content-Encoding: gzip` and
/// `Vary: Accept-Encoding` are set and any `Content-Length` is dropped. Empty
/// bodies and responses that already carry a `Content-Encoding` are left alone.
#[must_use]
pub fn gzip() -> Filter {
    gzip_with_level(Compression::default())
}

/// [`gzip`] with an explicit compression level.
#[must_use]
pub fn gzip_with_level(level: Compression) -> Filter {
    Filter::new(move |next: Next, req: Arc<Request>, rw: Arc<ResponseWriter>| {
        gzip_response(level, next, req, rw)
    })
    .named("gzip")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_content_type() {
        assert_eq!(sniff_content_type(b"<!doctype html>"), "text/html; charset=utf-8");
        assert_eq!(sniff_content_type(b"hello"), "text/plain; charset=utf-8");
        assert_eq!(sniff_content_type(&[0xff, 0xfe, 0x00]), "application/octet-stream");
    }

    #[test]
    fn test_accepts_gzip() {
        let req = Request::new(http::Method::GET, "/").with_header("Accept-Encoding", "br, gzip");
        assert!(accepts_gzip(&req));
        assert!(!accepts_gzip(&Request::new(http::Method::GET, "/")));
    }
}
