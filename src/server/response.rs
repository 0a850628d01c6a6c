use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::StatusCode;
use serde::Serialize;
use std::borrow::Cow;
use std::io;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct ResponseState {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Vec<u8>,
    written: bool,
}

/// Response sink shared by every handler of one request.
///
/// Provided into the request scope as `Arc<ResponseWriter>`. Output is buffered
/// and flushed by the transport once the chain is done. The first
/// [`write_header`](ResponseWriter::write_header) or
/// [`write`](ResponseWriter::write) marks the response as written, which stops the
/// filter chain after the current handler. Headers stay editable until the
/// transport flushes, so wrapping filters can still add them after `Next::run`.
#[derive(Default)]
pub struct ResponseWriter {
    state: Mutex<ResponseState>,
}

impl std::fmt::Debug for ResponseWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("ResponseWriter")
            .field("status", &state.status)
            .field("headers", &state.headers)
            .field("body_len", &state.body.len())
            .field("written", &state.written)
            .finish()
    }
}

impl ResponseWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ResponseState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Commit the status line. Ignored once the response was written.
    pub fn write_header(&self, status: StatusCode) {
        let mut state = self.lock();
        if !state.written {
            state.status = Some(status);
            state.written = true;
        }
    }

    /// Append to the body, committing `200 OK` if no status was set yet.
    /// Returns the number of bytes accepted.
    pub fn write(&self, bytes: &[u8]) -> usize {
        let mut state = self.lock();
        if state.status.is_none() {
            state.status = Some(StatusCode::OK);
        }
        state.written = true;
        state.body.extend_from_slice(bytes);
        bytes.len()
    }

    /// `true` once a status or body byte has been committed.
    #[must_use]
    pub fn written(&self) -> bool {
        self.lock().written
    }

    /// Committed status, `200` if none yet.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.lock().status.unwrap_or(StatusCode::OK)
    }

    /// Body bytes written so far.
    #[must_use]
    pub fn size(&self) -> usize {
        self.lock().body.len()
    }

    /// Replace a header.
    pub fn set_header(&self, name: HeaderName, value: HeaderValue) {
        self.lock().headers.insert(name, value);
    }

    /// Replace a header from strings; invalid names or values are ignored and
    /// reported as `false`.
    pub fn set_header_str(&self, name: &str, value: &str) -> bool {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.set_header(name, value);
                true
            }
            _ => false,
        }
    }

    /// Serialize `value` as the JSON body with `status` and a JSON content type.
    ///
    /// # Errors
    ///
    /// The serialization error; nothing is written in that case.
    pub fn write_json<T: Serialize + ?Sized>(
        &self,
        status: StatusCode,
        value: &T,
    ) -> Result<(), serde_json::Error> {
        let body = serde_json::to_vec(value)?;
        self.set_header(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        self.write_header(status);
        self.write(&body);
        Ok(())
    }

    /// Add a header value without replacing existing ones.
    pub fn append_header(&self, name: HeaderName, value: HeaderValue) {
        self.lock().headers.append(name, value);
    }

    /// Drop every value of a header. Returns whether one was present.
    pub fn remove_header(&self, name: &HeaderName) -> bool {
        self.lock().headers.remove(name).is_some()
    }

    /// Swap the buffered body for `body` and return the previous bytes.
    ///
    /// Status and written state are left as they are. Wrapping filters use this
    /// after `Next::run` to post-process what the rest of the chain wrote.
    pub fn replace_body(&self, body: Vec<u8>) -> Vec<u8> {
        std::mem::replace(&mut self.lock().body, body)
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<String> {
        self.lock()
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    }

    /// Take everything written so far.
    pub(crate) fn take(&self) -> Response {
        let mut state = self.lock();
        let state = std::mem::take(&mut *state);
        Response {
            status: state.status.unwrap_or(StatusCode::OK),
            headers: state.headers,
            body: state.body,
        }
    }
}

impl io::Write for &ResponseWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(ResponseWriter::write(self, buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Finished response handed back to the transport.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl Response {
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    #[must_use]
    pub fn body_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}
