use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::Method;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::io::{self, Read};
use tracing::debug;

/// Inbound request as seen by filters and actions.
///
/// Provided into every request scope as `Arc<Request>`. The transport adapter
/// builds it from the wire; tests build it directly:
///
/// ```rust
/// use http::Method;
/// use strip::server::Request;
///
/// let req = Request::new(Method::GET, "/user/42?tab=posts")
///     .with_header("x-reqid", "0123456789ab")
///     .with_body(b"{}".to_vec());
/// assert_eq!(req.path(), "/user/42");
/// assert_eq!(req.query_param("tab").as_deref(), Some("posts"));
/// assert_eq!(req.header("X-Reqid"), Some("0123456789ab"));
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    query: Option<String>,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Request {
    /// `uri` may carry a query string; it is split off the path.
    #[must_use]
    pub fn new(method: Method, uri: &str) -> Self {
        let (path, query) = match uri.split_once('?') {
            Some((path, query)) => (path, Some(query.to_owned())),
            None => (uri, None),
        };
        let path = if path.is_empty() { "/" } else { path };
        Self {
            method,
            path: path.to_owned(),
            query,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    /// Add a header. Invalid names or values are skipped.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path without the query string, as received (not decoded).
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Decoded query pairs in order of appearance.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.query
            .as_deref()
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Last value of a query parameter.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.query_pairs()
            .into_iter()
            .rev()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// First value of a header, if it is valid UTF-8. Names are case-insensitive.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn body_reader(&self) -> impl Read + '_ {
        io::Cursor::new(self.body.as_slice())
    }

    #[must_use]
    pub fn body_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Deserialize the body as JSON.
    ///
    /// # Errors
    ///
    /// The `serde_json` error for an empty or malformed body.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// Convert a `may_minihttp::Request`, reading at most `max_body_bytes` of body.
///
/// # Errors
///
/// `InvalidInput` for an unparsable method or an oversized body; read errors
/// are passed through.
pub(crate) fn from_wire(req: may_minihttp::Request, max_body_bytes: usize) -> io::Result<Request> {
    let method = Method::from_bytes(req.method().to_ascii_uppercase().as_bytes())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let mut request = Request::new(method, req.path());

    for h in req.headers().iter() {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(h.name.as_bytes()),
            HeaderValue::from_bytes(h.value),
        ) {
            request.headers.append(name, value);
        }
    }

    let limit = u64::try_from(max_body_bytes).unwrap_or(u64::MAX);
    let mut body = Vec::new();
    req.body().take(limit.saturating_add(1)).read_to_end(&mut body)?;
    if body.len() > max_body_bytes {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("request body exceeds {max_body_bytes} bytes"),
        ));
    }
    request.body = body;

    debug!(
        method = %request.method,
        path = %request.path,
        header_count = request.headers.len(),
        body_size_bytes = request.body.len(),
        "Request parsed"
    );
    Ok(request)
}
