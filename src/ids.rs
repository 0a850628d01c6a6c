use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

/// Accepted length range for a caller supplied request id.
pub const REQUEST_ID_LEN: std::ops::RangeInclusive<usize> = 10..=32;

/// Per-request identifier.
///
/// Generated ids are ULIDs. An id received in the `X-Reqid` header is kept
/// verbatim when it is 10 to 32 visible ASCII characters long, so callers can
/// correlate logs across services.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct RequestId(Arc<str>);

/// A string that is not an acceptable request id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidRequestId;

impl Display for InvalidRequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "request id must be {} to {} visible ASCII characters",
            REQUEST_ID_LEN.start(),
            REQUEST_ID_LEN.end()
        )
    }
}

impl std::error::Error for InvalidRequestId {}

impl RequestId {
    #[must_use]
    pub fn new() -> Self {
        Self::from_ulid(ulid::Ulid::new())
    }

    #[must_use]
    pub fn from_ulid(id: ulid::Ulid) -> Self {
        Self(Arc::from(id.to_string()))
    }

    /// Use the header value if it is acceptable; otherwise generate a new one.
    #[must_use]
    pub fn from_header_or_new(header_value: Option<&str>) -> Self {
        header_value
            .and_then(|s| s.parse::<RequestId>().ok())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The ULID behind a generated id.
    #[must_use]
    pub fn ulid(&self) -> Option<ulid::Ulid> {
        ulid::Ulid::from_string(&self.0).ok()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RequestId {
    type Err = InvalidRequestId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if REQUEST_ID_LEN.contains(&s.len()) && s.bytes().all(|b| b.is_ascii_graphic()) {
            Ok(RequestId(Arc::from(s)))
        } else {
            Err(InvalidRequestId)
        }
    }
}

impl Serialize for RequestId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RequestId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse::<RequestId>()
            .map_err(|_| serde::de::Error::custom("invalid request id"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_id_is_ulid() {
        let id = RequestId::new();
        assert_eq!(id.as_str().len(), 26);
        assert!(id.ulid().is_some());
    }

    #[test]
    fn test_header_value_bounds() {
        assert_eq!(
            RequestId::from_header_or_new(Some("abcdefghij")).as_str(),
            "abcdefghij"
        );
        let short = RequestId::from_header_or_new(Some("short"));
        assert_ne!(short.as_str(), "short");
        let long = "x".repeat(33);
        assert_ne!(RequestId::from_header_or_new(Some(&long)).as_str(), long);
        assert!("has space in it".parse::<RequestId>().is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let id: RequestId = "req-0123456789".parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"req-0123456789\"");
        let back: RequestId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
