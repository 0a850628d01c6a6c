use std::fmt;

use crate::inject::ResolveError;

/// Failure raised while running a filter chain.
///
/// Propagates out of [`Next::run`](super::Next::run) so that a wrapping filter
/// (usually [`recovery`](crate::middleware::recovery)) can turn it into a
/// response.
#[derive(Debug)]
pub enum DispatchError {
    /// A handler parameter or controller field could not be resolved
    Resolve(ResolveError),
    /// A handler returned an error
    Handler(anyhow::Error),
    /// A handler panicked; carries the panic message
    Panic(String),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Resolve(err) => write!(f, "dependency resolution failed: {err}"),
            DispatchError::Handler(err) => write!(f, "handler failed: {err:#}"),
            DispatchError::Panic(msg) => write!(f, "handler panicked: {msg}"),
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatchError::Resolve(err) => Some(err),
            DispatchError::Handler(err) => Some(&**err),
            DispatchError::Panic(_) => None,
        }
    }
}

impl From<ResolveError> for DispatchError {
    fn from(err: ResolveError) -> Self {
        DispatchError::Resolve(err)
    }
}

impl From<anyhow::Error> for DispatchError {
    fn from(err: anyhow::Error) -> Self {
        DispatchError::Handler(err)
    }
}

impl DispatchError {
    /// Build from a `catch_unwind` payload.
    #[must_use]
    pub fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let msg = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_owned()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_owned()
        };
        DispatchError::Panic(msg)
    }
}
