//! Per-request dispatch context and the `Next` continuation.

use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use tracing::trace;

use super::error::DispatchError;
use super::handler::{Filter, Handler};
use crate::inject::{Injector, Resolve, ResolveError, Resolver};
use crate::server::ResponseWriter;

struct ContextInner {
    injector: Injector,
    response: Arc<ResponseWriter>,
    filters: Arc<[Filter]>,
    terminal: Option<Handler>,
}

/// A filter chain bound to one request.
///
/// Holds the request scope, the response writer, the ordered filters and the
/// terminal action. Positions `0..N` are the filters and position `N` is the
/// action. Contexts live on the request's coroutine and are never shared between
/// requests; cloning one is cheap and refers to the same chain.
///
/// Handlers receive it by declaring a `Context` parameter.
#[derive(Clone)]
pub struct Context {
    inner: Rc<ContextInner>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("filters", &self.inner.filters)
            .field("has_terminal", &self.inner.terminal.is_some())
            .field("written", &self.inner.response.written())
            .finish()
    }
}

impl Context {
    pub(crate) fn new(
        injector: Injector,
        response: Arc<ResponseWriter>,
        filters: Arc<[Filter]>,
        terminal: Option<Handler>,
    ) -> Self {
        Self {
            inner: Rc::new(ContextInner {
                injector,
                response,
                filters,
                terminal,
            }),
        }
    }

    /// Context for a sub-chain: a child scope of this one, the same response.
    pub(crate) fn nested(&self, filters: Arc<[Filter]>, terminal: Option<Handler>) -> Self {
        Self::new(
            self.inner.injector.child(),
            Arc::clone(&self.inner.response),
            filters,
            terminal,
        )
    }

    /// Scope of this chain.
    #[must_use]
    pub fn injector(&self) -> &Injector {
        &self.inner.injector
    }

    /// Provide a value to every handler that runs after this point, including
    /// nested chains.
    pub fn provide<T: Send + Sync + 'static>(&self, value: T) {
        self.inner.injector.provide(value);
    }

    pub fn provide_as<T: ?Sized + Send + Sync + 'static>(&self, value: Arc<T>) {
        self.inner.injector.provide_as::<T>(value);
    }

    /// Resolve a value from this chain's scope.
    ///
    /// # Errors
    ///
    /// See [`Injector::find`].
    pub fn find<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, ResolveError> {
        self.inner.injector.find::<T>()
    }

    #[must_use]
    pub fn response(&self) -> &Arc<ResponseWriter> {
        &self.inner.response
    }

    /// `true` once anything was written to the response.
    #[must_use]
    pub fn written(&self) -> bool {
        self.inner.response.written()
    }

    /// Run the chain from the first filter.
    ///
    /// # Errors
    ///
    /// The first failing handler's error. Nothing after it runs.
    pub fn run(&self) -> Result<(), DispatchError> {
        self.run_from(0)
    }

    /// Run positions `start..=N`.
    ///
    /// Each handler is invoked with its parameters resolved in a fresh pass. The
    /// loop stops after a handler that took a [`Next`] (it owns the remainder),
    /// after a handler that wrote the response, or after the terminal action.
    /// The written check follows each invocation, so a filter that writes and
    /// then calls [`Next::run`] still runs exactly one more handler.
    pub(crate) fn run_from(&self, start: usize) -> Result<(), DispatchError> {
        let count = self.inner.filters.len();
        let mut position = start;

        while position <= count {
            let handler = match self.inner.filters.get(position) {
                Some(filter) => {
                    trace!(position, filter = filter.name(), "running filter");
                    filter.handler()
                }
                None => match &self.inner.terminal {
                    Some(terminal) => {
                        trace!(position, "running action");
                        terminal
                    }
                    None => break,
                },
            };

            let resolver = Resolver::in_frame(&self.inner.injector, self, position);
            handler(&resolver)?;

            if resolver.yielded() || self.inner.response.written() {
                break;
            }
            position += 1;
        }
        Ok(())
    }
}

impl Resolve for Context {
    fn resolve(resolver: &Resolver<'_>) -> Result<Self, ResolveError> {
        resolver
            .frame()
            .map(|frame| frame.context.clone())
            .ok_or(ResolveError::NoContext {
                type_name: "Context",
            })
    }
}

/// Continuation handed to a filter: the rest of the chain.
///
/// Taking a `Next` parameter means the filter is in charge of the remainder; if
/// it returns without calling [`Next::run`], nothing after it runs. Code placed
/// after `run()` executes once the downstream chain has fully finished.
///
/// ```rust
/// use strip::dispatcher::{DispatchError, Next};
///
/// fn timing(next: Next) -> Result<(), DispatchError> {
///     let start = std::time::Instant::now();
///     next.run()?;
///     tracing::info!(elapsed_us = start.elapsed().as_micros() as u64, "done");
///     Ok(())
/// }
/// # let _ = strip::dispatcher::Filter::new(timing);
/// ```
#[must_use = "the rest of the chain only runs when `run` is called"]
pub struct Next {
    context: Context,
    position: usize,
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("position", &self.position)
            .finish()
    }
}

impl Next {
    /// Run everything after the current handler.
    ///
    /// # Errors
    ///
    /// The first failing downstream handler's error.
    pub fn run(self) -> Result<(), DispatchError> {
        self.context.run_from(self.position + 1)
    }

    /// Context of the chain being continued.
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.context
    }
}

impl Resolve for Next {
    fn resolve(resolver: &Resolver<'_>) -> Result<Self, ResolveError> {
        let frame = resolver.frame().ok_or(ResolveError::NoContext { type_name: "Next" })?;
        resolver.mark_yielded();
        Ok(Next {
            context: frame.context.clone(),
            position: frame.position,
        })
    }
}
