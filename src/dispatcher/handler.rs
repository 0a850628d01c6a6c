//! Handler erasure: filters, targets and controllers.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use super::error::DispatchError;
use crate::inject::{Injectable, Invoke, Resolver};

/// Type-erased handler invoked by the pipeline.
pub(crate) type Handler = Arc<dyn Fn(&Resolver<'_>) -> Result<(), DispatchError> + Send + Sync>;

pub(crate) fn into_handler<F>(f: F) -> Handler
where
    F: Fn(&Resolver<'_>) -> Result<(), DispatchError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wrap any resolvable callable into a [`Handler`].
pub(crate) fn handler<Args, F>(f: F) -> Handler
where
    Args: 'static,
    F: Invoke<Args> + Clone + Send + Sync + 'static,
    F::Output: IntoOutcome,
{
    into_handler(move |resolver| f.clone().invoke(resolver)?.into_outcome())
}

/// What a handler may return.
pub trait IntoOutcome {
    /// # Errors
    ///
    /// The handler's own error, converted.
    fn into_outcome(self) -> Result<(), DispatchError>;
}

impl IntoOutcome for () {
    fn into_outcome(self) -> Result<(), DispatchError> {
        Ok(())
    }
}

impl<E: Into<DispatchError>> IntoOutcome for Result<(), E> {
    fn into_outcome(self) -> Result<(), DispatchError> {
        self.map_err(Into::into)
    }
}

/// A middleware function placed in a filter chain.
///
/// Any function whose parameters implement [`Resolve`](crate::inject::Resolve)
/// and which returns `()` or `Result<(), E>` can be a filter. A filter that takes
/// a [`Next`](super::Next) owns the rest of the chain: it decides whether, and
/// when, to call [`Next::run`](super::Next::run). Filters without one are
/// advanced automatically unless they wrote a response.
///
/// Filters are compared by identity for exemptions, so keep the value and pass
/// clones of it around:
///
/// ```rust
/// use strip::dispatcher::Filter;
/// let auth = Filter::new(|| ());
/// let copy = auth.clone();
/// assert!(auth.same(&copy));
/// assert!(!auth.same(&Filter::new(|| ())));
/// ```
#[derive(Clone)]
pub struct Filter {
    handler: Handler,
    name: Arc<str>,
}

impl Filter {
    pub fn new<Args, F>(f: F) -> Self
    where
        Args: 'static,
        F: Invoke<Args> + Clone + Send + Sync + 'static,
        F::Output: IntoOutcome,
    {
        Self {
            handler: handler(f),
            name: Arc::from(std::any::type_name::<F>()),
        }
    }

    /// Replace the diagnostic name (defaults to the function's type name).
    #[must_use]
    pub fn named(mut self, name: impl AsRef<str>) -> Self {
        self.name = Arc::from(name.as_ref());
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `true` when both values come from the same [`Filter::new`] call.
    #[must_use]
    pub fn same(&self, other: &Filter) -> bool {
        Arc::ptr_eq(&self.handler, &other.handler)
    }

    pub(crate) fn handler(&self) -> &Handler {
        &self.handler
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Filter").field(&self.name).finish()
    }
}

/// A struct-based handler with named actions.
///
/// For every request the registered prototype is cloned, its `#[inject]` fields
/// are filled from the request scope, and the action picked by the router is
/// called.
///
/// ```rust
/// use std::sync::Arc;
/// use strip::Injectable;
/// use strip::dispatcher::{Controller, DispatchError};
/// use strip::inject::Resolver;
/// use strip::server::ResponseWriter;
///
/// #[derive(Clone, Default, Injectable)]
/// struct Users {
///     #[inject]
///     rw: Option<Arc<ResponseWriter>>,
/// }
///
/// impl Controller for Users {
///     fn has_action(&self, name: &str) -> bool {
///         matches!(name, "Get" | "Archive")
///     }
///
///     fn call_action(&mut self, name: &str, _r: &Resolver<'_>) -> Result<(), DispatchError> {
///         if let Some(rw) = &self.rw {
///             rw.write(name.as_bytes());
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Controller: Clone + Injectable + Send + Sync + 'static {
    /// `true` when `name` can be passed to [`Controller::call_action`].
    fn has_action(&self, name: &str) -> bool;

    /// Run the action `name`. `resolver` is the request's resolution pass, so
    /// actions can pull further values with [`Resolver::invoke`].
    ///
    /// # Errors
    ///
    /// Whatever the action reports.
    fn call_action(&mut self, name: &str, resolver: &Resolver<'_>) -> Result<(), DispatchError>;
}

trait ErasedController: Send + Sync {
    fn has_action(&self, name: &str) -> bool;
    fn dispatch(&self, action: &str, resolver: &Resolver<'_>) -> Result<(), DispatchError>;
    fn type_name(&self) -> &'static str;
}

struct Prototype<C>(C);

impl<C: Controller> ErasedController for Prototype<C> {
    fn has_action(&self, name: &str) -> bool {
        self.0.has_action(name)
    }

    fn dispatch(&self, action: &str, resolver: &Resolver<'_>) -> Result<(), DispatchError> {
        let mut instance = self.0.clone();
        resolver.apply(&mut instance)?;
        instance.call_action(action, resolver)
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<C>()
    }
}

#[derive(Clone)]
enum TargetKind {
    Function(Handler),
    Controller(Arc<dyn ErasedController>),
}

/// What a route binding runs: a function or a controller prototype.
#[derive(Clone)]
pub struct Target(TargetKind);

impl Target {
    pub fn function<Args, F>(f: F) -> Self
    where
        Args: 'static,
        F: Invoke<Args> + Clone + Send + Sync + 'static,
        F::Output: IntoOutcome,
    {
        Self(TargetKind::Function(handler(f)))
    }

    pub fn controller<C: Controller>(prototype: C) -> Self {
        Self(TargetKind::Controller(Arc::new(Prototype(prototype))))
    }

    #[must_use]
    pub fn is_function(&self) -> bool {
        matches!(self.0, TargetKind::Function(_))
    }

    /// Controller action lookup; always `false` for functions.
    #[must_use]
    pub fn has_action(&self, name: &str) -> bool {
        match &self.0 {
            TargetKind::Function(_) => false,
            TargetKind::Controller(c) => c.has_action(name),
        }
    }

    /// Handler that runs this target with the given action.
    pub(crate) fn handler(&self, action: &Arc<str>) -> Handler {
        match &self.0 {
            TargetKind::Function(h) => Arc::clone(h),
            TargetKind::Controller(c) => {
                let controller = Arc::clone(c);
                let action = Arc::clone(action);
                into_handler(move |resolver| controller.dispatch(&action, resolver))
            }
        }
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            TargetKind::Function(_) => f.write_str("Target::Function"),
            TargetKind::Controller(c) => write!(f, "Target::Controller({})", c.type_name()),
        }
    }
}

/// Anything a route binding accepts: functions, controllers, or a ready
/// [`Target`]. `M` only separates the implementations.
pub trait IntoTarget<M> {
    fn into_target(self) -> Target;
}

#[doc(hidden)]
pub struct FunctionTarget<Args>(PhantomData<fn() -> Args>);

#[doc(hidden)]
pub struct ControllerTarget;

impl<Args, F> IntoTarget<FunctionTarget<Args>> for F
where
    Args: 'static,
    F: Invoke<Args> + Clone + Send + Sync + 'static,
    F::Output: IntoOutcome,
{
    fn into_target(self) -> Target {
        Target::function::<Args, F>(self)
    }
}

impl<C: Controller> IntoTarget<ControllerTarget> for C {
    fn into_target(self) -> Target {
        Target::controller(self)
    }
}

impl IntoTarget<Target> for Target {
    fn into_target(self) -> Target {
        self
    }
}
