//! Resolution passes, parameter resolution and field injection.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;

use super::core::{Erased, Injector, ProviderKey, Slot};
use super::error::ResolveError;
use crate::dispatcher::Context;

/// Position of the running handler inside a filter chain.
#[derive(Clone, Copy)]
pub(crate) struct Frame<'a> {
    pub(crate) context: &'a Context,
    pub(crate) position: usize,
}

#[derive(Default)]
struct PassState {
    /// Factory keys currently being produced, outermost first
    stack: Vec<ProviderKey>,
    /// Factory results produced during this pass
    produced: HashMap<ProviderKey, Erased>,
}

/// One resolution pass over a scope.
///
/// Every top level `find`/`invoke`/`apply` opens a pass. Within a pass each
/// factory runs at most once, and a factory that (transitively) asks for its own
/// key is reported as a cycle instead of recursing.
pub struct Resolver<'a> {
    scope: &'a Injector,
    frame: Option<Frame<'a>>,
    state: RefCell<PassState>,
    yielded: Cell<bool>,
}

impl fmt::Debug for Resolver<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("scope", self.scope)
            .field("in_pipeline", &self.frame.is_some())
            .finish()
    }
}

impl<'a> Resolver<'a> {
    #[must_use]
    pub fn new(scope: &'a Injector) -> Self {
        Self {
            scope,
            frame: None,
            state: RefCell::new(PassState::default()),
            yielded: Cell::new(false),
        }
    }

    pub(crate) fn in_frame(scope: &'a Injector, context: &'a Context, position: usize) -> Self {
        Self {
            frame: Some(Frame { context, position }),
            ..Self::new(scope)
        }
    }

    /// Scope this pass resolves against.
    #[must_use]
    pub fn scope(&self) -> &'a Injector {
        self.scope
    }

    pub(crate) fn frame(&self) -> Option<Frame<'a>> {
        self.frame
    }

    /// Record that the running handler took ownership of the rest of the chain.
    pub(crate) fn mark_yielded(&self) {
        self.yielded.set(true);
    }

    pub(crate) fn yielded(&self) -> bool {
        self.yielded.get()
    }

    /// Resolve the unnamed provider of `T`.
    ///
    /// # Errors
    ///
    /// See [`ResolveError`].
    pub fn resolve<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, ResolveError> {
        self.resolve_named::<T>(None)
    }

    /// Resolve the provider of `T`, named or not.
    ///
    /// # Errors
    ///
    /// See [`ResolveError`].
    pub fn resolve_named<T: ?Sized + Send + Sync + 'static>(
        &self,
        name: Option<&str>,
    ) -> Result<Arc<T>, ResolveError> {
        let key = ProviderKey::of::<T>(name);
        let cached = self.state.borrow().produced.get(&key).cloned();
        if let Some(value) = cached {
            return downcast::<T>(&key, &value);
        }

        let slot = self.scope.lookup(&key).ok_or_else(|| key.not_found())?;
        let value = match slot {
            Slot::Value(value) => value,
            Slot::Factory(factory) => {
                self.enter(&key)?;
                // the borrow is released before the factory resolves its own inputs
                let produced = factory(self);
                self.state.borrow_mut().stack.pop();
                let value = produced?;
                self.state
                    .borrow_mut()
                    .produced
                    .insert(key.clone(), Arc::clone(&value));
                value
            }
        };
        downcast::<T>(&key, &value)
    }

    /// Like [`Resolver::resolve_named`] but a missing key yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Anything other than the key itself being absent (a cycle, a failing
    /// factory input) is still an error.
    pub fn try_resolve<T: ?Sized + Send + Sync + 'static>(
        &self,
        name: Option<&str>,
    ) -> Result<Option<Arc<T>>, ResolveError> {
        let key = ProviderKey::of::<T>(name);
        let known = self.state.borrow().produced.contains_key(&key)
            || self.scope.lookup(&key).is_some();
        if known {
            self.resolve_named::<T>(name).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Call `f` with its parameters resolved in this pass.
    ///
    /// # Errors
    ///
    /// The first parameter that fails to resolve.
    pub fn invoke<Args, F: Invoke<Args>>(&self, f: F) -> Result<F::Output, ResolveError> {
        f.invoke(self)
    }

    /// Fill the injectable fields of `target` in this pass.
    ///
    /// # Errors
    ///
    /// The first field that fails to resolve.
    pub fn apply<T: Injectable + ?Sized>(&self, target: &mut T) -> Result<(), ResolveError> {
        target.inject_fields(self)
    }

    fn enter(&self, key: &ProviderKey) -> Result<(), ResolveError> {
        let mut state = self.state.borrow_mut();
        if let Some(start) = state.stack.iter().position(|k| k == key) {
            let mut path: Vec<String> = state.stack[start..].iter().map(ToString::to_string).collect();
            path.push(key.to_string());
            tracing::debug!(path = ?path, "dependency cycle");
            return Err(ResolveError::Cycle { path });
        }
        state.stack.push(key.clone());
        Ok(())
    }
}

fn downcast<T: ?Sized + Send + Sync + 'static>(
    key: &ProviderKey,
    value: &Erased,
) -> Result<Arc<T>, ResolveError> {
    let any: &(dyn Any + Send + Sync) = value.as_ref();
    any.downcast_ref::<Arc<T>>()
        .cloned()
        .ok_or(ResolveError::TypeMismatch {
            type_name: key.type_name(),
        })
}

/// A value that can be produced for a handler or factory parameter.
pub trait Resolve: Sized {
    /// # Errors
    ///
    /// See [`ResolveError`].
    fn resolve(resolver: &Resolver<'_>) -> Result<Self, ResolveError>;
}

impl<T: ?Sized + Send + Sync + 'static> Resolve for Arc<T> {
    fn resolve(resolver: &Resolver<'_>) -> Result<Self, ResolveError> {
        resolver.resolve::<T>()
    }
}

/// Optional dependency: `None` only when nothing provides `T`.
impl<T: ?Sized + Send + Sync + 'static> Resolve for Option<Arc<T>> {
    fn resolve(resolver: &Resolver<'_>) -> Result<Self, ResolveError> {
        resolver.try_resolve::<T>(None)
    }
}

/// The scope the pass resolves against. Filters use it to provide values to
/// everything after them in the chain.
impl Resolve for Injector {
    fn resolve(resolver: &Resolver<'_>) -> Result<Self, ResolveError> {
        Ok(resolver.scope().clone())
    }
}

/// Compile-time provider name for [`Named`].
pub trait ProviderName: 'static {
    const NAME: &'static str;
}

/// Declare zero-sized [`ProviderName`] markers.
///
/// ```rust
/// strip::provider_name!(pub Post = "post");
/// # use strip::inject::ProviderName;
/// assert_eq!(Post::NAME, "post");
/// ```
#[macro_export]
macro_rules! provider_name {
    ($($vis:vis $marker:ident = $name:literal),+ $(,)?) => {
        $(
            #[derive(Debug, Clone, Copy, Default)]
            $vis struct $marker;

            impl $crate::inject::ProviderName for $marker {
                const NAME: &'static str = $name;
            }
        )+
    };
}

/// A parameter resolved from the provider registered under `N::NAME`.
pub struct Named<T: ?Sized, N: ProviderName> {
    value: Arc<T>,
    _name: PhantomData<fn() -> N>,
}

impl<T: ?Sized, N: ProviderName> Named<T, N> {
    #[must_use]
    pub fn into_inner(self) -> Arc<T> {
        self.value
    }
}

impl<T: ?Sized, N: ProviderName> Deref for Named<T, N> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: ?Sized + fmt::Debug, N: ProviderName> fmt::Debug for Named<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Named")
            .field("name", &N::NAME)
            .field("value", &&*self.value)
            .finish()
    }
}

impl<T: ?Sized + Send + Sync + 'static, N: ProviderName> Resolve for Named<T, N> {
    fn resolve(resolver: &Resolver<'_>) -> Result<Self, ResolveError> {
        Ok(Self {
            value: resolver.resolve_named::<T>(Some(N::NAME))?,
            _name: PhantomData,
        })
    }
}

/// A callable whose parameters can all be resolved.
///
/// Implemented for every `FnOnce` of up to eight [`Resolve`] parameters. `Args` is
/// the parameter tuple and only exists to keep the implementations apart.
pub trait Invoke<Args> {
    type Output;

    /// # Errors
    ///
    /// The first parameter that fails to resolve; later parameters are not
    /// attempted.
    fn invoke(self, resolver: &Resolver<'_>) -> Result<Self::Output, ResolveError>;
}

macro_rules! impl_invoke {
    ($($arg:ident),*) => {
        impl<Func, Out, $($arg,)*> Invoke<($($arg,)*)> for Func
        where
            Func: FnOnce($($arg),*) -> Out,
            $($arg: Resolve,)*
        {
            type Output = Out;

            #[allow(non_snake_case, unused_variables)]
            fn invoke(self, resolver: &Resolver<'_>) -> Result<Out, ResolveError> {
                $(let $arg = <$arg as Resolve>::resolve(resolver)?;)*
                Ok(self($($arg),*))
            }
        }
    };
}

impl_invoke!();
impl_invoke!(A1);
impl_invoke!(A1, A2);
impl_invoke!(A1, A2, A3);
impl_invoke!(A1, A2, A3, A4);
impl_invoke!(A1, A2, A3, A4, A5);
impl_invoke!(A1, A2, A3, A4, A5, A6);
impl_invoke!(A1, A2, A3, A4, A5, A6, A7);
impl_invoke!(A1, A2, A3, A4, A5, A6, A7, A8);

/// A struct whose fields can be filled from a scope.
///
/// Usually derived with `#[derive(Injectable)]`; see the crate root.
pub trait Injectable {
    /// # Errors
    ///
    /// The first field that fails to resolve.
    fn inject_fields(&mut self, resolver: &Resolver<'_>) -> Result<(), ResolveError>;
}

impl<T: Injectable + ?Sized> Injectable for Box<T> {
    fn inject_fields(&mut self, resolver: &Resolver<'_>) -> Result<(), ResolveError> {
        (**self).inject_fields(resolver)
    }
}

/// An absent embedded struct is allocated before its fields are filled.
impl<T: Injectable + Default> Injectable for Option<Box<T>> {
    fn inject_fields(&mut self, resolver: &Resolver<'_>) -> Result<(), ResolveError> {
        self.get_or_insert_with(Box::default).inject_fields(resolver)
    }
}

/// A field type the derive can resolve.
///
/// A missing provider is an error for both forms; `Option<Arc<T>>` only marks the
/// field as unset until injection.
pub trait InjectField: Sized {
    /// # Errors
    ///
    /// See [`ResolveError`].
    fn resolve_field(resolver: &Resolver<'_>, name: Option<&str>) -> Result<Self, ResolveError>;
}

impl<T: ?Sized + Send + Sync + 'static> InjectField for Arc<T> {
    fn resolve_field(resolver: &Resolver<'_>, name: Option<&str>) -> Result<Self, ResolveError> {
        resolver.resolve_named::<T>(name)
    }
}

impl<T: ?Sized + Send + Sync + 'static> InjectField for Option<Arc<T>> {
    fn resolve_field(resolver: &Resolver<'_>, name: Option<&str>) -> Result<Self, ResolveError> {
        resolver.resolve_named::<T>(name).map(Some)
    }
}
