//! Provider tables and scope chaining.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use dashmap::DashMap;

use super::error::ResolveError;
use super::resolve::{Injectable, Invoke, Resolver};

/// Type-erased provider value. The concrete type behind the `Any` is always
/// `Arc<T>` for the key's `T`, which lets unsized capabilities (`dyn Logger`)
/// share the same table as plain values.
pub(crate) type Erased = Arc<dyn Any + Send + Sync>;

pub(crate) type FactoryFn =
    Arc<dyn Fn(&Resolver<'_>) -> Result<Erased, ResolveError> + Send + Sync>;

/// Lookup key: the requested type plus an optional provider name.
#[derive(Clone)]
pub struct ProviderKey {
    type_id: TypeId,
    type_name: &'static str,
    name: Option<Arc<str>>,
}

impl ProviderKey {
    /// Key for `T`, optionally named.
    #[must_use]
    pub fn of<T: ?Sized + 'static>(name: Option<&str>) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            name: name.map(Arc::from),
        }
    }

    /// Fully qualified type name, used in diagnostics only.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Provider name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub(crate) fn not_found(&self) -> ResolveError {
        ResolveError::NotFound {
            type_name: self.type_name,
            name: self.name.as_deref().map(str::to_owned),
        }
    }
}

impl PartialEq for ProviderKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.name == other.name
    }
}

impl Eq for ProviderKey {}

impl Hash for ProviderKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
        self.name.hash(state);
    }
}

impl fmt::Debug for ProviderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for ProviderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}({name})", self.type_name),
            None => f.write_str(self.type_name),
        }
    }
}

#[derive(Clone)]
pub(crate) enum Slot {
    Value(Erased),
    Factory(FactoryFn),
}

struct InjectorInner {
    slots: DashMap<ProviderKey, Slot>,
    parent: Option<Injector>,
}

/// A scope of providers with an optional parent scope.
///
/// Lookups walk from the scope towards the root and stop at the first hit, so a
/// child can shadow anything its parents provide. Registration is internally
/// synchronised; an `Injector` is cheap to clone and every clone refers to the same
/// scope.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use strip::inject::Injector;
///
/// let root = Injector::new();
/// root.provide(String::from("root"));
///
/// let child = root.child();
/// child.provide_named("post", String::from("child"));
///
/// assert_eq!(*child.find::<String>().unwrap(), "root");
/// assert_eq!(*child.find_named::<String>("post").unwrap(), "child");
/// assert!(root.find_named::<String>("post").is_err());
/// ```
#[derive(Clone)]
pub struct Injector {
    inner: Arc<InjectorInner>,
}

impl Default for Injector {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Injector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injector")
            .field("providers", &self.inner.slots.len())
            .field("has_parent", &self.inner.parent.is_some())
            .finish()
    }
}

impl Injector {
    /// Empty root scope.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(InjectorInner {
                slots: DashMap::new(),
                parent: None,
            }),
        }
    }

    /// Empty scope whose lookups fall back to `parent`.
    #[must_use]
    pub fn with_parent(parent: &Injector) -> Self {
        Self {
            inner: Arc::new(InjectorInner {
                slots: DashMap::new(),
                parent: Some(parent.clone()),
            }),
        }
    }

    /// Shorthand for [`Injector::with_parent`] on `self`.
    #[must_use]
    pub fn child(&self) -> Self {
        Self::with_parent(self)
    }

    #[must_use]
    pub fn parent(&self) -> Option<&Injector> {
        self.inner.parent.as_ref()
    }

    /// Number of providers registered directly in this scope.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.slots.is_empty()
    }

    /// Register a value under its own type.
    ///
    /// Note that `provide(Arc::new(x))` registers `Arc<X>`, not `X`; use
    /// [`Injector::provide_as`] to hand over an existing `Arc`.
    pub fn provide<T: Send + Sync + 'static>(&self, value: T) -> &Self {
        self.provide_as::<T>(Arc::new(value))
    }

    /// Register a value under its own type and a provider name.
    pub fn provide_named<T: Send + Sync + 'static>(
        &self,
        name: impl AsRef<str>,
        value: T,
    ) -> &Self {
        self.provide_as_named::<T>(name, Arc::new(value))
    }

    /// Register an `Arc<T>` under `T`. `T` may be a trait object:
    ///
    /// ```rust
    /// # use std::sync::Arc;
    /// # use strip::inject::Injector;
    /// trait Greeter: Send + Sync { fn hello(&self) -> &'static str; }
    /// struct En;
    /// impl Greeter for En { fn hello(&self) -> &'static str { "hello" } }
    ///
    /// let injector = Injector::new();
    /// injector.provide_as::<dyn Greeter>(Arc::new(En));
    /// assert_eq!(injector.find::<dyn Greeter>().unwrap().hello(), "hello");
    /// ```
    pub fn provide_as<T: ?Sized + Send + Sync + 'static>(&self, value: Arc<T>) -> &Self {
        self.insert(ProviderKey::of::<T>(None), Slot::Value(Arc::new(value)));
        self
    }

    pub fn provide_as_named<T: ?Sized + Send + Sync + 'static>(
        &self,
        name: impl AsRef<str>,
        value: Arc<T>,
    ) -> &Self {
        self.insert(
            ProviderKey::of::<T>(Some(name.as_ref())),
            Slot::Value(Arc::new(value)),
        );
        self
    }

    /// Register a factory producing `Arc<T>`.
    ///
    /// The factory's parameters are resolved from the scope that asks for `T`
    /// (not the scope the factory was registered in). It runs once per resolution
    /// pass at most and its result is not memoised across passes.
    pub fn provide_factory<T, Args, F>(&self, factory: F) -> &Self
    where
        T: ?Sized + Send + Sync + 'static,
        Args: 'static,
        F: Invoke<Args, Output = Arc<T>> + Clone + Send + Sync + 'static,
    {
        self.insert(
            ProviderKey::of::<T>(None),
            Slot::Factory(erase::<T, Args, F>(factory)),
        );
        self
    }

    pub fn provide_factory_named<T, Args, F>(&self, name: impl AsRef<str>, factory: F) -> &Self
    where
        T: ?Sized + Send + Sync + 'static,
        Args: 'static,
        F: Invoke<Args, Output = Arc<T>> + Clone + Send + Sync + 'static,
    {
        self.insert(
            ProviderKey::of::<T>(Some(name.as_ref())),
            Slot::Factory(erase::<T, Args, F>(factory)),
        );
        self
    }

    /// Resolve `T` from this scope.
    ///
    /// # Errors
    ///
    /// `NotFound` when no scope in the chain provides `T`, `Cycle` when a factory
    /// depends on itself.
    pub fn find<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, ResolveError> {
        Resolver::new(self).resolve::<T>()
    }

    /// Resolve the provider of `T` registered under `name`.
    ///
    /// # Errors
    ///
    /// Same as [`Injector::find`].
    pub fn find_named<T: ?Sized + Send + Sync + 'static>(
        &self,
        name: &str,
    ) -> Result<Arc<T>, ResolveError> {
        Resolver::new(self).resolve_named::<T>(Some(name))
    }

    /// Call `f` with every parameter resolved from this scope, in declared order.
    ///
    /// # Errors
    ///
    /// The first parameter that fails to resolve aborts the call.
    pub fn invoke<Args, F: Invoke<Args>>(&self, f: F) -> Result<F::Output, ResolveError> {
        Resolver::new(self).invoke(f)
    }

    /// Fill the injectable fields of `target`.
    ///
    /// # Errors
    ///
    /// The first field that fails to resolve aborts; fields visited before it
    /// keep their new values.
    pub fn apply<T: Injectable + ?Sized>(&self, target: &mut T) -> Result<(), ResolveError> {
        Resolver::new(self).apply(target)
    }

    /// `true` when this scope or one of its parents provides the key.
    #[must_use]
    pub fn contains<T: ?Sized + 'static>(&self, name: Option<&str>) -> bool {
        self.lookup(&ProviderKey::of::<T>(name)).is_some()
    }

    fn insert(&self, key: ProviderKey, slot: Slot) {
        tracing::trace!(key = %key, factory = matches!(slot, Slot::Factory(_)), "provider registered");
        self.inner.slots.insert(key, slot);
    }

    /// Walk the scope chain and return the first matching slot.
    pub(crate) fn lookup(&self, key: &ProviderKey) -> Option<Slot> {
        let mut scope = Some(self);
        while let Some(current) = scope {
            if let Some(slot) = current.inner.slots.get(key) {
                return Some(slot.value().clone());
            }
            scope = current.inner.parent.as_ref();
        }
        None
    }
}

fn erase<T, Args, F>(factory: F) -> FactoryFn
where
    T: ?Sized + Send + Sync + 'static,
    Args: 'static,
    F: Invoke<Args, Output = Arc<T>> + Clone + Send + Sync + 'static,
{
    erase_fn(move |resolver| {
        let value: Arc<T> = factory.clone().invoke(resolver)?;
        Ok(Arc::new(value) as Erased)
    })
}

fn erase_fn<F>(f: F) -> FactoryFn
where
    F: Fn(&Resolver<'_>) -> Result<Erased, ResolveError> + Send + Sync + 'static,
{
    Arc::new(f)
}
