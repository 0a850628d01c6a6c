//! Application shell: [`App`] collects providers, filters and routes, and
//! [`App::build`] freezes them into a shareable [`Service`].
//!
//! ```rust
//! use std::sync::Arc;
//! use http::Method;
//! use strip::router::{get, Routes};
//! use strip::server::{Request, ResponseWriter};
//! use strip::{middleware, App, Path};
//!
//! fn hello(Path(name): Path<String>, rw: Arc<ResponseWriter>) {
//!     rw.write(format!("hello {name}").as_bytes());
//! }
//!
//! let mut app = App::new();
//! app.filter(middleware::recovery());
//! app.routers(Routes::new().nest("/hello/:name", Routes::new().handle(get(hello))))
//!     .unwrap();
//! let service = app.build();
//!
//! let res = service.handle(Request::new(Method::GET, "/hello/strip"));
//! assert_eq!(res.status, 200);
//! assert_eq!(res.body_str(), "hello strip");
//! assert_eq!(res.header("x-powered-by"), Some("Teapot"));
//! ```

use http::{Method, StatusCode};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::config::{AppConfig, Configer};
use crate::dispatcher::{into_handler, Context, DispatchError, Filter, Handler};
use crate::inject::{Injector, Invoke, ResolveError};
use crate::logging::{Logger, TracingLogger};
use crate::middleware;
use crate::router::{ConfigError, RouteTable, Routes};
use crate::server::{Request, Response, ResponseWriter};

/// Value of the `X-Powered-By` header set on every response.
pub const POWERED_BY: &str = "Teapot";

/// Configuration phase of an application.
///
/// Everything registered here is frozen by [`App::build`]; there is no way to
/// add routes once the [`Service`] exists.
pub struct App {
    injector: Injector,
    filters: Vec<Filter>,
    not_found: Vec<Filter>,
    table: RouteTable,
    config: AppConfig,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("filters", &self.filters)
            .field("not_found", &self.not_found)
            .field("routes", &self.table.len())
            .field("config", &self.config)
            .finish()
    }
}

impl App {
    /// Root scope with a [`TracingLogger`] as `dyn Logger` and the default
    /// [`AppConfig`], no filters, no routes and the default not-found chain.
    #[must_use]
    pub fn new() -> Self {
        let injector = Injector::new();
        let config = AppConfig::default();
        injector.provide_as::<dyn Logger>(Arc::new(TracingLogger));
        injector.provide(config.clone());
        Self {
            injector,
            filters: Vec::new(),
            not_found: vec![middleware::not_found()],
            table: RouteTable::new(),
            config,
        }
    }

    /// Root scope; every request scope is a child of it.
    #[must_use]
    pub fn injector(&self) -> &Injector {
        &self.injector
    }

    pub fn provide<T: Send + Sync + 'static>(&mut self, value: T) -> &mut Self {
        self.injector.provide(value);
        self
    }

    pub fn provide_named<T: Send + Sync + 'static>(
        &mut self,
        name: impl AsRef<str>,
        value: T,
    ) -> &mut Self {
        self.injector.provide_named(name, value);
        self
    }

    pub fn provide_as<T: ?Sized + Send + Sync + 'static>(&mut self, value: Arc<T>) -> &mut Self {
        self.injector.provide_as::<T>(value);
        self
    }

    pub fn provide_as_named<T: ?Sized + Send + Sync + 'static>(
        &mut self,
        name: impl AsRef<str>,
        value: Arc<T>,
    ) -> &mut Self {
        self.injector.provide_as_named::<T>(name, value);
        self
    }

    /// See [`Injector::provide_factory`].
    pub fn provide_factory<T, Args, F>(&mut self, factory: F) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        Args: 'static,
        F: Invoke<Args, Output = Arc<T>> + Clone + Send + Sync + 'static,
    {
        self.injector.provide_factory::<T, Args, F>(factory);
        self
    }

    pub fn provide_factory_named<T, Args, F>(
        &mut self,
        name: impl AsRef<str>,
        factory: F,
    ) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        Args: 'static,
        F: Invoke<Args, Output = Arc<T>> + Clone + Send + Sync + 'static,
    {
        self.injector
            .provide_factory_named::<T, Args, F>(name, factory);
        self
    }

    /// Append a global filter. Global filters run before the route is matched,
    /// so route scopes cannot exempt them.
    pub fn filter(&mut self, filter: Filter) -> &mut Self {
        self.filters.push(filter);
        self
    }

    /// Replace the chain that runs when no route matches.
    pub fn not_found(&mut self, filters: Vec<Filter>) -> &mut Self {
        self.not_found = filters;
        self
    }

    /// Merge a route tree into the trie. May be called repeatedly.
    ///
    /// # Errors
    ///
    /// The first [`ConfigError`] found; bindings processed before it stay
    /// registered.
    pub fn routers(&mut self, routes: Routes) -> Result<&mut Self, ConfigError> {
        self.table.configure(routes)?;
        Ok(self)
    }

    /// Replace the `dyn Logger` of the root scope.
    pub fn set_logger(&mut self, logger: Arc<dyn Logger>) -> &mut Self {
        self.injector.provide_as::<dyn Logger>(logger);
        self
    }

    /// Provide `config` as `dyn Configer` and rebind [`AppConfig`] from it.
    pub fn import_config(&mut self, config: Arc<dyn Configer>) -> &mut Self {
        self.config = AppConfig::from_configer(config.as_ref());
        debug!(
            run_mode = %self.config.run_mode,
            listen_addr = %self.config.listen_addr(),
            "Application config imported"
        );
        self.injector.provide_as::<dyn Configer>(config);
        self.injector.provide(self.config.clone());
        self
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Freeze the application.
    #[must_use]
    pub fn build(self) -> Service {
        let table = Arc::new(self.table);
        let not_found: Arc<[Filter]> = self.not_found.into();
        let dispatch = route_dispatch(Arc::clone(&table), not_found);

        info!(
            routes_count = table.len(),
            global_filters = self.filters.len(),
            run_mode = %self.config.run_mode,
            "Application built"
        );

        Service {
            inner: Arc::new(ServiceInner {
                injector: self.injector,
                filters: self.filters.into(),
                dispatch,
                table,
                config: Arc::new(self.config),
            }),
        }
    }
}

/// Terminal action of the global chain: match the route and run its chain in a
/// nested context.
fn route_dispatch(table: Arc<RouteTable>, not_found: Arc<[Filter]>) -> Handler {
    into_handler(move |resolver| {
        let frame = resolver.frame().ok_or(ResolveError::NoContext {
            type_name: "Context",
        })?;
        let ctx: &Context = frame.context;
        let req = resolver.resolve::<Request>()?;

        let method = normalize_method(req.method());
        match table.route(&method, req.path()) {
            None => ctx.nested(Arc::clone(&not_found), None).run(),
            Some(hit) => {
                let action = hit.action.target().handler(&hit.action_name);
                let nested = ctx.nested(Arc::clone(&hit.action.filters), Some(action));
                nested.provide(hit.info);
                nested.run()
            }
        }
    })
}

/// Route lookups use upper-case method names.
fn normalize_method(method: &Method) -> Method {
    let raw = method.as_str();
    if !raw.bytes().any(|b| b.is_ascii_lowercase()) {
        return method.clone();
    }
    Method::from_bytes(raw.to_ascii_uppercase().as_bytes()).unwrap_or_else(|_| method.clone())
}

struct ServiceInner {
    injector: Injector,
    filters: Arc<[Filter]>,
    dispatch: Handler,
    table: Arc<RouteTable>,
    config: Arc<AppConfig>,
}

/// A built application. Cheap to clone and shareable between workers.
#[derive(Clone)]
pub struct Service {
    inner: Arc<ServiceInner>,
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("filters", &self.inner.filters)
            .field("routes", &self.inner.table.len())
            .finish()
    }
}

impl Service {
    /// Serve one request.
    ///
    /// Runs the global filters and route dispatch in a fresh child scope that
    /// provides `Arc<Request>` and `Arc<ResponseWriter>`. An error nobody
    /// recovered is logged and answered with `500` when possible; a response
    /// nobody wrote is `200` with an empty body.
    #[must_use]
    pub fn handle(&self, request: Request) -> Response {
        let response = Arc::new(ResponseWriter::new());
        response.set_header_str("x-powered-by", POWERED_BY);

        let scope = self.inner.injector.child();
        scope.provide(request);
        scope.provide_as::<ResponseWriter>(Arc::clone(&response));

        let context = Context::new(
            scope.clone(),
            Arc::clone(&response),
            Arc::clone(&self.inner.filters),
            Some(Arc::clone(&self.inner.dispatch)),
        );

        if let Err(err) = context.run() {
            self.report(&scope, &err);
            if !response.written() {
                response.write_header(StatusCode::INTERNAL_SERVER_ERROR);
                response.write(middleware::INTERNAL_ERROR_BODY.as_bytes());
            }
        }
        if !response.written() {
            response.write_header(StatusCode::OK);
        }
        response.take()
    }

    fn report(&self, scope: &Injector, err: &DispatchError) {
        match scope.find::<dyn Logger>() {
            Ok(logger) => logger.error(&format!("unrecovered dispatch error: {err}")),
            Err(_) => error!(error = %err, "Unrecovered dispatch error"),
        }
    }

    #[must_use]
    pub fn table(&self) -> &RouteTable {
        &self.inner.table
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Root scope of the application.
    #[must_use]
    pub fn injector(&self) -> &Injector {
        &self.inner.injector
    }
}
