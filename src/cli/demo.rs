//! Demo application served by `strip serve`.

use anyhow::Result;
use http::StatusCode;
use std::sync::Arc;

use crate::config::{AppConfig, Configer};
use crate::dispatcher::{Controller, DispatchError, Filter, Next};
use crate::inject::Resolver;
use crate::router::{all, get, method, post, Routes};
use crate::server::{Request, ResponseWriter};
use crate::store::{MemoryStore, Store};
use crate::{middleware, App, Injectable, Path, RouteInfo};

fn index(rw: Arc<ResponseWriter>, config: Arc<AppConfig>) {
    rw.write(format!("strip is brewing ({})\n", config.run_mode).as_bytes());
}

fn hello(Path(name): Path<String>, rw: Arc<ResponseWriter>, store: Arc<dyn Store>) {
    let visits = store.incr(&format!("hello:{name}"), 1).unwrap_or_default();
    rw.write(format!("hello {name} (visit {visits})\n").as_bytes());
}

fn files(route: RouteInfo, rw: Arc<ResponseWriter>) {
    rw.write(route.get("path").unwrap_or_default().as_bytes());
}

fn archive_user(Path(uid): Path<u64>, rw: Arc<ResponseWriter>) {
    rw.write_header(StatusCode::ACCEPTED);
    rw.write(format!("user {uid} archived\n").as_bytes());
}

/// Reflects a JSON body; anything else is a 400.
fn echo(req: Arc<Request>, rw: Arc<ResponseWriter>) -> Result<()> {
    match req.json::<serde_json::Value>() {
        Ok(value) => rw.write_json(StatusCode::OK, &value)?,
        Err(err) => {
            rw.write_header(StatusCode::BAD_REQUEST);
            rw.write(format!("invalid json: {err}\n").as_bytes());
        }
    }
    Ok(())
}

/// Rejects requests without an `Authorization` header.
fn require_auth(req: Arc<Request>, rw: Arc<ResponseWriter>) {
    if req.header("authorization").is_none() {
        rw.write_header(StatusCode::UNAUTHORIZED);
        rw.write(b"401 unauthorized\n");
    }
}

fn no_store(next: Next, rw: Arc<ResponseWriter>) -> Result<(), DispatchError> {
    next.run()?;
    rw.set_header_str("cache-control", "no-store");
    Ok(())
}

/// Users resource served by one controller through an `ALL` binding.
#[derive(Clone, Default, Injectable)]
struct UserController {
    #[inject]
    rw: Option<Arc<ResponseWriter>>,
    #[inject]
    route: Option<Arc<RouteInfo>>,
}

impl UserController {
    fn reply(&self, status: StatusCode, body: String) {
        if let Some(rw) = &self.rw {
            rw.write_header(status);
            rw.write(body.as_bytes());
        }
    }

    fn uid(&self) -> &str {
        self.route
            .as_ref()
            .and_then(|r| r.get("uid"))
            .unwrap_or_default()
    }
}

impl Controller for UserController {
    fn has_action(&self, name: &str) -> bool {
        matches!(name, "Get" | "Put" | "Delete")
    }

    fn call_action(&mut self, name: &str, _resolver: &Resolver<'_>) -> Result<(), DispatchError> {
        let uid = self.uid().to_owned();
        match name {
            "Get" => self.reply(StatusCode::OK, format!("user {uid}\n")),
            "Put" => self.reply(StatusCode::OK, format!("user {uid} updated\n")),
            "Delete" => self.reply(StatusCode::NO_CONTENT, String::new()),
            _ => self.reply(StatusCode::METHOD_NOT_ALLOWED, String::new()),
        }
        Ok(())
    }
}

/// Demo routes:
///
/// ```text
/// GET    /
/// GET    /hello/:name
/// GET    /files/*:path          (gzip for accepting clients)
/// ALL    /users/:uid            (controller, Get/Put/Delete; needs Authorization)
/// POST   /users/:uid:archive    (custom verb; needs Authorization)
/// POST   /echo                  (JSON in, JSON out)
/// ```
fn demo_routes() -> Routes {
    let auth = Filter::new(require_auth).named("require_auth");
    Routes::new()
        .handle(get(index))
        .nest("/hello/:name", Routes::new().name("hello").handle(get(hello)))
        .nest(
            "/files/*:path",
            Routes::new()
                .name("files")
                .handle(get(files).filter(middleware::gzip())),
        )
        .nest(
            "/users",
            Routes::new()
                .filter(auth)
                .filter(Filter::new(no_store).named("no_store"))
                .nest(
                    "/:uid",
                    Routes::new().name("user").handle(all(UserController::default())),
                )
                .nest(
                    "/:uid:archive",
                    Routes::new().handle(method(http::Method::POST, archive_user)),
                ),
        )
        .nest("/echo", Routes::new().handle(post(echo)))
}

/// Build the demo application, optionally importing `config`.
///
/// # Errors
///
/// A route configuration error.
pub fn demo_app(config: Option<Arc<dyn Configer>>) -> Result<App> {
    let mut app = App::new();
    if let Some(config) = config {
        app.import_config(config);
    }
    app.provide_as::<dyn Store>(Arc::new(MemoryStore::new()))
        .filter(middleware::recovery())
        .filter(middleware::request_logger());
    app.routers(demo_routes())?;
    Ok(app)
}
