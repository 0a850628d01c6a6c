use http::Method;
use strip::router::{
    all, any, delete, get, head, method, options, patch, post, put, ConfigError, RouteTable,
    Routes,
};

fn noop() {}

fn zoo() -> RouteTable {
    let mut table = RouteTable::new();
    table
        .configure(
            Routes::new()
                .handle(get(noop))
                .nest(
                    "/zoo/animals",
                    Routes::new()
                        .name("animals")
                        .handle(get(noop))
                        .handle(post(noop))
                        .nest(
                            "/:id",
                            Routes::new()
                                .name("animal")
                                .handle(get(noop))
                                .handle(put(noop))
                                .handle(patch(noop))
                                .handle(delete(noop)),
                        ),
                )
                .nest(
                    "/zoo/health",
                    Routes::new()
                        .handle(head(noop))
                        .handle(options(noop))
                        .handle(method(Method::TRACE, noop)),
                )
                .nest("/zoo/keepers/:kid:promote", Routes::new().handle(post(noop)))
                .nest("/zoo/feed/*:schedule", Routes::new().handle(any(noop)))
                .nest("/zoo/gate", Routes::new().handle(all(noop))),
        )
        .unwrap();
    table
}

fn assert_route(table: &RouteTable, method: Method, path: &str, template: &str, params: &[(&str, &str)]) {
    let m = table
        .route(&method, path)
        .unwrap_or_else(|| panic!("no route for {method} {path}"));
    assert_eq!(m.info.path.as_ref(), template, "{method} {path}");
    let got: Vec<(&str, &str)> = m.info.params.iter().map(|(k, v)| (k.as_ref(), v.as_str())).collect();
    assert_eq!(got, params, "{method} {path}");
}

#[test]
fn test_verb_zoo() {
    let t = zoo();
    assert_route(&t, Method::GET, "/", "/", &[]);
    assert_route(&t, Method::GET, "/zoo/animals", "/zoo/animals", &[]);
    assert_route(&t, Method::POST, "/zoo/animals", "/zoo/animals", &[]);
    for m in [Method::GET, Method::PUT, Method::PATCH, Method::DELETE] {
        assert_route(&t, m, "/zoo/animals/12", "/zoo/animals/:id", &[("id", "12")]);
    }
    assert_route(&t, Method::HEAD, "/zoo/health", "/zoo/health", &[]);
    assert_route(&t, Method::OPTIONS, "/zoo/health", "/zoo/health", &[]);
    assert_route(&t, Method::TRACE, "/zoo/health", "/zoo/health", &[]);
    assert_route(&t, Method::POST, "/zoo/keepers/5:promote", "/zoo/keepers/:kid:promote", &[("kid", "5")]);
    assert_route(&t, Method::PUT, "/zoo/feed/mon/am", "/zoo/feed/*:schedule", &[("schedule", "mon/am")]);
    assert_route(&t, Method::CONNECT, "/zoo/gate", "/zoo/gate", &[]);
}

#[test]
fn test_misses() {
    let t = zoo();
    assert!(t.route(&Method::DELETE, "/zoo/animals").is_none());
    assert!(t.route(&Method::GET, "/zoo/health").is_none());
    assert!(t.route(&Method::POST, "/zoo/keepers/5").is_none());
    assert!(t.route(&Method::GET, "/zoo").is_none());
    assert!(t.route(&Method::GET, "/zoo/animals/1/2").is_none());
}

#[test]
fn test_head_uses_get_binding() {
    let t = zoo();
    let head = t.route(&Method::HEAD, "/zoo/animals/1").unwrap();
    let get = t.route(&Method::GET, "/zoo/animals/1").unwrap();
    assert!(std::sync::Arc::ptr_eq(&head.action, &get.action));
}

#[test]
fn test_named_routes() {
    let t = zoo();
    assert_eq!(t.path_for("animals", &[]).as_deref(), Some("/zoo/animals"));
    assert_eq!(t.path_for("animal", &[("id", "9")]).as_deref(), Some("/zoo/animals/9"));
}

#[test]
fn test_routes_listing() {
    let t = zoo();
    let routes = t.routes();
    assert!(routes.iter().any(|(m, p)| m == "ANY" && p.as_ref() == "/zoo/feed/*:schedule"));
    assert!(routes.iter().any(|(m, p)| m == "ALL" && p.as_ref() == "/zoo/gate"));
    assert_eq!(
        routes.iter().filter(|(_, p)| p.as_ref() == "/zoo/animals/:id").count(),
        4
    );
}

#[test]
fn test_config_error_messages() {
    let mut t = RouteTable::new();
    let err = t
        .configure(Routes::new().nest("/docs/*:path/edit", Routes::new().handle(get(noop))))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "wild route `/docs/*:path/edit` must end with route param `:path`"
    );
    assert!(matches!(err, ConfigError::WildcardNotLast { .. }));
}

#[test]
fn test_many_params_stay_ordered() {
    let mut t = RouteTable::new();
    t.configure(Routes::new().nest(
        "/complex/:a/:b/:c/:d/:e/:f/:g/:h/:i/:j",
        Routes::new().handle(get(noop)),
    ))
    .unwrap();
    let m = t.route(&Method::GET, "/complex/1/2/3/4/5/6/7/8/9/10").unwrap();
    let values: Vec<&str> = m.info.values().collect();
    assert_eq!(values, ["1", "2", "3", "4", "5", "6", "7", "8", "9", "10"]);
    assert!(m.info.params.spilled());
}
