use std::fs;
use std::io::Read;
use std::sync::Arc;

use flate2::read::GzDecoder;
use http::{Method, StatusCode};
use strip::middleware::{self, StaticOptions, NOT_FOUND_BODY};
use strip::router::{get, Routes};
use strip::server::{Request, Response, ResponseWriter};
use strip::{App, Service};

mod common;
use common::send;

const PAGE: &str = "<html><body>the quick brown fox, the quick brown fox, the quick brown fox</body></html>";

fn gunzip(bytes: &[u8]) -> String {
    let mut out = String::new();
    GzDecoder::new(bytes).read_to_string(&mut out).unwrap();
    out
}

fn gzip_service() -> Service {
    let mut app = App::new();
    app.filter(middleware::gzip());
    app.routers(
        Routes::new()
            .nest(
                "/page",
                Routes::new().handle(get(|rw: Arc<ResponseWriter>| {
                    rw.set_header_str("content-length", &PAGE.len().to_string());
                    rw.write(PAGE.as_bytes());
                })),
            )
            .nest(
                "/empty",
                Routes::new().handle(get(|rw: Arc<ResponseWriter>| {
                    rw.write_header(StatusCode::NO_CONTENT);
                })),
            ),
    )
    .unwrap();
    app.build()
}

fn get_gzip(service: &Service, uri: &str) -> Response {
    service.handle(Request::new(Method::GET, uri).with_header("Accept-Encoding", "gzip, deflate"))
}

#[test]
fn test_gzip_compresses_for_accepting_clients() {
    let service = gzip_service();
    let res = get_gzip(&service, "/page");
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.header("content-encoding"), Some("gzip"));
    assert_eq!(res.header("vary"), Some("Accept-Encoding"));
    assert_eq!(res.header("content-length"), None);
    assert_eq!(res.header("content-type"), Some("text/html; charset=utf-8"));
    assert_ne!(res.body, PAGE.as_bytes());
    assert_eq!(gunzip(&res.body), PAGE);
}

#[test]
fn test_gzip_skipped_without_accept_encoding() {
    let service = gzip_service();
    let res = send(&service, Method::GET, "/page");
    assert_eq!(res.header("content-encoding"), None);
    assert_eq!(res.body_str(), PAGE);
}

#[test]
fn test_gzip_leaves_empty_bodies_alone() {
    let service = gzip_service();
    let res = get_gzip(&service, "/empty");
    assert_eq!(res.status, StatusCode::NO_CONTENT);
    assert_eq!(res.header("content-encoding"), None);
    assert!(res.body.is_empty());

    // the not-found chain runs inside the global filters too
    let res = get_gzip(&service, "/missing");
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(gunzip(&res.body), NOT_FOUND_BODY);
}

fn static_site() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("test.txt"), "test\n").unwrap();
    fs::write(dir.path().join("app.css"), "body {}").unwrap();
    fs::create_dir(dir.path().join("docs")).unwrap();
    fs::write(dir.path().join("docs").join("index.html"), "<h1>docs</h1>").unwrap();
    fs::write(dir.path().join("index.html"), "<h1>home</h1>").unwrap();
    dir
}

fn static_service(filter: strip::Filter) -> Service {
    let mut app = App::new();
    app.filter(filter);
    app.routers(Routes::new().nest(
        "/api/ping",
        Routes::new().handle(get(|rw: Arc<ResponseWriter>| {
            rw.write(b"pong");
        })),
    ))
    .unwrap();
    app.build()
}

#[test]
fn test_serve_static_files() {
    let site = static_site();
    let service = static_service(middleware::serve_static("", site.path()).unwrap());

    let res = send(&service, Method::GET, "/test.txt");
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body_str(), "test\n");
    assert_eq!(res.header("content-type"), Some("text/plain"));

    let res = send(&service, Method::HEAD, "/test.txt");
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body.is_empty());

    assert_eq!(send(&service, Method::GET, "/app.css").header("content-type"), Some("text/css"));

    // other methods pass through to routing
    assert_eq!(send(&service, Method::POST, "/test.txt").status, StatusCode::NOT_FOUND);
}

#[test]
fn test_serve_static_prefix() {
    let site = static_site();
    for prefix in ["/assets", "/assets/", "assets"] {
        let service = static_service(middleware::serve_static(prefix, site.path()).unwrap());
        let res = send(&service, Method::GET, "/assets/test.txt");
        assert_eq!(res.body_str(), "test\n", "prefix {prefix}");
        assert_eq!(send(&service, Method::GET, "/assets////test.txt").body_str(), "test\n");
        // outside the prefix the request reaches the router
        assert_eq!(send(&service, Method::GET, "/api/ping").body_str(), "pong");
        assert_eq!(send(&service, Method::GET, "/test.txt").status, StatusCode::NOT_FOUND);
    }
}

#[test]
fn test_serve_static_refuses_traversal_and_missing() {
    let site = static_site();
    let service = static_service(middleware::serve_static("/assets", site.path()).unwrap());
    let res = send(&service, Method::GET, "/assets/../assets/test.txt");
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    let res = send(&service, Method::GET, "/assets/nope.txt");
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body_str(), NOT_FOUND_BODY);
}

#[test]
fn test_serve_static_directories() {
    let site = static_site();
    let service = static_service(middleware::serve_static("/assets", site.path()).unwrap());
    let res = send(&service, Method::GET, "/assets/docs?v=2");
    assert_eq!(res.status, StatusCode::FOUND);
    assert_eq!(res.header("location"), Some("/assets/docs/?v=2"));

    let res = send(&service, Method::GET, "/assets/docs/");
    assert_eq!(res.body_str(), "<h1>docs</h1>");
    assert_eq!(res.header("content-type"), Some("text/html"));
}

#[test]
fn test_serve_static_options() {
    let site = static_site();
    let options = StaticOptions {
        any_method: true,
        try_files_then: Some("/index.html".into()),
        skip_prefixes: vec!["/api".into()],
    };
    let service = static_service(middleware::serve_static_with("", site.path(), options).unwrap());

    assert_eq!(send(&service, Method::POST, "/test.txt").body_str(), "test\n");
    assert_eq!(send(&service, Method::GET, "/app/settings").body_str(), "<h1>home</h1>");
    assert_eq!(send(&service, Method::GET, "/api/ping").body_str(), "pong");
}

#[test]
fn test_serve_static_needs_existing_directory() {
    let site = static_site();
    assert!(middleware::serve_static("", site.path().join("absent")).is_err());
}
