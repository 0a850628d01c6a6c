use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::*;
use crate::Injectable;

trait Greeter: Send + Sync {
    fn greet(&self) -> String;
}

struct English;

impl Greeter for English {
    fn greet(&self) -> String {
        "hello".into()
    }
}

#[derive(Debug, PartialEq)]
struct Post(&'static str);

crate::provider_name!(PostName = "post");

#[test]
fn test_find_by_type_and_name() {
    let injector = Injector::new();
    injector.provide(Post("plain"));
    injector.provide_named("post", Post("named"));

    assert_eq!(*injector.find::<Post>().unwrap(), Post("plain"));
    assert_eq!(*injector.find_named::<Post>("post").unwrap(), Post("named"));
    let err = injector.find_named::<Post>("draft").unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains("draft"));
}

#[test]
fn test_trait_object_provider() {
    let injector = Injector::new();
    injector.provide_as::<dyn Greeter>(Arc::new(English));
    assert_eq!(injector.find::<dyn Greeter>().unwrap().greet(), "hello");
    // the concrete type is not registered
    assert!(injector.find::<English>().is_err());
}

#[test]
fn test_invoke_resolves_in_order() {
    let injector = Injector::new();
    injector.provide(7_u32);
    injector.provide_named("post", Post("p"));

    let out = injector
        .invoke(|n: Arc<u32>, post: Named<Post, PostName>, missing: Option<Arc<String>>| {
            (*n, post.0, missing.is_none())
        })
        .unwrap();
    assert_eq!(out, (7, "p", true));
}

#[test]
fn test_invoke_stops_at_first_missing() {
    let injector = Injector::new();
    let err = injector
        .invoke(|_n: Arc<u32>, _s: Arc<String>| ())
        .unwrap_err();
    match err {
        ResolveError::NotFound { type_name, .. } => assert!(type_name.contains("u32")),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_parent_lookup_and_shadowing() {
    let root = Injector::new();
    root.provide(String::from("root"));
    root.provide(1_i64);

    let child = root.child();
    child.provide(String::from("child"));

    assert_eq!(*child.find::<String>().unwrap(), "child");
    assert_eq!(*child.find::<i64>().unwrap(), 1);
    assert_eq!(*root.find::<String>().unwrap(), "root");
    assert!(child.contains::<i64>(None));
    assert_eq!(child.len(), 1);
}

#[test]
fn test_factory_runs_once_per_pass() {
    let calls = Arc::new(AtomicUsize::new(0));
    let injector = Injector::new();
    let counter = Arc::clone(&calls);
    injector.provide_factory(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Arc::new(Post("made"))
    });

    // two parameters of the same key share one production
    injector
        .invoke(|a: Arc<Post>, b: Arc<Post>| assert!(Arc::ptr_eq(&a, &b)))
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // no memoisation across passes
    injector.find::<Post>().unwrap();
    injector.find::<Post>().unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_factory_resolves_against_requesting_scope() {
    let root = Injector::new();
    root.provide_factory(|tag: Arc<&'static str>| Arc::new(Post(*tag)));

    let request = root.child();
    request.provide::<&'static str>("from request");

    assert_eq!(*request.find::<Post>().unwrap(), Post("from request"));
    assert!(root.find::<Post>().unwrap_err().is_not_found());
}

struct A;
struct B;

#[test]
fn test_cycle_detected() {
    let injector = Injector::new();
    injector.provide_factory(|_b: Arc<B>| Arc::new(A));
    injector.provide_factory(|_a: Arc<A>| Arc::new(B));

    let err = injector.find::<A>().err().unwrap();
    assert!(err.is_cycle());
    assert!(err.to_string().contains("cycle dependencies"));
    if let ResolveError::Cycle { path } = err {
        assert_eq!(path.len(), 3);
        assert_eq!(path.first(), path.last());
    }
}

#[test]
fn test_self_cycle_detected() {
    let injector = Injector::new();
    injector.provide_factory(|a: Arc<A>| a);
    assert!(injector.find::<A>().err().unwrap().is_cycle());
}

#[derive(Default, Injectable)]
struct Base {
    #[inject]
    log: Option<Arc<dyn Greeter>>,
    #[inject]
    single: Option<Arc<u32>>,
    untouched: u8,
}

#[derive(Default, Injectable)]
struct Handler {
    #[inject(embed)]
    base: Base,
    #[inject(embed)]
    boxed: Option<Box<Base>>,
    #[inject(name = "post")]
    post: Option<Arc<Post>>,
    #[inject]
    plain: Option<Arc<Post>>,
}

#[test]
fn test_apply_fills_marked_fields() {
    let injector = Injector::new();
    injector.provide_as::<dyn Greeter>(Arc::new(English));
    injector.provide(9_u32);
    injector.provide(Post("plain"));
    injector.provide_named("post", Post("named"));

    let mut handler = Handler::default();
    injector.apply(&mut handler).unwrap();

    assert_eq!(handler.base.log.as_ref().unwrap().greet(), "hello");
    assert_eq!(**handler.base.single.as_ref().unwrap(), 9);
    assert_eq!(handler.base.untouched, 0);
    assert_eq!(**handler.boxed.as_ref().unwrap().single.as_ref().unwrap(), 9);
    assert_eq!(**handler.post.as_ref().unwrap(), Post("named"));
    assert_eq!(**handler.plain.as_ref().unwrap(), Post("plain"));
}

#[test]
fn test_apply_reports_missing_field() {
    let injector = Injector::new();
    injector.provide(9_u32);
    let mut base = Base::default();
    let err = injector.apply(&mut base).unwrap_err();
    assert!(err.is_not_found());
    assert!(base.single.is_none());
}
