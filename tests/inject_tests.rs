use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use strip::inject::{Injector, Named, ResolveError, Resolver};
use strip::Injectable;

trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

#[derive(Debug)]
struct Fixed(u64);

impl Clock for Fixed {
    fn now(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, PartialEq)]
struct Dsn(&'static str);

strip::provider_name!(Primary = "primary", Replica = "replica");

#[test]
fn test_named_and_unnamed_are_distinct_keys() {
    let injector = Injector::new();
    injector
        .provide(Dsn("default"))
        .provide_named("primary", Dsn("pg://primary"))
        .provide_named("replica", Dsn("pg://replica"));

    assert_eq!(*injector.find::<Dsn>().unwrap(), Dsn("default"));
    assert_eq!(
        *injector.find_named::<Dsn>("replica").unwrap(),
        Dsn("pg://replica")
    );
    let err = injector.find_named::<Dsn>("archive").unwrap_err();
    assert_eq!(
        err,
        ResolveError::NotFound {
            type_name: std::any::type_name::<Dsn>(),
            name: Some("archive".to_owned()),
        }
    );

    let joined = injector
        .invoke(|p: Named<Dsn, Primary>, r: Named<Dsn, Replica>| format!("{}|{}", p.0, r.0))
        .unwrap();
    assert_eq!(joined, "pg://primary|pg://replica");
}

#[test]
fn test_trait_object_provider() {
    let injector = Injector::new();
    injector.provide_as::<dyn Clock>(Arc::new(Fixed(1_700_000_000)));
    let now = injector.invoke(|clock: Arc<dyn Clock>| clock.now()).unwrap();
    assert_eq!(now, 1_700_000_000);
    // the concrete type was never registered
    assert!(injector.find::<Fixed>().unwrap_err().is_not_found());
}

#[test]
fn test_optional_parameter() {
    let injector = Injector::new();
    let seen = injector
        .invoke(|clock: Option<Arc<dyn Clock>>| clock.map(|c| c.now()))
        .unwrap();
    assert_eq!(seen, None);

    injector.provide_as::<dyn Clock>(Arc::new(Fixed(5)));
    let seen = injector
        .invoke(|clock: Option<Arc<dyn Clock>>| clock.map(|c| c.now()))
        .unwrap();
    assert_eq!(seen, Some(5));
}

#[test]
fn test_reprovide_replaces_value() {
    let injector = Injector::new();
    injector.provide(1_u16);
    injector.provide(2_u16);
    assert_eq!(*injector.find::<u16>().unwrap(), 2);
    assert_eq!(injector.len(), 1);
}

#[test]
fn test_child_scope_shadows_without_touching_parent() {
    let root = Injector::new();
    root.provide_as::<dyn Clock>(Arc::new(Fixed(1)));
    let request = root.child();
    request.provide_as::<dyn Clock>(Arc::new(Fixed(2)));

    assert_eq!(request.find::<dyn Clock>().unwrap().now(), 2);
    assert_eq!(root.find::<dyn Clock>().unwrap().now(), 1);
    assert!(request.parent().is_some());
    assert!(root.parent().is_none());
}

struct Pool {
    dsn: Arc<Dsn>,
}

struct Repo {
    pool: Arc<Pool>,
}

#[test]
fn test_factory_chain() {
    let injector = Injector::new();
    injector
        .provide(Dsn("pg://local"))
        .provide_factory(|dsn: Arc<Dsn>| Arc::new(Pool { dsn }))
        .provide_factory(|pool: Arc<Pool>| Arc::new(Repo { pool }));

    let repo = injector.find::<Repo>().unwrap();
    assert_eq!(*repo.pool.dsn, Dsn("pg://local"));
}

#[test]
fn test_failing_factory_input_propagates() {
    let injector = Injector::new();
    injector.provide_factory(|dsn: Arc<Dsn>| Arc::new(Pool { dsn }));
    let err = injector.find::<Pool>().err().unwrap();
    assert!(err.is_not_found());
    assert!(err.to_string().contains("Dsn"));
}

#[test]
fn test_named_factory() {
    let injector = Injector::new();
    injector.provide_factory_named("replica", || Arc::new(Dsn("pg://replica")));
    assert!(injector.contains::<Dsn>(Some("replica")));
    assert!(!injector.contains::<Dsn>(None));
    assert_eq!(
        *injector.find_named::<Dsn>("replica").unwrap(),
        Dsn("pg://replica")
    );
}

struct Ping;
struct Pong;
struct Serve;

#[test]
fn test_cycle_through_three_factories() {
    let injector = Injector::new();
    injector
        .provide_factory(|_p: Arc<Pong>| Arc::new(Ping))
        .provide_factory(|_s: Arc<Serve>| Arc::new(Pong))
        .provide_factory(|_p: Arc<Ping>| Arc::new(Serve));

    let err = injector.find::<Pong>().err().unwrap();
    match err {
        ResolveError::Cycle { path } => {
            assert_eq!(path.len(), 4);
            assert!(path[0].contains("Pong"));
            assert!(path[3].contains("Pong"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_diamond_is_not_a_cycle() {
    let calls = Arc::new(AtomicUsize::new(0));
    let injector = Injector::new();
    let counter = Arc::clone(&calls);
    injector
        .provide_factory(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Arc::new(Dsn("shared"))
        })
        .provide_factory(|dsn: Arc<Dsn>| Arc::new(Pool { dsn }))
        .provide_factory(|pool: Arc<Pool>| Arc::new(Repo { pool }));

    // Repo and Pool both need Dsn; it is produced once for the pass
    let same = injector
        .invoke(|repo: Arc<Repo>, dsn: Arc<Dsn>| Arc::ptr_eq(&repo.pool.dsn, &dsn))
        .unwrap();
    assert!(same);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_concurrent_passes_never_report_false_cycles() {
    let injector = Injector::new();
    injector
        .provide(Dsn("pg://shared"))
        .provide_factory(|dsn: Arc<Dsn>| {
            thread::sleep(Duration::from_millis(2));
            Arc::new(Pool { dsn })
        })
        .provide_factory(|pool: Arc<Pool>| Arc::new(Repo { pool }));

    let barrier = Arc::new(Barrier::new(8));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let injector = injector.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..20 {
                    let repo = injector.find::<Repo>().unwrap();
                    assert_eq!(*repo.pool.dsn, Dsn("pg://shared"));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_resolver_shares_a_pass() {
    let calls = Arc::new(AtomicUsize::new(0));
    let injector = Injector::new();
    let counter = Arc::clone(&calls);
    injector.provide_factory(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Arc::new(Ping)
    });

    let resolver = Resolver::new(&injector);
    let a = resolver.resolve::<Ping>().unwrap();
    let b = resolver.resolve::<Ping>().unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert!(resolver.try_resolve::<Pong>(None).unwrap().is_none());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[derive(Default, Injectable)]
struct Audit {
    #[inject]
    clock: Option<Arc<dyn Clock>>,
}

#[derive(Default, Injectable)]
struct Orders {
    #[inject(embed)]
    audit: Audit,
    #[inject(name = "primary")]
    dsn: Option<Arc<Dsn>>,
    #[inject]
    repo: Option<Arc<Repo>>,
    page_size: usize,
}

#[test]
fn test_derive_injectable() {
    let injector = Injector::new();
    injector
        .provide_as::<dyn Clock>(Arc::new(Fixed(99)))
        .provide_named("primary", Dsn("pg://primary"))
        .provide(Dsn("pg://default"))
        .provide_factory(|dsn: Arc<Dsn>| Arc::new(Pool { dsn }))
        .provide_factory(|pool: Arc<Pool>| Arc::new(Repo { pool }));

    let mut orders = Orders {
        page_size: 50,
        ..Orders::default()
    };
    injector.apply(&mut orders).unwrap();

    assert_eq!(orders.audit.clock.as_ref().unwrap().now(), 99);
    assert_eq!(**orders.dsn.as_ref().unwrap(), Dsn("pg://primary"));
    assert_eq!(*orders.repo.as_ref().unwrap().pool.dsn, Dsn("pg://default"));
    assert_eq!(orders.page_size, 50);
}

#[test]
fn test_derive_injectable_missing_named_field() {
    let injector = Injector::new();
    injector.provide_as::<dyn Clock>(Arc::new(Fixed(1)));
    let mut orders = Orders::default();
    let err = injector.apply(&mut orders).unwrap_err();
    assert_eq!(
        err,
        ResolveError::NotFound {
            type_name: std::any::type_name::<Dsn>(),
            name: Some("primary".to_owned()),
        }
    );
    // fields before the failure were filled
    assert!(orders.audit.clock.is_some());
}
