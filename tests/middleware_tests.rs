mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use common::*;
use nsmux::{CancelToken, Middleware, Mux, ResponseBuffer, ResponseWriter};

fn dispatch(mux: &Mux, mut req: nsmux::Request) -> ResponseBuffer {
    init_tracing();
    let mut res = ResponseBuffer::new();
    mux.dispatch(&mut res, &mut req);
    res
}

#[test]
fn global_middlewares_intercept_every_request() {
    for count in 1..=3 {
        let mux = Mux::new();
        let spies: Vec<_> = (0..count).map(|_| SpyMiddleware::new()).collect();
        for spy in &spies {
            mux.use_middleware([spy.clone() as Arc<dyn Middleware>]);
        }

        // No route registered: middlewares still run ahead of not-found.
        let res = dispatch(&mux, get_request(""));
        assert_eq!(res.status(), 404);
        for (i, spy) in spies.iter().enumerate() {
            assert!(spy.intercepted(), "middleware {i} did not intercept");
        }
    }
}

#[test]
fn middlewares_run_in_registration_order_root_to_leaf() {
    let mux = Mux::new();
    let order = Arc::new(Mutex::new(Vec::new()));

    for (label, path) in [("global", None), ("api", Some("/api")), ("v1", Some("/api/v1"))] {
        let order = order.clone();
        let mw = MockMiddleware::new(move |w, r, next| {
            order.lock().unwrap().push(label);
            next.proceed(w, r);
        });
        match path {
            None => mux.use_middleware([mw as Arc<dyn Middleware>]),
            Some(p) => mux.use_at(p, [mw as Arc<dyn Middleware>]),
        }
    }
    let handler = MockHandler::silent();
    mux.get("/api/v1/reports", handler.clone());

    dispatch(&mux, get_request("/api/v1/reports"));
    assert_eq!(*order.lock().unwrap(), vec!["global", "api", "v1"]);
    assert!(handler.called());

    // A sibling path outside /api only sees the global middleware.
    order.lock().unwrap().clear();
    mux.get("/health", MockHandler::silent());
    dispatch(&mux, get_request("/health"));
    assert_eq!(*order.lock().unwrap(), vec!["global"]);
}

#[test]
fn namespace_middleware_applies_to_deeper_paths() {
    let mux = Mux::new();
    let gate = MockMiddleware::new(|w, r, next| {
        if r.header("authorization").is_some() {
            next.proceed(w, r);
        } else {
            w.set_status(401);
        }
    });
    mux.use_at("/admin", [gate as Arc<dyn Middleware>]);
    let handler = MockHandler::new(|w, _r| w.write(b"[]"));
    mux.get("/admin/users", handler.clone());

    let authorized = get_request("/admin/users").with_header("Authorization", "[token]");
    let res = dispatch(&mux, authorized);
    assert_eq!(res.status(), 200);
    assert_eq!(res.body_string(), "[]");

    let res = dispatch(&mux, get_request("/admin/users"));
    assert_eq!(res.status(), 401);
    assert_eq!(res.body_string(), "");
}

#[test]
fn failing_middleware_skips_the_handler() {
    let mux = Mux::new();
    mux.use_middleware([MockMiddleware::new(|_w, _r, next| {
        next.fail(anyhow!("foo"));
    }) as Arc<dyn Middleware>]);
    let handler = MockHandler::silent();
    mux.all("/", handler.clone());

    let res = dispatch(&mux, get_request(""));
    assert!(!handler.called());
    assert_eq!(res.status(), 500);
    assert!(res.body_string().contains("foo"));
}

#[test]
fn error_handler_receives_the_surfaced_error() {
    let mux = Mux::new();
    let spy = SpyErrorHandler::new();
    mux.use_error_handler(spy.clone());
    mux.use_middleware([MockMiddleware::new(|_w, _r, next| {
        next.fail(anyhow!("foo"));
    }) as Arc<dyn Middleware>]);

    dispatch(&mux, get_request(""));
    assert_eq!(spy.calls(), 1);
    assert_eq!(spy.last_error.lock().unwrap().as_deref(), Some("foo"));
}

#[test]
fn later_error_handler_replaces_the_first() {
    let mux = Mux::new();
    let first = SpyErrorHandler::new();
    let second = SpyErrorHandler::new();
    mux.use_error_handler(first.clone());
    mux.use_error_handler(second.clone());
    mux.use_middleware([MockMiddleware::new(|_w, _r, next| {
        next.fail(anyhow!("bar"));
    }) as Arc<dyn Middleware>]);

    dispatch(&mux, get_request(""));
    assert_eq!(first.calls(), 0);
    assert_eq!(second.calls(), 1);
}

#[test]
fn dropping_next_halts_the_pipeline_silently() {
    let mux = Mux::new();
    let reached = Arc::new(AtomicUsize::new(0));
    mux.use_middleware([MockMiddleware::new(|w, _r, _next| {
        // Short-circuit: answer here and never call the continuation.
        w.set_status(401);
        w.write(b"denied");
    }) as Arc<dyn Middleware>]);
    {
        let reached = reached.clone();
        mux.use_middleware_fn(move |w, r, next| {
            reached.fetch_add(1, Ordering::SeqCst);
            next.proceed(w, r);
        });
    }
    let handler = MockHandler::silent();
    mux.all("/", handler.clone());

    let res = dispatch(&mux, get_request(""));
    assert_eq!(res.status(), 401);
    assert_eq!(res.body_string(), "denied");
    assert_eq!(reached.load(Ordering::SeqCst), 0);
    assert!(!handler.called());
}

#[test]
fn cancellation_stops_the_pipeline_without_error() {
    let mux = Mux::new();
    let spy = SpyErrorHandler::new();
    mux.use_error_handler(spy.clone());
    mux.use_middleware([MockMiddleware::new(|w, r, next| {
        r.cancel_token().cancel();
        next.proceed(w, r);
    }) as Arc<dyn Middleware>]);
    let late = SpyMiddleware::new();
    mux.use_middleware([late.clone() as Arc<dyn Middleware>]);
    let handler = MockHandler::silent();
    mux.all("/", handler.clone());

    let token = CancelToken::new();
    let res = dispatch(&mux, get_request("").with_cancel_token(token));
    assert!(!late.intercepted());
    assert!(!handler.called());
    assert_eq!(spy.calls(), 0);
    assert_eq!(res.status(), 200);
    assert_eq!(res.body_string(), "");
}

#[test]
fn panicking_middleware_becomes_a_500() {
    let mux = Mux::new();
    mux.use_middleware_fn(|_w, _r, _next| panic!("middleware exploded"));
    mux.all("/", MockHandler::silent());

    let res = dispatch(&mux, get_request(""));
    assert_eq!(res.status(), 500);
    assert_eq!(res.body_string(), "internal server error");
}

#[test]
#[should_panic(expected = "no middleware or handler")]
fn namespace_scoped_use_requires_middlewares() {
    let mux = Mux::new();
    mux.use_at("/path", Vec::<Arc<dyn Middleware>>::new());
}
