mod common;

use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::{Arc, Once};
use std::time::Duration;

use common::*;
use nsmux::{server, Middleware, Mux, ResponseWriter};

static MAY_INIT: Once = Once::new();

fn setup_runtime() {
    init_tracing();
    MAY_INIT.call_once(|| {
        may::config().set_stack_size(0x8000);
    });
}

/// Send one raw HTTP/1.1 request and read until the peer closes or the
/// read times out.
fn send_request(addr: std::net::SocketAddr, raw: &str) -> String {
    let mut stream = TcpStream::connect(addr).unwrap();
    stream.write_all(raw.as_bytes()).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_millis(500)))
        .unwrap();

    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
            Err(_) => break,
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}

#[test]
fn serves_routed_requests_over_the_wire() {
    setup_runtime();

    let mux = Arc::new(Mux::new());
    mux.get_fn("/greet", |w, _r| w.write(b"Hello, Requester"));
    mux.get_fn("/users/{id}", |w, r| {
        let id = r.params()["id"].clone();
        w.write(id.as_bytes());
    });
    mux.all("/moved/", Arc::new(StubHandler));
    let gate = MockMiddleware::new(|w, r, next| {
        if r.header("authorization").is_some() {
            next.proceed(w, r);
        } else {
            w.set_status(401);
        }
    });
    mux.use_at("/admin", [gate as Arc<dyn Middleware>]);
    mux.get_fn("/admin/users", |w, _r| w.write(b"[]"));

    let handle = server::serve(mux, "127.0.0.1:18634").unwrap();
    handle.wait_ready().unwrap();
    let addr = handle.addr();

    let response = send_request(addr, "GET /greet HTTP/1.1\r\nHost: site.com\r\nConnection: close\r\n\r\n");
    assert!(response.starts_with("HTTP/1.1 200"), "got {response:?}");
    assert!(response.ends_with("Hello, Requester"), "got {response:?}");

    let response = send_request(addr, "GET /users/42 HTTP/1.1\r\nHost: site.com\r\nConnection: close\r\n\r\n");
    assert!(response.ends_with("42"), "got {response:?}");

    let response = send_request(addr, "GET /moved HTTP/1.1\r\nHost: site.com\r\nConnection: close\r\n\r\n");
    assert!(response.starts_with("HTTP/1.1 301"), "got {response:?}");
    assert!(response.contains("Location: /moved/"), "got {response:?}");

    let response = send_request(addr, "GET /nowhere HTTP/1.1\r\nHost: site.com\r\nConnection: close\r\n\r\n");
    assert!(response.starts_with("HTTP/1.1 404"), "got {response:?}");

    let response = send_request(
        addr,
        "GET /admin/users HTTP/1.1\r\nHost: site.com\r\nAuthorization: [token]\r\nConnection: close\r\n\r\n",
    );
    assert!(response.starts_with("HTTP/1.1 200"), "got {response:?}");
    assert!(response.ends_with("[]"), "got {response:?}");

    let response = send_request(addr, "GET /admin/users HTTP/1.1\r\nHost: site.com\r\nConnection: close\r\n\r\n");
    assert!(response.starts_with("HTTP/1.1 401"), "got {response:?}");

    // The handle keeps the multiplexer reachable: a route registered
    // while the server is running serves the next request.
    handle.mux().get_fn("/late", |w, _r| w.write(b"registered live"));
    let response = send_request(addr, "GET /late HTTP/1.1\r\nHost: site.com\r\nConnection: close\r\n\r\n");
    assert!(response.starts_with("HTTP/1.1 200"), "got {response:?}");
    assert!(response.ends_with("registered live"), "got {response:?}");

    handle.stop();
}
