use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use may::coroutine::JoinHandle;
use may_minihttp::HttpServer;
use tracing::info;

use super::service::MuxService;
use crate::mux::Mux;

/// A multiplexer bound to a listening socket.
///
/// The handle keeps the [`Mux`] reachable, so endpoints and middlewares
/// can still be registered while the server is accepting requests;
/// in-flight requests may observe the pre-registration table.
pub struct ServerHandle {
    mux: Arc<Mux>,
    addr: SocketAddr,
    accept_loop: JoinHandle<()>,
}

impl ServerHandle {
    /// The multiplexer being served.
    pub fn mux(&self) -> &Arc<Mux> {
        &self.mux
    }

    /// Address the server is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Block until the listening socket accepts connections, or give up
    /// after a quarter of a second.
    pub fn wait_ready(&self) -> io::Result<()> {
        let deadline = Instant::now() + Duration::from_millis(250);
        while TcpStream::connect(self.addr).is_err() {
            if Instant::now() >= deadline {
                return Err(io::Error::new(io::ErrorKind::TimedOut, "server not ready"));
            }
            thread::sleep(Duration::from_millis(5));
        }
        Ok(())
    }

    /// Cancel the accept loop and wait for it to unwind. Established
    /// connections are dropped, not drained.
    pub fn stop(self) {
        info!(addr = %self.addr, "server stopping");
        // may only exposes cancellation through the raw coroutine handle.
        unsafe {
            self.accept_loop.coroutine().cancel();
        }
        let _ = self.accept_loop.join();
    }

    /// Wait for the accept loop to exit on its own.
    pub fn join(self) -> std::thread::Result<()> {
        self.accept_loop.join()
    }
}

/// Serve a multiplexer over `may_minihttp` on the given address.
///
/// # Errors
///
/// Fails when the address is invalid or the port cannot be bound.
pub fn serve<A: ToSocketAddrs>(mux: Arc<Mux>, addr: A) -> io::Result<ServerHandle> {
    let addr = addr
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid address"))?;
    let accept_loop = HttpServer(MuxService::new(mux.clone())).start(addr)?;
    info!(addr = %addr, "server listening");
    Ok(ServerHandle {
        mux,
        addr,
        accept_loop,
    })
}
