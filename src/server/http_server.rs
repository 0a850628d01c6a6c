use may::coroutine::JoinHandle;
use may_minihttp::{HttpServerWithHeaders, HttpService};
use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

/// Request headers accepted per request.
pub const MAX_HEADERS: usize = 32;

/// Listener for an [`HttpService`], usually an [`AppService`](super::AppService).
///
/// Accepts up to 32 request headers, enough for traffic behind proxies and
/// API gateways.
///
/// ```rust,no_run
/// use strip::server::{AppService, HttpServer};
/// use strip::App;
///
/// let service = AppService::new(App::new().build());
/// let handle = HttpServer(service).start("127.0.0.1:8080").unwrap();
/// handle.wait_ready().unwrap();
/// handle.stop();
/// ```
pub struct HttpServer<T>(pub T);

/// Running listener.
pub struct ServerHandle {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl ServerHandle {
    /// Address the listener is bound to.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Poll the listening address until a TCP connect succeeds.
    ///
    /// # Errors
    ///
    /// `TimedOut` after 50 attempts 5ms apart.
    pub fn wait_ready(&self) -> io::Result<()> {
        for _ in 0..50 {
            if TcpStream::connect(self.addr).is_ok() {
                return Ok(());
            }
            thread::sleep(Duration::from_millis(5));
        }
        Err(io::Error::new(io::ErrorKind::TimedOut, "server not ready"))
    }

    /// Cancel the accept coroutine and wait for it to finish.
    pub fn stop(self) {
        info!(addr = %self.addr, "Stopping HTTP server");
        // SAFETY: the handle is owned here and nothing else joins or cancels
        // the coroutine.
        #[allow(unsafe_code)]
        unsafe {
            self.handle.coroutine().cancel();
        }
        if self.handle.join().is_err() {
            debug!("Server coroutine ended by cancellation");
        }
    }

    /// Block until the accept coroutine ends.
    ///
    /// # Errors
    ///
    /// The coroutine's panic payload.
    pub fn join(self) -> std::thread::Result<()> {
        self.handle.join()
    }
}

impl<T: HttpService + Clone + Send + Sync + 'static> HttpServer<T> {
    /// Bind `addr` and start accepting.
    ///
    /// # Errors
    ///
    /// An address that does not resolve, or a bind failure.
    pub fn start<A: ToSocketAddrs>(self, addr: A) -> io::Result<ServerHandle> {
        let addr = addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid address"))?;
        let handle = HttpServerWithHeaders::<_, MAX_HEADERS>(self.0).start(addr)?;
        info!(addr = %addr, "HTTP server listening");
        Ok(ServerHandle { addr, handle })
    }
}
