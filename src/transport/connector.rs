//! TCP connector that caps open sockets per host.
//!
//! [`LimitedConnector`] takes a slot in the socket's host bucket before
//! dialing and the returned [`LimitedConnection`] keeps it until the socket
//! is dropped, whether the socket is in use or idle in the pool. A dial to a
//! host at its limit waits for one of its sockets to close; meanwhile the
//! pool hands the next idle socket to the waiting request.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use http::Uri;
use hyper::rt::{Read, ReadBufCursor, Write};
use hyper_util::client::legacy::connect::{Connected, Connection, HttpConnector};
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;
use tower_service::Service;
use tracing::trace;

use super::limiter::{ConnectionPermit, Gauge, HostBuckets, uri_host_key};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Dials TCP sockets, at most `limit` open at once per `scheme://host:port`.
#[derive(Clone)]
pub(crate) struct LimitedConnector {
    inner: HttpConnector,
    sockets: Arc<HostBuckets>,
    open: Arc<Gauge>,
}

impl LimitedConnector {
    /// Wraps `inner`; a `limit` of `0` means unlimited.
    pub(crate) fn new(inner: HttpConnector, limit: usize) -> Self {
        Self {
            inner,
            sockets: Arc::new(HostBuckets::new(limit)),
            open: Arc::new(Gauge::default()),
        }
    }

    /// Current and peak count of open sockets.
    pub(crate) fn open_sockets(&self) -> Arc<Gauge> {
        Arc::clone(&self.open)
    }
}

impl Service<Uri> for LimitedConnector {
    type Response = LimitedConnection;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<LimitedConnection, BoxError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, dst: Uri) -> Self::Future {
        // The ready connector goes to this call; keep a fresh clone.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let sockets = Arc::clone(&self.sockets);
        let open = Arc::clone(&self.open);

        Box::pin(async move {
            let key = uri_host_key(&dst);
            let (slot, waited) = sockets.acquire(key.clone()).await?;
            if waited {
                trace!(host = %key, "socket slot freed");
            }

            let io = inner.call(dst).await?;
            Ok(LimitedConnection {
                io,
                _slot: ConnectionPermit::new(slot, None, open),
            })
        })
    }
}

/// A TCP socket holding its host slot.
pub(crate) struct LimitedConnection {
    io: TokioIo<TcpStream>,
    _slot: ConnectionPermit,
}

impl Read for LimitedConnection {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: ReadBufCursor<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().io).poll_read(cx, buf)
    }
}

impl Write for LimitedConnection {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().io).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().io).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().io).poll_shutdown(cx)
    }

    fn is_write_vectored(&self) -> bool {
        self.io.is_write_vectored()
    }

    fn poll_write_vectored(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().io).poll_write_vectored(cx, bufs)
    }
}

impl Connection for LimitedConnection {
    fn connected(&self) -> Connected {
        self.io.connected()
    }
}
