//! Pooled connection resource shared by concurrent deliveries.
//!
//! A [`TransportSession`] pairs a hyper client, whose pool reuses sockets
//! per `scheme://host:port`, with a [`ConnectionLimiter`] that admits
//! deliveries per host and in total. Callers over a limit wait for a slot.
//! The client dials through a [`LimitedConnector`], so a host never has more
//! sockets open than its limit, idle ones included.

use std::error::Error as StdError;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use tracing::{debug, trace};
use url::Url;

use super::connector::LimitedConnector;
use super::limiter::{ConnectionLimiter, Gauge, host_key};
use super::traits::{DeliveryStats, Payload};
use crate::config::HttpTransportConfig;
use crate::tracing_support::TraceHook;
use crate::Error;

#[cfg(feature = "rustls")]
type Connector = hyper_rustls::HttpsConnector<LimitedConnector>;
#[cfg(not(feature = "rustls"))]
type Connector = LimitedConnector;

// ============================================================================
// Transport Session
// ============================================================================

/// The pooled connection resource owned by a started transport.
pub(crate) struct TransportSession {
    client: Client<Connector, Full<Bytes>>,
    limiter: ConnectionLimiter,
    sockets: Arc<Gauge>,
    request_timeout: Option<Duration>,
    hook: Arc<dyn TraceHook>,
    requests_sent: AtomicU64,
    requests_failed: AtomicU64,
}

impl TransportSession {
    /// Builds the HTTP client and connection limiter for `config`.
    pub(crate) fn new(config: &HttpTransportConfig, hook: Arc<dyn TraceHook>) -> Result<Self, Error> {
        let mut dialer = HttpConnector::new();
        dialer.set_connect_timeout(Some(config.connect_timeout));
        dialer.set_nodelay(true);
        #[cfg(feature = "rustls")]
        dialer.enforce_http(false);

        let tcp = LimitedConnector::new(dialer, config.pool.max_connections_per_host);
        let sockets = tcp.open_sockets();

        #[cfg(feature = "rustls")]
        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config(config.tls.client_config()?)
            .https_or_http()
            .enable_http1()
            .wrap_connector(tcp);
        #[cfg(not(feature = "rustls"))]
        let connector = tcp;

        // No cookie store and no redirect handling: one POST per delivery.
        let client = Client::builder(TokioExecutor::new())
            .pool_timer(TokioTimer::new())
            .pool_idle_timeout(config.pool.idle_timeout)
            .pool_max_idle_per_host(config.pool.max_idle_per_host())
            .build(connector);

        Ok(Self {
            client,
            limiter: ConnectionLimiter::new(&config.pool),
            sockets,
            request_timeout: config.request_timeout,
            hook,
            requests_sent: AtomicU64::new(0),
            requests_failed: AtomicU64::new(0),
        })
    }

    /// POSTs `payload` to `endpoint` and interprets the response status.
    pub(crate) async fn post(
        &self,
        endpoint: &Url,
        payload: Payload,
        content_type: &'static str,
    ) -> Result<(), Error> {
        let queued_at = Instant::now();
        let permit = self.limiter.acquire(host_key(endpoint)).await?;
        if permit.was_queued() {
            self.hook.on_connection_queued(endpoint, queued_at.elapsed());
        }

        self.requests_sent.fetch_add(1, Ordering::Relaxed);
        self.hook.on_request_start(endpoint);
        let started = Instant::now();

        let (status, reason) = match self.exchange(endpoint, payload, content_type).await {
            Ok(status_line) => status_line,
            Err(e) => {
                self.requests_failed.fetch_add(1, Ordering::Relaxed);
                self.hook.on_request_exception(endpoint, &e, started.elapsed());
                return Err(e);
            }
        };

        self.hook.on_request_end(endpoint, status, started.elapsed());
        debug!(endpoint = %endpoint, status, "response status is {}", status);

        interpret_status(status, &reason).inspect_err(|_| {
            self.requests_failed.fetch_add(1, Ordering::Relaxed);
        })
    }

    /// Sends the request and drains the response so its socket can be reused.
    async fn exchange(
        &self,
        endpoint: &Url,
        payload: Payload,
        content_type: &'static str,
    ) -> Result<(u16, String), Error> {
        let request = build_request(endpoint, payload, content_type)?;

        let round_trip = async {
            let response = self.client.request(request).await.map_err(map_client_error)?;

            let status = response.status().as_u16();
            let reason = reason_phrase(&response);

            if let Err(e) = response.into_body().collect().await {
                trace!(endpoint = %endpoint, error = %e, "failed to drain response body");
            }

            Ok((status, reason))
        };

        match self.request_timeout {
            Some(limit) => tokio::time::timeout(limit, round_trip)
                .await
                .map_err(|_| Error::timeout(format!("Request timed out after {:?}", limit)))?,
            None => round_trip.await,
        }
    }

    /// Closes the limiter; callers waiting for a slot fail with `InvalidState`.
    pub(crate) fn close(&self) {
        self.limiter.close();
    }

    /// Returns a snapshot of the delivery counters.
    pub(crate) fn stats(&self) -> DeliveryStats {
        let in_flight = self.limiter.in_flight();
        DeliveryStats {
            requests_sent: self.requests_sent.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            in_flight: in_flight.current(),
            peak_in_flight: in_flight.peak(),
            open_connections: self.sockets.current(),
            peak_open_connections: self.sockets.peak(),
        }
    }
}

/// Builds the POST: the payload as body and `Content-Type` as the only
/// added header.
fn build_request(
    endpoint: &Url,
    payload: Payload,
    content_type: &'static str,
) -> Result<http::Request<Full<Bytes>>, Error> {
    let mut target = endpoint.clone();
    target.set_fragment(None);

    let uri: http::Uri = target.as_str().parse().map_err(|e: http::uri::InvalidUri| {
        Error::invalid_endpoint(format!("Invalid request URI: {}", e)).with_source(e)
    })?;

    http::Request::post(uri)
        .header(CONTENT_TYPE, content_type)
        .body(Full::new(Bytes::from(payload)))
        .map_err(|e| Error::invalid_endpoint(format!("Invalid request: {}", e)).with_source(e))
}

impl From<Payload> for Bytes {
    fn from(payload: Payload) -> Self {
        match payload {
            Payload::Binary(bytes) => bytes,
            Payload::Text(text) => Bytes::from(text),
        }
    }
}

// ============================================================================
// Response Interpretation
// ============================================================================

/// Classifies a response status: 2xx is delivered, anything else is a failure.
pub(crate) fn interpret_status(status: u16, reason: &str) -> Result<(), Error> {
    if (200..=299).contains(&status) {
        Ok(())
    } else {
        Err(Error::unexpected_status(status, reason))
    }
}

/// Returns the server's reason phrase, falling back to the canonical one.
fn reason_phrase<B>(response: &http::Response<B>) -> String {
    response
        .extensions()
        .get::<hyper::ext::ReasonPhrase>()
        .and_then(|phrase| std::str::from_utf8(phrase.as_bytes()).ok())
        .filter(|phrase| !phrase.is_empty())
        .or_else(|| response.status().canonical_reason())
        .unwrap_or("unknown")
        .to_string()
}

// ============================================================================
// Error Mapping
// ============================================================================

/// Maps client errors to transport errors.
fn map_client_error(e: hyper_util::client::legacy::Error) -> Error {
    if closed_without_response(&e) {
        Error::empty_response().with_source(e)
    } else if timed_out(&e) {
        Error::timeout(format!("Connect timed out: {}", e)).with_source(e)
    } else if e.is_connect() {
        Error::connection(format!("Connection failed: {}", describe(&e))).with_source(e)
    } else {
        Error::transport(format!("HTTP error: {}", describe(&e))).with_source(e)
    }
}

fn causes<'a>(e: &'a (dyn StdError + 'static)) -> impl Iterator<Item = &'a (dyn StdError + 'static)> {
    std::iter::successors(Some(e), |err: &&'a (dyn StdError + 'static)| (*err).source())
}

/// Returns `true` if the peer closed the connection before any response.
fn closed_without_response(e: &hyper_util::client::legacy::Error) -> bool {
    causes(e).any(|err| {
        err.downcast_ref::<hyper::Error>()
            .is_some_and(hyper::Error::is_incomplete_message)
    })
}

fn timed_out(e: &hyper_util::client::legacy::Error) -> bool {
    causes(e).any(|err| {
        err.downcast_ref::<std::io::Error>()
            .is_some_and(|io| io.kind() == std::io::ErrorKind::TimedOut)
    })
}

/// The client error and its innermost cause, e.g. "client error (Connect): tcp connect error".
fn describe(e: &hyper_util::client::legacy::Error) -> String {
    match causes(e).skip(1).last() {
        Some(root) => format!("{}: {}", e, root),
        None => e.to_string(),
    }
}
