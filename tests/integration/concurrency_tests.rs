//! Concurrent delivery tests for the connection pool limits.

use std::sync::Arc;
use std::time::{Duration, Instant};

use agent_outbound_http::{ErrorKind, HttpTransport, PoolConfig};
use futures::future::join_all;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{KeepAliveServer, start};

async fn slow_server(delay: Duration) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(delay))
        .mount(&server)
        .await;
    server
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_per_host_limit_bounds_open_sockets() {
    let server = KeepAliveServer::start(Duration::from_millis(200)).await;
    let transport = start(HttpTransport::builder()).await;

    // 100 deliveries over 60 distinct paths on one host.
    let endpoints: Vec<String> = (0..100)
        .map(|i| format!("{}/agents/{}/inbox", server.uri, i % 60))
        .collect();

    let started = Instant::now();
    let results = join_all(
        endpoints
            .iter()
            .map(|endpoint| transport.deliver(vec![0x01u8], endpoint)),
    )
    .await;
    let elapsed = started.elapsed();

    assert!(results.iter().all(Result::is_ok), "{:?}", results);
    assert_eq!(server.served(), 100);

    // Sockets are capped, not just requests: idle pooled ones count too.
    assert!(server.peak_open() <= 50, "peak open sockets {}", server.peak_open());
    assert!(server.accepted() <= 50, "sockets accepted {}", server.accepted());

    let stats = transport.stats().unwrap();
    assert_eq!(stats.requests_sent, 100);
    assert_eq!(stats.requests_failed, 0);
    assert_eq!(stats.in_flight, 0);
    assert_eq!(stats.peak_in_flight, 50);
    assert!(stats.peak_open_connections <= 50, "{:?}", stats);

    // The second half had to wait for the first.
    assert!(elapsed >= Duration::from_millis(390), "{:?}", elapsed);
}

#[tokio::test]
async fn test_host_limit_of_one_reuses_one_socket() {
    let server = KeepAliveServer::start(Duration::ZERO).await;
    let transport = start(
        HttpTransport::builder()
            .pool_config(PoolConfig::builder().max_connections_per_host(1).build()),
    )
    .await;

    for i in 0..5 {
        transport
            .deliver("{}", &format!("{}/inbox/{}", server.uri, i))
            .await
            .unwrap();
    }

    assert_eq!(server.served(), 5);
    assert_eq!(server.accepted(), 1);
    assert_eq!(server.open(), 1);

    let stats = transport.stats().unwrap();
    assert_eq!(stats.open_connections, 1);
    assert_eq!(stats.peak_open_connections, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_total_limit_spans_hosts() {
    let first = slow_server(Duration::from_millis(100)).await;
    let second = slow_server(Duration::from_millis(100)).await;

    let transport = start(
        HttpTransport::builder().pool_config(PoolConfig::builder().max_connections(3).build()),
    )
    .await;

    let endpoints: Vec<String> = (0..10)
        .flat_map(|i| {
            [
                format!("{}/inbox/{}", first.uri(), i),
                format!("{}/inbox/{}", second.uri(), i),
            ]
        })
        .collect();

    let results = join_all(
        endpoints
            .iter()
            .map(|endpoint| transport.deliver("{}", endpoint)),
    )
    .await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(transport.stats().unwrap().peak_in_flight, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_zero_per_host_limit_is_unlimited() {
    let server = slow_server(Duration::from_millis(100)).await;

    let transport = start(
        HttpTransport::builder()
            .pool_config(PoolConfig::builder().max_connections_per_host(0).build()),
    )
    .await;

    let endpoint = format!("{}/inbox", server.uri());
    let results = join_all((0..80).map(|_| transport.deliver("{}", &endpoint))).await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(transport.stats().unwrap().peak_in_flight, 80);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stop_rejects_queued_deliveries() {
    let server = slow_server(Duration::from_millis(500)).await;

    let transport = Arc::new(
        start(
            HttpTransport::builder()
                .pool_config(PoolConfig::builder().max_connections_per_host(1).build()),
        )
        .await,
    );
    let endpoint = format!("{}/inbox", server.uri());

    let in_flight = {
        let transport = Arc::clone(&transport);
        let endpoint = endpoint.clone();
        tokio::spawn(async move { transport.deliver("first", &endpoint).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    let queued = {
        let transport = Arc::clone(&transport);
        let endpoint = endpoint.clone();
        tokio::spawn(async move { transport.deliver("second", &endpoint).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    transport.stop().await.unwrap();

    let err = queued.await.unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    // The request already on the wire completes normally.
    assert!(in_flight.await.unwrap().is_ok());
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}
