//! Delivery outcome tests against well-formed HTTP peers.

use std::sync::Arc;
use std::time::Duration;

use agent_outbound_http::tracing_support::{TimingCollector, TraceHook};
use agent_outbound_http::{Error, ErrorKind, FailureMode, HttpTransport, Payload, PoolConfig};
use parking_lot::Mutex;
use tokio_test::{assert_err, assert_ok};
use url::Url;
use wiremock::matchers::{body_bytes, body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{closed_port_uri, start};

#[tokio::test]
async fn test_binary_delivery() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/inbox"))
        .and(header("content-type", "application/ssi-agent-wire"))
        .and(body_bytes(vec![0x01u8, 0x02]))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let transport = start(HttpTransport::builder()).await;
    assert_ok!(
        transport
            .deliver(vec![0x01u8, 0x02], &format!("{}/inbox", server.uri()))
            .await
    );
}

#[tokio::test]
async fn test_text_delivery() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/inbox"))
        .and(header("content-type", "application/json"))
        .and(body_string("{\"@type\":\"ping\"}"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let transport = start(HttpTransport::builder()).await;
    let payload = Payload::json(&serde_json::json!({"@type": "ping"})).unwrap();
    assert_ok!(
        transport
            .deliver(payload, &format!("{}/inbox", server.uri()))
            .await
    );
}

#[tokio::test]
async fn test_response_body_is_ignored() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("this is not an agent message"),
        )
        .mount(&server)
        .await;

    let transport = start(HttpTransport::builder()).await;
    assert_ok!(
        transport
            .deliver("hello", &format!("{}/inbox", server.uri()))
            .await
    );
}

#[tokio::test]
async fn test_non_success_status_propagates() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let transport = start(HttpTransport::builder()).await;
    let endpoint = format!("{}/inbox", server.uri());
    let err = assert_err!(transport.deliver("hello", &endpoint).await);

    assert_eq!(err.kind(), ErrorKind::UnexpectedStatus);
    assert_eq!(err.status(), Some(500));
    assert_eq!(err.reason(), Some("Internal Server Error"));
    assert_eq!(
        err.message(),
        "Unexpected response status 500, caused by: Internal Server Error"
    );
    assert_eq!(err.endpoint(), Some(endpoint.as_str()));
}

#[tokio::test]
async fn test_redirect_is_not_followed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/old"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("location", format!("{}/new", server.uri())),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/new"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let transport = start(HttpTransport::builder()).await;
    let err = assert_err!(
        transport
            .deliver("hello", &format!("{}/old", server.uri()))
            .await
    );
    assert_eq!(err.kind(), ErrorKind::UnexpectedStatus);
    assert_eq!(err.status(), Some(302));
}

#[tokio::test]
async fn test_empty_endpoint_sends_nothing() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let transport = start(HttpTransport::builder()).await;
    let err = assert_err!(transport.deliver(vec![0x01u8], "").await);
    assert_eq!(err.kind(), ErrorKind::InvalidEndpoint);
    assert_eq!(err.message(), "No endpoint provided");
}

#[tokio::test]
async fn test_connection_refused() {
    let transport = start(HttpTransport::builder()).await;
    let endpoint = format!("{}/inbox", closed_port_uri().await);

    let err = assert_err!(transport.deliver("hello", &endpoint).await);
    assert_eq!(err.kind(), ErrorKind::Connection);
    assert!(err.is_retriable());
}

#[tokio::test]
async fn test_request_timeout() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let transport = HttpTransport::builder()
        .timeout(Duration::from_millis(200))
        .build();
    transport.start().await.unwrap();

    let err = assert_err!(
        transport
            .deliver("hello", &format!("{}/inbox", server.uri()))
            .await
    );
    assert_eq!(err.kind(), ErrorKind::Timeout);
}

#[tokio::test]
async fn test_log_only_mode() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let transport = start(HttpTransport::builder().failure_mode(FailureMode::LogOnly)).await;

    assert_ok!(
        transport
            .deliver("hello", &format!("{}/inbox", server.uri()))
            .await
    );
    assert_ok!(
        transport
            .deliver("hello", &format!("{}/inbox", closed_port_uri().await))
            .await
    );

    let stats = transport.stats().unwrap();
    assert_eq!(stats.requests_sent, 2);
    assert_eq!(stats.requests_failed, 2);
}

#[derive(Default)]
struct RecordingHook {
    events: Mutex<Vec<String>>,
}

impl TraceHook for RecordingHook {
    fn on_connection_queued(&self, _endpoint: &Url, _waited: Duration) {
        self.events.lock().push("queued".into());
    }

    fn on_request_start(&self, _endpoint: &Url) {
        self.events.lock().push("start".into());
    }

    fn on_request_end(&self, _endpoint: &Url, status: u16, _elapsed: Duration) {
        self.events.lock().push(format!("end {}", status));
    }

    fn on_request_exception(&self, _endpoint: &Url, error: &Error, _elapsed: Duration) {
        self.events.lock().push(format!("exception {:?}", error.kind()));
    }
}

#[tokio::test]
async fn test_trace_hook_sees_call_lifecycle() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let hook = Arc::new(RecordingHook::default());
    let transport = start(HttpTransport::builder().trace_hook(hook.clone())).await;

    let _ = transport
        .deliver("hello", &format!("{}/inbox", server.uri()))
        .await;
    let _ = transport
        .deliver("hello", &format!("{}/inbox", closed_port_uri().await))
        .await;

    // A non-2xx response is still a completed request. Free slots are
    // granted without a queued event.
    assert_eq!(
        *hook.events.lock(),
        vec!["start", "end 404", "start", "exception Connection"]
    );
}

#[tokio::test]
async fn test_trace_hook_sees_queueing_behind_busy_host() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(100)))
        .mount(&server)
        .await;

    let hook = Arc::new(RecordingHook::default());
    let transport = start(
        HttpTransport::builder()
            .pool_config(PoolConfig::builder().max_connections_per_host(1).build())
            .trace_hook(hook.clone()),
    )
    .await;

    let endpoint = format!("{}/inbox", server.uri());
    let (first, second) = tokio::join!(
        transport.deliver("first", &endpoint),
        transport.deliver("second", &endpoint)
    );
    assert_ok!(first);
    assert_ok!(second);

    let events = hook.events.lock().clone();
    assert_eq!(events.iter().filter(|e| *e == "queued").count(), 1, "{:?}", events);
    assert_eq!(events.iter().filter(|e| *e == "start").count(), 2, "{:?}", events);
    assert_eq!(events.iter().filter(|e| *e == "end 200").count(), 2, "{:?}", events);
}

#[tokio::test]
async fn test_collector_timings() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rejected"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;

    let collector = TimingCollector::new();
    let transport = start(HttpTransport::builder().collector(Arc::new(collector.clone()))).await;

    for _ in 0..3 {
        let _ = transport
            .deliver("ok", &format!("{}/ok", server.uri()))
            .await;
    }
    let _ = transport
        .deliver("no", &format!("{}/rejected", server.uri()))
        .await;

    let request = collector.get("outbound-http:request").unwrap();
    assert_eq!(request.count, 4);
    assert_eq!(request.failures, 1);
    assert!(request.max >= request.mean());

    // Sequential deliveries never wait for a slot.
    assert!(collector.get("outbound-http:connection_queued").is_none());
}

#[tokio::test]
async fn test_collector_times_queued_deliveries() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(50)))
        .mount(&server)
        .await;

    let collector = TimingCollector::new();
    let transport = start(
        HttpTransport::builder()
            .pool_config(PoolConfig::builder().max_connections_per_host(1).build())
            .collector(Arc::new(collector.clone())),
    )
    .await;

    let endpoint = format!("{}/inbox", server.uri());
    let results = futures::future::join_all((0..3).map(|_| transport.deliver("hi", &endpoint))).await;
    assert!(results.iter().all(Result::is_ok));

    assert_eq!(collector.get("outbound-http:request").unwrap().count, 3);

    // The first delivery found a free slot; the other two waited.
    let queued = collector.get("outbound-http:connection_queued").unwrap();
    assert_eq!(queued.count, 2);
    assert!(queued.max >= Duration::from_millis(40), "{:?}", queued);
}
