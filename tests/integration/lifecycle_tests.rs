//! Transport lifecycle tests.

use std::sync::Arc;

use agent_outbound_http::{
    ErrorKind, HttpTransport, HttpTransportConfig, MockTransport, OutboundTransport, Payload,
    TransportState,
};
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::init_tracing;

#[tokio::test]
async fn test_full_lifecycle() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::new(HttpTransportConfig::default());
    let endpoint = format!("{}/inbox", server.uri());

    let err = assert_err!(transport.deliver("early", &endpoint).await);
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    assert_ok!(transport.start().await);
    assert_ok!(transport.deliver("on time", &endpoint).await);
    assert_ok!(transport.stop().await);

    let err = assert_err!(transport.deliver("late", &endpoint).await);
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert!(transport.stats().is_none());
}

#[tokio::test]
async fn test_fresh_instance_after_stop() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;
    let endpoint = format!("{}/inbox", server.uri());

    let first = HttpTransport::default();
    first.start().await.unwrap();
    first.deliver("one", &endpoint).await.unwrap();
    first.stop().await.unwrap();
    assert_err!(first.start().await);

    let second = HttpTransport::default();
    second.start().await.unwrap();
    assert_ok!(second.deliver("two", &endpoint).await);
    assert_eq!(second.stats().unwrap().requests_sent, 1);
}

#[tokio::test]
async fn test_transports_behind_trait_objects() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let mock = Arc::new(MockTransport::with_schemes(&["ws", "wss"]));
    let transports: Vec<Arc<dyn OutboundTransport>> =
        vec![Arc::new(HttpTransport::default()), mock.clone()];

    for transport in &transports {
        transport.start().await.unwrap();
        assert_eq!(transport.state(), TransportState::Started);
    }

    // Route each endpoint to the transport that handles its scheme.
    let endpoints = [
        format!("{}/inbox", server.uri()),
        "wss://agent.example/socket".to_string(),
    ];
    for endpoint in &endpoints {
        let transport = transports
            .iter()
            .find(|t| t.supports(endpoint))
            .expect("a transport for every scheme");
        transport
            .deliver(Payload::from("hello"), endpoint)
            .await
            .unwrap();
    }

    assert_eq!(server.received_requests().await.unwrap().len(), 1);
    assert_eq!(mock.deliveries_to("wss://agent.example/socket").len(), 1);

    for transport in &transports {
        transport.stop().await.unwrap();
        assert_eq!(transport.state(), TransportState::Stopped);
    }
}
