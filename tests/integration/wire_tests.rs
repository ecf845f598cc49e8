//! Tests against peers that misbehave on the wire.

use agent_outbound_http::{ErrorKind, HttpTransport};
use tokio_test::assert_err;

use crate::common::{RawServer, start};

#[tokio::test]
async fn test_custom_reason_phrase_is_reported() {
    let server = RawServer::start(
        b"HTTP/1.1 500 Internal Error\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
    )
    .await;
    let transport = start(HttpTransport::builder()).await;

    let err = assert_err!(
        transport
            .deliver(vec![0x01u8, 0x02], &format!("{}/inbox", server.uri))
            .await
    );

    assert_eq!(err.kind(), ErrorKind::UnexpectedStatus);
    assert_eq!(err.status(), Some(500));
    assert_eq!(err.reason(), Some("Internal Error"));
    assert_eq!(
        err.message(),
        "Unexpected response status 500, caused by: Internal Error"
    );
}

#[tokio::test]
async fn test_connection_closed_without_response() {
    let server = RawServer::start(b"").await;
    let transport = start(HttpTransport::builder()).await;

    let err = assert_err!(
        transport
            .deliver("hello", &format!("{}/inbox", server.uri))
            .await
    );

    assert_eq!(err.kind(), ErrorKind::EmptyResponse);
    assert_eq!(
        err.message(),
        "Unexpected empty response, caused by unknown error"
    );
    assert!(err.is_retriable());
    assert_eq!(server.requests().len(), 1);
}

#[tokio::test]
async fn test_request_shape_on_the_wire() {
    let server =
        RawServer::start(b"HTTP/1.1 204 No Content\r\nconnection: close\r\n\r\n").await;
    let transport = start(HttpTransport::builder()).await;

    transport
        .deliver(vec![0xdeu8, 0xad, 0xbe, 0xef], &format!("{}/a/b?c=d", server.uri))
        .await
        .unwrap();

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    let request = requests[0].to_ascii_lowercase();
    assert!(request.starts_with("post /a/b?c=d http/1.1\r\n"), "{}", request);
    assert!(request.contains("content-type: application/ssi-agent-wire\r\n"));
    assert!(request.contains("content-length: 4\r\n"));
    assert!(!request.contains("user-agent:"));
    assert!(!request.contains("authorization:"));
}
