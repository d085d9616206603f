//! Transport Layer Tests
//!
//! Tests for the reconnecting WebSocket transport:
//! - Connection establishment
//! - Frames in both directions
//! - Reconnection after a server-side drop
//! - Connection failures and timeouts
//! - Subprotocol negotiation
//! - Client-side close

use gestura_test_utils::{init_tracing, TestServer};
use gestura_transport::{
    Transport, TransportError, TransportEvent, TransportOptions, TransportReceiver, TransportSender,
    WebSocketTransport, CLIENT_CLOSE_REASON,
};
use std::time::Duration;
use tokio::time::timeout;

fn fast_options() -> TransportOptions {
    TransportOptions {
        connection_timeout: Duration::from_secs(2),
        reconnect_interval: Duration::from_millis(50),
        subprotocols: Vec::new(),
    }
}

async fn next_event(receiver: &mut impl TransportReceiver) -> TransportEvent {
    timeout(Duration::from_secs(5), receiver.recv())
        .await
        .expect("timed out waiting for transport event")
        .expect("transport event channel closed")
}

// ============================================================================
// Connection Tests
// ============================================================================

#[tokio::test]
async fn test_websocket_connect() {
    init_tracing();
    let server = TestServer::start().await;

    let (sender, mut receiver) = WebSocketTransport::new()
        .open(&server.url(), &fast_options())
        .expect("open failed");

    assert_eq!(next_event(&mut receiver).await, TransportEvent::Connected);
    assert!(sender.is_connected());
    assert!(server.wait_for_connections(1, Duration::from_secs(2)).await);

    sender.close();
}

#[tokio::test]
async fn test_websocket_send_and_receive() {
    let server = TestServer::start().await;

    let (sender, mut receiver) = WebSocketTransport::new()
        .open(&server.url(), &fast_options())
        .expect("open failed");
    assert_eq!(next_event(&mut receiver).await, TransportEvent::Connected);
    assert!(server.wait_for_connections(1, Duration::from_secs(2)).await);

    sender
        .try_send(r#"{"type":"operation","data":[]}"#.to_string())
        .expect("send failed");
    assert!(server.wait_for_received(1, Duration::from_secs(2)).await);
    assert_eq!(server.received(), vec![r#"{"type":"operation","data":[]}"#]);

    assert_eq!(server.send(r#"{"type":"data","data":[]}"#), 1);
    assert_eq!(
        next_event(&mut receiver).await,
        TransportEvent::Data(r#"{"type":"data","data":[]}"#.to_string())
    );

    sender.close();
}

#[tokio::test]
async fn test_websocket_reconnects_after_server_drop() {
    let server = TestServer::start().await;

    let (sender, mut receiver) = WebSocketTransport::new()
        .open(&server.url(), &fast_options())
        .expect("open failed");
    assert_eq!(next_event(&mut receiver).await, TransportEvent::Connected);
    assert!(server.wait_for_connections(1, Duration::from_secs(2)).await);

    server.drop_clients("maintenance");

    assert_eq!(
        next_event(&mut receiver).await,
        TransportEvent::Disconnected {
            reason: Some("maintenance".to_string())
        }
    );
    assert_eq!(next_event(&mut receiver).await, TransportEvent::Connected);
    assert!(server.wait_for_connections(2, Duration::from_secs(2)).await);
    assert!(sender.is_connected());

    sender.close();
}

#[tokio::test]
async fn test_websocket_connection_refused_reports_error() {
    // Bind and release a port so nothing is listening on it
    let port = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };

    let (sender, mut receiver) = WebSocketTransport::new()
        .open(&format!("ws://127.0.0.1:{}", port), &fast_options())
        .expect("open failed");

    match next_event(&mut receiver).await {
        TransportEvent::Error(detail) => assert!(detail.starts_with("connection failed"), "{}", detail),
        other => panic!("expected error event, got {:?}", other),
    }
    assert!(!sender.is_connected());

    sender.close();
}

#[tokio::test]
async fn test_websocket_connection_timeout() {
    // Accepts TCP but never completes the WebSocket handshake
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let _hold = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    let options = TransportOptions {
        connection_timeout: Duration::from_millis(100),
        ..fast_options()
    };
    let (sender, mut receiver) = WebSocketTransport::new()
        .open(&format!("ws://127.0.0.1:{}", port), &options)
        .expect("open failed");

    match next_event(&mut receiver).await {
        TransportEvent::Error(detail) => {
            assert_eq!(detail, TransportError::Timeout(options.connection_timeout).to_string())
        }
        other => panic!("expected timeout error, got {:?}", other),
    }

    sender.close();
}

// ============================================================================
// Close and Subprotocol Tests
// ============================================================================

#[tokio::test]
async fn test_websocket_close_stops_reconnecting() {
    let server = TestServer::start().await;

    let (sender, mut receiver) = WebSocketTransport::new()
        .open(&server.url(), &fast_options())
        .expect("open failed");
    assert_eq!(next_event(&mut receiver).await, TransportEvent::Connected);

    sender.close();

    assert_eq!(
        next_event(&mut receiver).await,
        TransportEvent::Disconnected {
            reason: Some(CLIENT_CLOSE_REASON.to_string())
        }
    );
    let end = timeout(Duration::from_secs(2), receiver.recv())
        .await
        .expect("receiver did not finish");
    assert_eq!(end, None);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(server.connection_count(), 1);
    assert!(sender.try_send("late".to_string()).is_err());
}

#[tokio::test]
async fn test_websocket_subprotocol_header() {
    let server = TestServer::start().await;

    let options = TransportOptions {
        subprotocols: vec!["gestura.v1".to_string()],
        ..fast_options()
    };
    let (sender, mut receiver) = WebSocketTransport::new()
        .open(&server.url(), &options)
        .expect("open failed");
    assert_eq!(next_event(&mut receiver).await, TransportEvent::Connected);

    assert_eq!(
        server.requested_protocols(),
        vec![Some("gestura.v1".to_string())]
    );

    sender.close();
}

#[tokio::test]
async fn test_websocket_no_subprotocol_by_default() {
    let server = TestServer::start().await;

    let (sender, mut receiver) = WebSocketTransport::new()
        .open(&server.url(), &fast_options())
        .expect("open failed");
    assert_eq!(next_event(&mut receiver).await, TransportEvent::Connected);

    assert_eq!(server.requested_protocols(), vec![None]);

    sender.close();
}
