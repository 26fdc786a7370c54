// tests/integration/handshake_test.rs

//! Size negotiation and control paths, exercised over raw framed connections.

use super::test_helpers::{TestServer, next_message};
use futures::SinkExt;
use zcli::config::Config;
use zcli::core::protocol::{ControlPath, DEFAULT_BUF_SIZE, Message};

#[tokio::test]
async fn test_client_adopts_announced_chunk_size() {
    let server = TestServer::with_config(Config {
        buf_size: 64,
        ..TestServer::config()
    })
    .await;

    let mut client = server.client().await;
    assert_eq!(client.chunk_size(), 64);
    assert_eq!(client.query_size().await.unwrap(), 64);
    server.stop().await;
}

#[tokio::test]
async fn test_tiny_chunk_size_carries_long_messages() {
    let server = TestServer::with_config(Config {
        buf_size: 3,
        ..TestServer::config()
    })
    .await;

    let mut client = server.client().await;
    let help = client.execute("--help").await.unwrap();
    assert!(help.contains("Commands list:"));
    assert!(help.contains("Show the identity of this connection."));

    let long_line = format!("bogus{}", "x".repeat(5000));
    let err = client.execute(&long_line).await.unwrap();
    assert!(err.contains(&long_line));
    server.stop().await;
}

#[tokio::test]
async fn test_server_announces_before_anything_else() {
    let server = TestServer::start().await;
    let mut framed = server.raw().await;

    let announce = next_message(&mut framed).await;
    assert_eq!(announce.control_path(), Some(ControlPath::BufSizeSync));
    assert_eq!(announce.payload, DEFAULT_BUF_SIZE.to_string());
    server.stop().await;
}

#[tokio::test]
async fn test_user_command_before_sync_is_a_protocol_error() {
    let server = TestServer::start().await;
    let mut framed = server.raw().await;
    next_message(&mut framed).await;

    framed
        .send(Message::control(ControlPath::UserCommand, "whoami"))
        .await
        .unwrap();
    let close = next_message(&mut framed).await;
    assert_eq!(close.control_path(), Some(ControlPath::Close));
    assert!(close.payload.contains("synchronized"));
    server.wait_for_connections(0).await;
    server.stop().await;
}

#[tokio::test]
async fn test_mismatched_ack_is_a_protocol_error() {
    let server = TestServer::start().await;
    let mut framed = server.raw().await;
    next_message(&mut framed).await;

    framed
        .send(Message::control(ControlPath::BufSizeSync, "1024"))
        .await
        .unwrap();
    let close = next_message(&mut framed).await;
    assert_eq!(close.control_path(), Some(ControlPath::Close));
    assert!(close.payload.contains("mismatch"));
    server.stop().await;
}

#[tokio::test]
async fn test_empty_sync_is_answered_in_any_state() {
    let server = TestServer::start().await;
    let mut framed = server.raw().await;
    next_message(&mut framed).await;

    framed
        .send(Message::control(ControlPath::BufSizeSync, ""))
        .await
        .unwrap();
    let echo = next_message(&mut framed).await;
    assert_eq!(echo.control_path(), Some(ControlPath::BufSizeSync));
    assert_eq!(echo.payload, DEFAULT_BUF_SIZE.to_string());
    server.stop().await;
}

#[tokio::test]
async fn test_unknown_path_ends_the_session() {
    let server = TestServer::start().await;
    let mut framed = server.raw_synced().await;

    framed.send(Message::new("/nope", "")).await.unwrap();
    let close = next_message(&mut framed).await;
    assert_eq!(close.control_path(), Some(ControlPath::Close));
    assert!(close.payload.contains("path=/nope"));
    server.wait_for_connections(0).await;
    server.stop().await;
}

#[tokio::test]
async fn test_ping_is_echoed_as_pong() {
    let server = TestServer::start().await;
    let mut client = server.client().await;
    assert_eq!(client.ping("are you there").await.unwrap(), "are you there");
    server.stop().await;
}

#[tokio::test]
async fn test_sentinel_ends_the_session_quietly() {
    let server = TestServer::start().await;
    let mut framed = server.raw_synced().await;
    server.wait_for_connections(1).await;

    framed.send(Message::sentinel()).await.unwrap();
    server.wait_for_connections(0).await;
    server.stop().await;
}
