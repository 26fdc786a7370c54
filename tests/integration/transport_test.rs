// tests/integration/transport_test.rs

//! Sessions over a local domain socket.

use super::test_helpers::TestServer;
use std::path::PathBuf;
use zcli::ShellClient;
use zcli::transport::Endpoint;

#[cfg(unix)]
#[tokio::test]
async fn test_local_socket_session() {
    let server = TestServer::start_local().await;
    let path = PathBuf::from(&server.address);
    assert!(path.exists());

    let mut client = ShellClient::connect(&server.address).await.unwrap();
    assert_eq!(client.endpoint(), &Endpoint::Unix(path.clone()));
    assert_eq!(client.ping("hello").await.unwrap(), "hello");
    let whoami = client.execute("whoami").await.unwrap();
    assert!(whoami.contains("(guest)"));

    client.close("done").await.unwrap();
    server.wait_for_connections(0).await;
    server.stop().await;
    assert!(!path.exists(), "socket file should be removed on shutdown");
}

#[cfg(unix)]
#[tokio::test]
async fn test_stale_socket_file_is_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stale.sock");
    std::fs::write(&path, b"").unwrap();

    let server = TestServer::with_config(zcli::config::Config {
        address: path.to_string_lossy().into_owned(),
        ..TestServer::config()
    })
    .await;
    let mut client = server.client().await;
    assert!(client.execute("whoami").await.is_ok());
    server.stop().await;
}

#[tokio::test]
async fn test_connect_to_missing_server_fails() {
    let result = ShellClient::connect("127.0.0.1:1").await;
    assert!(matches!(result, Err(zcli::ShellError::Io(_))));
}
