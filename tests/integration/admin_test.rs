// tests/integration/admin_test.rs

//! Administrative commands and server-initiated session endings.

use super::test_helpers::{TestServer, whoami_id};
use std::time::Duration;
use zcli::ShellError;
use zcli::config::Config;
use zcli::server::CLOSE_TOO_MANY;

#[tokio::test]
async fn test_kill_closes_target_and_spares_others() {
    let server = TestServer::start().await;
    let mut a = server.client().await;
    let mut b = server.client().await;
    let mut admin = server.admin().await;
    let a_id = whoami_id(&mut a).await;
    server.wait_for_connections(3).await;

    assert_eq!(admin.execute("sudo conn kill").await.unwrap(), "Connection id: ");
    let killed = admin.execute(&a_id.to_string()).await.unwrap();
    assert!(killed.starts_with(&format!("Killed connection {a_id}")));

    assert_eq!(a.wait_closed().await.unwrap(), "killed by administrator");
    assert!(server.state.registry.lookup(a_id).is_none());
    assert_eq!(server.state.stats.get_killed_sessions(), 1);

    let b_whoami = b.execute("whoami").await.unwrap();
    assert!(b_whoami.contains("(guest)"));
    server.wait_for_connections(2).await;
    server.stop().await;
}

#[tokio::test]
async fn test_kill_reports_unknown_and_malformed_ids() {
    let server = TestServer::start().await;
    let mut admin = server.admin().await;

    let unknown = admin.execute("sudo conn kill 999").await.unwrap();
    assert!(unknown.starts_with("no conn found, id: 999"));
    // The session is back at `sudo conn`.
    let malformed = admin.execute("kill abc").await.unwrap();
    assert!(malformed.starts_with("invalid connection id: 'abc'"));
    server.stop().await;
}

#[tokio::test]
async fn test_users_cannot_reach_administration() {
    let server = TestServer::start().await;
    let mut user = server.client().await;
    super::test_helpers::sign_in(&mut user, "mallory").await;

    let denied = user.execute("sudo conn ls").await.unwrap();
    assert!(denied.contains("permission denied: 'zcli sudo'"));
    server.stop().await;
}

#[tokio::test]
async fn test_connection_list_marks_the_caller() {
    let server = TestServer::start().await;
    let _other = server.client().await;
    let mut admin = server.admin().await;
    let admin_id = whoami_id(&mut admin).await;

    let table = admin.execute("sudo conn ls").await.unwrap();
    assert!(table.contains("ADDRESS"));
    let marked: Vec<&str> = table.lines().filter(|l| l.starts_with('*')).collect();
    assert_eq!(marked.len(), 1);
    assert!(marked[0].contains(&format!(" {admin_id} |")));
    assert!(table.contains("2 live"));
    server.stop().await;
}

#[tokio::test]
async fn test_log_filter_is_replaced_at_runtime() {
    let server = TestServer::start().await;
    let mut admin = server.admin().await;

    assert_eq!(admin.execute("sudo log").await.unwrap(), "Log filter: ");
    let changed = admin.execute("zcli=debug").await.unwrap();
    assert!(changed.starts_with("Log filter set to 'zcli=debug'."));

    // The session is back at `sudo`.
    let rejected = admin.execute("log zcli=notalevel").await.unwrap();
    assert!(rejected.starts_with("invalid log filter 'zcli=notalevel'"));
    server.stop().await;
}

#[tokio::test]
async fn test_connections_over_the_limit_are_turned_away() {
    let server = TestServer::with_config(Config {
        max_clients: 1,
        ..TestServer::config()
    })
    .await;
    let mut first = server.client().await;

    match zcli::ShellClient::connect(&server.address).await {
        Err(ShellError::ClosedByPeer(reason)) => assert_eq!(reason, CLOSE_TOO_MANY),
        Err(e) => panic!("unexpected error: {e}"),
        Ok(_) => panic!("second client should have been rejected"),
    }
    assert_eq!(server.state.stats.get_rejected_connections(), 1);
    assert!(first.execute("whoami").await.is_ok());
    server.stop().await;
}

#[tokio::test]
async fn test_idle_sessions_are_closed() {
    let server = TestServer::with_config(Config {
        idle_timeout: Some(Duration::from_millis(100)),
        ..TestServer::config()
    })
    .await;
    let mut client = server.client().await;

    let reason = tokio::time::timeout(Duration::from_secs(5), client.wait_closed())
        .await
        .expect("server never closed the idle session")
        .unwrap();
    assert_eq!(reason, "idle timeout");
    server.wait_for_connections(0).await;
    server.stop().await;
}

#[tokio::test]
async fn test_shutdown_notifies_every_session() {
    let server = TestServer::start().await;
    let mut a = server.client().await;
    let mut b = server.client().await;
    server.wait_for_connections(2).await;

    server.stop().await;
    assert_eq!(a.wait_closed().await.unwrap(), "server shutting down");
    assert_eq!(b.wait_closed().await.unwrap(), "server shutting down");
}
