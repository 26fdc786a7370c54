// tests/integration/session_test.rs

//! The command dispatcher as seen by a connected client.

use super::test_helpers::{TestServer, sign_in};
use zcli::core::commands::{CONCEAL, REVEAL};
use zcli::core::permission::Mode;

#[tokio::test]
async fn test_help_lists_top_level_commands() {
    let server = TestServer::start().await;
    let mut client = server.client().await;

    let help = client.execute("--help").await.unwrap();
    assert!(help.starts_with("Usage: zcli <Command>"));
    for name in ["sign", "sudo", "whoami"] {
        assert!(help.contains(name), "missing {name} in {help}");
    }
    assert!(help.ends_with("> "));
    server.stop().await;
}

#[tokio::test]
async fn test_sign_in_is_a_three_step_conversation() {
    let server = TestServer::start().await;
    let mut client = server.client().await;

    assert_eq!(client.execute("sign in").await.unwrap(), "Name: ");
    let password_prompt = client.execute("alice").await.unwrap();
    assert!(password_prompt.starts_with("Password: "));
    assert!(password_prompt.ends_with(CONCEAL));

    let done = client.execute("secret").await.unwrap();
    assert!(done.starts_with(REVEAL));
    assert!(done.contains("alice"));
    assert!(done.contains(&Mode::USER.to_string()));
    // Back at the `sign` command set.
    assert!(done.contains("Usage: zcli sign <in out up>"));

    client.execute("").await.unwrap();
    let whoami = client.execute("whoami").await.unwrap();
    assert!(whoami.contains(&format!("mode: {} (user)", Mode::USER)));
    server.stop().await;
}

#[tokio::test]
async fn test_empty_line_aborts_without_side_effects() {
    let server = TestServer::start().await;
    let mut client = server.client().await;

    client.execute("sign in").await.unwrap();
    let aborted = client.execute("").await.unwrap();
    assert_eq!(aborted, "<<<\n> ");

    let whoami = client.execute("whoami").await.unwrap();
    assert!(whoami.contains("(guest)"));
    server.stop().await;
}

#[tokio::test]
async fn test_permission_gate_follows_the_connection_mode() {
    let server = TestServer::start().await;
    let mut client = server.client().await;

    let denied = client.execute("sign out").await.unwrap();
    assert!(denied.contains("permission denied"));
    assert!(denied.contains(&Mode::REGISTERED.to_string()));
    assert!(denied.contains(&Mode::GUEST.to_string()));

    // Denial leaves the session inside `sign`, so `out` is resolved there.
    assert!(client.execute("out").await.unwrap().contains("permission denied"));
    client.execute("").await.unwrap();

    sign_in(&mut client, "bob").await;
    assert!(
        client
            .execute("sign out")
            .await
            .unwrap()
            .starts_with("Confirm to logout?")
    );
    let out = client.execute("y").await.unwrap();
    assert!(out.starts_with("Signed out."));
    server.stop().await;
}

#[tokio::test]
async fn test_unknown_command_names_token_and_path() {
    let server = TestServer::start().await;
    let mut client = server.admin().await;

    let top = client.execute("bogus").await.unwrap();
    assert!(top.contains("invalid option: 'bogus' for command 'zcli'"));

    client.execute("sudo conn").await.unwrap();
    let nested = client.execute("bogus").await.unwrap();
    assert!(nested.contains("invalid option: 'bogus' for command 'zcli sudo conn'"));
    // Still waiting at `sudo conn`.
    assert!(client.execute("ls").await.unwrap().contains("ADDRESS"));
    server.stop().await;
}

#[tokio::test]
async fn test_one_line_invocation_feeds_the_first_answer() {
    let server = TestServer::start().await;
    let mut client = server.client().await;

    let prompt = client.execute("sign in carol").await.unwrap();
    assert!(prompt.starts_with("Password: "));
    let done = client.execute("pw").await.unwrap();
    assert!(done.contains("Signed in: carol"));
    server.stop().await;
}

#[tokio::test]
async fn test_redundant_arguments_are_reported() {
    let server = TestServer::start().await;
    let mut client = server.client().await;

    let out = client.execute("whoami extra").await.unwrap();
    assert!(out.starts_with("zcli: redundant argument(s) 'extra' ignored.\n"));
    assert!(out.contains("id: "));
    server.stop().await;
}
