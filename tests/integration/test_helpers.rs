// tests/integration/test_helpers.rs

//! Test helpers and utilities for integration tests

use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;
use tracing_subscriber::{EnvFilter, Registry, reload};
use zcli::ShellClient;
use zcli::config::Config;
use zcli::core::protocol::{ChunkCodec, ControlPath, Message};
use zcli::core::state::ServerState;
use zcli::server::Server;
use zcli::transport::{AnyStream, Endpoint};

/// The administrator name every test server is configured with.
pub const ADMIN: &str = "admin";

/// A real server listening on an ephemeral port (or a temporary socket file),
/// running on the test's runtime.
pub struct TestServer {
    pub state: Arc<ServerState>,
    pub address: String,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<anyhow::Result<()>>>,
    // Keeps the reload handle in server state usable.
    _log_layer: reload::Layer<EnvFilter, Registry>,
    _dir: Option<TempDir>,
}

impl TestServer {
    /// Starts a TCP server with default configuration.
    pub async fn start() -> Self {
        Self::with_config(Self::config()).await
    }

    /// The configuration every helper starts from.
    pub fn config() -> Config {
        Config {
            address: "127.0.0.1:0".to_string(),
            auth: zcli::config::AuthConfig {
                root_names: vec![ADMIN.to_string()],
            },
            ..Config::default()
        }
    }

    /// Starts a server listening on a fresh local socket file.
    pub async fn start_local() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("zcli.sock");
        let config = Config {
            address: path.to_string_lossy().into_owned(),
            ..Self::config()
        };
        let mut server = Self::with_config(config).await;
        server._dir = Some(dir);
        server
    }

    /// Starts a server with custom configuration.
    pub async fn with_config(config: Config) -> Self {
        // Set up minimal tracing for tests (ignore error if already initialized)
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("warn"))
            .with_test_writer()
            .try_init();

        let (log_layer, reload_handle) = reload::Layer::new(EnvFilter::new("warn"));

        let server = Server::bind(config, Arc::new(reload_handle))
            .await
            .expect("Failed to bind test server");
        let address = match server.local_endpoint().expect("No local endpoint") {
            Endpoint::Tcp(addr) => addr,
            Endpoint::Unix(path) => path.to_string_lossy().into_owned(),
        };
        let state = server.state();

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(server.run_until(async move {
            let _ = shutdown_rx.await;
        }));

        Self {
            state,
            address,
            shutdown: Some(shutdown_tx),
            task: Some(task),
            _log_layer: log_layer,
            _dir: None,
        }
    }

    /// Connects a client that has completed the handshake.
    pub async fn client(&self) -> ShellClient {
        ShellClient::connect(&self.address)
            .await
            .expect("Failed to connect test client")
    }

    /// Connects a client and signs it in as the configured administrator.
    pub async fn admin(&self) -> ShellClient {
        let mut client = self.client().await;
        sign_in(&mut client, ADMIN).await;
        client
    }

    /// Opens a connection without performing the handshake.
    pub async fn raw(&self) -> Framed<AnyStream, ChunkCodec> {
        let endpoint = Endpoint::parse(&self.address).expect("Bad address");
        let stream = AnyStream::connect(&endpoint)
            .await
            .expect("Failed to connect raw stream");
        Framed::new(stream, ChunkCodec::default())
    }

    /// Opens a raw connection and completes the handshake by hand.
    pub async fn raw_synced(&self) -> Framed<AnyStream, ChunkCodec> {
        let mut framed = self.raw().await;
        let announce = next_message(&mut framed).await;
        assert_eq!(announce.control_path(), Some(ControlPath::BufSizeSync));
        let size: usize = announce.payload.parse().expect("Size announcement is not a number");
        framed.codec_mut().set_chunk_size(size).unwrap();
        framed
            .send(Message::control(ControlPath::BufSizeSync, size.to_string()))
            .await
            .unwrap();
        framed
    }

    /// Waits until the registry holds exactly `n` connections.
    pub async fn wait_for_connections(&self, n: usize) {
        for _ in 0..200 {
            if self.state.registry.len() == n {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!(
            "expected {n} live connections, registry holds {}",
            self.state.registry.len()
        );
    }

    /// Shuts the server down and waits for the accept loop to finish.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            task.await
                .expect("Server task panicked")
                .expect("Server returned an error");
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Reads the next message from a raw connection, failing the test on EOF.
pub async fn next_message(framed: &mut Framed<AnyStream, ChunkCodec>) -> Message {
    framed
        .next()
        .await
        .expect("Stream ended")
        .expect("Failed to decode message")
}

/// Drives `sign in` for `name` with a throwaway password, then returns the
/// session to the top level. Returns the sign-in response.
pub async fn sign_in(client: &mut ShellClient, name: &str) -> String {
    assert_eq!(client.execute("sign in").await.unwrap(), "Name: ");
    client.execute(name).await.unwrap();
    let response = client.execute("secret").await.unwrap();
    assert!(client.execute("").await.unwrap().starts_with("<<<"));
    response
}

/// Extracts the connection id from `whoami` output.
pub async fn whoami_id(client: &mut ShellClient) -> u32 {
    let out = client.execute("whoami").await.unwrap();
    out.lines()
        .find_map(|line| line.strip_prefix("id: "))
        .and_then(|id| id.trim().parse().ok())
        .expect("whoami did not report an id")
}
