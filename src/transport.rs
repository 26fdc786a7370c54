// src/transport.rs

//! Transport selection shared by the server and the client: an address ending
//! in `.sock` is a local domain socket, anything else is a TCP `host:port`.

use crate::core::ShellError;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{TcpListener, TcpStream};
#[cfg(unix)]
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, warn};

/// The suffix that selects a local domain socket.
pub const LOCAL_SOCKET_SUFFIX: &str = ".sock";

/// Where to listen or dial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Tcp(String),
    Unix(PathBuf),
}

impl Endpoint {
    pub fn parse(address: &str) -> Result<Self, ShellError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(ShellError::InvalidAddress(address.to_string()));
        }
        if address.ends_with(LOCAL_SOCKET_SUFFIX) {
            if cfg!(unix) {
                Ok(Endpoint::Unix(PathBuf::from(address)))
            } else {
                Err(ShellError::InvalidAddress(format!(
                    "{address}: local sockets are not supported on this platform"
                )))
            }
        } else {
            Ok(Endpoint::Tcp(address.to_string()))
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Tcp(addr) => write!(f, "tcp://{addr}"),
            Endpoint::Unix(path) => write!(f, "unix://{}", path.display()),
        }
    }
}

/// An enum to wrap different stream types (TCP or local socket) into a single type.
#[derive(Debug)]
pub enum AnyStream {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl AnyStream {
    /// Dials `endpoint`.
    pub async fn connect(endpoint: &Endpoint) -> Result<Self, ShellError> {
        match endpoint {
            Endpoint::Tcp(addr) => {
                let stream = TcpStream::connect(addr.as_str()).await?;
                stream.set_nodelay(true)?;
                Ok(AnyStream::Tcp(stream))
            }
            #[cfg(unix)]
            Endpoint::Unix(path) => Ok(AnyStream::Unix(UnixStream::connect(path).await?)),
            #[cfg(not(unix))]
            Endpoint::Unix(path) => Err(ShellError::InvalidAddress(path.display().to_string())),
        }
    }
}

impl AsyncRead for AnyStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            AnyStream::Tcp(s) => Pin::new(s).poll_read(cx, buf),
            #[cfg(unix)]
            AnyStream::Unix(s) => Pin::new(s).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for AnyStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<Result<usize, std::io::Error>> {
        match self.get_mut() {
            AnyStream::Tcp(s) => Pin::new(s).poll_write(cx, buf),
            #[cfg(unix)]
            AnyStream::Unix(s) => Pin::new(s).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), std::io::Error>> {
        match self.get_mut() {
            AnyStream::Tcp(s) => Pin::new(s).poll_flush(cx),
            #[cfg(unix)]
            AnyStream::Unix(s) => Pin::new(s).poll_flush(cx),
        }
    }

    fn poll_shutdown(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<(), std::io::Error>> {
        match self.get_mut() {
            AnyStream::Tcp(s) => Pin::new(s).poll_shutdown(cx),
            #[cfg(unix)]
            AnyStream::Unix(s) => Pin::new(s).poll_shutdown(cx),
        }
    }
}

/// A bound listener of either kind. A local socket file is removed again when
/// the listener is dropped.
#[derive(Debug)]
pub enum AnyListener {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix {
        listener: UnixListener,
        path: PathBuf,
    },
}

impl AnyListener {
    pub async fn bind(endpoint: &Endpoint) -> io::Result<Self> {
        match endpoint {
            Endpoint::Tcp(addr) => Ok(AnyListener::Tcp(TcpListener::bind(addr.as_str()).await?)),
            #[cfg(unix)]
            Endpoint::Unix(path) => {
                // A previous run that crashed leaves its socket file behind.
                if path.exists() {
                    debug!("Removing stale socket file {}", path.display());
                    std::fs::remove_file(path)?;
                }
                let listener = UnixListener::bind(path)?;
                Ok(AnyListener::Unix {
                    listener,
                    path: path.clone(),
                })
            }
            #[cfg(not(unix))]
            Endpoint::Unix(path) => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("local sockets are not supported: {}", path.display()),
            )),
        }
    }

    /// Accepts the next connection, returning it with a printable peer address.
    pub async fn accept(&self) -> io::Result<(AnyStream, String)> {
        match self {
            AnyListener::Tcp(listener) => {
                let (stream, addr) = listener.accept().await?;
                if let Err(e) = stream.set_nodelay(true) {
                    warn!("Failed to set TCP_NODELAY for {}: {}", addr, e);
                }
                Ok((AnyStream::Tcp(stream), addr.to_string()))
            }
            #[cfg(unix)]
            AnyListener::Unix { listener, path } => {
                let (stream, addr) = listener.accept().await?;
                let peer = addr
                    .as_pathname()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| format!("{}@local", path.display()));
                Ok((AnyStream::Unix(stream), peer))
            }
        }
    }

    /// The endpoint actually bound, with the real port when `:0` was requested.
    pub fn local_endpoint(&self) -> io::Result<Endpoint> {
        match self {
            AnyListener::Tcp(listener) => Ok(Endpoint::Tcp(listener.local_addr()?.to_string())),
            #[cfg(unix)]
            AnyListener::Unix { path, .. } => Ok(Endpoint::Unix(path.clone())),
        }
    }
}

#[cfg(unix)]
impl Drop for AnyListener {
    fn drop(&mut self) {
        if let AnyListener::Unix { path, .. } = self
            && let Err(e) = std::fs::remove_file(&*path)
            && e.kind() != io::ErrorKind::NotFound
        {
            warn!("Failed to remove socket file {}: {}", path.display(), e);
        }
    }
}
