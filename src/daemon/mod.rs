//! Daemon client module.
//!
//! The watcher only ever needs one capability from the container runtime:
//! issue a `GET` against an API path and receive the status plus a streamed
//! body. That capability is the [`DaemonClient`] trait, so the transport can
//! be swapped (the real Unix socket client, or a fake daemon in tests).

use std::path::PathBuf;
use std::pin::Pin;

use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt};
use http::StatusCode;

mod unix;

pub use unix::UnixSocketClient;

/// Where the Docker daemon listens by default on Linux.
pub const DEFAULT_SOCKET_PATH: &str = "/var/run/docker.sock";

/// A response body, delivered chunk by chunk as the daemon writes it.
pub type ResponseBody = Pin<Box<dyn Stream<Item = Result<Bytes, DaemonError>> + Send>>;

pub struct DaemonResponse {
    pub status: StatusCode,
    pub body: ResponseBody,
}

impl std::fmt::Debug for DaemonResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DaemonResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("Unable to connect to daemon socket {path:?}: {source}")]
    Connect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),
    #[error("Invalid request: {0}")]
    Request(#[from] http::Error),
}

#[async_trait::async_trait]
pub trait DaemonClient: Send + Sync {
    /// Issue `GET path` against the daemon API.
    ///
    /// `path` is an absolute API path such as `/events?since=1` or
    /// `/containers/{id}/json`.
    async fn get(&self, path: &str) -> Result<DaemonResponse, DaemonError>;
}

/// Read a whole response body into memory.
pub async fn read_body(mut body: ResponseBody) -> Result<Bytes, DaemonError> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = body.next().await {
        buf.extend_from_slice(&chunk?);
    }
    Ok(buf.freeze())
}
