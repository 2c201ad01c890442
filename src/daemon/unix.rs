use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures_util::{StreamExt, TryStreamExt};
use http::{header, Method, Request};
use http_body_util::{BodyStream, Empty};
use hyper_util::rt::TokioIo;
use tokio::net::UnixStream;

use super::{DaemonClient, DaemonError, DaemonResponse, DEFAULT_SOCKET_PATH};

/// Talks HTTP/1.1 to the daemon over its Unix domain socket.
///
/// Every call dials a fresh connection; nothing is pooled. The connection
/// stays open for as long as the returned body is alive, which is what lets
/// the event stream run indefinitely.
#[derive(Debug, Clone)]
pub struct UnixSocketClient {
    socket_path: PathBuf,
}

impl Default for UnixSocketClient {
    fn default() -> Self {
        Self::new(DEFAULT_SOCKET_PATH)
    }
}

impl UnixSocketClient {
    pub fn new(socket_path: impl AsRef<Path>) -> Self {
        Self {
            socket_path: socket_path.as_ref().to_path_buf(),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

#[async_trait::async_trait]
impl DaemonClient for UnixSocketClient {
    async fn get(&self, path: &str) -> Result<DaemonResponse, DaemonError> {
        let stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|source| DaemonError::Connect {
                path: self.socket_path.clone(),
                source,
            })?;

        let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream)).await?;
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                log::debug!("Daemon connection closed with error: {e}");
            }
        });

        let request = Request::builder()
            .method(Method::GET)
            .uri(path)
            .header(header::HOST, "localhost")
            .body(Empty::<Bytes>::new())?;

        log::debug!("GET {path}");
        let response = sender.send_request(request).await?;
        let status = response.status();

        let body = BodyStream::new(response.into_body())
            .try_filter_map(|frame| async move { Ok(frame.into_data().ok()) })
            .map(move |chunk| {
                // The request handle lives as long as the body does.
                let _ = &sender;
                chunk.map_err(DaemonError::from)
            });

        Ok(DaemonResponse {
            status,
            body: Box::pin(body),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::daemon::read_body;
    use http::StatusCode;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::UnixListener;

    fn temp_socket_path() -> PathBuf {
        std::env::temp_dir().join(format!("dockwatch-{}.sock", uuid::Uuid::now_v7()))
    }

    /// Accept a single connection, answer it with `response` and return the
    /// request head the client sent.
    fn serve_once(listener: UnixListener, response: &'static str) -> tokio::task::JoinHandle<String> {
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.expect("Failed to accept");
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).await.expect("Failed to read request");
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
            }
            stream
                .write_all(response.as_bytes())
                .await
                .expect("Failed to write response");
            stream.shutdown().await.expect("Failed to shutdown");
            String::from_utf8_lossy(&head).into_owned()
        })
    }

    #[tokio::test]
    async fn test_get_streams_body_until_close() {
        let path = temp_socket_path();
        let listener = UnixListener::bind(&path).expect("Failed to bind socket");
        let server = serve_once(
            listener,
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nConnection: close\r\n\r\n{\"id\":\"c1\",\"status\":\"start\"}{\"id\":\"c2\",\"status\":\"die\"}",
        );

        let client = UnixSocketClient::new(&path);
        let response = client.get("/events?since=1").await.expect("Request failed");
        assert_eq!(response.status, StatusCode::OK);

        let body = read_body(response.body).await.expect("Failed to read body");
        assert_eq!(
            &body[..],
            b"{\"id\":\"c1\",\"status\":\"start\"}{\"id\":\"c2\",\"status\":\"die\"}"
        );

        let head = server.await.expect("Server task failed");
        assert!(head.starts_with("GET /events?since=1 HTTP/1.1\r\n"));
        assert!(head.to_ascii_lowercase().contains("host: localhost"));

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_get_reports_status() {
        let path = temp_socket_path();
        let listener = UnixListener::bind(&path).expect("Failed to bind socket");
        let server = serve_once(
            listener,
            "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n",
        );

        let client = UnixSocketClient::new(&path);
        let response = client
            .get("/containers/missing/json")
            .await
            .expect("Request failed");
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        drop(response);

        server.await.expect("Server task failed");
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_get_missing_socket_is_connect_error() {
        let client = UnixSocketClient::new(temp_socket_path());
        match client.get("/events?since=1").await {
            Err(DaemonError::Connect { path, .. }) => assert_eq!(path, client.socket_path()),
            other => panic!("Expected connect error, got {other:?}"),
        }
    }

    #[test]
    fn test_default_uses_docker_socket() {
        assert_eq!(
            UnixSocketClient::default().socket_path(),
            Path::new("/var/run/docker.sock")
        );
    }
}
