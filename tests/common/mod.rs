//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use courier::compiler::CompiledRequest;
use courier::network::{RawResponse, TransportError, TransportOutcome};
use courier::Transport;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

// =============================================================================
// Canned HTTP server
// =============================================================================

/// Accept one connection, answer with `response`, and yield the raw request text
pub async fn serve_once(
    response: &'static str,
) -> anyhow::Result<(String, JoinHandle<anyhow::Result<String>>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await?;
        let request = read_request(&mut socket).await?;
        socket.write_all(response.as_bytes()).await?;
        socket.shutdown().await?;
        Ok(request)
    });
    Ok((format!("http://{}", addr), handle))
}

/// A URL on which nothing is listening
pub async fn refused_url() -> anyhow::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(format!("http://{}", addr))
}

async fn read_request(socket: &mut TcpStream) -> anyhow::Result<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if request_complete(&buf) {
            break;
        }
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn request_complete(buf: &[u8]) -> bool {
    let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
        return false;
    };
    let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
    if head.contains("transfer-encoding: chunked") {
        return buf.ends_with(b"0\r\n\r\n");
    }
    let length = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
    buf.len() >= end + 4 + length
}

// =============================================================================
// Scripted transport
// =============================================================================

/// Echoes the compiled request back as the body (`METHOD url`). URLs starting
/// with `fail://` fail; URLs containing `slow` wait for [`Scripted::release`].
#[derive(Clone, Default)]
pub struct Scripted {
    gate: Arc<Notify>,
}

impl Scripted {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let one waiting `slow` request through
    pub fn release(&self) {
        self.gate.notify_one();
    }
}

impl Transport for Scripted {
    async fn execute(&self, request: CompiledRequest) -> TransportOutcome {
        if request.url.starts_with("fail://") {
            return Err(TransportError::new("Failed to fetch"));
        }
        if request.url.contains("slow") {
            self.gate.notified().await;
        }
        let mut headers = vec![("Content-Type".to_string(), "text/plain".to_string())];
        headers.extend(
            request
                .headers
                .iter()
                .map(|(k, v)| (format!("x-echo-{}", k), v.to_string())),
        );
        let mut body = format!("{} {}", request.method, request.url);
        if let Some(text) = request.body_text() {
            body.push('\n');
            body.push_str(text);
        }
        Ok(RawResponse {
            status: 200,
            status_text: "OK".into(),
            headers,
            body: body.into_bytes(),
        })
    }
}

/// Panics on every request
pub struct Panicking;

impl Transport for Panicking {
    async fn execute(&self, _request: CompiledRequest) -> TransportOutcome {
        panic!("transport exploded")
    }
}
