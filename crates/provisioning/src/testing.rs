//! Test doubles shared by the module tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Notify;

use crate::ProvisionError;
use crate::fetcher::ConfigImporter;
use crate::http::{GetFuture, HttpGet, HttpResponse};

/// Device id preset in test stores so fetch URLs are predictable.
pub(crate) const DEVICE_ID: &str = "dev-1";

/// Starts a one-shot HTTP server answering with `status` and `body`.
pub(crate) async fn mock_server(status: u16, body: &str) -> (String, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let url = format!("http://127.0.0.1:{port}");
    let body = body.to_string();

    let handle = tokio::spawn(async move {
        if let Ok((mut stream, _)) = listener.accept().await {
            let mut buf = vec![0u8; 8192];
            let _ = stream.read(&mut buf).await;

            let resp = format!(
                "HTTP/1.1 {status} Mock\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = stream.write_all(resp.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });

    (url, handle)
}

/// Starts a server that accepts one connection and never answers.
pub(crate) async fn stalled_server(hold: Duration) -> (String, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let url = format!("http://127.0.0.1:{port}");

    let handle = tokio::spawn(async move {
        if let Ok((mut stream, _)) = listener.accept().await {
            let mut buf = vec![0u8; 8192];
            let _ = stream.read(&mut buf).await;
            tokio::time::sleep(hold).await;
        }
    });

    (url, handle)
}

/// Returns a URL on a port nothing listens on.
pub(crate) async fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}/provision")
}

/// Scripted answer for [`FakeHttp`].
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Ok(&'static str),
    Status(u16),
    Timeout,
    Refused,
}

/// Scripted [`HttpGet`]. Each URL has a queue of replies; the last reply
/// repeats once the queue is down to one. Unknown URLs are refused.
#[derive(Default)]
pub(crate) struct FakeHttp {
    routes: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<(String, Duration)>>,
    gate: Option<Arc<Notify>>,
}

impl FakeHttp {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Every request waits for `gate` to be notified before answering.
    pub(crate) fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub(crate) fn route(self, url: &str, replies: &[Reply]) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), replies.iter().cloned().collect());
        self
    }

    /// Requested URLs with their timeouts, in order.
    pub(crate) fn calls(&self) -> Vec<(String, Duration)> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn urls(&self) -> Vec<String> {
        self.calls().into_iter().map(|(url, _)| url).collect()
    }

    fn next_reply(&self, url: &str) -> Reply {
        let mut routes = self.routes.lock().unwrap();
        match routes.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap_or(Reply::Refused),
            None => Reply::Refused,
        }
    }
}

impl HttpGet for FakeHttp {
    fn get<'a>(&'a self, url: &'a str, timeout: Duration) -> GetFuture<'a> {
        Box::pin(async move {
            self.calls.lock().unwrap().push((url.to_string(), timeout));
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            match self.next_reply(url) {
                Reply::Ok(body) => Ok(HttpResponse {
                    status: 200,
                    body: body.to_string(),
                }),
                Reply::Status(status) => Ok(HttpResponse {
                    status,
                    body: String::new(),
                }),
                Reply::Timeout => Err(ProvisionError::Timeout {
                    url: url.to_string(),
                    timeout,
                }),
                Reply::Refused => Err(ProvisionError::Transport {
                    url: url.to_string(),
                    message: "connection refused".into(),
                }),
            }
        })
    }
}

/// Importer that records every payload.
#[derive(Default)]
pub(crate) struct RecordingImporter {
    payloads: Mutex<Vec<String>>,
}

impl RecordingImporter {
    pub(crate) fn payloads(&self) -> Vec<String> {
        self.payloads.lock().unwrap().clone()
    }
}

impl ConfigImporter for RecordingImporter {
    fn import(&self, payload: &str) {
        self.payloads.lock().unwrap().push(payload.to_string());
    }
}
