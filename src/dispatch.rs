// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Delivery of traces to the webhook.
//!
//! One POST per trace, JSON body, bounded by a timeout. Nothing is retried:
//! the caller logs the error and moves on to the next trace.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::error::DispatchError;
use crate::types::DeliveryPayload;

/// Default delivery timeout in milliseconds.
pub const DEFAULT_DELIVERY_TIMEOUT_MS: u64 = 2000;

/// Sends a payload to an endpoint.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn deliver(&self, url: &str, payload: &DeliveryPayload) -> Result<(), DispatchError>;
}

/// HTTP webhook dispatcher.
#[derive(Debug, Clone)]
pub struct WebhookDispatcher {
    client: Client,
    timeout: Duration,
}

impl WebhookDispatcher {
    /// Create a dispatcher whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, DispatchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tracewatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DispatchError::NetworkError(e.to_string()))?;

        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn map_send_error(&self, err: reqwest::Error) -> DispatchError {
        if err.is_timeout() {
            DispatchError::Timeout(self.timeout.as_millis() as u64)
        } else {
            DispatchError::NetworkError(err.to_string())
        }
    }
}

#[async_trait]
impl Dispatcher for WebhookDispatcher {
    async fn deliver(&self, url: &str, payload: &DeliveryPayload) -> Result<(), DispatchError> {
        if url.trim().is_empty() {
            return Err(DispatchError::NotConfigured);
        }

        let body = serde_json::to_vec(payload).map_err(|e| DispatchError::Serialization(e.to_string()))?;

        let response = self
            .client
            .post(url)
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DispatchError::Status {
                status: status.as_u16(),
            });
        }

        debug!(url, status = status.as_u16(), "trace delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ErrorTrace, ProvenanceRecord};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    fn payload() -> DeliveryPayload {
        let trace = ErrorTrace::new(vec!["PHP Warning: x in /srv/a.php on line 3".to_string()]).unwrap();
        let record = ProvenanceRecord {
            file: "/srv/a.php".to_string(),
            line: 3,
            vhost: None,
            git_remote: Some("unknown".to_string()),
            error_line: trace.text(),
            blame: None,
        };
        DeliveryPayload::new(&trace, Some(record))
    }

    /// Read one HTTP request (headers plus Content-Length body).
    async fn read_request(stream: &mut tokio::net::TcpStream) -> (String, Vec<u8>) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let head = String::from_utf8_lossy(&buf[..end]).to_string();
            let length = head
                .lines()
                .find_map(|l| {
                    let (name, value) = l.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= end + 4 + length {
                return (head, buf[end + 4..end + 4 + length].to_vec());
            }
        }
        (String::new(), Vec::new())
    }

    /// Serve a single request with `status`, handing the request back.
    async fn one_shot_server(status: &'static str) -> (String, oneshot::Receiver<(String, Vec<u8>)>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/webhook/apache-error", listener.local_addr().unwrap());
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request = read_request(&mut stream).await;
            let response = format!("HTTP/1.1 {status}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n");
            stream.write_all(response.as_bytes()).await.unwrap();
            let _ = tx.send(request);
        });

        (url, rx)
    }

    #[tokio::test]
    async fn test_deliver_posts_json() {
        let (url, rx) = one_shot_server("200 OK").await;
        let dispatcher = WebhookDispatcher::new(Duration::from_secs(5)).unwrap();

        dispatcher.deliver(&url, &payload()).await.unwrap();

        let (head, body) = rx.await.unwrap();
        assert!(head.starts_with("POST /webhook/apache-error"));
        assert!(head.to_lowercase().contains("content-type: application/json"));

        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error_line"], "PHP Warning: x in /srv/a.php on line 3");
        assert_eq!(json["error_detail"]["file"], "/srv/a.php");
        assert_eq!(json["error_detail"]["line"], 3);
        assert_eq!(json["error_detail"]["git_remote"], "unknown");
    }

    #[tokio::test]
    async fn test_deliver_non_success_status() {
        let (url, _rx) = one_shot_server("500 Internal Server Error").await;
        let dispatcher = WebhookDispatcher::new(Duration::from_secs(5)).unwrap();

        let err = dispatcher.deliver(&url, &payload()).await.unwrap_err();
        assert!(matches!(err, DispatchError::Status { status: 500 }));
    }

    #[tokio::test]
    async fn test_deliver_unreachable_endpoint() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let dispatcher = WebhookDispatcher::new(Duration::from_secs(2)).unwrap();
        let err = dispatcher
            .deliver(&format!("http://{addr}/hook"), &payload())
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::NetworkError(_)), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn test_deliver_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/hook", listener.local_addr().unwrap());
        tokio::spawn(async move {
            // Accept and never answer.
            let (_stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        let dispatcher = WebhookDispatcher::new(Duration::from_millis(200)).unwrap();
        let err = dispatcher.deliver(&url, &payload()).await.unwrap_err();
        assert!(matches!(err, DispatchError::Timeout(200)));
    }

    #[tokio::test]
    async fn test_deliver_empty_url() {
        let dispatcher = WebhookDispatcher::new(Duration::from_secs(1)).unwrap();
        let err = dispatcher.deliver("  ", &payload()).await.unwrap_err();
        assert!(matches!(err, DispatchError::NotConfigured));
    }
}
