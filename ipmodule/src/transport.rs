//! HTTP transport seam
//!
//! The client never talks to reqwest directly. Hosts that already own an
//! HTTP session hand it in through [`ReqwestTransport::from_client`], and
//! tests substitute a scripted transport.

use crate::{IpModuleError, IpModuleResult, TimeoutConfig};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::trace;

/// Status line and body of one HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// 200 response carrying a JSON document
    pub fn json(value: &Value) -> Self {
        Self::new(200, value.to_string())
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Minimal HTTP surface needed by the IP Module client
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> IpModuleResult<HttpResponse>;

    async fn post_json(&self, url: &str, body: &Value) -> IpModuleResult<HttpResponse>;
}

/// Production transport backed by a (shareable) reqwest client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http_client: Client,
    /// Reported in timeout errors
    request_ms: u64,
}

impl ReqwestTransport {
    /// Build a dedicated HTTP client with the given timeouts
    pub fn new(timeout_config: &TimeoutConfig) -> IpModuleResult<Self> {
        let http_client = Client::builder()
            .timeout(timeout_config.request_timeout())
            .connect_timeout(timeout_config.connect_timeout())
            .pool_idle_timeout(timeout_config.pool_idle_timeout())
            .build()
            .map_err(|e| IpModuleError::RequestFailed(e.to_string()))?;

        Ok(Self {
            http_client,
            request_ms: timeout_config.request_ms,
        })
    }

    /// Reuse a session owned by the host application
    pub fn from_client(http_client: Client) -> Self {
        Self {
            http_client,
            request_ms: TimeoutConfig::default().request_ms,
        }
    }

    /// Request timeout the shared session was built with
    pub fn with_request_timeout(mut self, ms: u64) -> Self {
        self.request_ms = ms;
        self
    }

    pub fn request_timeout_ms(&self) -> u64 {
        self.request_ms
    }

    fn map_error(&self, err: reqwest::Error) -> IpModuleError {
        if err.is_timeout() {
            let operation = err
                .url()
                .map(|u| u.path().to_string())
                .unwrap_or_else(|| "HTTP request".to_string());
            IpModuleError::timeout(operation, self.request_ms)
        } else {
            IpModuleError::from(err)
        }
    }

    async fn read(&self, response: reqwest::Response) -> IpModuleResult<HttpResponse> {
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| self.map_error(e))?;
        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str) -> IpModuleResult<HttpResponse> {
        trace!(url, "GET");
        let response = self.http_client.get(url).send().await.map_err(|e| self.map_error(e))?;
        self.read(response).await
    }

    async fn post_json(&self, url: &str, body: &Value) -> IpModuleResult<HttpResponse> {
        trace!(url, %body, "POST");
        let response = self
            .http_client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_error(e))?;
        self.read(response).await
    }
}

#[cfg(any(test, feature = "mock"))]
pub use mock::MockTransport;

#[cfg(any(test, feature = "mock"))]
mod mock {
    use super::{HttpResponse, Transport};
    use crate::{IpModuleError, IpModuleResult};
    use async_trait::async_trait;
    use serde_json::Value;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Scripted in-process transport.
    ///
    /// Responses are queued per endpoint. The last queued response of a queue
    /// is sticky and keeps being returned, which makes "device never stops"
    /// scenarios a single push. Every call is counted, and the number of
    /// overlapping calls is tracked to observe serialization.
    #[derive(Debug, Default)]
    pub struct MockTransport {
        status: Mutex<VecDeque<HttpResponse>>,
        command: Mutex<VecDeque<HttpResponse>>,
        posted: Mutex<Vec<Value>>,
        get_calls: AtomicUsize,
        post_calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        delay: Option<Duration>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Every call takes this long before answering
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn push_status(&self, payload: Value) -> &Self {
            self.push_status_response(HttpResponse::json(&payload))
        }

        pub fn push_status_response(&self, response: HttpResponse) -> &Self {
            self.status.lock().unwrap().push_back(response);
            self
        }

        pub fn push_command(&self, payload: Value) -> &Self {
            self.push_command_response(HttpResponse::json(&payload))
        }

        pub fn push_command_response(&self, response: HttpResponse) -> &Self {
            self.command.lock().unwrap().push_back(response);
            self
        }

        pub fn get_calls(&self) -> usize {
            self.get_calls.load(Ordering::SeqCst)
        }

        pub fn post_calls(&self) -> usize {
            self.post_calls.load(Ordering::SeqCst)
        }

        pub fn total_calls(&self) -> usize {
            self.get_calls() + self.post_calls()
        }

        /// Highest number of calls that were in progress at the same time
        pub fn max_in_flight(&self) -> usize {
            self.max_in_flight.load(Ordering::SeqCst)
        }

        /// Bodies of every POST, in order
        pub fn posted(&self) -> Vec<Value> {
            self.posted.lock().unwrap().clone()
        }

        fn next(queue: &Mutex<VecDeque<HttpResponse>>, url: &str) -> IpModuleResult<HttpResponse> {
            let mut queue = queue.lock().unwrap();
            let response = if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            };
            response.ok_or_else(|| IpModuleError::RequestFailed(format!("no scripted response for {}", url)))
        }

        async fn exchange(&self, queue: &Mutex<VecDeque<HttpResponse>>, url: &str) -> IpModuleResult<HttpResponse> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let response = Self::next(queue, url);
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            response
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn get(&self, url: &str) -> IpModuleResult<HttpResponse> {
            self.get_calls.fetch_add(1, Ordering::SeqCst);
            self.exchange(&self.status, url).await
        }

        async fn post_json(&self, url: &str, body: &Value) -> IpModuleResult<HttpResponse> {
            self.post_calls.fetch_add(1, Ordering::SeqCst);
            self.posted.lock().unwrap().push(body.clone());
            self.exchange(&self.command, url).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_mock_last_response_is_sticky() {
        let transport = MockTransport::new();
        transport
            .push_status(json!({"STATUS": "OK", "VERTICAL": "DOWN", "HORIZONTAL": "NA"}))
            .push_status(json!({"STATUS": "OK", "VERTICAL": "MOVING", "HORIZONTAL": "NA"}));

        let first = transport.get("http://lift/api/status").await.unwrap();
        assert!(first.body_text().contains("DOWN"));
        for _ in 0..3 {
            let next = transport.get("http://lift/api/status").await.unwrap();
            assert!(next.body_text().contains("MOVING"));
        }
        assert_eq!(transport.get_calls(), 4);
        assert_eq!(transport.post_calls(), 0);
    }

    #[tokio::test]
    async fn test_mock_without_script_fails() {
        let transport = MockTransport::new();
        let err = transport.post_json("http://lift/api/command", &json!({"COMMAND": "UP"})).await.unwrap_err();
        assert!(err.is_transport());
        assert_eq!(transport.posted(), vec![json!({"COMMAND": "UP"})]);
    }

    #[test]
    fn test_reqwest_transport_builds() {
        assert!(ReqwestTransport::new(&TimeoutConfig::default()).is_ok());
    }

    /// Accepts connections and never answers
    async fn silent_server() -> (String, tokio::task::JoinHandle<()>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        (format!("http://{}/api/status", addr), handle)
    }

    #[tokio::test]
    async fn test_timeout_reports_configured_duration() {
        let (url, server) = silent_server().await;
        let config = TimeoutConfig {
            request_ms: 50,
            ..TimeoutConfig::default()
        };
        let transport = ReqwestTransport::new(&config).unwrap();

        match transport.get(&url).await {
            Err(IpModuleError::Timeout { operation, duration_ms }) => {
                assert_eq!(duration_ms, 50);
                assert_eq!(operation, "/api/status");
            }
            other => panic!("expected Timeout, got {:?}", other),
        }
        server.abort();
    }

    #[tokio::test]
    async fn test_shared_session_reports_configured_duration() {
        let (url, server) = silent_server().await;
        let host = url
            .trim_start_matches("http://")
            .trim_end_matches("/api/status")
            .to_string();
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_millis(80))
            .build()
            .unwrap();
        let client = crate::IpModuleClient::builder(host)
            .request_timeout(80)
            .http_client(http_client)
            .build()
            .unwrap();

        let err = client.get_status().await.unwrap_err();
        assert!(
            matches!(err, IpModuleError::Timeout { duration_ms: 80, .. }),
            "{:?}",
            err
        );
        server.abort();
    }
}
