//! IP Module HTTP client

use crate::transport::{HttpResponse, ReqwestTransport, Transport};
use crate::{
    Command, CommandResponse, IpModuleError, IpModuleResult, ProgressListener, StatusResponse,
    TimeoutConfig, TransitionConfig,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Status endpoint name under `/api/`
pub const STATUS_ENDPOINT: &str = "status";

/// Command endpoint name under `/api/`
pub const COMMAND_ENDPOINT: &str = "command";

/// Client for one Nexus21 IP Module.
///
/// The module firmware handles a single HTTP request at a time, so every
/// exchange goes through `service_lock`. The lock lives in the client, not
/// in a global, so separate lifts never wait on each other.
pub struct IpModuleClient {
    host: String,
    transport: Arc<dyn Transport>,
    service_lock: Mutex<()>,
    transition_config: TransitionConfig,
}

impl std::fmt::Debug for IpModuleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpModuleClient")
            .field("host", &self.host)
            .field("transition_config", &self.transition_config)
            .finish_non_exhaustive()
    }
}

impl IpModuleClient {
    /// Create a client with its own HTTP session and default configuration
    pub fn new(host: impl Into<String>) -> IpModuleResult<Self> {
        IpModuleClientBuilder::new(host).build()
    }

    /// Create a client on top of an existing transport (shared session, tests)
    pub fn with_transport(host: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            host: host.into(),
            transport,
            service_lock: Mutex::new(()),
            transition_config: TransitionConfig::default(),
        }
    }

    /// Create a builder for custom configuration
    pub fn builder(host: impl Into<String>) -> IpModuleClientBuilder {
        IpModuleClientBuilder::new(host)
    }

    /// Host (IP address or name) of the module
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn transition_config(&self) -> &TransitionConfig {
        &self.transition_config
    }

    fn build_url(&self, endpoint: &str) -> String {
        format!("http://{}/api/{}", self.host, endpoint)
    }

    fn check_http(&self, endpoint: &str, response: HttpResponse) -> IpModuleResult<HttpResponse> {
        if response.status != 200 {
            return Err(IpModuleError::InvalidResponse {
                host: self.host.clone(),
                endpoint: endpoint.to_string(),
                status: response.status,
                body: response.body_text(),
            });
        }
        Ok(response)
    }

    /// Read the current lift status
    pub async fn get_status(&self) -> IpModuleResult<StatusResponse> {
        let response = {
            let _guard = self.service_lock.lock().await;
            self.transport.get(&self.build_url(STATUS_ENDPOINT)).await?
        };

        let response = self.check_http(STATUS_ENDPOINT, response)?;
        Ok(StatusResponse::from_body(&response.body)?)
    }

    /// Send one command. Unknown command names are rejected before any I/O.
    pub async fn send_command(&self, command: impl AsRef<str>) -> IpModuleResult<CommandResponse> {
        let command: Command = command.as_ref().parse()?;

        debug!(host = %self.host, %command, "Sending command");
        let response = {
            let _guard = self.service_lock.lock().await;
            self.transport
                .post_json(
                    &self.build_url(COMMAND_ENDPOINT),
                    &json!({ "COMMAND": command.as_str() }),
                )
                .await?
        };

        let response = self.check_http(COMMAND_ENDPOINT, response)?;
        let module_response = CommandResponse::from_body(&response.body)?;
        if module_response.not_ok() {
            warn!(host = %self.host, %command, "Module rejected command");
            return Err(IpModuleError::CommandFailed {
                host: self.host.clone(),
                command: command.to_string(),
                status: module_response.status().to_string(),
                description: module_response.description(),
            });
        }
        Ok(module_response)
    }

    /// Raise the lift and wait for it to arrive, using the configured bounds
    pub async fn open(&self, progress: Option<&dyn ProgressListener>) -> IpModuleResult<Duration> {
        let config = self.transition_config.clone();
        self.open_with(progress, config.timeout(), config.poll_interval()).await
    }

    /// Lower the lift and wait for it to arrive, using the configured bounds
    pub async fn close(&self, progress: Option<&dyn ProgressListener>) -> IpModuleResult<Duration> {
        let config = self.transition_config.clone();
        self.close_with(progress, config.timeout(), config.poll_interval()).await
    }

    /// Raise the lift. Returns the time the transition took.
    pub async fn open_with(
        &self,
        progress: Option<&dyn ProgressListener>,
        timeout: Duration,
        poll_interval: Duration,
    ) -> IpModuleResult<Duration> {
        self.run_transition(Command::Up, progress, timeout, poll_interval).await
    }

    /// Lower the lift. Returns the time the transition took.
    pub async fn close_with(
        &self,
        progress: Option<&dyn ProgressListener>,
        timeout: Duration,
        poll_interval: Duration,
    ) -> IpModuleResult<Duration> {
        self.run_transition(Command::Down, progress, timeout, poll_interval).await
    }

    /// Recall a stored memory position (1..=3). The move is not tracked.
    pub async fn move_to_memory(&self, slot: u8) -> IpModuleResult<CommandResponse> {
        let command = Command::memory(slot).ok_or_else(|| IpModuleError::InvalidCommand {
            command: format!("MEM{}", slot),
        })?;
        self.send_command(command).await
    }
}

/// Builder for creating an IpModuleClient with custom configuration
pub struct IpModuleClientBuilder {
    host: String,
    timeout_config: TimeoutConfig,
    transition_config: TransitionConfig,
    http_client: Option<reqwest::Client>,
    transport: Option<Arc<dyn Transport>>,
}

impl IpModuleClientBuilder {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            timeout_config: TimeoutConfig::default(),
            transition_config: TransitionConfig::default(),
            http_client: None,
            transport: None,
        }
    }

    pub fn timeout_config(mut self, config: TimeoutConfig) -> Self {
        self.timeout_config = config;
        self
    }

    pub fn transition_config(mut self, config: TransitionConfig) -> Self {
        self.transition_config = config;
        self
    }

    pub fn request_timeout(mut self, ms: u64) -> Self {
        self.timeout_config.request_ms = ms;
        self
    }

    pub fn connect_timeout(mut self, ms: u64) -> Self {
        self.timeout_config.connect_ms = ms;
        self
    }

    pub fn transition_timeout(mut self, timeout: Duration) -> Self {
        self.transition_config.timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.transition_config.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Reuse a host-owned reqwest session instead of building one. The
    /// session is expected to carry the configured request timeout.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> IpModuleResult<IpModuleClient> {
        let transport: Arc<dyn Transport> = match (self.transport, self.http_client) {
            (Some(transport), _) => transport,
            (None, Some(http_client)) => Arc::new(
                ReqwestTransport::from_client(http_client).with_request_timeout(self.timeout_config.request_ms),
            ),
            (None, None) => Arc::new(ReqwestTransport::new(&self.timeout_config)?),
        };

        let mut client = IpModuleClient::with_transport(self.host, transport);
        client.transition_config = self.transition_config;
        Ok(client)
    }
}
