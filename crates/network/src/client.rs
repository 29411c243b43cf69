// crates/network/src/client.rs
//! HTTP client wrapper with resilience

use crate::error::{NetworkError, NetworkResult};
use crate::transport::{HttpTransport, ObjectRequest, ObjectResponse, RequestContext, TransportError};
use futures::StreamExt;
use reqwest::{Client as ReqwestClient, Response};
use std::fmt;
use std::time::Duration;
use stowage_resilience::{with_retry, RetryPolicy};

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Whole-request timeout; `None` lets large bodies take as long as they need
    pub timeout: Option<Duration>,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// User agent string
    pub user_agent: String,
    /// Maximum redirects to follow
    pub max_redirects: usize,
    /// Retry policy for ordinary requests
    pub retry_policy: Option<RetryPolicy>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("Stowage/{}", env!("CARGO_PKG_VERSION")),
            max_redirects: 10,
            retry_policy: Some(RetryPolicy::new(3).with_initial_delay(Duration::from_millis(100))),
        }
    }
}

/// reqwest-backed [`HttpTransport`]
#[derive(Clone)]
pub struct Client {
    inner: ReqwestClient,
    config: ClientConfig,
}

/// Why one attempt did not produce a usable response
enum AttemptFailure {
    Server(Response),
    Transport(TransportError),
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptFailure::Server(response) => write!(f, "HTTP {}", response.status()),
            AttemptFailure::Transport(e) => write!(f, "{}", e),
        }
    }
}

impl Client {
    /// Creates a new client with default configuration
    pub fn new() -> NetworkResult<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Creates a new client with custom configuration
    pub fn with_config(config: ClientConfig) -> NetworkResult<Self> {
        let mut builder = ReqwestClient::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects));

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().map_err(NetworkError::Http)?;

        Ok(Self {
            inner: client,
            config,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn policy(&self, context: RequestContext) -> RetryPolicy {
        match &self.config.retry_policy {
            Some(policy) if !context.retries_disabled() => policy.clone(),
            _ => RetryPolicy::no_retry(),
        }
    }

    async fn attempt(&self, request: &ObjectRequest) -> Result<Response, AttemptFailure> {
        let response = self
            .inner
            .request(request.method().clone(), request.url().clone())
            .headers(request.headers().clone())
            .send()
            .await
            .map_err(|e| AttemptFailure::Transport(e.into()))?;

        // 5xx may be retried; everything else goes back to the caller
        if response.status().is_server_error() {
            return Err(AttemptFailure::Server(response));
        }
        Ok(response)
    }
}

impl HttpTransport for Client {
    async fn execute(
        &self,
        request: ObjectRequest,
        context: RequestContext,
    ) -> Result<ObjectResponse, TransportError> {
        let policy = self.policy(context);

        let result = with_retry(
            &policy,
            |_| self.attempt(&request),
            |failure| match failure {
                AttemptFailure::Server(_) => true,
                AttemptFailure::Transport(e) => policy.should_retry(e.kind()),
            },
        )
        .await;

        let response = match result {
            Ok(response) => response,
            Err(AttemptFailure::Server(response)) => response,
            Err(AttemptFailure::Transport(e)) => return Err(e),
        };

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(TransportError::from))
            .boxed();

        Ok(ObjectResponse::new(status, headers, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.timeout, None);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.max_redirects, 10);
        assert!(config.user_agent.starts_with("Stowage/"));
        assert!(config.retry_policy.is_some());
    }

    #[test]
    fn test_client_creation() {
        let client = Client::new();
        assert!(client.is_ok());
    }

    #[test]
    fn test_client_with_custom_config() {
        let config = ClientConfig {
            timeout: Some(Duration::from_secs(10)),
            connect_timeout: Duration::from_secs(2),
            user_agent: "TestAgent".to_string(),
            max_redirects: 5,
            retry_policy: None,
        };

        let client = Client::with_config(config).unwrap();
        assert_eq!(client.config().user_agent, "TestAgent");
    }

    #[test]
    fn test_retries_disabled_by_context() {
        let client = Client::new().unwrap();
        assert_eq!(client.policy(RequestContext::new()).max_attempts(), 3);
        assert_eq!(client.policy(RequestContext::without_retries()).max_attempts(), 1);
    }
}
