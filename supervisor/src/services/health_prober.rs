//! HTTP health prober
//!
//! Issues one bounded GET against `http://<host>:<port><health_check_path>`.
//! Every failure mode collapses into an unhealthy result.

use async_trait::async_trait;
use std::time::Duration;

use shared::{node_debug, HealthResult, NodeDescriptor};

use crate::error::{SupervisorError, SupervisorResult};
use crate::traits::HealthProber;

pub struct HttpHealthProber {
    client: reqwest::Client,
    host: String,
}

impl HttpHealthProber {
    pub fn new(host: impl Into<String>) -> SupervisorResult<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| SupervisorError::config(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            client,
            host: host.into(),
        })
    }

    pub fn health_url(&self, descriptor: &NodeDescriptor) -> String {
        format!(
            "http://{}:{}{}",
            self.host, descriptor.port, descriptor.health_check_path
        )
    }
}

#[async_trait]
impl HealthProber for HttpHealthProber {
    async fn probe(&self, descriptor: &NodeDescriptor, timeout: Duration) -> HealthResult {
        let url = self.health_url(descriptor);
        let id = descriptor.id.clone();

        let result = match self.client.get(&url).timeout(timeout).send().await {
            Ok(response) if response.status().is_success() => HealthResult::healthy(id),
            Ok(response) => HealthResult::unhealthy(id, format!("HTTP {}", response.status())),
            Err(e) if e.is_timeout() => {
                HealthResult::unhealthy(id, format!("no response within {timeout:?}"))
            }
            Err(e) if e.is_connect() => HealthResult::unhealthy(id, "connection refused"),
            Err(e) => HealthResult::unhealthy(id, e.to_string()),
        };

        if let Some(detail) = &result.detail {
            node_debug!(descriptor.id, "Health probe {} failed: {}", url, detail);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn descriptor_on(port: u16) -> NodeDescriptor {
        NodeDescriptor::new("00", "StateMachine", port, "core")
    }

    /// Port with nothing listening on it
    fn closed_port() -> u16 {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn test_success_status_is_healthy() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let prober = HttpHealthProber::new("127.0.0.1").unwrap();
        let result = prober
            .probe(&descriptor_on(server.address().port()), Duration::from_secs(2))
            .await;

        assert!(result.healthy);
        assert!(result.detail.is_none());
    }

    #[tokio::test]
    async fn test_custom_health_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ready"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let prober = HttpHealthProber::new("127.0.0.1").unwrap();
        let descriptor = descriptor_on(server.address().port()).with_health_check_path("/ready");

        assert!(prober.probe(&descriptor, Duration::from_secs(2)).await.healthy);
        // Default path is not mounted and answers 404
        let default_path = descriptor_on(server.address().port());
        assert!(!prober.probe(&default_path, Duration::from_secs(2)).await.healthy);
    }

    #[tokio::test]
    async fn test_error_status_is_unhealthy() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let prober = HttpHealthProber::new("127.0.0.1").unwrap();
        let result = prober
            .probe(&descriptor_on(server.address().port()), Duration::from_secs(2))
            .await;

        assert!(!result.healthy);
        assert!(result.detail.unwrap().contains("503"));
    }

    #[tokio::test]
    async fn test_slow_endpoint_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let prober = HttpHealthProber::new("127.0.0.1").unwrap();
        let started = std::time::Instant::now();
        let result = prober
            .probe(&descriptor_on(server.address().port()), Duration::from_millis(200))
            .await;

        assert!(!result.healthy);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_refused_connection_is_unhealthy() {
        let prober = HttpHealthProber::new("127.0.0.1").unwrap();
        let result = prober
            .probe(&descriptor_on(closed_port()), Duration::from_secs(1))
            .await;

        assert!(!result.healthy);
        assert!(result.detail.is_some());
    }

    #[test]
    fn test_health_url() {
        let prober = HttpHealthProber::new("localhost").unwrap();
        let descriptor = descriptor_on(8064).with_health_check_path("/status");
        assert_eq!(prober.health_url(&descriptor), "http://localhost:8064/status");
    }
}
