//! Tells the prediction node that fresh daily data has landed.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use stocker_core::config::PredictorConfig;
use stocker_core::error::{Result, StockerError};

#[async_trait]
pub trait PredictorNotifier: Send + Sync {
    async fn notify(&self) -> Result<()>;
}

/// POSTs an empty body to `http://{host}/updateDB`.
pub struct HttpPredictorNotifier {
    url: String,
    client: reqwest::Client,
}

impl HttpPredictorNotifier {
    pub fn new(host: &str, timeout: Duration) -> Result<Self> {
        let host = host.trim().trim_end_matches('/');
        if host.is_empty() {
            return Err(StockerError::Config("predictor host is empty".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StockerError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            url: format!("http://{host}/updateDB"),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl PredictorNotifier for HttpPredictorNotifier {
    async fn notify(&self) -> Result<()> {
        let resp = self
            .client
            .post(&self.url)
            .body(Vec::new())
            .send()
            .await
            .map_err(|e| StockerError::Transport(format!("POST {}: {e}", self.url)))?;
        let status = resp.status();
        if !status.is_success() {
            tracing::error!("❌ Predictor returned HTTP {status} for {}", self.url);
            return Ok(());
        }
        tracing::info!("🔔 Predictor notified: {}", self.url);
        Ok(())
    }
}

/// Used when no predictor host is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPredictorNotifier;

#[async_trait]
impl PredictorNotifier for NoopPredictorNotifier {
    async fn notify(&self) -> Result<()> {
        tracing::debug!("No predictor configured, skipping notification");
        Ok(())
    }
}

/// Pick the notifier for `[predictor]`.
pub fn from_config(config: &PredictorConfig, timeout: Duration) -> Result<Arc<dyn PredictorNotifier>> {
    match config.host.as_deref().map(str::trim) {
        Some(host) if !host.is_empty() => Ok(Arc::new(HttpPredictorNotifier::new(host, timeout)?)),
        _ => Ok(Arc::new(NoopPredictorNotifier)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Reply, StubServer};

    fn host_of(stub: &StubServer) -> String {
        stub.base_url().trim_start_matches("http://").to_string()
    }

    #[tokio::test]
    async fn test_http_notifier_posts_update() {
        let stub = StubServer::start(|_| Reply::status(200)).await;
        let notifier = HttpPredictorNotifier::new(&host_of(&stub), Duration::from_secs(5)).unwrap();
        notifier.notify().await.unwrap();

        let requests = stub.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].path, "/updateDB");
        assert!(requests[0].body.is_empty());
    }

    #[tokio::test]
    async fn test_error_status_is_not_fatal() {
        let stub = StubServer::start(|_| Reply::status(500)).await;
        let notifier = HttpPredictorNotifier::new(&host_of(&stub), Duration::from_secs(5)).unwrap();
        assert!(notifier.notify().await.is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_predictor_is_transport_error() {
        // Bind then drop to get a port nobody listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let notifier = HttpPredictorNotifier::new(&addr.to_string(), Duration::from_secs(2)).unwrap();
        assert!(matches!(notifier.notify().await, Err(StockerError::Transport(_))));
    }

    #[test]
    fn test_from_config_picks_implementation() {
        let none = PredictorConfig { host: None };
        let blank = PredictorConfig {
            host: Some("  ".into()),
        };
        let set = PredictorConfig {
            host: Some("predictor:5000".into()),
        };
        assert!(from_config(&none, Duration::from_secs(1)).is_ok());
        assert!(from_config(&blank, Duration::from_secs(1)).is_ok());
        assert!(from_config(&set, Duration::from_secs(1)).is_ok());
        assert!(HttpPredictorNotifier::new("", Duration::from_secs(1)).is_err());
        assert_eq!(
            HttpPredictorNotifier::new("predictor:5000/", Duration::from_secs(1))
                .unwrap()
                .url(),
            "http://predictor:5000/updateDB"
        );
    }
}
