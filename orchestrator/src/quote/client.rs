//! HTTP client for the path-finding service

use super::{PathRequest, PathResponse, QuoteSource};
use crate::config::QuotingConfig;
use crate::error::{SwapError, SwapResult};

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

const FIND_PATH: &str = "/api/trading/find-path";

pub struct HttpQuoteSource {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpQuoteSource {
    pub fn new(config: &QuotingConfig) -> SwapResult<Self> {
        let timeout = Duration::from_millis(config.timeout_ms);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .gzip(true)
            .build()
            .map_err(|e| SwapError::Config(format!("Failed to build quoting client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!("{}{}", config.base_url.trim_end_matches('/'), FIND_PATH),
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl QuoteSource for HttpQuoteSource {
    async fn find_path(&self, request: &PathRequest) -> SwapResult<PathResponse> {
        debug!(
            "Requesting path {:?} -> {:?} for {} (exact in: {})",
            request.from_token, request.to_token, request.amount, request.is_amount_in
        );

        let response = tokio::time::timeout(
            self.timeout,
            self.client.post(&self.endpoint).json(request).send(),
        )
        .await
        .map_err(|_| SwapError::QuoteUnavailable(format!("no answer within {:?}", self.timeout)))?
        .map_err(|e| SwapError::QuoteUnavailable(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Quoting service returned {}", status);
            return Err(SwapError::QuoteUnavailable(format!(
                "quoting service returned {}",
                status
            )));
        }

        let body: PathResponse = response
            .json()
            .await
            .map_err(|e| SwapError::QuoteUnavailable(format!("malformed response: {}", e)))?;

        if body.path.len() < 2 {
            return Err(SwapError::QuoteUnavailable("no route found".to_string()));
        }

        debug!("Path of {} hops, amount {}", body.path.len() - 1, body.amount);
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_base_url() {
        let config = QuotingConfig {
            base_url: "https://quotes.example.org/".to_string(),
            timeout_ms: 2000,
        };
        let source = HttpQuoteSource::new(&config).unwrap();
        assert_eq!(
            source.endpoint(),
            "https://quotes.example.org/api/trading/find-path"
        );
    }

    #[tokio::test]
    async fn test_unreachable_service_is_unavailable() {
        let config = QuotingConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_ms: 500,
        };
        let source = HttpQuoteSource::new(&config).unwrap();
        let request = PathRequest {
            from_token: Default::default(),
            to_token: Default::default(),
            amount: "1".into(),
            is_amount_in: true,
        };
        let err = source.find_path(&request).await.unwrap_err();
        assert!(matches!(err, SwapError::QuoteUnavailable(_)));
        assert!(err.is_retryable());
    }
}
