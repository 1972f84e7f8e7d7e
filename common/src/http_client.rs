use crate::errors::AppError;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Default bound on a single upstream request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP client with a bounded wait and provider-flavoured error mapping.
///
/// Requests are never retried here; a failed call surfaces immediately.
pub struct HttpClient {
    client: Client,
    timeout: Duration,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, timeout })
    }

    /// GET `url` and parse the body as JSON.
    ///
    /// Non-2xx responses become [`AppError::Provider`] carrying status and body,
    /// transport problems become [`AppError::Provider`] or [`AppError::Timeout`],
    /// and an unparseable body becomes [`AppError::Format`].
    #[instrument(skip(self, url), fields(endpoint = %endpoint(url)))]
    pub async fn get_json<T>(&self, url: &str) -> Result<T, AppError>
    where
        T: serde::de::DeserializeOwned,
    {
        let response = tokio::time::timeout(self.timeout, self.client.get(url).send())
            .await
            .map_err(|_| self.timed_out(url))?
            .map_err(|e| self.transport_error(url, e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.transport_error(url, e))?;

        if !status.is_success() {
            warn!(endpoint = %endpoint(url), status = status.as_u16(), "Upstream returned error status");
            return Err(AppError::http(status.as_u16(), text));
        }

        debug!(bytes = text.len(), "Upstream response received");

        serde_json::from_str(&text)
            .map_err(|e| AppError::format(format!("Failed to parse API response: {}", e)))
    }

    fn transport_error(&self, url: &str, e: reqwest::Error) -> AppError {
        if e.is_timeout() {
            self.timed_out(url)
        } else {
            warn!(endpoint = %endpoint(url), error = %e, "Upstream request failed");
            AppError::provider(format!("API request failed: {}", e))
        }
    }

    fn timed_out(&self, url: &str) -> AppError {
        warn!(endpoint = %endpoint(url), timeout_ms = self.timeout.as_millis(), "Upstream request timed out");
        AppError::timeout(format!(
            "API request to {} timed out after {}ms",
            endpoint(url),
            self.timeout.as_millis()
        ))
    }
}

/// URL without its query string, which carries API keys.
fn endpoint(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}
