use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::{Serialize, de::DeserializeOwned};
use std::time::Duration;
use tracing::{Level, event, instrument};

use crate::error::PlatformError;

pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared HTTP transport for all platform services.
///
/// Holds the workspace base URL and bearer token. Every request carries a
/// bounded timeout so a single poll cycle can never block past its cadence.
#[derive(Clone)]
pub(crate) struct Http {
    client: reqwest::Client,
    base_url: String,
}

impl Http {
    pub(crate) fn new(host: &str, token: &str) -> Result<Self, PlatformError> {
        Self::with_timeout(host, token, DEFAULT_TIMEOUT)
    }

    pub(crate) fn with_timeout(
        host: &str,
        token: &str,
        timeout: Duration,
    ) -> Result<Self, PlatformError> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| {
            PlatformError::Authentication("token contains invalid header characters".to_string())
        })?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| PlatformError::unavailable(e.to_string()))?;

        Ok(Http {
            client,
            base_url: normalize_host(host),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    #[instrument(level = "trace", skip(self))]
    pub(crate) async fn get<T>(&self, path: &str) -> Result<T, PlatformError>
    where
        T: DeserializeOwned,
    {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(transport_error)?;
        decode(response).await
    }

    #[instrument(level = "trace", skip(self, request), fields(json_request = serde_json::to_string(request).unwrap_or_default()))]
    pub(crate) async fn post<S, T>(&self, path: &str, request: &S) -> Result<T, PlatformError>
    where
        S: Serialize + Sized,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.url(path))
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, PlatformError> {
    let status = response.status();
    if !status.is_success() {
        let detail = response
            .text()
            .await
            .unwrap_or_else(|_| "failed to read error body".to_string());
        return Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                PlatformError::Authentication(detail)
            }
            StatusCode::TOO_MANY_REQUESTS => PlatformError::RateLimited,
            _ => PlatformError::ServiceUnavailable {
                status: Some(status.as_u16()),
                detail,
            },
        });
    }

    let text = response.text().await.map_err(transport_error)?;
    event!(Level::TRACE, response = text);

    serde_json::from_str::<T>(&text).map_err(|e| PlatformError::Malformed(e.to_string()))
}

fn transport_error(e: reqwest::Error) -> PlatformError {
    let detail = if e.is_timeout() {
        "request timed out".to_string()
    } else {
        e.to_string()
    };
    PlatformError::ServiceUnavailable {
        status: e.status().map(|s| s.as_u16()),
        detail,
    }
}

/// Hosts arrive from config with or without a scheme or trailing slash.
fn normalize_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}
