//! Shared HTTP plumbing for the service clients.

use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::config::HttpServiceConfig;

use super::{ServiceError, ServiceResult};

/// Thin wrapper over `reqwest::Client` carrying a base URL, a service name
/// for error attribution, and an optional API key.
#[derive(Debug, Clone)]
pub struct HttpClient {
    service: String,
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl HttpClient {
    pub fn new(service: impl Into<String>, config: &HttpServiceConfig) -> ServiceResult<Self> {
        let service = service.into();
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            ServiceError::configuration(format!("Invalid {service} base URL '{}': {e}", config.base_url))
        })?;

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| ServiceError::configuration(format!("Failed to build HTTP client: {e}")))?;

        let api_key = if config.api_key.is_empty() {
            None
        } else {
            Some(config.api_key.clone())
        };

        Ok(Self {
            service,
            client,
            base_url,
            api_key,
        })
    }

    fn url(&self, path: &str) -> ServiceResult<Url> {
        self.base_url.join(path).map_err(|e| {
            ServiceError::configuration(format!("Invalid {} path '{path}': {e}", self.service))
        })
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ServiceResult<T> {
        let url = self.url(path)?;
        debug!(service = %self.service, %url, "GET");
        let mut request = self.client.get(url);
        if let Some(key) = &self.api_key {
            request = request.header("X-Api-Key", key);
        }
        let response = request.send().await.map_err(|e| self.map_send_error(e))?;
        self.decode(response).await
    }

    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ServiceResult<T> {
        let url = self.url(path)?;
        debug!(service = %self.service, %url, "POST");
        let mut request = self.client.post(url).json(body);
        if let Some(key) = &self.api_key {
            request = request.header("X-Api-Key", key);
        }
        let response = request.send().await.map_err(|e| self.map_send_error(e))?;
        self.decode(response).await
    }

    /// POST where the caller only cares that the request was accepted.
    pub async fn post_unit<B: Serialize>(&self, path: &str, body: &B) -> ServiceResult<()> {
        let url = self.url(path)?;
        debug!(service = %self.service, %url, "POST");
        let mut request = self.client.post(url).json(body);
        if let Some(key) = &self.api_key {
            request = request.header("X-Api-Key", key);
        }
        let response = request.send().await.map_err(|e| self.map_send_error(e))?;
        self.check_status(response).await.map(|_| ())
    }

    fn map_send_error(&self, error: reqwest::Error) -> ServiceError {
        if error.is_timeout() {
            ServiceError::timeout(&self.service)
        } else {
            ServiceError::transport(&self.service, error.to_string())
        }
    }

    async fn check_status(&self, response: reqwest::Response) -> ServiceResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        if status == StatusCode::NOT_FOUND {
            Err(ServiceError::not_found(&self.service, message))
        } else if status.is_server_error() {
            Err(ServiceError::Server {
                service: self.service.clone(),
                status: status.as_u16(),
                message,
            })
        } else {
            // Remaining 4xx: the request itself is wrong, retrying is futile.
            Err(ServiceError::Rejected {
                service: self.service.clone(),
                status: status.as_u16(),
                message,
            })
        }
    }

    async fn decode<T: DeserializeOwned>(&self, response: reqwest::Response) -> ServiceResult<T> {
        let response = self.check_status(response).await?;
        response.json::<T>().await.map_err(|e| ServiceError::InvalidResponse {
            service: self.service.clone(),
            message: e.to_string(),
        })
    }
}
