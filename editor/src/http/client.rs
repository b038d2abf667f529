//! HTTP client implementation

use std::time::Duration;

use openapi_client::{ApiResponse, ErrorResponse};
use reqwest::{header, Client, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error};
use url::Url;

use crate::errors::EditorError;

/// HTTP client for backend communication
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, EditorError> {
        let parsed = Url::parse(base_url)
            .map_err(|e| EditorError::ConfigError(format!("invalid backend URL {}: {}", base_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(EditorError::ConfigError(format!(
                "backend URL must be http or https: {}",
                base_url
            )));
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Create a new HTTP client that sends a bearer token
    pub fn with_token(base_url: &str, timeout: Duration, token: String) -> Result<Self, EditorError> {
        let mut client = Self::new(base_url, timeout)?;
        client.token = Some(token);
        Ok(client)
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.header(header::AUTHORIZATION, format!("Bearer {}", token)),
            None => request,
        }
    }

    /// Make a GET request, returning the raw envelope
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<ApiResponse<T>, EditorError> {
        let url = self.url(path);
        debug!("GET {}", url);

        let request = self.authorize(self.client.get(&url));
        self.send(request, "GET").await
    }

    /// Make a POST request, returning the raw envelope
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse<T>, EditorError> {
        let url = self.url(path);
        debug!("POST {}", url);

        let request = self.authorize(self.client.post(&url).json(body));
        self.send(request, "POST").await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        method: &str,
    ) -> Result<ApiResponse<T>, EditorError> {
        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("HTTP {} failed: {} - {}", method, status, body);
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.message)
                .unwrap_or(body);
            return Err(EditorError::ApiError {
                code: status.as_u16().to_string(),
                message,
            });
        }

        let body = response.json().await?;
        Ok(body)
    }
}

/// Unwrap the data of a successful envelope
pub fn unwrap_envelope<T>(response: ApiResponse<T>) -> Result<T, EditorError> {
    if !response.is_success() {
        return Err(EditorError::ApiError {
            message: response.message_or("request failed"),
            code: response.code,
        });
    }
    response.data.ok_or_else(|| EditorError::ApiError {
        code: response.code,
        message: "response has no data".to_string(),
    })
}
