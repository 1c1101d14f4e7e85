use std::time::Duration;

use anyhow::{anyhow, Result};
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use shared_config::AppConfig;

/// Errors the caller can act on. Timeouts and connection failures are
/// retryable; the commit path deliberately does not retry them itself.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document store unavailable: {0}")]
    Unavailable(String),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("store request failed ({status}): {message}")]
    Request { status: u16, message: String },
}

/// Thin async client for the PostgREST-style document store API. Every
/// request carries the service api key plus the caller's bearer token, so
/// the store's row-level rules see the acting user.
#[derive(Clone)]
pub struct StoreClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl StoreClient {
    pub fn new(config: &AppConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.store_timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: config.store_url.clone(),
            anon_key: config.store_anon_key.clone(),
        }
    }

    fn get_headers(&self, auth_token: Option<&str>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        headers.insert(
            "apikey",
            HeaderValue::from_str(&self.anon_key)
                .map_err(|_| anyhow!("invalid characters in store api key"))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = auth_token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token))
                    .map_err(|_| anyhow!("invalid characters in auth token"))?,
            );
        }

        Ok(headers)
    }

    pub async fn request<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<T, StoreError>
    where
        T: DeserializeOwned,
    {
        self.request_with_headers(method, path, auth_token, body, None)
            .await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<T, StoreError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Store request {} {}", method, url);

        let mut headers = self
            .get_headers(auth_token)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url).headers(headers);
        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await.map_err(|e| {
            error!("Store request failed: {}", e);
            StoreError::Unavailable(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Store error ({}): {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => StoreError::Auth(error_text),
                404 => StoreError::NotFound(error_text),
                code => StoreError::Request {
                    status: code,
                    message: error_text,
                },
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| StoreError::Unavailable(format!("failed to decode response: {}", e)))
    }

    /// POST that asks the store to echo the created rows back.
    pub async fn insert_returning<T>(
        &self,
        path: &str,
        auth_token: Option<&str>,
        body: Value,
    ) -> Result<T, StoreError>
    where
        T: DeserializeOwned,
    {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        self.request_with_headers(Method::POST, path, auth_token, Some(body), Some(headers))
            .await
    }

    /// PATCH that asks the store to echo the updated rows back.
    pub async fn update_returning<T>(
        &self,
        path: &str,
        auth_token: Option<&str>,
        body: Value,
    ) -> Result<T, StoreError>
    where
        T: DeserializeOwned,
    {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        self.request_with_headers(Method::PATCH, path, auth_token, Some(body), Some(headers))
            .await
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}
