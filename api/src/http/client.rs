//! HTTP client implementation

use std::time::Duration;

use reqwest::{header, Client, Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error};
use url::Url;

use crate::errors::ReleaseError;

/// JSON client for an upstream service rooted at a base URL
pub struct HttpClient {
    client: Client,
    base_url: Url,
    token: Option<SecretString>,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ReleaseError> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(ReleaseError::ConfigError(format!(
                "upstream url {} cannot carry a path",
                base_url
            )));
        }

        Ok(Self {
            client,
            base_url,
            token: None,
        })
    }

    /// Send a bearer token with every request
    pub fn with_token(mut self, token: SecretString) -> Self {
        self.token = Some(token);
        self
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Build a URL below the base from path segments.
    ///
    /// Each segment is percent-encoded on its own, `/` included.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, ReleaseError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ReleaseError::ConfigError(format!("{} cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, ReleaseError> {
        self.request::<T, ()>(Method::GET, url, None).await
    }

    /// Make a POST request
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, ReleaseError> {
        self.request(Method::POST, url, Some(body)).await
    }

    /// Make a PUT request
    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, ReleaseError> {
        self.request(Method::PUT, url, Some(body)).await
    }

    async fn request<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<T, ReleaseError> {
        debug!("{} {}", method, url);

        let path = url.path().to_string();
        let mut request = self.client.request(method.clone(), url);
        if let Some(token) = &self.token {
            request = request.header(
                header::AUTHORIZATION,
                format!("Bearer {}", token.expose_secret()),
            );
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if status == StatusCode::NOT_FOUND {
            return Err(ReleaseError::NotFound(format!("{} {}", method, path)));
        }
        if !status.is_success() {
            error!("HTTP {} failed: {} - {}", method, status, text);
            return Err(ReleaseError::UpstreamError {
                status: status.as_u16(),
                body: text,
            });
        }

        // Empty bodies decode as JSON null, which fits `()` and `Option<_>`.
        let text = if text.trim().is_empty() { "null" } else { text.as_str() };
        Ok(serde_json::from_str(text)?)
    }
}
