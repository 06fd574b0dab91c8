//! Remote-call transport.
//!
//! `Transport` is the single seam between the signed client and the
//! network: one method, one round trip, one result. `HttpTransport` is the
//! production implementation; tests substitute their own.

use async_trait::async_trait;
use reqwest::Client;

use crate::config::ClientConfig;
use crate::error::{ClientError, TransportError};
use crate::http::{parse_http_response, HttpRequest, HttpResponse};
use crate::value::Value;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Invoke `method` with positional `params` exactly once.
    async fn method_call(&self, method: &str, params: Vec<Value>) -> Result<Value, TransportError>;
}

/// XML-RPC over HTTP POST using reqwest.
///
/// Timeouts and connection reuse are reqwest's defaults.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    url: String,
}

impl HttpTransport {
    /// Build a transport for the configured endpoint.
    ///
    /// # Errors
    /// `ClientError::Configuration` if the HTTP client cannot be created.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .build()
            .map_err(|e| ClientError::Configuration(format!("cannot build HTTP client: {e}")))?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: Client, config: &ClientConfig) -> Self {
        Self {
            client,
            url: config.endpoint_url(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Execute a prepared request and return the raw response.
    pub async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self.client.post(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let response = builder
            .body(request.body)
            .send()
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Connect(format!("reading response body: {e}")))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn method_call(&self, method: &str, params: Vec<Value>) -> Result<Value, TransportError> {
        let request = HttpRequest::method_call(&self.url, method, &params);
        let response = self.execute(request).await?;
        parse_http_response(response)
    }
}
