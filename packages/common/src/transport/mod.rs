//! HTTP transport seam used by the storage client.
//!
//! Everything the storage client sends goes through an [`HttpTransport`], so a
//! decorator such as [`fault::FaultInjectionTransport`] can observe or replace
//! any request without the client knowing.

pub mod fault;

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Request handed to a transport. Bodies are fully buffered.
pub type TransportRequest = http::Request<Bytes>;

/// Response produced by a transport.
pub type TransportResponse = http::Response<Bytes>;

/// Header carrying the caller-generated request id.
pub const CLIENT_REQUEST_ID: &str = "x-ms-client-request-id";

/// Header asking the service to echo the client request id.
pub const RETURN_CLIENT_REQUEST_ID: &str = "x-ms-return-client-request-id";

/// Header carrying the service error code.
pub const ERROR_CODE: &str = "x-ms-error-code";

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("transport error: {0}")]
    Other(String),
}

impl TransportError {
    /// Whether another attempt could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Connect(_))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else if err.is_builder() {
            Self::InvalidRequest(err.to_string())
        } else {
            Self::Other(err.to_string())
        }
    }
}

/// Sends a request and returns the response.
///
/// Both paths must have the same observable behavior; only the way the real
/// network call waits differs.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Non-blocking path.
    async fn process(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;

    /// Blocking path. Must not be called from inside an async runtime.
    fn process_blocking(
        &self,
        request: TransportRequest,
    ) -> Result<TransportResponse, TransportError>;
}

#[async_trait]
impl<T: HttpTransport + ?Sized> HttpTransport for Arc<T> {
    async fn process(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        (**self).process(request).await
    }

    fn process_blocking(
        &self,
        request: TransportRequest,
    ) -> Result<TransportResponse, TransportError> {
        (**self).process_blocking(request)
    }
}

/// The real network transport, backed by `reqwest`.
pub struct ReqwestTransport {
    client: reqwest::Client,
    blocking: OnceLock<reqwest::blocking::Client>,
    timeout: Duration,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            blocking: OnceLock::new(),
            timeout,
        })
    }

    /// The blocking client spins up its own runtime, so it is only built on
    /// first blocking use.
    fn blocking_client(&self) -> Result<&reqwest::blocking::Client, TransportError> {
        if let Some(client) = self.blocking.get() {
            return Ok(client);
        }
        let client = reqwest::blocking::Client::builder()
            .use_rustls_tls()
            .timeout(self.timeout)
            .build()?;
        Ok(self.blocking.get_or_init(|| client))
    }
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn process(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let request = reqwest::Request::try_from(request)?;
        let response = self.client.execute(request).await?;

        let mut builder = http::Response::builder()
            .status(response.status())
            .version(response.version());
        if let Some(headers) = builder.headers_mut() {
            *headers = response.headers().clone();
        }
        let body = response.bytes().await?;
        builder
            .body(body)
            .map_err(|e| TransportError::Other(e.to_string()))
    }

    fn process_blocking(
        &self,
        request: TransportRequest,
    ) -> Result<TransportResponse, TransportError> {
        let request = reqwest::blocking::Request::try_from(request.map(|body| body.to_vec()))?;
        let response = self.blocking_client()?.execute(request)?;

        let mut builder = http::Response::builder()
            .status(response.status())
            .version(response.version());
        if let Some(headers) = builder.headers_mut() {
            *headers = response.headers().clone();
        }
        let body = response.bytes()?;
        builder
            .body(body)
            .map_err(|e| TransportError::Other(e.to_string()))
    }
}
