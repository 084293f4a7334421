//! Blob store speaking the Azure Blob REST protocol.
//!
//! Every request goes through an [`HttpTransport`], so a fault-injecting
//! transport can be slotted in without this client knowing. The retry policy
//! is applied here, above the transport.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header};
use tracing::{debug, instrument, warn};
use url::Url;

use super::connection::ConnectionString;
use super::error::StorageError;
use super::name::{validate_blob_name, validate_container_name};
use super::traits::{BlobStore, PublicAccess, StoredBlob};
use crate::retry::{RetryOptions, is_retriable_status};
use crate::transport::{
    CLIENT_REQUEST_ID, ERROR_CODE, HttpTransport, RETURN_CLIENT_REQUEST_ID, TransportRequest,
    TransportResponse,
};

/// REST API version sent with every request.
pub const API_VERSION: &str = "2021-08-06";

const MS_VERSION: &str = "x-ms-version";
const MS_DATE: &str = "x-ms-date";
const MS_BLOB_TYPE: &str = "x-ms-blob-type";
const MS_BLOB_CONTENT_TYPE: &str = "x-ms-blob-content-type";
const MS_BLOB_PUBLIC_ACCESS: &str = "x-ms-blob-public-access";
const MS_DELETE_SNAPSHOTS: &str = "x-ms-delete-snapshots";

/// How uploads are split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferOptions {
    /// Payloads up to this size go in a single request.
    pub initial_transfer_size: usize,
    /// Size of each block for larger payloads.
    pub maximum_transfer_size: usize,
    /// Blocks in flight at once.
    pub maximum_concurrency: usize,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            initial_transfer_size: 4 * 1024 * 1024,
            maximum_transfer_size: 4 * 1024 * 1024,
            maximum_concurrency: 8,
        }
    }
}

/// Request that can be rebuilt for every attempt.
struct Operation {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Bytes,
    /// Same id for every attempt so retries correlate in service logs.
    client_request_id: String,
}

impl Operation {
    fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            client_request_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    fn header(mut self, name: &'static str, value: &str) -> Result<Self, StorageError> {
        let value = HeaderValue::from_str(value)
            .map_err(|_| StorageError::InvalidName(format!("header {name}: '{value}'")))?;
        self.headers.insert(HeaderName::from_static(name), value);
        Ok(self)
    }

    fn body(mut self, body: Bytes) -> Self {
        self.body = body;
        self
    }

    fn to_request(&self) -> Result<TransportRequest, StorageError> {
        let mut builder = http::Request::builder()
            .method(self.method.clone())
            .uri(self.url.as_str())
            .header(MS_VERSION, API_VERSION)
            .header(MS_DATE, http_date())
            .header(CLIENT_REQUEST_ID, self.client_request_id.as_str())
            .header(RETURN_CLIENT_REQUEST_ID, "true");
        if let Some(headers) = builder.headers_mut() {
            headers.extend(self.headers.clone());
        }
        builder
            .body(self.body.clone())
            .map_err(|e| StorageError::InvalidConfiguration(format!("request: {e}")))
    }
}

fn http_date() -> String {
    chrono::Utc::now()
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

/// Blob store over an [`HttpTransport`].
pub struct HttpBlobStore {
    transport: Arc<dyn HttpTransport>,
    endpoint: Url,
    sas_token: Option<String>,
    retry: RetryOptions,
    transfer: TransferOptions,
    max_size: u64,
}

impl HttpBlobStore {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        connection: ConnectionString,
        retry: RetryOptions,
        transfer: TransferOptions,
        max_size: u64,
    ) -> Self {
        if connection.sas_token.is_none() && connection.account_key.is_some() {
            warn!(
                account = connection.account_name.as_deref().unwrap_or_default(),
                "AccountKey is not used for signing; requests are sent without credentials"
            );
        }
        Self {
            transport,
            endpoint: connection.blob_endpoint,
            sas_token: connection.sas_token,
            retry,
            transfer: TransferOptions {
                initial_transfer_size: transfer.initial_transfer_size,
                maximum_transfer_size: transfer.maximum_transfer_size.max(1),
                maximum_concurrency: transfer.maximum_concurrency.max(1),
            },
            max_size,
        }
    }

    fn url(
        &self,
        container: &str,
        name: Option<&str>,
        params: &[(&str, &str)],
    ) -> Result<Url, StorageError> {
        let mut url = self.endpoint.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                StorageError::InvalidConfiguration("blob endpoint cannot be a base".into())
            })?;
            segments.pop_if_empty().push(validate_container_name(container)?);
            if let Some(name) = name {
                segments.push(validate_blob_name(name)?);
            }
        }

        let mut query: Vec<String> = params
            .iter()
            .map(|(k, v)| {
                let v: String = url::form_urlencoded::byte_serialize(v.as_bytes()).collect();
                format!("{k}={v}")
            })
            .collect();
        if let Some(sas) = &self.sas_token {
            query.push(sas.clone());
        }
        url.set_query((!query.is_empty()).then(|| query.join("&")).as_deref());
        Ok(url)
    }

    /// Send an operation, retrying transient failures. Returns the last
    /// response whatever its status.
    async fn execute(&self, op: &Operation) -> Result<TransportResponse, StorageError> {
        let mut attempt = 0;
        loop {
            let outcome = self.transport.process(op.to_request()?).await;
            let retriable = match &outcome {
                Ok(response) => is_retriable_status(response.status()),
                Err(e) => e.is_transient(),
            };
            if !retriable || attempt >= self.retry.max_retries {
                return outcome.map_err(StorageError::from);
            }

            attempt += 1;
            let delay = self.retry.delay_for(attempt);
            match &outcome {
                Ok(response) => warn!(
                    client_request_id = %op.client_request_id,
                    status = response.status().as_u16(),
                    code = error_code(response).unwrap_or_default(),
                    attempt,
                    ?delay,
                    "Retrying storage request"
                ),
                Err(e) => warn!(
                    client_request_id = %op.client_request_id,
                    error = %e,
                    attempt,
                    ?delay,
                    "Retrying storage request"
                ),
            }
            tokio::time::sleep(delay).await;
        }
    }

    /// Execute and require one of the expected statuses.
    async fn expect(
        &self,
        op: &Operation,
        expected: &[StatusCode],
    ) -> Result<TransportResponse, StorageError> {
        let response = self.execute(op).await?;
        if expected.contains(&response.status()) {
            Ok(response)
        } else {
            Err(service_error(&response))
        }
    }

    async fn put_single(
        &self,
        container: &str,
        name: &str,
        content_type: Option<&str>,
        data: Bytes,
    ) -> Result<(), StorageError> {
        let mut op = Operation::new(Method::PUT, self.url(container, Some(name), &[])?)
            .header(MS_BLOB_TYPE, "BlockBlob")?
            .body(data);
        if let Some(ct) = content_type {
            op = op.header(MS_BLOB_CONTENT_TYPE, ct)?;
        }
        self.expect(&op, &[StatusCode::CREATED]).await?;
        Ok(())
    }

    async fn put_blocks(
        &self,
        container: &str,
        name: &str,
        content_type: Option<&str>,
        data: Bytes,
    ) -> Result<(), StorageError> {
        let block_size = self.transfer.maximum_transfer_size;
        let blocks: Vec<(String, Bytes)> = (0..data.len())
            .step_by(block_size)
            .enumerate()
            .map(|(index, start)| {
                let end = (start + block_size).min(data.len());
                (block_id(index), data.slice(start..end))
            })
            .collect();
        debug!(container, name, blocks = blocks.len(), "Uploading blob in blocks");

        futures::stream::iter(blocks.iter().cloned())
            .map(|(id, chunk)| async move {
                let url = self.url(container, Some(name), &[("comp", "block"), ("blockid", id.as_str())])?;
                let op = Operation::new(Method::PUT, url).body(chunk);
                self.expect(&op, &[StatusCode::CREATED]).await.map(|_| ())
            })
            .buffer_unordered(self.transfer.maximum_concurrency)
            .try_collect::<Vec<()>>()
            .await?;

        let ids: Vec<&str> = blocks.iter().map(|(id, _)| id.as_str()).collect();
        let mut op = Operation::new(
            Method::PUT,
            self.url(container, Some(name), &[("comp", "blocklist")])?,
        )
        .header("content-type", "application/xml")?
        .body(Bytes::from(block_list_xml(&ids)));
        if let Some(ct) = content_type {
            op = op.header(MS_BLOB_CONTENT_TYPE, ct)?;
        }
        self.expect(&op, &[StatusCode::CREATED]).await?;
        Ok(())
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    #[instrument(skip(self))]
    async fn create_container_if_not_exists(&self, container: &str) -> Result<bool, StorageError> {
        let op = Operation::new(
            Method::PUT,
            self.url(container, None, &[("restype", "container")])?,
        );
        let response = self
            .expect(&op, &[StatusCode::CREATED, StatusCode::CONFLICT])
            .await?;
        if response.status() == StatusCode::CONFLICT
            && error_code(&response).is_some_and(|c| c != "ContainerAlreadyExists")
        {
            return Err(service_error(&response));
        }
        Ok(response.status() == StatusCode::CREATED)
    }

    #[instrument(skip(self))]
    async fn set_public_access(
        &self,
        container: &str,
        access: PublicAccess,
    ) -> Result<(), StorageError> {
        let mut op = Operation::new(
            Method::PUT,
            self.url(container, None, &[("restype", "container"), ("comp", "acl")])?,
        );
        if let Some(level) = access.header_value() {
            op = op.header(MS_BLOB_PUBLIC_ACCESS, level)?;
        }
        self.expect(&op, &[StatusCode::OK]).await?;
        Ok(())
    }

    #[instrument(skip(self, data), fields(size = data.len()))]
    async fn put(
        &self,
        container: &str,
        name: &str,
        content_type: Option<&str>,
        data: Bytes,
    ) -> Result<Url, StorageError> {
        if data.len() as u64 > self.max_size {
            return Err(StorageError::SizeLimitExceeded {
                actual: data.len() as u64,
                limit: self.max_size,
            });
        }

        if data.len() <= self.transfer.initial_transfer_size {
            self.put_single(container, name, content_type, data).await?;
        } else {
            self.put_blocks(container, name, content_type, data).await?;
        }
        self.blob_url(container, name)
    }

    #[instrument(skip(self))]
    async fn get(&self, container: &str, name: &str) -> Result<StoredBlob, StorageError> {
        let op = Operation::new(Method::GET, self.url(container, Some(name), &[])?);
        let response = self.execute(&op).await?;
        match response.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => {
                return Err(StorageError::NotFound(format!("{container}/{name}")));
            }
            _ => return Err(service_error(&response)),
        }
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Ok(StoredBlob {
            data: response.into_body(),
            content_type,
        })
    }

    #[instrument(skip(self))]
    async fn delete_if_exists(&self, container: &str, name: &str) -> Result<bool, StorageError> {
        let op = Operation::new(Method::DELETE, self.url(container, Some(name), &[])?)
            .header(MS_DELETE_SNAPSHOTS, "include")?;
        let response = self
            .expect(&op, &[StatusCode::ACCEPTED, StatusCode::NOT_FOUND])
            .await?;
        Ok(response.status() == StatusCode::ACCEPTED)
    }

    fn blob_url(&self, container: &str, name: &str) -> Result<Url, StorageError> {
        let mut url = self.url(container, Some(name), &[])?;
        url.set_query(None);
        Ok(url)
    }
}

/// Block ids must all have the same length before encoding.
fn block_id(index: usize) -> String {
    BASE64.encode(format!("block-{index:08}"))
}

fn block_list_xml(ids: &[&str]) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<BlockList>\n");
    for id in ids {
        xml.push_str("  <Latest>");
        xml.push_str(id);
        xml.push_str("</Latest>\n");
    }
    xml.push_str("</BlockList>\n");
    xml
}

fn error_code(response: &TransportResponse) -> Option<&str> {
    response
        .headers()
        .get(ERROR_CODE)
        .and_then(|v| v.to_str().ok())
}

fn service_error(response: &TransportResponse) -> StorageError {
    let body = String::from_utf8_lossy(response.body());
    let message = xml_element(&body, "Message")
        .map(str::to_string)
        .or_else(|| response.status().canonical_reason().map(str::to_string))
        .unwrap_or_default();
    let code = error_code(response)
        .map(str::to_string)
        .or_else(|| xml_element(&body, "Code").map(str::to_string));
    StorageError::Service {
        status: response.status().as_u16(),
        code,
        message,
    }
}

fn xml_element<'a>(xml: &'a str, name: &str) -> Option<&'a str> {
    let open = format!("<{name}>");
    let close = format!("</{name}>");
    let start = xml.find(&open)? + open.len();
    let end = start + xml[start..].find(&close)?;
    Some(xml[start..end].trim())
}
