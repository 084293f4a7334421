//! Fault injection for storage writes.
//!
//! [`FaultInjectionTransport`] decorates another transport and answers some
//! blob writes with a synthetic `503 ServerBusy` instead of sending them,
//! which lets retry policies be exercised without a throttled account.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderValue, Method, StatusCode, header};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use super::{
    CLIENT_REQUEST_ID, ERROR_CODE, HttpTransport, RETURN_CLIENT_REQUEST_ID, TransportError,
    TransportRequest, TransportResponse,
};

/// A storage service error as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceFault {
    pub code: &'static str,
    pub status: StatusCode,
    pub message: &'static str,
    pub reason: &'static str,
}

impl ServiceFault {
    pub const SERVER_BUSY: ServiceFault = ServiceFault {
        code: "ServerBusy",
        status: StatusCode::SERVICE_UNAVAILABLE,
        message: "Operations per second is over the account limit.",
        reason: "Service Unavailable",
    };

    /// XML error document in the storage service format.
    pub fn body(&self) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<Error>\n  <Code>{}</Code>\n  <Message>{}</Message>\n</Error>\n",
            self.code, self.message
        )
    }
}

/// Alternating windows of normal service and throttling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleWindows {
    /// Requests are never throttled during this part of the cycle.
    pub available: Duration,
    /// Requests may be throttled during this part of the cycle.
    pub throttling: Duration,
}

impl ThrottleWindows {
    /// Whether `elapsed` (time since the transport was created) falls in a
    /// throttling window.
    pub fn is_throttling(&self, elapsed: Duration) -> bool {
        let cycle = self.available + self.throttling;
        if cycle.is_zero() {
            return true;
        }
        let phase = elapsed.as_nanos() % cycle.as_nanos();
        phase >= self.available.as_nanos()
    }
}

/// When and how often blob writes are faulted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThrottlePolicy {
    rate: f64,
    windows: Option<ThrottleWindows>,
}

impl ThrottlePolicy {
    /// Fault a blob write with probability `rate`, clamped to `[0, 1]`.
    pub fn new(rate: f64) -> Self {
        let rate = if rate.is_nan() { 0.0 } else { rate.clamp(0.0, 1.0) };
        Self {
            rate,
            windows: None,
        }
    }

    pub fn with_windows(mut self, windows: ThrottleWindows) -> Self {
        self.windows = Some(windows);
        self
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn windows(&self) -> Option<ThrottleWindows> {
        self.windows
    }
}

/// Transport decorator that replaces some blob writes with a synthetic
/// `ServerBusy` response.
pub struct FaultInjectionTransport<T> {
    inner: T,
    policy: ThrottlePolicy,
    rng: Mutex<StdRng>,
    started: Instant,
}

impl<T> FaultInjectionTransport<T> {
    /// Wrap `inner`, drawing randomness from an OS-seeded generator.
    pub fn new(inner: T, policy: ThrottlePolicy) -> Self {
        Self::with_rng(inner, policy, StdRng::from_os_rng())
    }

    /// Wrap `inner` with a fixed seed, for reproducible runs.
    pub fn with_seed(inner: T, policy: ThrottlePolicy, seed: u64) -> Self {
        Self::with_rng(inner, policy, StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(inner: T, policy: ThrottlePolicy, rng: StdRng) -> Self {
        Self {
            inner,
            policy,
            rng: Mutex::new(rng),
            started: Instant::now(),
        }
    }

    pub fn policy(&self) -> &ThrottlePolicy {
        &self.policy
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Decide whether `request` is faulted and, if so, build the response.
    ///
    /// Returns `None` when the request should go to the wrapped transport.
    pub fn intercept(&self, request: &TransportRequest) -> Option<TransportResponse> {
        if !is_blob_put(request) || !self.should_throttle() {
            return None;
        }

        let client_request_id = request
            .headers()
            .get(CLIENT_REQUEST_ID)
            .and_then(|v| v.to_str().ok());
        info!(
            client_request_id = client_request_id.unwrap_or("-"),
            uri = %request.uri(),
            "Throttling request"
        );

        Some(fault_response(&ServiceFault::SERVER_BUSY, request))
    }

    fn should_throttle(&self) -> bool {
        if let Some(windows) = self.policy.windows
            && !windows.is_throttling(self.started.elapsed())
        {
            return false;
        }
        let draw: f64 = self
            .rng
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .random();
        draw < self.policy.rate
    }
}

impl<T> std::fmt::Debug for FaultInjectionTransport<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaultInjectionTransport")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<T: HttpTransport> HttpTransport for FaultInjectionTransport<T> {
    async fn process(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        if let Some(response) = self.intercept(&request) {
            return Ok(response);
        }
        debug!(method = %request.method(), uri = %request.uri(), "Forwarding request");
        self.inner.process(request).await
    }

    fn process_blocking(
        &self,
        request: TransportRequest,
    ) -> Result<TransportResponse, TransportError> {
        if let Some(response) = self.intercept(&request) {
            return Ok(response);
        }
        self.inner.process_blocking(request)
    }
}

/// A PUT that is not a container-management call.
pub fn is_blob_put(request: &TransportRequest) -> bool {
    request.method() == Method::PUT
        && !request
            .uri()
            .query()
            .is_some_and(|q| q.contains("restype=container"))
}

fn wants_client_request_id(request: &TransportRequest) -> bool {
    request
        .headers()
        .get(RETURN_CLIENT_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}

fn fault_response(fault: &ServiceFault, request: &TransportRequest) -> TransportResponse {
    let mut response = http::Response::new(Bytes::from(fault.body()));
    *response.status_mut() = fault.status;

    let headers = response.headers_mut();
    headers.insert(ERROR_CODE, HeaderValue::from_static(fault.code));
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/xml"),
    );
    if wants_client_request_id(request)
        && let Some(id) = request.headers().get(CLIENT_REQUEST_ID)
    {
        headers.insert(RETURN_CLIENT_REQUEST_ID, id.clone());
    }
    response
}
