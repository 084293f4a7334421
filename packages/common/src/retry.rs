use std::time::Duration;

use http::StatusCode;
use rand::Rng;

/// How the delay between retries grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryMode {
    /// The same delay before every retry.
    Fixed,
    /// Delay doubles with every attempt, with jitter.
    #[default]
    Exponential,
}

impl RetryMode {
    /// Parse a mode name, ignoring case. Returns `None` for unknown names.
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "fixed" => Some(Self::Fixed),
            "exponential" => Some(Self::Exponential),
            _ => None,
        }
    }
}

/// Retry policy applied by the storage client to every request.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryOptions {
    /// Retries after the first attempt. Default: 3.
    pub max_retries: u32,
    /// Base delay between attempts. Default: 0.8s.
    pub delay: Duration,
    /// Upper bound on any single delay. Default: 1 minute.
    pub max_delay: Duration,
    pub mode: RetryMode,
    /// Per-request timeout enforced by the real transport. Default: 100s.
    pub network_timeout: Duration,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay: Duration::from_millis(800),
            max_delay: Duration::from_secs(60),
            mode: RetryMode::Exponential,
            network_timeout: Duration::from_secs(100),
        }
    }
}

impl RetryOptions {
    /// Options that never retry, used where a single attempt is wanted.
    pub fn no_retries() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before the given 1-based retry attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self.mode {
            RetryMode::Fixed => {
                if attempt == 0 {
                    Duration::ZERO
                } else {
                    self.delay.min(self.max_delay)
                }
            }
            RetryMode::Exponential => calculate_backoff(
                attempt,
                saturating_millis(self.delay),
                saturating_millis(self.max_delay),
            ),
        }
    }
}

fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Whether a response status is worth another attempt.
pub fn is_retriable_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::REQUEST_TIMEOUT
            | StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

/// Calculate exponential backoff delay with jitter.
///
/// Formula: `min(base_ms * 2^(attempt-1) + jitter, max_ms)` (0-25% jitter)
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let exp_factor = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exp_factor);

    let jitter = if delay_ms > 0 {
        rand::rng().random_range(0..=delay_ms / 4)
    } else {
        0
    };

    let total_delay = delay_ms.saturating_add(jitter).min(max_ms);
    Duration::from_millis(total_delay)
}
