use std::time::Duration;

use common::storage::TransferOptions;
use common::{RetryMode, RetryOptions, ThrottlePolicy, ThrottleWindows};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Local directory, served under `/blobs`.
    Filesystem,
    /// Azure Blob REST endpoint from `storage.connection_string`.
    Http,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FilesystemConfig {
    pub root: String,
    pub public_base_url: String,
}

/// Retry settings as written. Converted with [`RetrySettings::to_options`].
#[derive(Debug, Deserialize, Clone, Default)]
pub struct RetrySettings {
    pub max_retries: Option<String>,
    pub delay: Option<String>,
    pub max_delay: Option<String>,
    pub mode: Option<String>,
    pub network_timeout: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TransferSettings {
    pub maximum_transfer_size: Option<String>,
    pub maximum_concurrency: Option<String>,
    pub initial_transfer_size: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct FaultInjectionSettings {
    #[serde(default)]
    pub enabled: bool,
    pub throttling_rate: Option<String>,
    pub available_interval: Option<String>,
    pub throttling_interval: Option<String>,
    pub seed: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub container: String,
    pub max_blob_size: u64,
    pub connection_string: Option<String>,
    pub filesystem: FilesystemConfig,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub transfer: TransferSettings,
    #[serde(default)]
    pub fault_injection: FaultInjectionSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SeedConfig {
    pub enabled: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub seed: SeedConfig,
}

/// Default fault-injection rate when none (or garbage) is configured.
pub const DEFAULT_THROTTLING_RATE: f64 = 0.5;

impl AppConfig {
    /// Builder pre-populated with every default.
    pub fn default_builder() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("database.url", "sqlite://gallery.db?mode=rwc")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 1)?
            .set_default("storage.backend", "filesystem")?
            .set_default("storage.container", "images")?
            .set_default("storage.max_blob_size", 32 * 1024 * 1024)?
            .set_default("storage.filesystem.root", "./data/blobs")?
            .set_default(
                "storage.filesystem.public_base_url",
                "http://127.0.0.1:3000/blobs/",
            )?
            .set_default("seed.enabled", false)
    }

    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("GALLERY_CONFIG").unwrap_or_else(|_| "config/config".into());
        Self::default_builder()?
            // Load from config/config.toml (or $GALLERY_CONFIG)
            .add_source(File::with_name(&path).required(false))
            // Override from environment (e.g., GALLERY__STORAGE__FAULT_INJECTION__ENABLED)
            .add_source(Environment::with_prefix("GALLERY").separator("__"))
            .build()?
            .try_deserialize()
    }
}

impl RetrySettings {
    pub fn to_options(&self) -> RetryOptions {
        let defaults = RetryOptions::default();
        RetryOptions {
            max_retries: setting(
                "storage.retry.max_retries",
                &self.max_retries,
                |s| s.trim().parse().ok(),
                defaults.max_retries,
            ),
            delay: setting("storage.retry.delay", &self.delay, parse_duration, defaults.delay),
            max_delay: setting(
                "storage.retry.max_delay",
                &self.max_delay,
                parse_duration,
                defaults.max_delay,
            ),
            mode: setting("storage.retry.mode", &self.mode, RetryMode::parse, defaults.mode),
            network_timeout: setting(
                "storage.retry.network_timeout",
                &self.network_timeout,
                parse_duration,
                defaults.network_timeout,
            ),
        }
    }
}

impl TransferSettings {
    pub fn to_options(&self) -> TransferOptions {
        let defaults = TransferOptions::default();
        let positive = |s: &str| s.trim().parse::<usize>().ok().filter(|n| *n > 0);
        TransferOptions {
            initial_transfer_size: setting(
                "storage.transfer.initial_transfer_size",
                &self.initial_transfer_size,
                positive,
                defaults.initial_transfer_size,
            ),
            maximum_transfer_size: setting(
                "storage.transfer.maximum_transfer_size",
                &self.maximum_transfer_size,
                positive,
                defaults.maximum_transfer_size,
            ),
            maximum_concurrency: setting(
                "storage.transfer.maximum_concurrency",
                &self.maximum_concurrency,
                positive,
                defaults.maximum_concurrency,
            ),
        }
    }
}

impl FaultInjectionSettings {
    /// Throttle policy. Windows apply only when both intervals parse.
    pub fn to_policy(&self) -> ThrottlePolicy {
        let rate = setting(
            "storage.fault_injection.throttling_rate",
            &self.throttling_rate,
            |s| s.trim().parse::<f64>().ok().filter(|r| r.is_finite()),
            DEFAULT_THROTTLING_RATE,
        );
        let policy = ThrottlePolicy::new(rate);

        let available = optional_setting(
            "storage.fault_injection.available_interval",
            &self.available_interval,
            parse_duration,
        );
        let throttling = optional_setting(
            "storage.fault_injection.throttling_interval",
            &self.throttling_interval,
            parse_duration,
        );
        match (available, throttling) {
            (Some(available), Some(throttling)) => policy.with_windows(ThrottleWindows {
                available,
                throttling,
            }),
            (None, None) => policy,
            _ => {
                warn!("Only one throttling interval is configured; throttling without windows");
                policy
            }
        }
    }
}

fn optional_setting<T>(
    key: &str,
    raw: &Option<String>,
    parse: impl Fn(&str) -> Option<T>,
) -> Option<T> {
    let raw = raw.as_deref()?;
    let parsed = parse(raw);
    if parsed.is_none() {
        warn!(key, value = raw, "Ignoring unparsable setting");
    }
    parsed
}

fn setting<T>(key: &str, raw: &Option<String>, parse: impl Fn(&str) -> Option<T>, default: T) -> T {
    optional_setting(key, raw, parse).unwrap_or(default)
}

/// Parse a duration given as `hh:mm:ss[.fff]`, `d.hh:mm:ss[.fff]`, bare
/// seconds, or a humantime span such as `250ms`, `2m` or `1h 30m`.
/// Values that do not fit in a [`Duration`] are rejected.
pub fn parse_duration(text: &str) -> Option<Duration> {
    let text = text.trim();
    if text.contains(':') {
        return parse_clock(text);
    }
    if let Ok(seconds) = text.parse::<f64>() {
        return Duration::try_from_secs_f64(seconds).ok();
    }
    humantime::parse_duration(text).ok()
}

fn parse_clock(text: &str) -> Option<Duration> {
    let mut parts = text.split(':');
    let (Some(head), Some(minutes), Some(seconds), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return None;
    };

    let (days, hours) = match head.split_once('.') {
        Some((d, h)) => (d.parse::<u64>().ok()?, h.parse::<u64>().ok()?),
        None => (0, head.parse::<u64>().ok()?),
    };
    let minutes: u64 = minutes.parse().ok()?;
    let seconds: f64 = seconds.parse().ok()?;
    if hours > 23 || minutes > 59 || !(0.0..60.0).contains(&seconds) {
        return None;
    }

    let whole = days
        .checked_mul(86_400)?
        .checked_add(hours * 3_600 + minutes * 60)?;
    Duration::from_secs(whole).checked_add(Duration::try_from_secs_f64(seconds).ok()?)
}
