use std::{fmt::Display, str::FromStr, time::Duration};

use connect_common::helpers::{parse_boolean_flag, parse_env_var};
use log::*;
use thiserror::Error;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/connect_matches.db";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_TX_TIMEOUT: Duration = Duration::from_millis(5_000);
pub const DEFAULT_TX_MAX_RETRIES: u32 = 5;
pub const DEFAULT_TX_RETRY_BACKOFF: Duration = Duration::from_millis(25);
pub const DEFAULT_DAILY_BATCH_SIZE: usize = 10;
pub const MAX_DAILY_BATCH_SIZE: usize = 50;
pub const DEFAULT_QUEUE_PULL_SIZE: usize = 3;
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid configuration value. {0}")]
    InvalidValue(String),
}

/// Bounds on how long, and how often, a mutating store transaction is attempted before the caller is told to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionPolicy {
    /// Upper bound on a single attempt, including the time spent waiting for the write lock
    pub timeout: Duration,
    /// Additional attempts after the first one fails with a transient error
    pub max_retries: u32,
    /// The base delay between attempts. Attempt `n` waits `n * backoff`, plus some jitter.
    pub backoff: Duration,
}

impl Default for TransactionPolicy {
    fn default() -> Self {
        Self { timeout: DEFAULT_TX_TIMEOUT, max_retries: DEFAULT_TX_MAX_RETRIES, backoff: DEFAULT_TX_RETRY_BACKOFF }
    }
}

impl TransactionPolicy {
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Configuration for the matching engine. Every field can be set from a `CONNECT_*` environment variable.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub transactions: TransactionPolicy,
    /// The number of candidates the batch generator puts in each daily entry. Clamped to `1..=50`.
    pub daily_batch_size: usize,
    /// The number of candidates [`crate::QueueApi::get_next`] returns when the caller does not say.
    pub queue_pull_size: usize,
    pub event_buffer_size: usize,
    /// Run the embedded migrations when the database is opened
    pub auto_migrate: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            transactions: TransactionPolicy::default(),
            daily_batch_size: DEFAULT_DAILY_BATCH_SIZE,
            queue_pull_size: DEFAULT_QUEUE_PULL_SIZE,
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
            auto_migrate: false,
        }
    }
}

impl EngineConfig {
    pub fn from_env_or_default() -> Self {
        let database_url = std::env::var("CONNECT_DATABASE_URL").ok().unwrap_or_else(|| {
            info!("🪛️ CONNECT_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let max_connections = env_or_default("CONNECT_DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS);
        let timeout = env_or_default("CONNECT_TX_TIMEOUT_MS", DEFAULT_TX_TIMEOUT.as_millis() as u64);
        let max_retries = env_or_default("CONNECT_TX_MAX_RETRIES", DEFAULT_TX_MAX_RETRIES);
        let backoff = env_or_default("CONNECT_TX_RETRY_BACKOFF_MS", DEFAULT_TX_RETRY_BACKOFF.as_millis() as u64);
        let transactions = TransactionPolicy {
            timeout: Duration::from_millis(timeout),
            max_retries,
            backoff: Duration::from_millis(backoff),
        };
        let daily_batch_size = env_or_default("CONNECT_DAILY_BATCH_SIZE", DEFAULT_DAILY_BATCH_SIZE);
        let queue_pull_size = env_or_default("CONNECT_QUEUE_PULL_SIZE", DEFAULT_QUEUE_PULL_SIZE);
        let event_buffer_size = env_or_default("CONNECT_EVENT_BUFFER_SIZE", DEFAULT_EVENT_BUFFER_SIZE);
        let auto_migrate = parse_boolean_flag(std::env::var("CONNECT_AUTO_MIGRATE").ok(), false);
        Self {
            database_url,
            max_connections,
            transactions,
            daily_batch_size: clamp_batch_size(daily_batch_size),
            queue_pull_size: queue_pull_size.max(1),
            event_buffer_size: event_buffer_size.max(1),
            auto_migrate,
        }
    }

    /// Like [`Self::from_env_or_default`], but fails on the first malformed value instead of falling back to the
    /// default.
    pub fn try_from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let database_url = std::env::var("CONNECT_DATABASE_URL").unwrap_or(defaults.database_url);
        let transactions = TransactionPolicy {
            timeout: strict("CONNECT_TX_TIMEOUT_MS")?.map(Duration::from_millis).unwrap_or(DEFAULT_TX_TIMEOUT),
            max_retries: strict("CONNECT_TX_MAX_RETRIES")?.unwrap_or(DEFAULT_TX_MAX_RETRIES),
            backoff: strict("CONNECT_TX_RETRY_BACKOFF_MS")?
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_TX_RETRY_BACKOFF),
        };
        let daily_batch_size = strict("CONNECT_DAILY_BATCH_SIZE")?.unwrap_or(defaults.daily_batch_size);
        Ok(Self {
            database_url,
            max_connections: strict("CONNECT_DB_MAX_CONNECTIONS")?.unwrap_or(defaults.max_connections),
            transactions,
            daily_batch_size: clamp_batch_size(daily_batch_size),
            queue_pull_size: strict::<usize>("CONNECT_QUEUE_PULL_SIZE")?.unwrap_or(defaults.queue_pull_size).max(1),
            event_buffer_size: strict::<usize>("CONNECT_EVENT_BUFFER_SIZE")?
                .unwrap_or(defaults.event_buffer_size)
                .max(1),
            auto_migrate: parse_boolean_flag(std::env::var("CONNECT_AUTO_MIGRATE").ok(), defaults.auto_migrate),
        })
    }

    pub fn with_database_url(mut self, url: &str) -> Self {
        self.database_url = url.to_string();
        self
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections.max(1);
        self
    }

    pub fn with_transaction_policy(mut self, policy: TransactionPolicy) -> Self {
        self.transactions = policy;
        self
    }

    pub fn with_daily_batch_size(mut self, size: usize) -> Self {
        self.daily_batch_size = clamp_batch_size(size);
        self
    }

    pub fn with_queue_pull_size(mut self, size: usize) -> Self {
        self.queue_pull_size = size.max(1);
        self
    }

    pub fn with_auto_migrate(mut self, auto_migrate: bool) -> Self {
        self.auto_migrate = auto_migrate;
        self
    }
}

pub fn clamp_batch_size(size: usize) -> usize {
    size.clamp(1, MAX_DAILY_BATCH_SIZE)
}

fn strict<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    parse_env_var::<T>(key).map_err(ConfigError::InvalidValue)
}

fn env_or_default<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match parse_env_var::<T>(key) {
        Ok(Some(v)) => v,
        Ok(None) => default,
        Err(e) => {
            error!("🪛️ {e} Using the default, {default}, instead.");
            default
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn batch_size_is_clamped() {
        let config = EngineConfig::default().with_daily_batch_size(0);
        assert_eq!(config.daily_batch_size, 1);
        let config = config.with_daily_batch_size(500);
        assert_eq!(config.daily_batch_size, MAX_DAILY_BATCH_SIZE);
        let config = config.with_daily_batch_size(7);
        assert_eq!(config.daily_batch_size, 7);
    }

    #[test]
    fn invalid_env_values_fall_back_to_defaults() {
        std::env::set_var("CONNECT_QUEUE_PULL_SIZE", "lots");
        std::env::set_var("CONNECT_TX_MAX_RETRIES", "2");
        let config = EngineConfig::from_env_or_default();
        assert_eq!(config.queue_pull_size, DEFAULT_QUEUE_PULL_SIZE);
        assert_eq!(config.transactions.max_retries, 2);
        assert_eq!(config.transactions.max_attempts(), 3);
        assert!(matches!(EngineConfig::try_from_env(), Err(ConfigError::InvalidValue(_))));
        std::env::remove_var("CONNECT_QUEUE_PULL_SIZE");
        std::env::remove_var("CONNECT_TX_MAX_RETRIES");
    }
}
