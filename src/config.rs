use std::collections::HashMap;
use std::env;
use std::num::ParseIntError;

use chrono::Duration as ChronoDuration;
use rdkafka::ClientConfig;
use thiserror::Error;
use tokio::time::Duration;

use crate::cli::KVPair;
use crate::constants::{
    DEFAULT_BOOTSTRAP_SERVERS, DEFAULT_LAG_THRESHOLD, DEFAULT_SAMPLING_INTERVAL_SECONDS,
    DEFAULT_SUSTAIN_SECONDS, DEFAULT_WINDOW_SIZE,
};

/// Possible errors when building a [`ScalerConfig`].
#[derive(Error, Debug, Eq, PartialEq)]
pub enum ConfigError {
    /// A required configuration option was provided neither via scaler
    /// metadata, nor via the process environment.
    #[error("Configuration option '{0}' is required")]
    MissingRequired(&'static str),

    /// A numeric configuration option could not be parsed.
    #[error("Configuration option '{0}' is not a valid integer: {1}")]
    MalformedInteger(&'static str, ParseIntError),

    /// A duration or count configuration option was zero or negative.
    #[error("Configuration option '{0}' must be positive: got {1}")]
    NonPositive(&'static str, i64),

    /// A duration configuration option was too large to represent.
    #[error("Configuration option '{0}' is out of range: {1}")]
    DurationOutOfRange(&'static str, i64),

    /// The sustain duration does not fit in the sliding window: a lag
    /// stretch long enough to qualify could never be retained whole.
    #[error("Sustain duration ({0}s) exceeds the window duration ({1}s): persistence could never be observed")]
    SustainExceedsWindow(i64, i64),
}

/// Scaler configuration. Read-only after construction.
///
/// Options are resolved with the following precedence (first hit wins):
/// scaler metadata carried by orchestrator requests, process environment,
/// built-in defaults.
#[derive(Debug, Clone)]
pub struct ScalerConfig {
    /// Initial Kafka Brokers to connect to (format: 'HOST:PORT,...').
    pub bootstrap_servers: String,

    /// Topic to observe.
    pub topic: String,

    /// Consumer Group whose committed offsets define the lag.
    pub consumer_group: String,

    /// Lag at or above this threshold counts towards persistence.
    pub lag_threshold: i64,

    /// Minimum continuous duration the lag must span to be persistent.
    pub sustain_duration: ChronoDuration,

    /// How often the Cluster is queried for lag.
    pub sampling_interval: Duration,

    /// Sliding window duration, expressed as a multiple of `sampling_interval`.
    pub window_size: usize,
}

impl ScalerConfig {
    /// Build a [`ScalerConfig`] from the given scaler metadata, falling back
    /// on the process environment, then on defaults.
    ///
    /// # Arguments
    ///
    /// * `metadata` - Scaler metadata, as carried by the orchestrator requests
    pub fn from_metadata(metadata: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bootstrap_servers = resolve(metadata, "bootstrapServers", "KAFKA_BROKERS")
            .unwrap_or_else(|| DEFAULT_BOOTSTRAP_SERVERS.to_string());
        let topic = resolve(metadata, "topic", "KAFKA_TOPIC")
            .ok_or(ConfigError::MissingRequired("topic"))?;
        let consumer_group = resolve(metadata, "consumerGroup", "KAFKA_GROUP_ID")
            .ok_or(ConfigError::MissingRequired("consumerGroup"))?;

        let lag_threshold = resolve_integer(metadata, "lagThreshold", "LAG_THRESHOLD")?
            .unwrap_or(DEFAULT_LAG_THRESHOLD);
        let sustain_seconds = resolve_positive(metadata, "sustainSeconds", "SUSTAIN_SECONDS")?
            .unwrap_or(DEFAULT_SUSTAIN_SECONDS);
        let sampling_seconds = resolve_positive(metadata, "samplingInterval", "SAMPLING_INTERVAL")?
            .unwrap_or(DEFAULT_SAMPLING_INTERVAL_SECONDS);
        let window_size = resolve_positive(metadata, "windowSize", "WINDOW_SIZE")?
            .unwrap_or(DEFAULT_WINDOW_SIZE);

        let sustain_duration = ChronoDuration::try_seconds(sustain_seconds)
            .ok_or(ConfigError::DurationOutOfRange("sustainSeconds", sustain_seconds))?;

        // The window must be able to retain a whole qualifying stretch
        if (sustain_seconds as i128) > (window_size as i128) * (sampling_seconds as i128) {
            return Err(ConfigError::SustainExceedsWindow(
                sustain_seconds,
                window_size.saturating_mul(sampling_seconds),
            ));
        }

        Ok(Self {
            bootstrap_servers,
            topic,
            consumer_group,
            lag_threshold,
            sustain_duration,
            sampling_interval: Duration::from_secs(sampling_seconds as u64),
            window_size: window_size as usize,
        })
    }

    /// Build a [`ScalerConfig`] from the process environment alone.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_metadata(&HashMap::new())
    }

    /// Build the Kafka [`ClientConfig`] used to query the Cluster.
    ///
    /// The `group.id` is set to the observed Consumer Group, so that
    /// committed-offset lookups are routed to its Group Coordinator;
    /// auto-commit is disabled, as the scaler must never alter the
    /// state of the Group it observes.
    ///
    /// # Arguments
    ///
    /// * `overrides` - Additional `librdkafka` configuration to apply on top
    pub fn build_client_config(&self, overrides: &[KVPair]) -> ClientConfig {
        let mut client_config = ClientConfig::new();
        client_config
            .set("bootstrap.servers", self.bootstrap_servers.clone())
            .set("client.id", env!("CARGO_PKG_NAME"))
            .set("group.id", self.consumer_group.clone())
            .set("enable.auto.commit", "false");
        for cfg in overrides {
            client_config.set(cfg.0.clone(), cfg.1.clone());
        }

        trace!("Created:\n{:#?}", client_config);
        client_config
    }
}

/// Resolve a configuration option: first from `metadata`, then from the
/// process environment. Empty values count as absent.
fn resolve(metadata: &HashMap<String, String>, key: &str, env_key: &str) -> Option<String> {
    if let Some(v) = metadata.get(key) {
        if !v.is_empty() {
            return Some(v.clone());
        }
    }

    env::var(env_key).ok().filter(|v| !v.is_empty())
}

/// Like [`resolve`], parsing the raw value as an `i64`.
fn resolve_integer(
    metadata: &HashMap<String, String>,
    key: &'static str,
    env_key: &'static str,
) -> Result<Option<i64>, ConfigError> {
    resolve(metadata, key, env_key)
        .map(|raw| raw.parse::<i64>().map_err(|e| ConfigError::MalformedInteger(key, e)))
        .transpose()
}

/// Like [`resolve_integer`], additionally rejecting zero and negative values.
fn resolve_positive(
    metadata: &HashMap<String, String>,
    key: &'static str,
    env_key: &'static str,
) -> Result<Option<i64>, ConfigError> {
    match resolve_integer(metadata, key, env_key)? {
        Some(v) if v <= 0 => Err(ConfigError::NonPositive(key, v)),
        other => Ok(other),
    }
}
