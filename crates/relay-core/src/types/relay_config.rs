//! Relay configuration (relay.yaml)

use serde::{Deserialize, Serialize};

use super::{PollPolicy, RetryPolicy};
use crate::error::{Error, Result};

/// Top-level relay configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RelayConfig {
    /// Ledger gateway connection
    #[serde(default)]
    pub network: NetworkConfig,

    /// Retry policy for one-off ledger reads
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Poll policy used while waiting for contest creation
    #[serde(default)]
    pub poll: PollPolicy,

    /// Contest parameters
    #[serde(default)]
    pub contest: ContestConfig,
}

/// Ledger gateway connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NetworkConfig {
    /// Base URL of the relay gateway
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// API key sent as `X-API-Key`
    #[serde(default)]
    pub api_key: Option<String>,

    /// HTTP request timeout in seconds
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: None,
            http_timeout_secs: default_http_timeout(),
        }
    }
}

fn default_endpoint() -> String {
    "http://127.0.0.1:8081/api/v2".to_string()
}
fn default_http_timeout() -> u64 {
    30
}

/// Contest creation and lifecycle parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ContestConfig {
    /// Address of the contest factory contract
    #[serde(default)]
    pub factory_address: Option<String>,

    /// Value attached to the create message, in TON
    #[serde(default = "default_create_value")]
    pub create_value: String,

    /// Value attached to start/end/claim messages, in TON
    #[serde(default = "default_message_value")]
    pub message_value: String,

    /// Value sent when participating, in TON
    #[serde(default = "default_participation_value")]
    pub participation_value: String,

    /// Seconds between now and the contest start time
    #[serde(default = "default_start_offset")]
    pub start_offset_secs: u64,

    /// Contest duration in seconds
    #[serde(default = "default_duration")]
    pub duration_secs: u64,

    /// Wait after sending the create message before the first poll
    #[serde(default = "default_settle_delay")]
    pub settle_delay_secs: u64,

    /// Wait after each lifecycle message
    #[serde(default = "default_step_delay")]
    pub step_delay_secs: u64,

    /// Extra wait after the contest duration before ending it
    #[serde(default = "default_end_grace")]
    pub end_grace_secs: u64,
}

impl Default for ContestConfig {
    fn default() -> Self {
        Self {
            factory_address: None,
            create_value: default_create_value(),
            message_value: default_message_value(),
            participation_value: default_participation_value(),
            start_offset_secs: default_start_offset(),
            duration_secs: default_duration(),
            settle_delay_secs: default_settle_delay(),
            step_delay_secs: default_step_delay(),
            end_grace_secs: default_end_grace(),
        }
    }
}

fn default_create_value() -> String {
    "1.2".to_string()
}
fn default_message_value() -> String {
    "0.1".to_string()
}
fn default_participation_value() -> String {
    "0.5".to_string()
}
fn default_start_offset() -> u64 {
    600
}
fn default_duration() -> u64 {
    1800
}
fn default_settle_delay() -> u64 {
    60
}
fn default_step_delay() -> u64 {
    20
}
fn default_end_grace() -> u64 {
    30
}

impl RelayConfig {
    /// Check values that serde cannot reject on its own
    pub fn validate(&self) -> Result<()> {
        if self.network.endpoint.trim().is_empty() {
            return Err(Error::invalid_config("network.endpoint must not be empty"));
        }
        url::Url::parse(&self.network.endpoint).map_err(|e| {
            Error::invalid_config(format!(
                "network.endpoint '{}' is not a valid URL: {}",
                self.network.endpoint, e
            ))
        })?;

        for (name, policy) in [
            ("retry", &self.retry),
            ("poll.read-retry", &self.poll.read_retry),
            ("poll.final-check-retry", &self.poll.final_check_retry),
        ] {
            if policy.max_attempts == 0 {
                return Err(Error::invalid_config(format!(
                    "{}.max-attempts must be at least 1",
                    name
                )));
            }
            if !valid_multiplier(policy.backoff_multiplier) {
                return Err(Error::invalid_config(format!(
                    "{}.backoff-multiplier must be a finite number >= 1.0",
                    name
                )));
            }
        }

        if self.poll.max_attempts == 0 {
            return Err(Error::invalid_config("poll.max-attempts must be at least 1"));
        }
        if !valid_multiplier(self.poll.backoff_multiplier) {
            return Err(Error::invalid_config(
                "poll.backoff-multiplier must be a finite number >= 1.0",
            ));
        }
        if self.poll.max_delay_ms < self.poll.initial_delay_ms {
            return Err(Error::invalid_config(
                "poll.max-delay-ms must not be lower than poll.initial-delay-ms",
            ));
        }

        Ok(())
    }
}

/// Backoff growth factors must not shrink the delay, and NaN never compares
fn valid_multiplier(multiplier: f64) -> bool {
    multiplier.is_finite() && multiplier >= 1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = RelayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.contest.create_value, "1.2");
        assert_eq!(config.contest.settle_delay_secs, 60);
        assert!(config.contest.factory_address.is_none());
    }

    #[test]
    fn test_rejects_empty_endpoint() {
        let mut config = RelayConfig::default();
        config.network.endpoint = "  ".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("endpoint"));
    }

    #[test]
    fn test_rejects_malformed_endpoint() {
        let mut config = RelayConfig::default();
        config.network.endpoint = "not a url".to_string();
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_rejects_zero_attempts() {
        let mut config = RelayConfig::default();
        config.poll.final_check_retry.max_attempts = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("poll.final-check-retry"));
    }

    #[test]
    fn test_rejects_bad_poll_multiplier() {
        for multiplier in [0.5, f64::NAN, f64::INFINITY] {
            let mut config = RelayConfig::default();
            config.poll.backoff_multiplier = multiplier;
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("poll.backoff-multiplier"), "{}", err);
        }
    }

    #[test]
    fn test_rejects_nan_retry_multiplier() {
        let mut config = RelayConfig::default();
        config.retry.backoff_multiplier = f64::NAN;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("retry.backoff-multiplier"));
    }

    #[test]
    fn test_rejects_cap_below_initial_delay() {
        let mut config = RelayConfig::default();
        config.poll.max_delay_ms = 1000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_yaml_round_trip_keeps_kebab_case() {
        let yaml = serde_yaml_ng::to_string(&RelayConfig::default()).unwrap();
        assert!(yaml.contains("http-timeout-secs"));
        assert!(yaml.contains("final-check-retry"));
    }
}
