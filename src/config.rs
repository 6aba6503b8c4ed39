//! Configuration consumed by a race.
//!
//! Durations are given in whole milliseconds. Configurations can be built in
//! code or loaded from TOML:
//!
//! ```
//! use race_cancel::config::ResolveConfig;
//! use std::time::Duration;
//!
//! let config = ResolveConfig::from_toml(
//!     r#"
//!     host = "localhost"
//!     port = 80
//!     timeout_ms = 50
//!     abort_after_ms = 5
//!     "#,
//! )
//! .unwrap();
//!
//! assert_eq!(config.race.timeout(), Duration::from_millis(50));
//! assert_eq!(config.race.abort_after(), Some(Duration::from_millis(5)));
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Errors raised while loading a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The input was not valid TOML or did not match the expected shape.
    #[error("invalid race configuration: {0}")]
    Parse(#[from] toml::de::Error),
    /// The target host was empty.
    #[error("target host must not be empty")]
    EmptyHost,
}

/// Deadlines of a single race.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    /// The operation's own timeout.
    pub timeout_ms: u64,
    /// The abort trigger's deadline. `None` disables the trigger.
    ///
    /// The trigger may be shorter or longer than the timeout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abort_after_ms: Option<u64>,
}

impl RaceConfig {
    /// A configuration with the given timeout and no abort trigger.
    ///
    /// Durations are stored in whole milliseconds, rounded up, so a
    /// sub-millisecond timeout never turns into an immediate one.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout_ms: millis(timeout),
            abort_after_ms: None,
        }
    }

    /// Enable the abort trigger.
    #[must_use]
    pub fn with_abort_after(mut self, abort_after: Duration) -> Self {
        self.abort_after_ms = Some(millis(abort_after));
        self
    }

    /// The operation's own timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The abort trigger's deadline, if enabled.
    pub fn abort_after(&self) -> Option<Duration> {
        self.abort_after_ms.map(Duration::from_millis)
    }
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self::new(Duration::from_millis(10))
    }
}

/// Target and deadlines of a name resolution race.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveConfig {
    /// Host name to resolve.
    pub host: String,
    /// Port attached to every resolved address.
    pub port: u16,
    /// Deadlines of the race.
    #[serde(flatten)]
    pub race: RaceConfig,
}

impl ResolveConfig {
    /// A configuration for `host:port` with the default deadlines.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            race: RaceConfig::default(),
        }
    }

    /// Replace the deadlines.
    #[must_use]
    pub fn with_race(mut self, race: RaceConfig) -> Self {
        self.race = race;
        self
    }

    /// Parse and validate a configuration from TOML text.
    ///
    /// Missing fields take their default values.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: ResolveConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values no race can use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        Ok(())
    }
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self::new("ftx.com", 443)
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos().div_ceil(1_000_000)).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        let config = ResolveConfig::default();
        assert_eq!(config.host, "ftx.com");
        assert_eq!(config.port, 443);
        assert_eq!(config.race.timeout(), Duration::from_millis(10));
        assert_eq!(config.race.abort_after(), None);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config = ResolveConfig::from_toml("host = \"example.org\"").unwrap();
        assert_eq!(config.host, "example.org");
        assert_eq!(config.port, 443);
        assert_eq!(config.race, RaceConfig::default());
    }

    #[test]
    fn abort_may_outlast_timeout() {
        let config = ResolveConfig::from_toml(
            r#"
            host = "example.org"
            timeout_ms = 5
            abort_after_ms = 500
            "#,
        )
        .unwrap();
        assert_eq!(config.race.abort_after(), Some(Duration::from_millis(500)));
        assert!(config.race.abort_after().unwrap() > config.race.timeout());
    }

    #[test]
    fn empty_host_is_rejected() {
        let err = ResolveConfig::from_toml("host = \"  \"").unwrap_err();
        assert!(matches!(err, ConfigError::EmptyHost));
    }

    #[test]
    fn wrong_type_is_a_parse_error() {
        let err = ResolveConfig::from_toml("timeout_ms = \"soon\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().starts_with("invalid race configuration"));
    }

    #[test]
    fn builder_round_trips_through_toml() {
        let config = ResolveConfig::new("localhost", 8080).with_race(
            RaceConfig::new(Duration::from_millis(20)).with_abort_after(Duration::from_millis(3)),
        );
        let text = toml::to_string(&config).unwrap();
        assert_eq!(ResolveConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn sub_millisecond_durations_round_up() {
        let config = RaceConfig::new(Duration::from_micros(500))
            .with_abort_after(Duration::from_micros(1_001));
        assert_eq!(config.timeout_ms, 1);
        assert_eq!(config.abort_after_ms, Some(2));
        assert_eq!(RaceConfig::new(Duration::ZERO).timeout_ms, 0);
        assert_eq!(RaceConfig::new(Duration::MAX).timeout_ms, u64::MAX);
    }
}
