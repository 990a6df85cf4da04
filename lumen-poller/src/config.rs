//! Poller configuration
//!
//! Defines the polling schedule, retry budget and progress estimate of a
//! tracking session. Defaults cover roughly fifteen minutes of polling,
//! which is longer than any generation is expected to take.

use std::time::Duration;

/// Job poller configuration
#[derive(Debug, Clone, PartialEq)]
pub struct PollerConfig {
    /// Delay between fetches while the remote service answers normally
    pub initial_interval: Duration,

    /// Upper bound of the delay once backoff kicks in
    pub max_interval: Duration,

    /// Total fetch budget of one session
    pub max_attempts: u32,

    /// Growth factor of the delay after each failed fetch
    pub backoff_multiplier: f64,

    /// Expected duration of a generation, drives progress and ETA
    pub estimated_total: Duration,

    /// Consecutive failures before they are reported to the observer
    pub error_report_threshold: u32,

    /// Consecutive failures after which polling is abandoned
    pub abandon_threshold: u32,
}

impl PollerConfig {
    /// Creates a configuration with the default schedule
    pub fn new() -> Self {
        Self {
            initial_interval: Duration::from_secs(3),
            max_interval: Duration::from_secs(15),
            max_attempts: 180,
            backoff_multiplier: 1.2,
            estimated_total: Duration::from_secs(120),
            error_report_threshold: 3,
            abandon_threshold: 10,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Every variable is optional and falls back to the default:
    /// - LUMEN_POLL_INITIAL_INTERVAL_MS (default: 3000)
    /// - LUMEN_POLL_MAX_INTERVAL_MS (default: 15000)
    /// - LUMEN_POLL_MAX_ATTEMPTS (default: 180)
    /// - LUMEN_POLL_BACKOFF_MULTIPLIER (default: 1.2)
    /// - LUMEN_POLL_ESTIMATED_TOTAL_SECS (default: 120)
    /// - LUMEN_POLL_ERROR_REPORT_THRESHOLD (default: 3)
    /// - LUMEN_POLL_ABANDON_THRESHOLD (default: 10)
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::new();

        let config = Self {
            initial_interval: env_parse("LUMEN_POLL_INITIAL_INTERVAL_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.initial_interval),
            max_interval: env_parse("LUMEN_POLL_MAX_INTERVAL_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.max_interval),
            max_attempts: env_parse("LUMEN_POLL_MAX_ATTEMPTS")?.unwrap_or(defaults.max_attempts),
            backoff_multiplier: env_parse("LUMEN_POLL_BACKOFF_MULTIPLIER")?
                .unwrap_or(defaults.backoff_multiplier),
            estimated_total: env_parse("LUMEN_POLL_ESTIMATED_TOTAL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.estimated_total),
            error_report_threshold: env_parse("LUMEN_POLL_ERROR_REPORT_THRESHOLD")?
                .unwrap_or(defaults.error_report_threshold),
            abandon_threshold: env_parse("LUMEN_POLL_ABANDON_THRESHOLD")?
                .unwrap_or(defaults.abandon_threshold),
        };

        config.validate()?;
        Ok(config)
    }

    /// Delay following `current` after a failed fetch, clamped to `max_interval`
    ///
    /// A multiplier that yields no representable delay (negative, NaN,
    /// overflowing) falls back to `max_interval`.
    pub fn next_interval(&self, current: Duration) -> Duration {
        Duration::try_from_secs_f64(current.as_secs_f64() * self.backoff_multiplier)
            .unwrap_or(self.max_interval)
            .min(self.max_interval)
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.initial_interval.is_zero() {
            anyhow::bail!("initial_interval must be greater than 0");
        }

        if self.max_interval < self.initial_interval {
            anyhow::bail!("max_interval cannot be shorter than initial_interval");
        }

        if self.max_attempts == 0 {
            anyhow::bail!("max_attempts must be greater than 0");
        }

        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            anyhow::bail!("backoff_multiplier must be a finite number >= 1.0");
        }

        if self.estimated_total.is_zero() {
            anyhow::bail!("estimated_total must be greater than 0");
        }

        if self.error_report_threshold == 0 || self.error_report_threshold > self.abandon_threshold
        {
            anyhow::bail!("error_report_threshold must be between 1 and abandon_threshold");
        }

        Ok(())
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn env_parse<T>(key: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("invalid value '{}' for {}: {}", raw, key, e)),
        Err(_) => Ok(None),
    }
}
