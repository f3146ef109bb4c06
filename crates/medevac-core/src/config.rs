// ── Runtime engine configuration ──
//
// Tuning knobs for the engine, its storage decorators and monitors.
// Core never touches disk for these: hosts build an `EngineConfig`
// (usually through `medevac-config`) and hand it in.

use std::time::Duration;

use crate::error::CoreError;
use crate::proximity::PROXIMITY_THRESHOLD_KM;

/// Exponential backoff for storage calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. 1 = no retry.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Single attempt, no waiting.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Delay before retry number `retry` (1-based), doubling each time.
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
        }
    }
}

/// Background task cadence for [`EmergencyMonitor`](crate::EmergencyMonitor).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorConfig {
    /// How often the elapsed-time ticker publishes.
    pub tick: Duration,
    /// Distance at or under which `IN_PROGRESS` auto-advances to `ARRIVING`.
    pub proximity_threshold_km: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(1),
            proximity_threshold_km: PROXIMITY_THRESHOLD_KM,
        }
    }
}

/// Configuration for one engine instance.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineConfig {
    pub retry: RetryPolicy,
    pub monitor: MonitorConfig,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.retry.max_attempts == 0 {
            return Err(CoreError::Config {
                message: "retry.max_attempts must be at least 1".into(),
            });
        }
        let threshold = self.monitor.proximity_threshold_km;
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(CoreError::Config {
                message: format!("proximity threshold must be a positive distance, got {threshold}"),
            });
        }
        if self.monitor.tick.is_zero() {
            return Err(CoreError::Config {
                message: "monitor tick must be non-zero".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(350),
        };
        assert_eq!(policy.backoff_for(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_for(3), Duration::from_millis(350));
        assert_eq!(policy.backoff_for(30), Duration::from_millis(350));
    }

    #[test]
    fn default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_attempts_and_bad_threshold() {
        let mut cfg = EngineConfig::default();
        cfg.retry.max_attempts = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = EngineConfig::default();
        cfg.monitor.proximity_threshold_km = f64::NAN;
        assert!(cfg.validate().is_err());

        cfg.monitor.proximity_threshold_km = -1.0;
        assert!(cfg.validate().is_err());
    }
}
