//! Engine configuration. Every field has a default, so an empty document
//! deserializes to [`EngineConfig::default`].

use std::time::Duration;

use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScheduleError};
use crate::time::hhmm;

pub const DEFAULT_SNAP_MINUTES: u32 = 15;
pub const MIN_SNAP_MINUTES: u32 = 5;
pub const MAX_SNAP_MINUTES: u32 = 60;

/// How far a booked session's start may drift from an occurrence's start
/// and still be treated as that occurrence.
pub const SESSION_MATCH_TOLERANCE_MINUTES: u32 = 45;

pub const MIN_CACHE_TTL_SECS: u64 = 30;
pub const MAX_CACHE_TTL_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// IANA timezone the tenant's wall-clock times are expressed in.
    pub timezone: String,
    #[serde(with = "hhmm")]
    pub default_work_start: NaiveTime,
    #[serde(with = "hhmm")]
    pub default_work_end: NaiveTime,
    pub default_snap_minutes: u32,
    pub cache_ttl_secs: u64,
    pub session_match_tolerance_minutes: u32,
    pub default_horizon_days: u32,
    /// Upper bound on calendar ranges and reschedule horizons.
    pub max_range_days: u32,
    /// Duration of an extra class whose override gives none.
    pub extra_class_minutes: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            default_work_start: NaiveTime::from_hms_opt(7, 0, 0).unwrap_or(NaiveTime::MIN),
            default_work_end: NaiveTime::from_hms_opt(20, 0, 0).unwrap_or(NaiveTime::MIN),
            default_snap_minutes: DEFAULT_SNAP_MINUTES,
            cache_ttl_secs: 45,
            session_match_tolerance_minutes: SESSION_MATCH_TOLERANCE_MINUTES,
            default_horizon_days: 7,
            max_range_days: 92,
            extra_class_minutes: 60,
        }
    }
}

impl EngineConfig {
    /// Parse the configured timezone.
    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse()
            .map_err(|_| ScheduleError::invalid(format!("invalid timezone '{}'", self.timezone)))
    }

    /// TTL for cached read results, held inside `[30, 60]` seconds.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(
            self.cache_ttl_secs
                .clamp(MIN_CACHE_TTL_SECS, MAX_CACHE_TTL_SECS),
        )
    }

    /// Check the values that would make computations meaningless.
    pub fn validate(&self) -> Result<()> {
        self.tz()?;
        if self.default_horizon_days == 0 || self.max_range_days == 0 {
            return Err(ScheduleError::invalid(
                "default_horizon_days and max_range_days must be positive",
            ));
        }
        if self.extra_class_minutes == 0 {
            return Err(ScheduleError::invalid("extra_class_minutes must be positive"));
        }
        Ok(())
    }
}

/// Clamp a snap granularity into `[5, 60]` minutes.
pub fn clamp_snap(minutes: u32) -> u32 {
    minutes.clamp(MIN_SNAP_MINUTES, MAX_SNAP_MINUTES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.default_work_start.to_string(), "07:00:00");
    }

    #[test]
    fn cache_ttl_is_clamped() {
        let mut config = EngineConfig {
            cache_ttl_secs: 5,
            ..EngineConfig::default()
        };
        assert_eq!(config.cache_ttl(), Duration::from_secs(30));
        config.cache_ttl_secs = 600;
        assert_eq!(config.cache_ttl(), Duration::from_secs(60));
    }

    #[test]
    fn bad_timezone_fails_validation() {
        let config = EngineConfig {
            timezone: "Mars/Olympus".to_string(),
            ..EngineConfig::default()
        };
        assert!(matches!(config.validate(), Err(ScheduleError::InvalidInput(_))));
    }

    #[test]
    fn snap_clamped_to_bounds() {
        assert_eq!(clamp_snap(1), 5);
        assert_eq!(clamp_snap(15), 15);
        assert_eq!(clamp_snap(90), 60);
    }
}
