//! Controller configuration, resolved from an optional TOML document.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, RoamError};

pub const CONFIG_VERSION: u32 = 1;

/// NetworkManager profile the agent manages unless told otherwise.
pub const DEFAULT_PROFILE: &str = "10-kiss-enable-master";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RoamConfigInput {
    pub version: u32,
    pub profile: Option<String>,
    pub scoring: ScoringConfigInput,
    pub probe: ProbeConfigInput,
    pub timing: TimingConfigInput,
    pub registry: RegistryConfigInput,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScoringConfigInput {
    pub quality_penalty: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProbeConfigInput {
    pub ping_count: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TimingConfigInput {
    pub settle_secs: Option<u64>,
    pub short_interval_secs: Option<u64>,
    pub long_interval_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegistryConfigInput {
    pub max_entries: Option<usize>,
    pub stale_after_scans: Option<u64>,
}

/// Hysteresis applied by the candidate scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringConfig {
    /// A candidate must beat the active quality by more than this margin.
    pub quality_penalty: i32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self { quality_penalty: 10 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Number of ICMP echoes per probe, one per second.
    pub ping_count: u32,
}

impl ProbeConfig {
    /// Hard deadline handed to `ping -w`.
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(u64::from(self.ping_count) + 1)
    }

    /// Latency recorded when the probe yields nothing usable.
    pub fn sentinel_ms(&self) -> f64 {
        2.0 * f64::from(self.ping_count) * 1000.0
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self { ping_count: 4 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingConfig {
    /// Pause after reconfiguring before the next scan is trusted.
    pub settle: Duration,
    /// Re-poll delay after a switch.
    pub short_interval: Duration,
    /// Re-poll delay when nothing better was found.
    pub long_interval: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            settle: Duration::from_secs(10),
            short_interval: Duration::from_secs(5),
            long_interval: Duration::from_secs(5 * 60),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    pub max_entries: usize,
    /// Entries missing from this many consecutive scans are evicted.
    pub stale_after_scans: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_entries: 256,
            stale_after_scans: 12,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoamConfig {
    pub version: u32,
    pub profile: String,
    pub scoring: ScoringConfig,
    pub probe: ProbeConfig,
    pub timing: TimingConfig,
    pub registry: RegistryConfig,
}

impl Default for RoamConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            profile: DEFAULT_PROFILE.to_string(),
            scoring: ScoringConfig::default(),
            probe: ProbeConfig::default(),
            timing: TimingConfig::default(),
            registry: RegistryConfig::default(),
        }
    }
}

impl RoamConfigInput {
    pub fn resolve(self) -> Result<RoamConfig> {
        let version = if self.version == 0 {
            CONFIG_VERSION
        } else {
            self.version
        };
        if version != CONFIG_VERSION {
            return Err(RoamError::Config(format!(
                "unsupported config version {version}"
            )));
        }

        let defaults = RoamConfig::default();

        let profile = match self.profile {
            Some(profile) => {
                let trimmed = profile.trim();
                if trimmed.is_empty() {
                    return Err(RoamError::Config("profile must not be empty".into()));
                }
                trimmed.to_string()
            }
            None => defaults.profile,
        };

        let quality_penalty = self
            .scoring
            .quality_penalty
            .unwrap_or(defaults.scoring.quality_penalty);
        if quality_penalty < 0 {
            return Err(RoamError::Config(format!(
                "quality_penalty must be non-negative, got {quality_penalty}"
            )));
        }

        let ping_count = self.probe.ping_count.unwrap_or(defaults.probe.ping_count);
        if ping_count == 0 {
            return Err(RoamError::Config("ping_count must be at least 1".into()));
        }

        let secs = |value: Option<u64>, fallback: Duration| {
            value.map(Duration::from_secs).unwrap_or(fallback)
        };
        let timing = TimingConfig {
            settle: secs(self.timing.settle_secs, defaults.timing.settle),
            short_interval: secs(
                self.timing.short_interval_secs,
                defaults.timing.short_interval,
            ),
            long_interval: secs(self.timing.long_interval_secs, defaults.timing.long_interval),
        };

        if timing.short_interval.is_zero() || timing.long_interval.is_zero() {
            return Err(RoamError::Config(
                "polling intervals must be at least one second".into(),
            ));
        }

        let registry = RegistryConfig {
            max_entries: self
                .registry
                .max_entries
                .unwrap_or(defaults.registry.max_entries)
                .max(1),
            stale_after_scans: self
                .registry
                .stale_after_scans
                .unwrap_or(defaults.registry.stale_after_scans)
                .max(1),
        };

        Ok(RoamConfig {
            version,
            profile,
            scoring: ScoringConfig { quality_penalty },
            probe: ProbeConfig { ping_count },
            timing,
            registry,
        })
    }
}

impl RoamConfig {
    pub fn from_toml_str(input: &str) -> Result<Self> {
        if input.trim().is_empty() {
            return Ok(RoamConfig::default());
        }
        let parsed: RoamConfigInput = toml::from_str(input)
            .map_err(|e| RoamError::Config(format!("invalid config TOML: {e}")))?;
        parsed.resolve()
    }
}
