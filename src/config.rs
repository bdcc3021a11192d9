//! TOML configuration for the machinewatch monitor.
//!
//! Every tunable of the simulator, the risk scorer and the alerting rules lives
//! here as a named field with a compiled-in default. A file is layered over
//! the defaults table by table, so a partial file (down to a single field of
//! a rule) only overrides what it names. Arrays such as `anomaly.regimes`
//! replace the default list as a whole.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::sensor::anomaly::Regime;
use crate::sensor::Signal;

/// Environment variable naming an alternative config file.
pub const CONFIG_ENV: &str = "MACHINEWATCH_CONFIG";

/// Standard system location for the config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/machinewatch/machinewatch.toml";

/// Configuration rejected by [`MonitorConfig::validate`].
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name}: min ({min}) must not exceed max ({max})")]
    InvalidRange { name: String, min: f64, max: f64 },

    #[error("{signal}: base + offset range [{low}, {high}] never reaches the clamp band")]
    UnreachableBand { signal: String, low: f64, high: f64 },

    #[error("{name} must lie in [0, 1], got {value}")]
    NotAProbability { name: String, value: f64 },

    #[error("anomaly regimes: {0}")]
    RegimeTable(String),

    #[error("status thresholds must satisfy 0 <= warning < critical <= 1 (warning={warning}, critical={critical})")]
    StatusThresholds { warning: f64, critical: f64 },

    #[error("rule {rule}: strict threshold {strict} is not beyond threshold {threshold}")]
    TierOrder { rule: String, threshold: f64, strict: f64 },

    #[error("rule {rule}: weight {weight} is negative")]
    NegativeWeight { rule: String, weight: f64 },

    #[error("alert {alert}: critical level {critical} is not beyond warning level {warning}")]
    AlertOrder { alert: String, warning: f64, critical: f64 },

    #[error("{name} must be a finite number, got {value}")]
    NotFinite { name: String, value: f64 },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration for the monitor process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub machine: MachineConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub signals: SignalsConfig,
    #[serde(default)]
    pub tool_wear: ToolWearConfig,
    #[serde(default)]
    pub anomaly: AnomalyConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub alerts: AlertConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl MonitorConfig {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config = Self::from_toml_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded monitor configuration");
        Ok(config)
    }

    /// Parse `content` layered over [`MonitorConfig::default`].
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let overlay: toml::Value = toml::from_str(content)?;
        let mut merged =
            toml::Value::try_from(Self::default()).context("failed to encode default config")?;
        merge_tables(&mut merged, overlay);
        Ok(merged.try_into()?)
    }

    /// Load from an explicit path (which must exist and parse), or fall back
    /// to [`MonitorConfig::load_or_default`].
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::load_or_default()),
        }
    }

    /// [`MonitorConfig::resolve`] followed by [`MonitorConfig::validate`].
    pub fn load_validated(path: Option<&Path>) -> Result<Self> {
        let config = Self::resolve(path)?;
        config.validate().context("invalid monitor configuration")?;
        Ok(config)
    }

    /// Try to load configuration from, in order:
    /// 1. The path specified by the `MACHINEWATCH_CONFIG` environment variable.
    /// 2. `/etc/machinewatch/machinewatch.toml`.
    /// 3. Fall back to compiled-in defaults.
    pub fn load_or_default() -> Self {
        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let path = Path::new(&env_path);
            match Self::load(path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "MACHINEWATCH_CONFIG set but file could not be loaded, trying fallback"
                    );
                }
            }
        }

        let system_path = Path::new(SYSTEM_CONFIG_PATH);
        if system_path.exists() {
            match Self::load(system_path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %system_path.display(),
                        error = %e,
                        "system config file exists but could not be loaded, using defaults"
                    );
                }
            }
        }

        debug!("no config file found, using compiled-in defaults");
        Self::default()
    }

    /// Check every cross-field invariant. Run once at startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scheduler.tick_interval_ms == 0 {
            return Err(ConfigError::Zero("scheduler.tick_interval_ms"));
        }
        if self.scheduler.history_len == 0 {
            return Err(ConfigError::Zero("scheduler.history_len"));
        }

        for (signal, cfg) in self.signals.iter() {
            cfg.validate(signal.key())?;
        }
        self.tool_wear.band.validate("tool_wear.band")?;
        check_finite("tool_wear.initial", self.tool_wear.initial)?;
        for (name, value) in [
            ("tool_wear.wear_rate", self.tool_wear.wear_rate),
            ("tool_wear.anomaly_bonus", self.tool_wear.anomaly_bonus),
        ] {
            check_finite(name, value)?;
            if value < 0.0 {
                return Err(ConfigError::InvalidRange {
                    name: name.to_string(),
                    min: 0.0,
                    max: value,
                });
            }
        }

        self.anomaly.validate()?;
        self.risk.validate()?;
        self.alerts.validate()?;
        Ok(())
    }
}

/// Recursively overlay `overlay` onto `base`. Tables merge key by key; any
/// other value (arrays included) replaces what was there.
fn merge_tables(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => merge_tables(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

// ---------------------------------------------------------------------------
// Shared range type
// ---------------------------------------------------------------------------

/// An inclusive `[min, max]` range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub min: f64,
    pub max: f64,
}

impl Band {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    /// Both edges finite, ordered, and with a finite width so the band can
    /// be sampled.
    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        check_finite(&format!("{name}.min"), self.min)?;
        check_finite(&format!("{name}.max"), self.max)?;
        if self.min > self.max {
            return Err(ConfigError::InvalidRange {
                name: name.to_string(),
                min: self.min,
                max: self.max,
            });
        }
        check_finite(&format!("{name} width"), self.max - self.min)
    }
}

fn check_finite(name: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::NotFinite {
            name: name.to_string(),
            value,
        });
    }
    Ok(())
}

fn check_probability(name: &str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::NotAProbability {
            name: name.to_string(),
            value,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Machine identity
// ---------------------------------------------------------------------------

/// Identity of the simulated machine, carried on every reading.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    pub udi: String,
    pub product_id: String,
    /// Free-form machine type shown to operators.
    pub kind: String,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            udi: "UDI-2024-001".to_string(),
            product_id: "M14860".to_string(),
            kind: "Industrial CNC lathe".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Period between ticks, in milliseconds.
    pub tick_interval_ms: u64,
    /// Number of points kept for trend charts.
    pub history_len: usize,
    /// Fixed RNG seed for reproducible runs. Entropy-seeded when absent.
    pub seed: Option<u64>,
}

impl SchedulerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 4_000,
            history_len: 24,
            seed: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Signals
// ---------------------------------------------------------------------------

/// Generation and clamping rules for one sensor channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalConfig {
    /// Nominal operating point.
    pub base: f64,
    /// Uniform offset added to `base` each tick.
    pub offset: Band,
    /// Hard operating band applied after every update.
    pub band: Band,
    /// Value before the first tick.
    pub initial: f64,
}

impl SignalConfig {
    /// Midpoint of the nominal generation range (`base + offset`).
    pub fn nominal_midpoint(&self) -> f64 {
        self.base + self.offset.midpoint()
    }

    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        self.band.validate(&format!("signals.{name}.band"))?;
        self.offset.validate(&format!("signals.{name}.offset"))?;
        check_finite(&format!("signals.{name}.base"), self.base)?;
        check_finite(&format!("signals.{name}.initial"), self.initial)?;
        let low = self.base + self.offset.min;
        let high = self.base + self.offset.max;
        if high < self.band.min || low > self.band.max {
            return Err(ConfigError::UnreachableBand {
                signal: name.to_string(),
                low,
                high,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalsConfig {
    /// Air temperature [K].
    pub air_temperature: SignalConfig,
    /// Process temperature [K].
    pub process_temperature: SignalConfig,
    /// Rotational speed [rpm].
    pub rotational_speed: SignalConfig,
    /// Torque [Nm].
    pub torque: SignalConfig,
}

impl SignalsConfig {
    /// The four generated channels, in display order.
    pub fn iter(&self) -> impl Iterator<Item = (Signal, &SignalConfig)> {
        [
            (Signal::AirTemperature, &self.air_temperature),
            (Signal::ProcessTemperature, &self.process_temperature),
            (Signal::RotationalSpeed, &self.rotational_speed),
            (Signal::Torque, &self.torque),
        ]
        .into_iter()
    }
}

impl Default for SignalsConfig {
    fn default() -> Self {
        Self {
            air_temperature: SignalConfig {
                base: 298.0,
                offset: Band::new(0.0, 2.0),
                band: Band::new(295.0, 305.0),
                initial: 298.1,
            },
            process_temperature: SignalConfig {
                base: 308.0,
                offset: Band::new(0.0, 1.5),
                band: Band::new(305.0, 315.0),
                initial: 308.6,
            },
            rotational_speed: SignalConfig {
                base: 1400.0,
                offset: Band::new(0.0, 600.0),
                band: Band::new(1000.0, 3000.0),
                initial: 1551.0,
            },
            torque: SignalConfig {
                base: 35.0,
                offset: Band::new(0.0, 15.0),
                band: Band::new(3.0, 80.0),
                initial: 42.8,
            },
        }
    }
}

/// Tool wear accumulator [min].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolWearConfig {
    /// Upper bound of the uniform per-tick wear increment.
    pub wear_rate: f64,
    /// Extra wear added on ticks with an injected anomaly.
    pub anomaly_bonus: f64,
    pub band: Band,
    pub initial: f64,
}

impl Default for ToolWearConfig {
    fn default() -> Self {
        Self {
            wear_rate: 0.08,
            anomaly_bonus: 0.15,
            band: Band::new(0.0, 300.0),
            initial: 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Anomaly injection
// ---------------------------------------------------------------------------

/// One field forced into `[min, max]` while a regime is active.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldOverride {
    pub signal: Signal,
    pub min: f64,
    pub max: f64,
}

/// A regime and the upper edge of its slice of the unit interval.
///
/// Slices are consecutive: a regime owns `[previous split, split)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegimeConfig {
    pub regime: Regime,
    pub split: f64,
    pub overrides: Vec<FieldOverride>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    /// Chance per tick of injecting a regime.
    pub probability: f64,
    /// Partition of the unit interval, ordered by `split`.
    pub regimes: Vec<RegimeConfig>,
}

impl AnomalyConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        check_probability("anomaly.probability", self.probability)?;
        if self.regimes.is_empty() {
            return Err(ConfigError::RegimeTable("at least one regime is required".into()));
        }

        let mut previous = 0.0;
        for rc in &self.regimes {
            if !rc.split.is_finite() || rc.split <= previous || rc.split > 1.0 {
                return Err(ConfigError::RegimeTable(format!(
                    "split {} for {} must be in ({previous}, 1]",
                    rc.split,
                    rc.regime.label()
                )));
            }
            previous = rc.split;
            for ov in &rc.overrides {
                Band::new(ov.min, ov.max)
                    .validate(&format!("anomaly.{}.{}", rc.regime.label(), ov.signal.key()))?;
            }
        }
        if (previous - 1.0).abs() > f64::EPSILON {
            return Err(ConfigError::RegimeTable(format!(
                "last split must be 1.0, got {previous}"
            )));
        }
        Ok(())
    }
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        let ov = |signal, min, max| FieldOverride { signal, min, max };
        Self {
            probability: 0.12,
            regimes: vec![
                RegimeConfig {
                    regime: Regime::Decoupling,
                    split: 0.25,
                    overrides: vec![
                        ov(Signal::RotationalSpeed, 2800.0, 2950.0),
                        ov(Signal::Torque, 3.0, 6.0),
                    ],
                },
                RegimeConfig {
                    regime: Regime::Overload,
                    split: 0.45,
                    overrides: vec![
                        ov(Signal::Torque, 60.0, 75.0),
                        ov(Signal::RotationalSpeed, 1300.0, 1500.0),
                    ],
                },
                RegimeConfig {
                    regime: Regime::LowTorque,
                    split: 0.65,
                    overrides: vec![ov(Signal::Torque, 3.0, 8.0)],
                },
                RegimeConfig {
                    regime: Regime::ThermalSpike,
                    split: 0.85,
                    overrides: vec![
                        ov(Signal::ProcessTemperature, 311.0, 315.0),
                        ov(Signal::AirTemperature, 302.0, 305.0),
                    ],
                },
                RegimeConfig {
                    regime: Regime::Blockage,
                    split: 1.0,
                    overrides: vec![
                        ov(Signal::RotationalSpeed, 1050.0, 1200.0),
                        ov(Signal::Torque, 65.0, 78.0),
                    ],
                },
            ],
        }
    }
}

// ---------------------------------------------------------------------------
// Risk scoring
// ---------------------------------------------------------------------------

/// A two-tier threshold rule. Crossing `strict_threshold` contributes
/// `strict_weight` instead of `weight`; tiers do not add up.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TierRule {
    pub threshold: f64,
    pub weight: f64,
    pub strict_threshold: f64,
    pub strict_weight: f64,
}

impl TierRule {
    fn validate(&self, rule: &str, above: bool) -> Result<(), ConfigError> {
        check_finite(&format!("risk.{rule}.threshold"), self.threshold)?;
        check_finite(&format!("risk.{rule}.strict_threshold"), self.strict_threshold)?;
        let ordered = if above {
            self.strict_threshold >= self.threshold
        } else {
            self.strict_threshold <= self.threshold
        };
        if !ordered {
            return Err(ConfigError::TierOrder {
                rule: rule.to_string(),
                threshold: self.threshold,
                strict: self.strict_threshold,
            });
        }
        check_weight(rule, self.weight)?;
        check_weight(rule, self.strict_weight)
    }
}

fn check_weight(rule: &str, weight: f64) -> Result<(), ConfigError> {
    check_finite(&format!("risk.{rule} weight"), weight)?;
    if weight < 0.0 {
        return Err(ConfigError::NegativeWeight {
            rule: rule.to_string(),
            weight,
        });
    }
    Ok(())
}

/// Low torque while spinning fast: the tool has lost grip on the work.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DecouplingRule {
    pub torque_below: f64,
    pub speed_above: f64,
    pub weight: f64,
}

/// High torque at low speed: something is jamming the spindle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BlockageRule {
    pub speed_below: f64,
    pub torque_above: f64,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Probability above which the machine is `warning`.
    pub warning_threshold: f64,
    /// Probability above which the machine is `critical`.
    pub critical_threshold: f64,
    /// Half-width of the noise added when at least one rule fires.
    pub jitter: f64,
    /// Range the probability is drawn from when no rule fires.
    pub baseline_noise: Band,
    pub process_temperature_high: TierRule,
    pub air_temperature_high: TierRule,
    pub torque_high: TierRule,
    pub torque_low: TierRule,
    pub speed_high: TierRule,
    pub tool_wear_high: TierRule,
    pub decoupling: DecouplingRule,
    pub blockage: BlockageRule,
}

impl RiskConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let (w, c) = (self.warning_threshold, self.critical_threshold);
        if !(0.0..=1.0).contains(&w) || !(0.0..=1.0).contains(&c) || w >= c {
            return Err(ConfigError::StatusThresholds {
                warning: w,
                critical: c,
            });
        }
        check_finite("risk.jitter", self.jitter)?;
        if self.jitter < 0.0 {
            return Err(ConfigError::InvalidRange {
                name: "risk.jitter".into(),
                min: 0.0,
                max: self.jitter,
            });
        }
        self.baseline_noise.validate("risk.baseline_noise")?;
        check_probability("risk.baseline_noise.min", self.baseline_noise.min)?;
        check_probability("risk.baseline_noise.max", self.baseline_noise.max)?;

        self.process_temperature_high
            .validate("process_temperature_high", true)?;
        self.air_temperature_high.validate("air_temperature_high", true)?;
        self.torque_high.validate("torque_high", true)?;
        self.torque_low.validate("torque_low", false)?;
        self.speed_high.validate("speed_high", true)?;
        self.tool_wear_high.validate("tool_wear_high", true)?;
        check_finite("risk.decoupling.torque_below", self.decoupling.torque_below)?;
        check_finite("risk.decoupling.speed_above", self.decoupling.speed_above)?;
        check_weight("decoupling", self.decoupling.weight)?;
        check_finite("risk.blockage.speed_below", self.blockage.speed_below)?;
        check_finite("risk.blockage.torque_above", self.blockage.torque_above)?;
        check_weight("blockage", self.blockage.weight)
    }
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            warning_threshold: 0.30,
            critical_threshold: 0.65,
            jitter: 0.03,
            baseline_noise: Band::new(0.02, 0.12),
            process_temperature_high: TierRule {
                threshold: 309.5,
                weight: 0.20,
                strict_threshold: 311.0,
                strict_weight: 0.35,
            },
            air_temperature_high: TierRule {
                threshold: 303.0,
                weight: 0.10,
                strict_threshold: 304.5,
                strict_weight: 0.15,
            },
            torque_high: TierRule {
                threshold: 55.0,
                weight: 0.25,
                strict_threshold: 65.0,
                strict_weight: 0.40,
            },
            torque_low: TierRule {
                threshold: 15.0,
                weight: 0.20,
                strict_threshold: 8.0,
                strict_weight: 0.35,
            },
            speed_high: TierRule {
                threshold: 2200.0,
                weight: 0.20,
                strict_threshold: 2600.0,
                strict_weight: 0.30,
            },
            tool_wear_high: TierRule {
                threshold: 180.0,
                weight: 0.20,
                strict_threshold: 220.0,
                strict_weight: 0.35,
            },
            decoupling: DecouplingRule {
                torque_below: 15.0,
                speed_above: 2200.0,
                weight: 0.40,
            },
            blockage: BlockageRule {
                speed_below: 1300.0,
                torque_above: 55.0,
                weight: 0.35,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Alerting
// ---------------------------------------------------------------------------

/// Warning and critical levels for one alert condition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AlertLevels {
    pub warning: f64,
    pub critical: f64,
}

impl AlertLevels {
    fn validate(&self, alert: &str, above: bool) -> Result<(), ConfigError> {
        check_finite(&format!("alerts.{alert}.warning"), self.warning)?;
        check_finite(&format!("alerts.{alert}.critical"), self.critical)?;
        let ordered = if above {
            self.critical >= self.warning
        } else {
            self.critical <= self.warning
        };
        if !ordered {
            return Err(ConfigError::AlertOrder {
                alert: alert.to_string(),
                warning: self.warning,
                critical: self.critical,
            });
        }
        Ok(())
    }
}

/// Notification thresholds. Independent of [`RiskConfig`] so alert
/// sensitivity can be tuned without moving the risk score.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub process_temperature_high: AlertLevels,
    pub torque_high: AlertLevels,
    pub torque_low: AlertLevels,
    pub speed_high: AlertLevels,
    /// Only consulted together with `torque_high` for blockage alerts.
    pub speed_low: AlertLevels,
    pub tool_wear_high: AlertLevels,
}

impl AlertConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.process_temperature_high
            .validate("process_temperature_high", true)?;
        self.torque_high.validate("torque_high", true)?;
        self.torque_low.validate("torque_low", false)?;
        self.speed_high.validate("speed_high", true)?;
        self.speed_low.validate("speed_low", false)?;
        self.tool_wear_high.validate("tool_wear_high", true)
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            process_temperature_high: AlertLevels {
                warning: 309.0,
                critical: 309.5,
            },
            torque_high: AlertLevels {
                warning: 52.0,
                critical: 60.0,
            },
            torque_low: AlertLevels {
                warning: 15.0,
                critical: 8.0,
            },
            speed_high: AlertLevels {
                warning: 2200.0,
                critical: 2500.0,
            },
            speed_low: AlertLevels {
                warning: 1300.0,
                critical: 1200.0,
            },
            tool_wear_high: AlertLevels {
                warning: 200.0,
                critical: 240.0,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// API / logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Address for the read-only JSON API.
    pub bind: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum tracing level when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = MonitorConfig::default();
        cfg.validate().unwrap();

        assert_eq!(cfg.scheduler.tick_interval(), Duration::from_secs(4));
        assert_eq!(cfg.scheduler.history_len, 24);
        assert!(cfg.scheduler.seed.is_none());
        assert_eq!(cfg.risk.warning_threshold, 0.30);
        assert_eq!(cfg.risk.critical_threshold, 0.65);
        assert_eq!(cfg.anomaly.regimes.len(), 5);
        assert_eq!(cfg.machine.product_id, "M14860");
        assert_eq!(cfg.api.bind, "127.0.0.1:8080");
    }

    #[test]
    fn test_nominal_ranges_sit_inside_bands() {
        let cfg = MonitorConfig::default();
        for (signal, sc) in cfg.signals.iter() {
            assert!(sc.band.contains(sc.base + sc.offset.min), "{signal:?}");
            assert!(sc.band.contains(sc.base + sc.offset.max), "{signal:?}");
            assert!(sc.band.contains(sc.initial), "{signal:?}");
        }
    }

    #[test]
    fn test_parse_partial_toml() {
        let toml_str = r#"
[scheduler]
tick_interval_ms = 3500
seed = 42

[risk]
warning_threshold = 0.20
critical_threshold = 0.50

[signals.rotational_speed]
base = 1500.0
offset = { min = 0.0, max = 400.0 }
band = { min = 1200.0, max = 2800.0 }
initial = 1500.0
"#;
        let cfg = MonitorConfig::from_toml_str(toml_str).unwrap();
        cfg.validate().unwrap();

        assert_eq!(cfg.scheduler.tick_interval_ms, 3500);
        assert_eq!(cfg.scheduler.seed, Some(42));
        assert_eq!(cfg.scheduler.history_len, 24);
        assert_eq!(cfg.risk.warning_threshold, 0.20);
        assert_eq!(cfg.risk.critical_threshold, 0.50);
        // untouched rules keep their defaults
        assert_eq!(cfg.risk.torque_high.threshold, 55.0);
        assert_eq!(cfg.signals.rotational_speed.band.max, 2800.0);
        assert_eq!(cfg.signals.torque.base, 35.0);
    }

    #[test]
    fn test_parse_regime_table() {
        let toml_str = r#"
[anomaly]
probability = 0.08

[[anomaly.regimes]]
regime = "decoupling"
split = 0.5
overrides = [
    { signal = "rotational_speed", min = 2700.0, max = 2900.0 },
    { signal = "torque", min = 4.0, max = 6.0 },
]

[[anomaly.regimes]]
regime = "thermal_spike"
split = 1.0
overrides = [{ signal = "process_temperature", min = 312.0, max = 315.0 }]
"#;
        let cfg = MonitorConfig::from_toml_str(toml_str).unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.anomaly.probability, 0.08);
        assert_eq!(cfg.anomaly.regimes.len(), 2);
        assert_eq!(cfg.anomaly.regimes[1].regime, Regime::ThermalSpike);
        assert_eq!(cfg.anomaly.regimes[0].overrides[1].signal, Signal::Torque);
    }

    #[test]
    fn test_partial_sub_tables_keep_remaining_fields() {
        let toml_str = r#"
[risk.torque_high]
threshold = 50.0

[signals.torque]
base = 30.0

[alerts.speed_low]
critical = 1150.0
"#;
        let cfg = MonitorConfig::from_toml_str(toml_str).unwrap();
        cfg.validate().unwrap();

        assert_eq!(cfg.risk.torque_high.threshold, 50.0);
        assert_eq!(cfg.risk.torque_high.weight, 0.25);
        assert_eq!(cfg.risk.torque_high.strict_threshold, 65.0);
        assert_eq!(cfg.signals.torque.base, 30.0);
        assert_eq!(cfg.signals.torque.band, Band::new(3.0, 80.0));
        assert_eq!(cfg.signals.torque.initial, 42.8);
        assert_eq!(cfg.alerts.speed_low.critical, 1150.0);
        assert_eq!(cfg.alerts.speed_low.warning, 1300.0);
    }

    #[test]
    fn test_regime_list_replaces_defaults_whole() {
        let toml_str = r#"
[[anomaly.regimes]]
regime = "blockage"
split = 1.0
overrides = []
"#;
        let cfg = MonitorConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(cfg.anomaly.regimes.len(), 1);
        assert_eq!(cfg.anomaly.regimes[0].regime, Regime::Blockage);
        assert_eq!(cfg.anomaly.probability, 0.12);
    }

    #[test]
    fn test_parse_rejects_wrong_types() {
        assert!(MonitorConfig::from_toml_str("[risk.torque_high]\nweight = \"high\"\n").is_err());
        assert!(MonitorConfig::from_toml_str("risk = 3").is_err());
    }

    #[test]
    fn test_empty_toml_uses_all_defaults() {
        let cfg = MonitorConfig::from_toml_str("").unwrap();
        let defaults = MonitorConfig::default();
        assert_eq!(cfg.scheduler.tick_interval_ms, defaults.scheduler.tick_interval_ms);
        assert_eq!(cfg.risk.jitter, defaults.risk.jitter);
        assert_eq!(cfg.alerts.torque_low.critical, defaults.alerts.torque_low.critical);
    }

    #[test]
    fn test_rejects_inverted_status_thresholds() {
        let mut cfg = MonitorConfig::default();
        cfg.risk.warning_threshold = 0.7;
        cfg.risk.critical_threshold = 0.4;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::StatusThresholds { .. })
        ));
    }

    #[test]
    fn test_rejects_inverted_band() {
        let mut cfg = MonitorConfig::default();
        cfg.signals.torque.band = Band::new(80.0, 3.0);
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidRange { .. })));
    }

    #[test]
    fn test_rejects_unreachable_band() {
        let mut cfg = MonitorConfig::default();
        cfg.signals.air_temperature.base = 400.0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::UnreachableBand { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_regime_splits() {
        let mut cfg = MonitorConfig::default();
        cfg.anomaly.regimes[1].split = 0.1;
        assert!(matches!(cfg.validate(), Err(ConfigError::RegimeTable(_))));

        let mut cfg = MonitorConfig::default();
        cfg.anomaly.regimes.last_mut().unwrap().split = 0.9;
        assert!(matches!(cfg.validate(), Err(ConfigError::RegimeTable(_))));

        let mut cfg = MonitorConfig::default();
        cfg.anomaly.regimes.clear();
        assert!(matches!(cfg.validate(), Err(ConfigError::RegimeTable(_))));
    }

    #[test]
    fn test_rejects_misordered_tiers_and_alerts() {
        let mut cfg = MonitorConfig::default();
        cfg.risk.torque_low.strict_threshold = 20.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::TierOrder { .. })));

        let mut cfg = MonitorConfig::default();
        cfg.alerts.speed_high.critical = 2000.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::AlertOrder { .. })));
    }

    #[test]
    fn test_rejects_bad_probability_and_zero_interval() {
        let mut cfg = MonitorConfig::default();
        cfg.anomaly.probability = 1.5;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::NotAProbability { .. })
        ));

        let mut cfg = MonitorConfig::default();
        cfg.scheduler.tick_interval_ms = 0;
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::Zero("scheduler.tick_interval_ms"))
        );
    }

    #[test]
    fn test_rejects_infinite_ranges() {
        let mut cfg = MonitorConfig::default();
        cfg.signals.torque.offset = Band::new(0.0, f64::INFINITY);
        assert!(matches!(cfg.validate(), Err(ConfigError::NotFinite { .. })));

        let mut cfg = MonitorConfig::default();
        cfg.signals.rotational_speed.band = Band::new(f64::NEG_INFINITY, 3000.0);
        assert!(matches!(cfg.validate(), Err(ConfigError::NotFinite { .. })));

        let mut cfg = MonitorConfig::default();
        cfg.risk.jitter = f64::INFINITY;
        assert!(matches!(cfg.validate(), Err(ConfigError::NotFinite { .. })));

        let mut cfg = MonitorConfig::default();
        cfg.anomaly.regimes[0].overrides[0].max = f64::INFINITY;
        assert!(matches!(cfg.validate(), Err(ConfigError::NotFinite { .. })));

        let mut cfg = MonitorConfig::default();
        cfg.tool_wear.wear_rate = f64::INFINITY;
        assert!(matches!(cfg.validate(), Err(ConfigError::NotFinite { .. })));
    }

    #[test]
    fn test_rejects_band_too_wide_to_sample() {
        let mut cfg = MonitorConfig::default();
        cfg.signals.torque.offset = Band::new(-f64::MAX, f64::MAX);
        assert!(matches!(cfg.validate(), Err(ConfigError::NotFinite { .. })));
    }

    #[test]
    fn test_rejects_nan_values() {
        let mut cfg = MonitorConfig::default();
        cfg.signals.air_temperature.base = f64::NAN;
        assert!(matches!(cfg.validate(), Err(ConfigError::NotFinite { .. })));

        let mut cfg = MonitorConfig::default();
        cfg.anomaly.regimes[2].split = f64::NAN;
        assert!(matches!(cfg.validate(), Err(ConfigError::RegimeTable(_))));

        let mut cfg = MonitorConfig::default();
        cfg.alerts.torque_high.warning = f64::NAN;
        assert!(matches!(cfg.validate(), Err(ConfigError::NotFinite { .. })));

        let mut cfg = MonitorConfig::default();
        cfg.risk.blockage.torque_above = f64::NAN;
        assert!(matches!(cfg.validate(), Err(ConfigError::NotFinite { .. })));
    }

    #[test]
    fn test_toml_inf_is_rejected_at_validation() {
        let cfg = MonitorConfig::from_toml_str("[risk]\njitter = inf\n").unwrap();
        assert!(matches!(cfg.validate(), Err(ConfigError::NotFinite { .. })));

        let cfg = MonitorConfig::from_toml_str(
            "[signals.torque]\noffset = { min = 0.0, max = inf }\n",
        )
        .unwrap();
        assert!(matches!(cfg.validate(), Err(ConfigError::NotFinite { .. })));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("machinewatch.toml");
        std::fs::write(
            &path,
            r#"
[machine]
udi = "UDI-TEST"

[alerts.torque_high]
warning = 50.0
critical = 58.0
"#,
        )
        .unwrap();

        let cfg = MonitorConfig::load_validated(Some(&path)).unwrap();
        assert_eq!(cfg.machine.udi, "UDI-TEST");
        assert_eq!(cfg.alerts.torque_high.warning, 50.0);
    }

    #[test]
    fn test_load_validated_rejects_invalid_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[scheduler]\nhistory_len = 0\n").unwrap();
        assert!(MonitorConfig::load_validated(Some(&path)).is_err());
    }

    #[test]
    fn test_load_missing_file_errors() {
        let result = MonitorConfig::load(Path::new("/nonexistent/path/machinewatch.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_serialization_roundtrip() {
        let cfg = MonitorConfig::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let back: MonitorConfig = toml::from_str(&toml_str).unwrap();
        back.validate().unwrap();
        assert_eq!(cfg.anomaly.regimes.len(), back.anomaly.regimes.len());
        assert_eq!(cfg.risk.blockage.weight, back.risk.blockage.weight);
    }
}
