//! Rule-based failure risk scoring.
//!
//! Rules are evaluated in a fixed order. Each rule that fires adds its weight
//! to the score and appends its factor; the sum is clamped to [0, 1]. When no
//! rule fires the score is replaced by a small baseline noise draw, so an idle
//! machine never reads as exactly zero risk.

use rand::Rng;
use serde::{Serialize, Serializer};

use crate::config::{Band, RiskConfig, TierRule};
use crate::sensor::{uniform, MachineStatus, SensorReading};

/// A rule that contributed to the risk probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Factor {
    ElevatedTemperature,
    AmbientHeating,
    MechanicalOverload,
    InsufficientTorque,
    ExcessiveSpeed,
    AdvancedToolWear,
    Decoupling,
    Blockage,
}

impl Factor {
    pub fn label(&self) -> &'static str {
        match self {
            Self::ElevatedTemperature => "elevated temperature",
            Self::AmbientHeating => "ambient heating",
            Self::MechanicalOverload => "mechanical overload",
            Self::InsufficientTorque => "insufficient torque",
            Self::ExcessiveSpeed => "excessive speed",
            Self::AdvancedToolWear => "advanced tool wear",
            Self::Decoupling => "decoupling detected",
            Self::Blockage => "possible jam/blockage",
        }
    }
}

impl std::fmt::Display for Factor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Factor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Output of one scoring pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskResult {
    /// Failure probability in [0, 1].
    pub probability: f64,
    pub status: MachineStatus,
    /// Distinct, in rule evaluation order. Empty when no rule fired.
    pub factors: Vec<Factor>,
}

impl RiskResult {
    pub fn has_factor(&self, factor: Factor) -> bool {
        self.factors.contains(&factor)
    }
}

pub struct RiskScorer {
    config: RiskConfig,
}

impl RiskScorer {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    /// Deterministic part of the score: summed rule weights (unclamped) and
    /// the factors that fired.
    pub fn evaluate(&self, reading: &SensorReading) -> (f64, Vec<Factor>) {
        let cfg = &self.config;
        let mut score = 0.0;
        let mut factors = Vec::new();

        let mut fire = |weight: Option<f64>, factor: Factor| {
            if let Some(w) = weight {
                score += w;
                factors.push(factor);
            }
        };

        fire(
            above(&cfg.process_temperature_high, reading.process_temperature),
            Factor::ElevatedTemperature,
        );
        fire(
            above(&cfg.air_temperature_high, reading.air_temperature),
            Factor::AmbientHeating,
        );
        fire(above(&cfg.torque_high, reading.torque), Factor::MechanicalOverload);
        fire(below(&cfg.torque_low, reading.torque), Factor::InsufficientTorque);
        fire(
            above(&cfg.speed_high, reading.rotational_speed),
            Factor::ExcessiveSpeed,
        );
        fire(
            above(&cfg.tool_wear_high, reading.tool_wear),
            Factor::AdvancedToolWear,
        );

        let decoupled = reading.torque < cfg.decoupling.torque_below
            && reading.rotational_speed > cfg.decoupling.speed_above;
        fire(decoupled.then_some(cfg.decoupling.weight), Factor::Decoupling);

        let blocked = reading.rotational_speed < cfg.blockage.speed_below
            && reading.torque > cfg.blockage.torque_above;
        fire(blocked.then_some(cfg.blockage.weight), Factor::Blockage);

        (score, factors)
    }

    /// Score a reading. `rng` supplies the jitter and the baseline noise; a
    /// seeded generator makes the result reproducible.
    pub fn score<R: Rng>(&self, reading: &SensorReading, rng: &mut R) -> RiskResult {
        let (raw, factors) = self.evaluate(reading);

        let probability = if factors.is_empty() {
            uniform(rng, self.config.baseline_noise)
        } else if self.config.jitter > 0.0 {
            raw + uniform(rng, Band::new(-self.config.jitter, self.config.jitter))
        } else {
            raw
        };
        let probability = probability.clamp(0.0, 1.0);

        RiskResult {
            probability,
            status: self.classify(probability),
            factors,
        }
    }

    pub fn classify(&self, probability: f64) -> MachineStatus {
        MachineStatus::from_probability(
            probability,
            self.config.warning_threshold,
            self.config.critical_threshold,
        )
    }
}

fn above(rule: &TierRule, value: f64) -> Option<f64> {
    if value > rule.strict_threshold {
        Some(rule.strict_weight)
    } else if value > rule.threshold {
        Some(rule.weight)
    } else {
        None
    }
}

fn below(rule: &TierRule, value: f64) -> Option<f64> {
    if value < rule.strict_threshold {
        Some(rule.strict_weight)
    } else if value < rule.threshold {
        Some(rule.weight)
    } else {
        None
    }
}
