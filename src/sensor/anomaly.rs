//! Anomaly injection.
//!
//! Each tick the generator rolls once against the configured probability and,
//! on a hit, picks exactly one regime by partitioning the unit interval. The
//! regimes are shaped so every risk rule and every alert can be observed within
//! a short run.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{AnomalyConfig, Band, FieldOverride, RegimeConfig};
use crate::sensor::{uniform, SensorReading};

/// A named anomalous combination of sensor values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    /// High speed with almost no torque.
    Decoupling,
    /// High torque at normal-to-low speed.
    Overload,
    /// Very low torque on its own.
    LowTorque,
    /// Process temperature pushed to the top of its band.
    ThermalSpike,
    /// Low speed with high torque.
    Blockage,
}

impl Regime {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Decoupling => "decoupling",
            Self::Overload => "overload",
            Self::LowTorque => "low-torque fault",
            Self::ThermalSpike => "thermal spike",
            Self::Blockage => "blockage",
        }
    }
}

impl std::fmt::Display for Regime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

pub struct AnomalyGenerator {
    probability: f64,
    regimes: Vec<RegimeConfig>,
}

impl AnomalyGenerator {
    pub fn new(config: &AnomalyConfig) -> Self {
        Self {
            probability: config.probability,
            regimes: config.regimes.clone(),
        }
    }

    /// Map a draw in `[0, 1)` to the regime owning that slice. Draws at or
    /// past the last split fall into the last regime. `None` only for an
    /// empty table.
    pub fn select(&self, draw: f64) -> Option<Regime> {
        self.regimes
            .iter()
            .find(|rc| draw < rc.split)
            .or_else(|| self.regimes.last())
            .map(|rc| rc.regime)
    }

    /// Decide whether this tick is anomalous, and if so which regime applies.
    pub fn roll<R: Rng>(&self, rng: &mut R) -> Option<Regime> {
        if self.probability <= 0.0 || rng.gen::<f64>() >= self.probability {
            return None;
        }
        self.select(rng.gen::<f64>())
    }

    /// Field overrides configured for `regime`.
    pub fn overrides(&self, regime: Regime) -> &[FieldOverride] {
        self.regimes
            .iter()
            .find(|rc| rc.regime == regime)
            .map(|rc| rc.overrides.as_slice())
            .unwrap_or(&[])
    }

    /// Overwrite the affected fields of `reading` with fresh draws from the
    /// regime's ranges. Values are not clamped here.
    pub fn apply<R: Rng>(&self, regime: Regime, reading: &mut SensorReading, rng: &mut R) {
        for ov in self.overrides(regime) {
            let value = uniform(rng, Band::new(ov.min, ov.max));
            ov.signal.set(reading, value);
        }
    }
}
