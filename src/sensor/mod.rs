//! Sensor model -- readings, channels, and the simulated sensor state.

pub mod anomaly;
pub mod state;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{Band, MachineConfig};

/// Machine health. `Critical` is what older dashboards called "failure".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MachineStatus {
    #[default]
    Healthy,
    Warning,
    Critical,
}

impl MachineStatus {
    /// Step function over a failure probability. Both comparisons are strict.
    pub fn from_probability(probability: f64, warning: f64, critical: f64) -> Self {
        if probability > critical {
            Self::Critical
        } else if probability > warning {
            Self::Warning
        } else {
            Self::Healthy
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for MachineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of the machine a reading belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineIdentity {
    pub udi: String,
    pub product_id: String,
    pub kind: String,
}

impl From<&MachineConfig> for MachineIdentity {
    fn from(cfg: &MachineConfig) -> Self {
        Self {
            udi: cfg.udi.clone(),
            product_id: cfg.product_id.clone(),
            kind: cfg.kind.clone(),
        }
    }
}

/// One synthesized sample of every channel. Always fully populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub machine: MachineIdentity,
    /// [K]
    pub air_temperature: f64,
    /// [K]
    pub process_temperature: f64,
    /// [rpm]
    pub rotational_speed: f64,
    /// [Nm]
    pub torque: f64,
    /// [min], non-decreasing tick over tick
    pub tool_wear: f64,
    pub status: MachineStatus,
}

impl SensorReading {
    /// Boolean failure flag kept for consumers of the old representation.
    #[deprecated(note = "use `status == MachineStatus::Critical`")]
    pub fn machine_failure(&self) -> bool {
        self.status == MachineStatus::Critical
    }
}

/// A clampable sensor channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    AirTemperature,
    ProcessTemperature,
    RotationalSpeed,
    Torque,
    ToolWear,
}

impl Signal {
    pub const ALL: [Signal; 5] = [
        Signal::AirTemperature,
        Signal::ProcessTemperature,
        Signal::RotationalSpeed,
        Signal::Torque,
        Signal::ToolWear,
    ];

    /// Config / serialization key.
    pub fn key(&self) -> &'static str {
        match self {
            Self::AirTemperature => "air_temperature",
            Self::ProcessTemperature => "process_temperature",
            Self::RotationalSpeed => "rotational_speed",
            Self::Torque => "torque",
            Self::ToolWear => "tool_wear",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::AirTemperature => "Air temperature",
            Self::ProcessTemperature => "Process temperature",
            Self::RotationalSpeed => "Rotational speed",
            Self::Torque => "Torque",
            Self::ToolWear => "Tool wear",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Self::AirTemperature | Self::ProcessTemperature => "K",
            Self::RotationalSpeed => "rpm",
            Self::Torque => "Nm",
            Self::ToolWear => "min",
        }
    }

    pub fn get(&self, reading: &SensorReading) -> f64 {
        match self {
            Self::AirTemperature => reading.air_temperature,
            Self::ProcessTemperature => reading.process_temperature,
            Self::RotationalSpeed => reading.rotational_speed,
            Self::Torque => reading.torque,
            Self::ToolWear => reading.tool_wear,
        }
    }

    pub fn set(&self, reading: &mut SensorReading, value: f64) {
        match self {
            Self::AirTemperature => reading.air_temperature = value,
            Self::ProcessTemperature => reading.process_temperature = value,
            Self::RotationalSpeed => reading.rotational_speed = value,
            Self::Torque => reading.torque = value,
            Self::ToolWear => reading.tool_wear = value,
        }
    }
}

/// Uniform draw over an inclusive band. A degenerate band, or one too wide to
/// sample, yields its lower edge.
pub(crate) fn uniform<R: Rng>(rng: &mut R, band: Band) -> f64 {
    if band.max > band.min && (band.max - band.min).is_finite() {
        rng.gen_range(band.min..=band.max)
    } else {
        band.min
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_status_step_function() {
        assert_eq!(MachineStatus::from_probability(0.10, 0.30, 0.65), MachineStatus::Healthy);
        assert_eq!(MachineStatus::from_probability(0.30, 0.30, 0.65), MachineStatus::Healthy);
        assert_eq!(MachineStatus::from_probability(0.31, 0.30, 0.65), MachineStatus::Warning);
        assert_eq!(MachineStatus::from_probability(0.65, 0.30, 0.65), MachineStatus::Warning);
        assert_eq!(MachineStatus::from_probability(0.66, 0.30, 0.65), MachineStatus::Critical);
    }

    #[test]
    #[allow(deprecated)]
    fn test_failure_flag_is_critical_status() {
        let mut reading = state::tests::sample_reading();
        assert!(!reading.machine_failure());
        reading.status = MachineStatus::Warning;
        assert!(!reading.machine_failure());
        reading.status = MachineStatus::Critical;
        assert!(reading.machine_failure());
    }

    #[test]
    fn test_signal_get_set() {
        let mut reading = state::tests::sample_reading();
        for (i, signal) in Signal::ALL.iter().enumerate() {
            signal.set(&mut reading, i as f64 + 0.5);
        }
        for (i, signal) in Signal::ALL.iter().enumerate() {
            assert_eq!(signal.get(&reading), i as f64 + 0.5);
        }
    }

    #[test]
    fn test_uniform_respects_band() {
        let mut rng = StdRng::seed_from_u64(7);
        let band = Band::new(2.0, 3.0);
        for _ in 0..1_000 {
            let v = uniform(&mut rng, band);
            assert!(band.contains(v));
        }
        assert_eq!(uniform(&mut rng, Band::new(5.0, 5.0)), 5.0);
    }

    #[test]
    fn test_uniform_does_not_panic_on_unsampleable_band() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(uniform(&mut rng, Band::new(0.0, f64::INFINITY)), 0.0);
        assert_eq!(uniform(&mut rng, Band::new(-f64::MAX, f64::MAX)), -f64::MAX);
        assert!(uniform(&mut rng, Band::new(f64::NAN, 1.0)).is_nan());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&MachineStatus::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
    }
}
