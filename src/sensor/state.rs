//! Sensor state store: the single owner and writer of the current reading.

use rand::Rng;
use tracing::info;

use crate::config::{Band, MonitorConfig, SignalsConfig, ToolWearConfig};
use crate::sensor::anomaly::{AnomalyGenerator, Regime};
use crate::sensor::{uniform, MachineIdentity, MachineStatus, SensorReading, Signal};

pub struct SensorState {
    signals: SignalsConfig,
    tool_wear: ToolWearConfig,
    anomalies: AnomalyGenerator,
    current: SensorReading,
    last_regime: Option<Regime>,
}

impl SensorState {
    pub fn new(config: &MonitorConfig) -> Self {
        let signals = config.signals.clone();
        let current = SensorReading {
            machine: MachineIdentity::from(&config.machine),
            air_temperature: signals.air_temperature.band.clamp(signals.air_temperature.initial),
            process_temperature: signals
                .process_temperature
                .band
                .clamp(signals.process_temperature.initial),
            rotational_speed: signals.rotational_speed.band.clamp(signals.rotational_speed.initial),
            torque: signals.torque.band.clamp(signals.torque.initial),
            tool_wear: config.tool_wear.band.clamp(config.tool_wear.initial),
            status: MachineStatus::Healthy,
        };

        Self {
            signals,
            tool_wear: config.tool_wear.clone(),
            anomalies: AnomalyGenerator::new(&config.anomaly),
            current,
            last_regime: None,
        }
    }

    pub fn current(&self) -> &SensorReading {
        &self.current
    }

    /// Regime injected on the most recent `advance`, if any.
    pub fn last_regime(&self) -> Option<Regime> {
        self.last_regime
    }

    /// Produce the next reading.
    ///
    /// Order: nominal draw, anomaly override, tool wear accumulation, clamp.
    /// The status is carried over unchanged; it is written back by
    /// [`SensorState::apply_status`] once the reading has been scored.
    pub fn advance<R: Rng>(&mut self, rng: &mut R) -> SensorReading {
        let mut next = self.current.clone();

        for (signal, cfg) in self.signals.iter() {
            signal.set(&mut next, cfg.base + uniform(rng, cfg.offset));
        }

        let regime = self.anomalies.roll(rng);
        if let Some(regime) = regime {
            self.anomalies.apply(regime, &mut next, rng);
            info!(%regime, "anomaly injected");
        }

        let mut wear = uniform(rng, Band::new(0.0, self.tool_wear.wear_rate));
        if regime.is_some() {
            wear += self.tool_wear.anomaly_bonus;
        }
        next.tool_wear = self.current.tool_wear + wear;

        self.clamp(&mut next);
        self.current = next.clone();
        self.last_regime = regime;
        next
    }

    /// Record the scored status on the current reading.
    pub fn apply_status(&mut self, status: MachineStatus) -> &SensorReading {
        self.current.status = status;
        &self.current
    }

    fn clamp(&self, reading: &mut SensorReading) {
        for signal in Signal::ALL {
            let band = self.band(signal);
            signal.set(reading, band.clamp(signal.get(reading)));
        }
    }

    /// Clamp band for `signal`.
    pub fn band(&self, signal: Signal) -> Band {
        match signal {
            Signal::AirTemperature => self.signals.air_temperature.band,
            Signal::ProcessTemperature => self.signals.process_temperature.band,
            Signal::RotationalSpeed => self.signals.rotational_speed.band,
            Signal::Torque => self.signals.torque.band,
            Signal::ToolWear => self.tool_wear.band,
        }
    }
}
