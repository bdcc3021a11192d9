//! The monitoring pipeline and its periodic driver.
//!
//! [`Monitor::tick`] runs one strict pass: advance the sensor state, score the
//! new reading, write the status back, synthesize notifications, record
//! history. Each stage consumes the previous stage's output; nothing re-reads
//! shared state mid-pass. [`TickScheduler`] runs that pass on a timer and
//! publishes each result as an immutable [`Snapshot`].

pub mod engine;
pub mod history;

pub use self::engine::{SnapshotView, TickScheduler};
pub use self::history::{History, HistoryPoint};

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::MonitorConfig;
use crate::detect::{Notification, NotificationSynthesizer, RiskResult, RiskScorer};
use crate::sensor::anomaly::Regime;
use crate::sensor::state::SensorState;
use crate::sensor::{MachineStatus, SensorReading};

/// Everything a consumer needs for one tick. Never mutated after publication.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    /// 0 for the initial state, then one per tick.
    pub sequence: u64,
    pub generated_at: DateTime<Utc>,
    /// Regime injected on this tick, if any.
    pub regime: Option<Regime>,
    pub reading: SensorReading,
    pub risk: RiskResult,
    pub notifications: Vec<Notification>,
    /// Oldest first, this tick included.
    pub history: Vec<HistoryPoint>,
}

/// Owns the simulation state and runs the pipeline.
pub struct Monitor {
    state: SensorState,
    scorer: RiskScorer,
    notifier: NotificationSynthesizer,
    history: History,
    rng: StdRng,
    sequence: u64,
}

impl Monitor {
    pub fn new(config: &MonitorConfig, rng: StdRng) -> Self {
        Self {
            state: SensorState::new(config),
            scorer: RiskScorer::new(config.risk.clone()),
            notifier: NotificationSynthesizer::new(config.alerts.clone()),
            history: History::new(config.scheduler.history_len),
            rng,
            sequence: 0,
        }
    }

    /// Seeded from `scheduler.seed` when set, from OS entropy otherwise.
    pub fn from_config(config: &MonitorConfig) -> Self {
        let rng = match config.scheduler.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::new(config, rng)
    }

    /// Sequence number of the last produced snapshot.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Score the starting reading without advancing, so consumers have a
    /// complete snapshot before the first tick fires.
    pub fn initial_snapshot(&mut self) -> Snapshot {
        let reading = self.state.current().clone();
        self.publish(None, reading)
    }

    /// One full pass of the pipeline.
    pub fn tick(&mut self) -> Snapshot {
        self.sequence += 1;
        let previous = self.state.current().status;
        let reading = self.state.advance(&mut self.rng);
        let regime = self.state.last_regime();

        let snapshot = self.publish(regime, reading);

        let status = snapshot.risk.status;
        if status != previous {
            if status == MachineStatus::Critical {
                warn!(
                    sequence = snapshot.sequence,
                    from = %previous,
                    to = %status,
                    probability = snapshot.risk.probability,
                    factors = ?snapshot.risk.factors,
                    "machine status changed"
                );
            } else {
                info!(
                    sequence = snapshot.sequence,
                    from = %previous,
                    to = %status,
                    probability = snapshot.risk.probability,
                    "machine status changed"
                );
            }
        }
        snapshot
    }

    fn publish(&mut self, regime: Option<Regime>, reading: SensorReading) -> Snapshot {
        let risk = self.scorer.score(&reading, &mut self.rng);
        let reading = self.state.apply_status(risk.status).clone();
        let notifications = self.notifier.notify(&reading, &risk);

        let now = Utc::now();
        self.history
            .push(HistoryPoint::new(self.sequence, now, &reading, &risk));

        debug!(
            sequence = self.sequence,
            regime = ?regime,
            probability = risk.probability,
            status = %risk.status,
            notifications = notifications.len(),
            "tick"
        );

        Snapshot {
            sequence: self.sequence,
            generated_at: now,
            regime,
            reading,
            risk,
            notifications,
            history: self.history.to_vec(),
        }
    }
}
