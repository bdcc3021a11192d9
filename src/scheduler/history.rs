//! Bounded trend history for charting consumers.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::detect::RiskResult;
use crate::sensor::SensorReading;

/// One chart point: the reading values and score of a single tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryPoint {
    pub sequence: u64,
    pub at: DateTime<Utc>,
    pub air_temperature: f64,
    pub process_temperature: f64,
    pub rotational_speed: f64,
    pub torque: f64,
    pub tool_wear: f64,
    pub probability: f64,
}

impl HistoryPoint {
    pub fn new(sequence: u64, at: DateTime<Utc>, reading: &SensorReading, risk: &RiskResult) -> Self {
        Self {
            sequence,
            at,
            air_temperature: reading.air_temperature,
            process_temperature: reading.process_temperature,
            rotational_speed: reading.rotational_speed,
            torque: reading.torque,
            tool_wear: reading.tool_wear,
            probability: risk.probability,
        }
    }
}

/// FIFO of the most recent points; the oldest is evicted once full.
#[derive(Debug, Clone)]
pub struct History {
    capacity: usize,
    points: VecDeque<HistoryPoint>,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            points: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, point: HistoryPoint) {
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    /// Oldest first.
    pub fn to_vec(&self) -> Vec<HistoryPoint> {
        self.points.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::state::tests::sample_reading;
    use crate::sensor::MachineStatus;

    fn point(seq: u64) -> HistoryPoint {
        let risk = RiskResult {
            probability: seq as f64 / 100.0,
            status: MachineStatus::Healthy,
            factors: Vec::new(),
        };
        HistoryPoint::new(seq, Utc::now(), &sample_reading(), &risk)
    }

    #[test]
    fn test_evicts_oldest() {
        let mut h = History::new(3);
        assert!(h.to_vec().is_empty());
        for seq in 0..5 {
            h.push(point(seq));
        }
        assert_eq!(h.to_vec().len(), 3);
        let seqs: Vec<u64> = h.to_vec().iter().map(|p| p.sequence).collect();
        assert_eq!(seqs, vec![2, 3, 4]);
    }

    #[test]
    fn test_zero_capacity_keeps_latest() {
        let mut h = History::new(0);
        h.push(point(1));
        h.push(point(2));
        let points = h.to_vec();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].sequence, 2);
    }
}
