//! Alert synthesis from raw sensor thresholds.
//!
//! Alert conditions are checked against [`AlertConfig`], not against the risk
//! factors, so alert sensitivity can be tuned without moving the risk score.
//! The list produced for a tick replaces the previous one entirely.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::config::{AlertConfig, AlertLevels};
use crate::detect::risk::RiskResult;
use crate::detect::Severity;
use crate::sensor::{MachineStatus, SensorReading};

/// Condition that raised a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    TemperatureHigh,
    TorqueHigh,
    TorqueLow,
    SpeedHigh,
    Decoupling,
    Blockage,
    ToolWear,
    /// Nothing crossed an alert level but the risk score reached `warning`.
    ElevatedRisk,
}

/// A human-readable alert.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    /// UUIDv7: unique per emission and ordered by creation time.
    pub id: Uuid,
    #[serde(rename = "type")]
    pub severity: Severity,
    pub alert: AlertKind,
    pub title: String,
    pub message: String,
    /// Display form of `created_at`.
    pub timestamp: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensor: Option<String>,
}

pub struct NotificationSynthesizer {
    alerts: AlertConfig,
}

impl NotificationSynthesizer {
    pub fn new(alerts: AlertConfig) -> Self {
        Self { alerts }
    }

    pub fn notify(&self, reading: &SensorReading, risk: &RiskResult) -> Vec<Notification> {
        self.notify_at(reading, risk, Utc::now())
    }

    /// As [`notify`](Self::notify), stamping every notification with `now`.
    pub fn notify_at(
        &self,
        reading: &SensorReading,
        risk: &RiskResult,
        now: DateTime<Utc>,
    ) -> Vec<Notification> {
        let a = &self.alerts;
        let mut out = Vec::new();
        let stamp = now.format("%H:%M:%S").to_string();
        let push = |out: &mut Vec<Notification>,
                    severity: Severity,
                    alert: AlertKind,
                    title: &str,
                    message: String,
                    sensor: Option<&str>| {
            out.push(Notification {
                id: Uuid::now_v7(),
                severity,
                alert,
                title: title.to_string(),
                message,
                timestamp: stamp.clone(),
                created_at: now,
                sensor: sensor.map(str::to_string),
            });
        };

        let temp = reading.process_temperature;
        if let Some(sev) = above(&a.process_temperature_high, temp) {
            push(
                &mut out,
                sev,
                AlertKind::TemperatureHigh,
                "Process temperature high",
                format!(
                    "Process temperature at {temp:.1} K (alert level {:.1} K)",
                    level(&a.process_temperature_high, sev)
                ),
                Some("PT-100 thermal sensor"),
            );
        }

        let torque = reading.torque;
        let speed = reading.rotational_speed;
        if let Some(sev) = above(&a.torque_high, torque) {
            push(
                &mut out,
                sev,
                AlertKind::TorqueHigh,
                "Mechanical overload",
                format!(
                    "Torque at {torque:.1} Nm exceeds {:.1} Nm",
                    level(&a.torque_high, sev)
                ),
                Some("Torque transducer"),
            );
        }
        if let Some(sev) = below(&a.torque_low, torque) {
            push(
                &mut out,
                sev,
                AlertKind::TorqueLow,
                "Insufficient torque",
                format!(
                    "Torque dropped to {torque:.1} Nm (floor {:.1} Nm)",
                    level(&a.torque_low, sev)
                ),
                Some("Torque transducer"),
            );
        }
        if let Some(sev) = above(&a.speed_high, speed) {
            push(
                &mut out,
                sev,
                AlertKind::SpeedHigh,
                "Excessive rotational speed",
                format!(
                    "Spindle at {speed:.0} rpm (limit {:.0} rpm)",
                    level(&a.speed_high, sev)
                ),
                Some("Rotary encoder"),
            );
        }
        if let Some(sev) = both(below(&a.torque_low, torque), above(&a.speed_high, speed)) {
            push(
                &mut out,
                sev,
                AlertKind::Decoupling,
                "Tool decoupling detected",
                format!("{speed:.0} rpm with only {torque:.1} Nm of torque: the tool may have lost contact"),
                Some("Drive train"),
            );
        }
        if let Some(sev) = both(below(&a.speed_low, speed), above(&a.torque_high, torque)) {
            push(
                &mut out,
                sev,
                AlertKind::Blockage,
                "Possible spindle blockage",
                format!("{torque:.1} Nm of torque at only {speed:.0} rpm"),
                Some("Drive train"),
            );
        }

        let wear = reading.tool_wear;
        if let Some(sev) = above(&a.tool_wear_high, wear) {
            push(
                &mut out,
                sev,
                AlertKind::ToolWear,
                "Accelerated tool wear",
                format!(
                    "Tool wear at {wear:.0} min (limit {:.0} min)",
                    level(&a.tool_wear_high, sev)
                ),
                Some("Tool wear monitor"),
            );
        }

        if out.is_empty() && risk.status == MachineStatus::Warning {
            push(
                &mut out,
                Severity::Info,
                AlertKind::ElevatedRisk,
                "Elevated failure risk",
                format!(
                    "Estimated failure probability is {:.0}%",
                    risk.probability * 100.0
                ),
                None,
            );
        }

        out
    }
}

fn above(levels: &AlertLevels, value: f64) -> Option<Severity> {
    if value > levels.critical {
        Some(Severity::Critical)
    } else if value > levels.warning {
        Some(Severity::Warning)
    } else {
        None
    }
}

fn below(levels: &AlertLevels, value: f64) -> Option<Severity> {
    if value < levels.critical {
        Some(Severity::Critical)
    } else if value < levels.warning {
        Some(Severity::Warning)
    } else {
        None
    }
}

/// Compound condition: fires when both parts fire, at the milder severity.
fn both(a: Option<Severity>, b: Option<Severity>) -> Option<Severity> {
    Some(a?.min(b?))
}

/// The level that was crossed for `severity`.
fn level(levels: &AlertLevels, severity: Severity) -> f64 {
    match severity {
        Severity::Critical => levels.critical,
        _ => levels.warning,
    }
}
