//! Best-effort sensor snapshot

use crate::sensor::traits::{EnvironmentSensors, HostIdentity};
use anyhow::Result;
use chrono::{DateTime, Local};
use sensehat_shared::{BoardIdentity, SensorSnapshot};
use tracing::warn;

/// Combines the environment sensors and the host identity into snapshots
///
/// The identity group and the sensor group fail independently, and inside
/// the sensor group every reading fails on its own.
pub struct SensorReader {
    sensors: Box<dyn EnvironmentSensors>,
    identity: Box<dyn HostIdentity>,
}

impl SensorReader {
    pub fn new(sensors: Box<dyn EnvironmentSensors>, identity: Box<dyn HostIdentity>) -> Self {
        Self { sensors, identity }
    }

    /// Read everything that can be read; never fails
    pub async fn snapshot(&mut self, captured_at: DateTime<Local>) -> SensorSnapshot {
        let mut snapshot = SensorSnapshot::empty(captured_at);

        snapshot.identity = match self.identity.identity().await {
            Ok(identity) => identity,
            Err(e) => {
                warn!("[SENSOR] Failed to read host identity: {:#}", e);
                BoardIdentity::default()
            }
        };

        if let Err(e) = self.sensors.refresh().await {
            warn!("[SENSOR] Failed to update sensors: {:#}", e);
            return snapshot;
        }

        snapshot.humidity = reading("humidity", self.sensors.humidity().await);
        snapshot.temperature = reading("temperature", self.sensors.temperature().await);
        snapshot.pressure = reading("pressure", self.sensors.pressure().await);

        snapshot
    }
}

fn reading(name: &str, result: Result<f64>) -> Option<f64> {
    match result {
        Ok(value) if value.is_finite() => Some(value),
        Ok(value) => {
            warn!("[SENSOR] Discarding {} reading {}", name, value);
            None
        }
        Err(e) => {
            warn!("[SENSOR] Failed to read {}: {:#}", name, e);
            None
        }
    }
}
