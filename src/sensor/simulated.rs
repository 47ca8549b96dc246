//! Simulated sensors for running without a Sense HAT

use crate::sensor::traits::{EnvironmentSensors, HostIdentity};
use anyhow::Result;
use async_trait::async_trait;
use sensehat_shared::BoardIdentity;

/// Slowly drifting readings, repeating every 60 refreshes
#[derive(Debug, Default)]
pub struct SimulatedSensors {
    step: u32,
}

impl SimulatedSensors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Triangle wave in [0, 1]
    fn phase(&self) -> f64 {
        let position = (self.step % 60) as f64 / 30.0;
        if position <= 1.0 {
            position
        } else {
            2.0 - position
        }
    }
}

#[async_trait]
impl EnvironmentSensors for SimulatedSensors {
    async fn refresh(&mut self) -> Result<()> {
        self.step = self.step.wrapping_add(1);
        Ok(())
    }

    async fn humidity(&mut self) -> Result<f64> {
        Ok(40.0 + 10.0 * self.phase())
    }

    async fn temperature(&mut self) -> Result<f64> {
        Ok(21.0 + 3.0 * self.phase())
    }

    async fn pressure(&mut self) -> Result<f64> {
        Ok(1010.0 + 6.0 * self.phase())
    }
}

/// Fixed identity of the simulated board
#[derive(Debug, Default)]
pub struct SimulatedIdentity;

#[async_trait]
impl HostIdentity for SimulatedIdentity {
    async fn identity(&self) -> Result<BoardIdentity> {
        Ok(BoardIdentity {
            processor_name: Some("Simulated".into()),
            model_name: Some("Sense HAT simulator".into()),
            serial_number: Some("0000000000000000".into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_readings_stay_in_range() {
        let mut sensors = SimulatedSensors::new();
        for _ in 0..120 {
            sensors.refresh().await.unwrap();
            let humidity = sensors.humidity().await.unwrap();
            assert!((40.0..=50.0).contains(&humidity));
            let pressure = sensors.pressure().await.unwrap();
            assert!((1010.0..=1016.0).contains(&pressure));
        }
    }
}
