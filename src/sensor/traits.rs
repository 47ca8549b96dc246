//! Sensor and host identity abstractions

use anyhow::Result;
use async_trait::async_trait;
use sensehat_shared::BoardIdentity;

/// Environmental sensors of the board
#[async_trait]
pub trait EnvironmentSensors: Send {
    /// Prepare the devices for a new round of readings
    async fn refresh(&mut self) -> Result<()>;

    /// Relative humidity in percent
    async fn humidity(&mut self) -> Result<f64>;

    /// Temperature in degrees Celsius
    async fn temperature(&mut self) -> Result<f64>;

    /// Pressure in hectopascal
    async fn pressure(&mut self) -> Result<f64>;
}

/// Source of the processor, model and serial number of the host
#[async_trait]
pub trait HostIdentity: Send + Sync {
    async fn identity(&self) -> Result<BoardIdentity>;
}
