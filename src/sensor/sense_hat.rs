//! Sense HAT sensors through the Linux IIO subsystem
//!
//! The kernel drivers expose the HTS221 (humidity, temperature) and the
//! LPS25H (pressure) under `/sys/bus/iio/devices/iio:deviceN`. A channel
//! value is `(raw + offset) * scale`, in milli-percent for humidity,
//! milli-degrees for temperature and kilopascal for pressure.

use crate::sensor::traits::EnvironmentSensors;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// IIO name of the humidity/temperature sensor
pub const HUMIDITY_DEVICE: &str = "hts221";

/// IIO name of the pressure sensor
pub const PRESSURE_DEVICE: &str = "lps25h";

/// Sense HAT sensors read from sysfs
pub struct IioSensors {
    root: PathBuf,
    humidity_dev: Option<PathBuf>,
    pressure_dev: Option<PathBuf>,
}

impl IioSensors {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            humidity_dev: None,
            pressure_dev: None,
        }
    }

    /// Find the IIO device directory whose `name` starts with `name`
    async fn find_device(&self, name: &str) -> Result<Option<PathBuf>> {
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .with_context(|| format!("Failed to list {}", self.root.display()))?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if let Ok(device_name) = tokio::fs::read_to_string(path.join("name")).await {
                if device_name.trim().starts_with(name) {
                    return Ok(Some(path));
                }
            }
        }

        Ok(None)
    }

    fn device<'a>(dev: &'a Option<PathBuf>, name: &str) -> Result<&'a Path> {
        dev.as_deref()
            .ok_or_else(|| anyhow!("{} not found on the IIO bus", name))
    }
}

async fn read_number(path: &Path) -> Result<f64> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    text.trim()
        .parse::<f64>()
        .with_context(|| format!("Unparsable value {:?} in {}", text.trim(), path.display()))
}

async fn read_optional(path: &Path, default: f64) -> Result<f64> {
    if tokio::fs::try_exists(path).await.unwrap_or(false) {
        read_number(path).await
    } else {
        Ok(default)
    }
}

/// Read one processed channel value: `(raw + offset) * scale`
async fn read_channel(dev: &Path, channel: &str) -> Result<f64> {
    let raw = read_number(&dev.join(format!("in_{}_raw", channel))).await?;
    let offset = read_optional(&dev.join(format!("in_{}_offset", channel)), 0.0).await?;
    let scale = read_optional(&dev.join(format!("in_{}_scale", channel)), 1.0).await?;
    Ok((raw + offset) * scale)
}

#[async_trait]
impl EnvironmentSensors for IioSensors {
    async fn refresh(&mut self) -> Result<()> {
        if self.humidity_dev.is_none() {
            self.humidity_dev = self.find_device(HUMIDITY_DEVICE).await?;
            if let Some(dev) = &self.humidity_dev {
                info!("[SENSOR] {} at {}", HUMIDITY_DEVICE, dev.display());
            }
        }
        if self.pressure_dev.is_none() {
            self.pressure_dev = self.find_device(PRESSURE_DEVICE).await?;
            if let Some(dev) = &self.pressure_dev {
                info!("[SENSOR] {} at {}", PRESSURE_DEVICE, dev.display());
            }
        }

        if self.humidity_dev.is_none() && self.pressure_dev.is_none() {
            return Err(anyhow!(
                "No Sense HAT sensors under {}",
                self.root.display()
            ));
        }
        Ok(())
    }

    async fn humidity(&mut self) -> Result<f64> {
        let dev = Self::device(&self.humidity_dev, HUMIDITY_DEVICE)?;
        let milli_percent = read_channel(dev, "humidityrelative").await?;
        debug!("[SENSOR] humidity {} m%", milli_percent);
        Ok(milli_percent / 1000.0)
    }

    async fn temperature(&mut self) -> Result<f64> {
        let dev = Self::device(&self.humidity_dev, HUMIDITY_DEVICE)?;
        let milli_degrees = read_channel(dev, "temp").await?;
        Ok(milli_degrees / 1000.0)
    }

    async fn pressure(&mut self) -> Result<f64> {
        let dev = Self::device(&self.pressure_dev, PRESSURE_DEVICE)?;
        let kilopascal = read_channel(dev, "pressure").await?;
        Ok(kilopascal * 10.0)
    }
}
