//! LED matrix devices

use crate::display::grid::DisplayGrid;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use embedded_graphics::pixelcolor::{IntoStorage, Rgb565};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Name the Sense HAT framebuffer driver registers under
pub const SENSE_HAT_FB_NAME: &str = "RPi-Sense FB";

/// A physical (or simulated) 8x8 LED matrix
#[async_trait]
pub trait LedMatrix: Send {
    /// Push the grid contents to the device
    async fn update(&mut self, grid: &DisplayGrid) -> Result<()>;

    /// Human-readable name for this device
    fn name(&self) -> String;
}

/// Encode a grid as the Sense HAT framebuffer expects it:
/// 64 little-endian RGB565 words, row by row
pub fn encode_rgb565(grid: &DisplayGrid) -> Vec<u8> {
    grid.rows()
        .iter()
        .flatten()
        .flat_map(|color| Rgb565::from(*color).into_storage().to_le_bytes())
        .collect()
}

/// Sense HAT matrix behind a Linux framebuffer device
pub struct FramebufferMatrix {
    device: PathBuf,
}

impl FramebufferMatrix {
    pub fn new(device: PathBuf) -> Self {
        Self { device }
    }

    /// Find the Sense HAT framebuffer under the graphics class directory
    pub async fn discover(graphics_root: &Path) -> Result<Self> {
        let mut entries = tokio::fs::read_dir(graphics_root)
            .await
            .with_context(|| format!("Failed to list {}", graphics_root.display()))?;

        while let Some(entry) = entries.next_entry().await? {
            let name = match tokio::fs::read_to_string(entry.path().join("name")).await {
                Ok(name) => name,
                Err(_) => continue,
            };

            if name.trim() == SENSE_HAT_FB_NAME {
                let device = Path::new("/dev").join(entry.file_name());
                info!("[DISPLAY] Sense HAT matrix at {}", device.display());
                return Ok(Self::new(device));
            }
        }

        Err(anyhow!(
            "No {} framebuffer under {}",
            SENSE_HAT_FB_NAME,
            graphics_root.display()
        ))
    }

    #[cfg(test)]
    pub fn device(&self) -> &Path {
        &self.device
    }
}

#[async_trait]
impl LedMatrix for FramebufferMatrix {
    async fn update(&mut self, grid: &DisplayGrid) -> Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .open(&self.device)
            .await
            .with_context(|| format!("Failed to open {}", self.device.display()))?;

        file.write_all(&encode_rgb565(grid)).await?;
        file.flush().await?;
        Ok(())
    }

    fn name(&self) -> String {
        self.device.display().to_string()
    }
}

/// Matrix that only logs what it would show
#[derive(Debug, Default)]
pub struct LoggingMatrix {
    updates: u64,
}

impl LoggingMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn updates(&self) -> u64 {
        self.updates
    }
}

#[async_trait]
impl LedMatrix for LoggingMatrix {
    async fn update(&mut self, grid: &DisplayGrid) -> Result<()> {
        self.updates += 1;
        debug!("[DISPLAY] update #{}: lit {:?}", self.updates, grid.lit());
        Ok(())
    }

    fn name(&self) -> String {
        "simulated matrix".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::grid::colors;
    use embedded_graphics::pixelcolor::Rgb888;

    #[test]
    fn test_encode_rgb565() {
        let mut grid = DisplayGrid::new();
        grid.set_pixel(0, 0, Rgb888::new(255, 255, 255));
        grid.set_pixel(0, 1, Rgb888::new(255, 0, 0));
        grid.set_pixel(7, 7, Rgb888::new(0, 0, 255));

        let bytes = encode_rgb565(&grid);
        assert_eq!(bytes.len(), 128);
        assert_eq!(&bytes[0..2], &[0xFF, 0xFF]);
        assert_eq!(&bytes[2..4], &[0x00, 0xF8]);
        assert_eq!(&bytes[4..6], &[0x00, 0x00]);
        assert_eq!(&bytes[126..128], &[0x1F, 0x00]);
    }

    #[tokio::test]
    async fn test_framebuffer_discovery_and_write() {
        let dir = std::env::temp_dir().join(format!("sensehat-fb-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(dir.join("fb0")).unwrap();
        std::fs::create_dir_all(dir.join("fb1")).unwrap();
        std::fs::write(dir.join("fb0/name"), "vc4drmfb\n").unwrap();
        std::fs::write(dir.join("fb1/name"), "RPi-Sense FB\n").unwrap();

        let matrix = FramebufferMatrix::discover(&dir).await.expect("discover");
        assert_eq!(matrix.device(), Path::new("/dev/fb1"));

        // Write to a plain file standing in for the device
        let target = dir.join("fb-device");
        std::fs::write(&target, []).unwrap();
        let mut matrix = FramebufferMatrix::new(target.clone());
        let mut grid = DisplayGrid::new();
        grid.fill(colors::UPLOAD_FAILURE);
        matrix.update(&grid).await.expect("update");
        assert_eq!(std::fs::read(&target).unwrap(), encode_rgb565(&grid));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_discovery_fails_without_sense_hat() {
        let dir = std::env::temp_dir().join(format!("sensehat-nofb-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(dir.join("fb0")).unwrap();
        std::fs::write(dir.join("fb0/name"), "vc4drmfb\n").unwrap();

        assert!(FramebufferMatrix::discover(&dir).await.is_err());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_logging_matrix_counts_updates() {
        let mut matrix = LoggingMatrix::new();
        matrix.update(&DisplayGrid::new()).await.unwrap();
        matrix.update(&DisplayGrid::new()).await.unwrap();
        assert_eq!(matrix.updates(), 2);
    }
}
