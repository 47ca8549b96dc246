//! Display Module
//!
//! Drives the 8x8 LED matrix: the per-cycle progress pixel, the status
//! overlay, and the device adapters behind them.

mod device;
mod feedback;
mod grid;

pub use device::{FramebufferMatrix, LedMatrix, LoggingMatrix};
pub use feedback::{CycleCounter, DisplayFeedback, StatusColor};

#[cfg(test)]
pub use grid::{colors, DisplayGrid};
