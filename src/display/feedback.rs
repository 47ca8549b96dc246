//! Per-cycle visual feedback
//!
//! Two layers share one grid: a single progress pixel painted before any
//! network activity, and an optional full-grid status color once the cycle
//! outcome is known. The grid is blanked at the end of every cycle.

use crate::display::device::LedMatrix;
use crate::display::grid::{colors, DisplayGrid};
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::Pixel;
use sensehat_shared::matrix::{PIXEL_COUNT, SIDE};
use tracing::warn;

/// Position of the progress pixel, advancing once per cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleCounter {
    index: usize,
}

impl CycleCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter starting at `index` (wrapped into range)
    #[cfg(test)]
    pub fn starting_at(index: usize) -> Self {
        Self {
            index: index % PIXEL_COUNT,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// (row, column) of the progress pixel
    pub fn position(&self) -> (usize, usize) {
        (self.index / SIDE, self.index % SIDE)
    }

    /// Move to the next position, wrapping after the last one
    pub fn advance(&mut self) {
        self.index = (self.index + 1) % PIXEL_COUNT;
    }
}

/// Full-grid status colors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusColor {
    /// Login failed
    AuthenticationFailed,
    /// Record was not created
    UploadFailed,
}

impl StatusColor {
    pub fn color(self) -> Rgb888 {
        match self {
            StatusColor::AuthenticationFailed => colors::AUTH_FAILURE,
            StatusColor::UploadFailed => colors::UPLOAD_FAILURE,
        }
    }
}

/// Owns the grid and pushes it to the matrix
pub struct DisplayFeedback {
    grid: DisplayGrid,
    matrix: Box<dyn LedMatrix>,
}

impl DisplayFeedback {
    pub fn new(matrix: Box<dyn LedMatrix>) -> Self {
        Self {
            grid: DisplayGrid::new(),
            matrix,
        }
    }

    #[cfg(test)]
    pub fn grid(&self) -> &DisplayGrid {
        &self.grid
    }

    /// Paint the progress pixel for this cycle on a blank grid
    pub async fn begin_cycle(&mut self, counter: &CycleCounter) {
        let (row, col) = counter.position();
        self.grid.blank();
        let _ = Pixel(Point::new(col as i32, row as i32), colors::ACTIVE).draw(&mut self.grid);
        self.push().await;
    }

    /// Fill the whole grid with a status color
    pub async fn show_status(&mut self, status: StatusColor) {
        self.grid.fill(status.color());
        self.push().await;
    }

    /// Blank the grid at cycle end
    pub async fn finish_cycle(&mut self) {
        self.grid.blank();
        self.push().await;
    }

    async fn push(&mut self) {
        if let Err(e) = self.matrix.update(&self.grid).await {
            warn!("[DISPLAY] Failed to update {}: {:#}", self.matrix.name(), e);
        }
    }
}
