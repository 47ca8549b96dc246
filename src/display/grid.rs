//! 8x8 RGB pixel grid

use core::convert::Infallible;
use embedded_graphics::{pixelcolor::Rgb888, prelude::*, Pixel};
use sensehat_shared::matrix::SIDE;

/// Colors used on the matrix
pub mod colors {
    use embedded_graphics::pixelcolor::Rgb888;

    /// Progress pixel (chartreuse)
    pub const ACTIVE: Rgb888 = Rgb888::new(127, 255, 0);

    /// Login failed (amber)
    pub const AUTH_FAILURE: Rgb888 = Rgb888::new(255, 191, 0);

    /// Upload failed (crimson)
    pub const UPLOAD_FAILURE: Rgb888 = Rgb888::new(220, 20, 60);

    pub const OFF: Rgb888 = Rgb888::new(0, 0, 0);
}

/// Pixel contents of the LED matrix, addressed by (row, column)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayGrid {
    pixels: [[Rgb888; SIDE]; SIDE],
}

impl Default for DisplayGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayGrid {
    /// Create a blank grid
    pub fn new() -> Self {
        Self {
            pixels: [[colors::OFF; SIDE]; SIDE],
        }
    }

    /// Turn every pixel off
    pub fn blank(&mut self) {
        self.fill(colors::OFF);
    }

    /// Set every pixel to one color
    pub fn fill(&mut self, color: Rgb888) {
        self.pixels = [[color; SIDE]; SIDE];
    }

    /// Set one pixel; out-of-range positions are ignored
    pub fn set_pixel(&mut self, row: usize, col: usize, color: Rgb888) -> bool {
        match self.pixels.get_mut(row).and_then(|r| r.get_mut(col)) {
            Some(pixel) => {
                *pixel = color;
                true
            }
            None => false,
        }
    }

    #[cfg(test)]
    pub fn pixel(&self, row: usize, col: usize) -> Option<Rgb888> {
        self.pixels.get(row).and_then(|r| r.get(col)).copied()
    }

    pub fn rows(&self) -> &[[Rgb888; SIDE]; SIDE] {
        &self.pixels
    }

    #[cfg(test)]
    pub fn is_blank(&self) -> bool {
        self.pixels.iter().flatten().all(|p| *p == colors::OFF)
    }

    /// Whether every pixel has this color
    #[cfg(test)]
    pub fn is_filled_with(&self, color: Rgb888) -> bool {
        self.pixels.iter().flatten().all(|p| *p == color)
    }

    /// Positions of all pixels that are not off
    pub fn lit(&self) -> Vec<(usize, usize)> {
        let mut lit = Vec::new();
        for (row, cols) in self.pixels.iter().enumerate() {
            for (col, pixel) in cols.iter().enumerate() {
                if *pixel != colors::OFF {
                    lit.push((row, col));
                }
            }
        }
        lit
    }
}

impl OriginDimensions for DisplayGrid {
    fn size(&self) -> Size {
        Size::new(SIDE as u32, SIDE as u32)
    }
}

impl DrawTarget for DisplayGrid {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            // x is the column, y the row
            if let (Ok(col), Ok(row)) = (usize::try_from(point.x), usize::try_from(point.y)) {
                self.set_pixel(row, col, color);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};

    #[test]
    fn test_new_grid_is_blank() {
        let grid = DisplayGrid::new();
        assert!(grid.is_blank());
        assert!(grid.lit().is_empty());
    }

    #[test]
    fn test_set_pixel_bounds() {
        let mut grid = DisplayGrid::new();
        assert!(grid.set_pixel(7, 7, colors::ACTIVE));
        assert!(!grid.set_pixel(8, 0, colors::ACTIVE));
        assert_eq!(grid.lit(), vec![(7, 7)]);
    }

    #[test]
    fn test_fill_and_blank() {
        let mut grid = DisplayGrid::new();
        grid.fill(colors::UPLOAD_FAILURE);
        assert!(grid.is_filled_with(colors::UPLOAD_FAILURE));
        assert_eq!(grid.lit().len(), 64);

        grid.blank();
        assert!(grid.is_blank());
    }

    #[test]
    fn test_draw_target_maps_x_to_column() {
        let mut grid = DisplayGrid::new();
        Pixel(Point::new(3, 1), colors::ACTIVE).draw(&mut grid).unwrap();
        // Off-grid pixels are dropped
        Pixel(Point::new(-1, 9), colors::ACTIVE).draw(&mut grid).unwrap();

        assert_eq!(grid.lit(), vec![(1, 3)]);
    }

    #[test]
    fn test_draw_rectangle() {
        let mut grid = DisplayGrid::new();
        Rectangle::new(Point::new(0, 0), Size::new(2, 2))
            .into_styled(PrimitiveStyle::with_fill(colors::AUTH_FAILURE))
            .draw(&mut grid)
            .unwrap();

        assert_eq!(grid.lit(), vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
    }
}
