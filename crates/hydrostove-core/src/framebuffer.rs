//! Page-packed monochrome framebuffer with change detection.
//!
//! Drawing targets this RAM buffer instead of the panel. The layout matches
//! SSD1306-class controllers: the panel is split into 8-pixel-tall pages and
//! each byte holds one column of a page, least significant bit on top. After
//! drawing, only the bounding box of changed bytes is sent to the hardware.

use core::convert::Infallible;

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PointsIter, Rectangle};
use log::debug;

use crate::config::{DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX};

const WIDTH: usize = DISPLAY_WIDTH_PX as usize;
const HEIGHT: usize = DISPLAY_HEIGHT_PX as usize;

/// Number of 8-row pages on the panel.
pub const PAGE_COUNT: usize = HEIGHT / 8;

/// Size of the packed buffer in bytes (128 × 64 / 8 = 1024).
pub const BUFFER_SIZE: usize = WIDTH * PAGE_COUNT;

/// Region of pages and columns changed since the last flush (inclusive bounds).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyRegion {
    pub first_page: usize,
    pub last_page: usize,
    pub first_column: usize,
    pub last_column: usize,
}

impl DirtyRegion {
    /// Expand the dirty region to include the given byte position.
    fn expand(&mut self, column: usize, page: usize) {
        self.first_column = self.first_column.min(column);
        self.last_column = self.last_column.max(column);
        self.first_page = self.first_page.min(page);
        self.last_page = self.last_page.max(page);
    }

    /// Create a new dirty region covering a single byte.
    fn from_byte(column: usize, page: usize) -> Self {
        Self {
            first_page: page,
            last_page: page,
            first_column: column,
            last_column: column,
        }
    }

    pub fn columns(&self) -> usize {
        self.last_column - self.first_column + 1
    }
}

/// 128×64 monochrome framebuffer implementing `DrawTarget<Color = BinaryColor>`.
pub struct MonoFrameBuffer {
    bytes: [u8; BUFFER_SIZE],
    dirty: Option<DirtyRegion>,
}

impl Default for MonoFrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl MonoFrameBuffer {
    /// A blank (all pixels off) framebuffer.
    pub const fn new() -> Self {
        Self {
            bytes: [0; BUFFER_SIZE],
            dirty: None,
        }
    }

    /// Write a single pixel, expanding the dirty region only if it changed.
    #[inline]
    fn set_pixel(&mut self, x: usize, y: usize, on: bool) {
        let page = y / 8;
        let idx = page * WIDTH + x;
        let mask = 1u8 << (y % 8);
        let old = self.bytes[idx];
        let new = if on { old | mask } else { old & !mask };
        if new != old {
            self.bytes[idx] = new;
            match &mut self.dirty {
                Some(region) => region.expand(x, page),
                None => self.dirty = Some(DirtyRegion::from_byte(x, page)),
            }
        }
    }

    /// Whether the pixel at `(x, y)` is lit. Out-of-bounds pixels are off.
    pub fn pixel(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 || x as usize >= WIDTH || y as usize >= HEIGHT {
            return false;
        }
        let (x, y) = (x as usize, y as usize);
        self.bytes[(y / 8) * WIDTH + x] & (1 << (y % 8)) != 0
    }

    /// Count lit pixels inside a rectangle.
    pub fn lit_pixels_in(&self, area: &Rectangle) -> usize {
        area.points().filter(|p| self.pixel(p.x, p.y)).count()
    }

    /// Raw packed bytes of the whole panel.
    pub fn as_bytes(&self) -> &[u8; BUFFER_SIZE] {
        &self.bytes
    }

    /// Bytes of one page restricted to the columns of a dirty region.
    pub fn page_bytes(&self, page: usize, region: &DirtyRegion) -> &[u8] {
        let start = page * WIDTH + region.first_column;
        &self.bytes[start..start + region.columns()]
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.is_some()
    }

    /// Take the changed region, leaving the buffer clean.
    pub fn take_dirty(&mut self) -> Option<DirtyRegion> {
        let region = self.dirty.take()?;
        debug!(
            "Flushing pages {}..={} columns {}..={}",
            region.first_page, region.last_page, region.first_column, region.last_column
        );
        Some(region)
    }

    /// Mark the whole panel as changed, e.g. after the panel was reset.
    pub fn invalidate(&mut self) {
        self.dirty = Some(DirtyRegion {
            first_page: 0,
            last_page: PAGE_COUNT - 1,
            first_column: 0,
            last_column: WIDTH - 1,
        });
    }
}

impl OriginDimensions for MonoFrameBuffer {
    fn size(&self) -> Size {
        Size::new(DISPLAY_WIDTH_PX, DISPLAY_HEIGHT_PX)
    }
}

impl DrawTarget for MonoFrameBuffer {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(coord, color) in pixels {
            let x = coord.x;
            let y = coord.y;
            if x >= 0 && y >= 0 && (x as usize) < WIDTH && (y as usize) < HEIGHT {
                self.set_pixel(x as usize, y as usize, color.is_on());
            }
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let area = area.intersection(&self.bounding_box());
        let Some(bottom_right) = area.bottom_right() else {
            return Ok(());
        };

        for y in area.top_left.y..=bottom_right.y {
            for x in area.top_left.x..=bottom_right.x {
                self.set_pixel(x as usize, y as usize, color.is_on());
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        let fill = if color.is_on() { 0xFF } else { 0x00 };
        for page in 0..PAGE_COUNT {
            for column in 0..WIDTH {
                let idx = page * WIDTH + column;
                if self.bytes[idx] != fill {
                    self.bytes[idx] = fill;
                    match &mut self.dirty {
                        Some(region) => region.expand(column, page),
                        None => self.dirty = Some(DirtyRegion::from_byte(column, page)),
                    }
                }
            }
        }
        Ok(())
    }
}
