//! Monochrome display buffer.
use std::fmt::{self, Write as FmtWrite};

use crate::constants::*;

/// Screen buffer that is drawn to, 64 pixels wide and 32 high.
///
/// Pixels are stored row-major, so the pixel at `(x, y)`
/// is at index `x + y * DISPLAY_WIDTH`.
#[derive(Debug, Clone)]
pub struct Framebuffer {
    pixels: Box<[bool; DISPLAY_BUFFER_SIZE]>,
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self {
            pixels: Box::new([false; DISPLAY_BUFFER_SIZE]),
        }
    }
}

impl Framebuffer {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn clear(&mut self) {
        self.pixels.fill(false);
    }

    /// Pixel state, or `None` when the coordinate is off screen.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<bool> {
        if x < DISPLAY_WIDTH && y < DISPLAY_HEIGHT {
            Some(self.pixels[x + y * DISPLAY_WIDTH])
        } else {
            None
        }
    }

    /// Set a single pixel. Coordinates off screen are ignored.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, on: bool) {
        if x < DISPLAY_WIDTH && y < DISPLAY_HEIGHT {
            self.pixels[x + y * DISPLAY_WIDTH] = on;
        }
    }

    /// XOR a sprite onto the buffer with its top left corner at `(x, y)`.
    ///
    /// Each byte of `sprite` is one row of 8 pixels, most significant bit
    /// on the left. Pixels that fall off an edge wrap around to the other side.
    ///
    /// Returns `true` when any pixel that was on got erased.
    pub fn draw_sprite(&mut self, x: usize, y: usize, sprite: &[u8]) -> bool {
        let mut is_erased = false;

        for (r, row) in sprite.iter().enumerate() {
            // Each row is 8 bits representing the 8 pixels of the sprite.
            for c in 0..8 {
                if (row >> (7 - c)) & 1 == 0 {
                    continue;
                }

                let d = ((x + c) & DISPLAY_WIDTH_MASK)
                    + ((y + r) & DISPLAY_HEIGHT_MASK) * DISPLAY_WIDTH;

                // XOR erases a pixel when both the old and new values are both 1.
                is_erased |= self.pixels[d];
                self.pixels[d] = !self.pixels[d];
            }
        }

        is_erased
    }

    /// Iterate the rows of the display, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[bool]> {
        self.pixels.chunks(DISPLAY_WIDTH)
    }

    /// Flat view of the buffer.
    #[inline]
    pub fn as_slice(&self) -> &[bool; DISPLAY_BUFFER_SIZE] {
        &self.pixels
    }

    /// Check whether every pixel is off.
    pub fn is_blank(&self) -> bool {
        self.pixels.iter().all(|px| !*px)
    }
}

/// Renders the buffer as text, `#` for pixels that are on and `.` for off.
impl fmt::Display for Framebuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.rows() {
            for px in row {
                f.write_char(if *px { '#' } else { '.' })?;
            }
            f.write_char('\n')?;
        }
        Ok(())
    }
}
