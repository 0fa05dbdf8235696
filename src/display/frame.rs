use std::convert::Infallible;

use embedded_graphics::{
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{PointsIter, Rectangle},
};

pub const WIDTH: u32 = 128;
pub const HEIGHT: u32 = 64;
pub const PAGES: usize = (HEIGHT / 8) as usize;
pub const BUFFER_LEN: usize = WIDTH as usize * PAGES;

/// 128x64 1-bit framebuffer stored in SSD1306 page order: one byte per
/// column per 8-row page, least significant bit on top.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    buffer: [u8; BUFFER_LEN],
}

impl Frame {
    /// All pixels off.
    pub fn new() -> Self {
        Self {
            buffer: [0; BUFFER_LEN],
        }
    }

    pub fn set(&mut self, x: u32, y: u32, on: bool) {
        if x >= WIDTH || y >= HEIGHT {
            return;
        }
        let idx = (y as usize / 8) * WIDTH as usize + x as usize;
        let mask = 1u8 << (y % 8);
        if on {
            self.buffer[idx] |= mask;
        } else {
            self.buffer[idx] &= !mask;
        }
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        if x >= WIDTH || y >= HEIGHT {
            return false;
        }
        let idx = (y as usize / 8) * WIDTH as usize + x as usize;
        self.buffer[idx] & (1u8 << (y % 8)) != 0
    }

    /// Raw bytes for one 8-row page.
    pub fn page(&self, page: usize) -> &[u8] {
        let start = page * WIDTH as usize;
        &self.buffer[start..start + WIDTH as usize]
    }

    /// Number of lit pixels inside `area` (clipped to the frame).
    pub fn lit_in(&self, area: &Rectangle) -> usize {
        area.intersection(&self.bounding_box())
            .points()
            .filter(|p| self.get(p.x as u32, p.y as u32))
            .count()
    }

    /// Number of lit pixels outside `area`.
    pub fn lit_outside(&self, area: &Rectangle) -> usize {
        self.bounding_box()
            .points()
            .filter(|p| !area.contains(*p) && self.get(p.x as u32, p.y as u32))
            .count()
    }

    /// Encode as a binary PBM (`P4`) image: rows MSB-first, 1 = black ink.
    pub fn to_pbm(&self) -> Vec<u8> {
        let mut out = format!("P4\n{WIDTH} {HEIGHT}\n").into_bytes();
        let row_bytes = (WIDTH as usize).div_ceil(8);
        for y in 0..HEIGHT {
            for chunk in 0..row_bytes {
                let mut byte = 0u8;
                for bit in 0..8 {
                    let x = (chunk * 8 + bit) as u32;
                    if self.get(x, y) {
                        byte |= 0x80 >> bit;
                    }
                }
                out.push(byte);
            }
        }
        out
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lit = self.buffer.iter().map(|b| b.count_ones()).sum::<u32>();
        f.debug_struct("Frame").field("lit_pixels", &lit).finish()
    }
}

impl OriginDimensions for Frame {
    fn size(&self) -> Size {
        Size::new(WIDTH, HEIGHT)
    }
}

impl DrawTarget for Frame {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if point.x >= 0 && point.y >= 0 {
                self.set(point.x as u32, point.y as u32, color.is_on());
            }
        }
        Ok(())
    }
}
