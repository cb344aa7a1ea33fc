use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics_framebuf::backends::FrameBufferBackend;
use embedded_graphics_framebuf::FrameBuf;

use crate::device::KeyFormat;

/// Heap-backed pixel storage for one key canvas.
pub(crate) struct PixelBuffer {
    pixels: Vec<Rgb888>,
}

impl FrameBufferBackend for &mut PixelBuffer {
    type Color = Rgb888;

    fn set(&mut self, index: usize, color: Rgb888) {
        self.pixels[index] = color;
    }

    fn get(&self, index: usize) -> Rgb888 {
        self.pixels[index]
    }

    fn nr_elements(&self) -> usize {
        self.pixels.len()
    }
}

/// Drawing surface for a single key, sized to the device's key format.
pub(crate) struct Canvas {
    width: u32,
    height: u32,
    buffer: PixelBuffer,
}

impl Canvas {
    pub fn new(format: KeyFormat) -> Self {
        let pixels = vec![Rgb888::BLACK; (format.width * format.height) as usize];
        Self {
            width: format.width,
            height: format.height,
            buffer: PixelBuffer { pixels },
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn fill(&mut self, color: Rgb888) {
        self.buffer.pixels.fill(color);
    }

    /// Set one pixel. Out-of-bounds coordinates are ignored.
    pub fn put(&mut self, x: u32, y: u32, color: Rgb888) {
        if x < self.width && y < self.height {
            self.buffer.pixels[(y * self.width + x) as usize] = color;
        }
    }

    /// Borrow the canvas as an embedded-graphics draw target.
    pub fn frame(&mut self) -> FrameBuf<Rgb888, &mut PixelBuffer> {
        FrameBuf::new(&mut self.buffer, self.width as usize, self.height as usize)
    }

    /// Convert to the device-native byte layout: RGB888, row-major.
    pub fn into_native(self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.buffer.pixels.len() * 3);
        for pixel in &self.buffer.pixels {
            out.extend_from_slice(&[pixel.r(), pixel.g(), pixel.b()]);
        }
        out
    }

    #[cfg(test)]
    pub fn pixel(&self, x: u32, y: u32) -> Rgb888 {
        self.buffer.pixels[(y * self.width + x) as usize]
    }
}
