//! In-memory device for dry runs and tests.
//!
//! `MockDevice` renders each capture into a `MockFramebuffer`, writes it to
//! disk as a real PNG, and records every tap. Failures can be scheduled to
//! simulate a device dropping off mid-run.

use font8x8::{BASIC_FONTS, UnicodeFonts};
use image::{ImageBuffer, RgbImage};
use std::fs;
use std::io::Cursor;
use std::path::PathBuf;

use super::types::{DeviceBridge, DeviceError, DeviceResult, ScreenshotRef};
use crate::session::capture_file_name;

/// Logical resolution of the simulated phone (taps are in these units)
pub const MOCK_SCREEN_WIDTH: u32 = 1440;
pub const MOCK_SCREEN_HEIGHT: u32 = 3040;

/// Rendered frames are downscaled by this factor
const RENDER_SCALE: u32 = 4;

/// A virtual framebuffer with a small drawing API
#[derive(Debug, Clone)]
pub struct MockFramebuffer {
    width: u32,
    height: u32,
    /// RGB pixel buffer (row-major, 3 bytes per pixel)
    buffer: Vec<u8>,
}

impl MockFramebuffer {
    /// Create a new framebuffer with the given dimensions, initialized to black
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            buffer: vec![0u8; (width * height * 3) as usize],
        }
    }

    /// Create a framebuffer initialized to a specific color
    pub fn with_color(width: u32, height: u32, color: [u8; 3]) -> Self {
        let mut fb = Self::new(width, height);
        fb.fill(color);
        fb
    }

    /// Load a framebuffer from PNG image bytes
    pub fn from_png_bytes(data: &[u8]) -> DeviceResult<Self> {
        let img = image::load_from_memory(data)
            .map_err(|e| DeviceError::InvalidScreenshot(format!("failed to load PNG: {}", e)))?;
        let rgb = img.to_rgb8();
        Ok(Self {
            width: rgb.width(),
            height: rgb.height(),
            buffer: rgb.into_raw(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn fill(&mut self, color: [u8; 3]) {
        for chunk in self.buffer.chunks_exact_mut(3) {
            chunk.copy_from_slice(&color);
        }
    }

    /// Draw a filled rectangle, clipped to the buffer
    pub fn draw_rect(&mut self, x: u32, y: u32, w: u32, h: u32, color: [u8; 3]) {
        for py in y..(y + h).min(self.height) {
            for px in x..(x + w).min(self.width) {
                self.set_pixel(px, py, color);
            }
        }
    }

    /// Draw text using 8x8 glyphs. Text does not wrap.
    pub fn draw_text(&mut self, x: u32, y: u32, text: &str, fg: [u8; 3], bg: [u8; 3]) {
        let mut cursor_x = x;
        for ch in text.chars() {
            if cursor_x >= self.width {
                break;
            }
            self.draw_char(cursor_x, y, ch, fg, bg);
            cursor_x += 8;
        }
    }

    fn draw_char(&mut self, x: u32, y: u32, ch: char, fg: [u8; 3], bg: [u8; 3]) {
        let glyph = BASIC_FONTS.get(ch).unwrap_or([0u8; 8]);
        for (row_idx, row) in glyph.iter().enumerate() {
            let py = y + row_idx as u32;
            for bit in 0..8 {
                // LSB is the leftmost pixel
                let color = if (row >> bit) & 1 == 1 { fg } else { bg };
                self.set_pixel(x + bit, py, color);
            }
        }
    }

    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 3] {
        if x >= self.width || y >= self.height {
            return [0, 0, 0];
        }
        let idx = ((y * self.width + x) * 3) as usize;
        [self.buffer[idx], self.buffer[idx + 1], self.buffer[idx + 2]]
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: [u8; 3]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = ((y * self.width + x) * 3) as usize;
        self.buffer[idx..idx + 3].copy_from_slice(&color);
    }

    fn to_image(&self) -> Option<RgbImage> {
        ImageBuffer::from_raw(self.width, self.height, self.buffer.clone())
    }

    /// Encode the framebuffer as PNG bytes
    pub fn to_png(&self) -> DeviceResult<Vec<u8>> {
        let img = self
            .to_image()
            .ok_or_else(|| DeviceError::InvalidScreenshot("buffer size mismatch".to_string()))?;
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .map_err(|e| DeviceError::InvalidScreenshot(format!("failed to encode PNG: {}", e)))?;
        Ok(bytes)
    }
}

/// Simulated phone that renders captions onto synthetic frames
pub struct MockDevice {
    output_dir: PathBuf,
    framebuffer: MockFramebuffer,
    /// Captions cycled through on successive captures
    screens: Vec<String>,
    captures: u64,
    taps: Vec<(i32, i32)>,
    fail_capture_at: Option<u64>,
    fail_tap_at: Option<usize>,
}

impl MockDevice {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            framebuffer: MockFramebuffer::with_color(
                MOCK_SCREEN_WIDTH / RENDER_SCALE,
                MOCK_SCREEN_HEIGHT / RENDER_SCALE,
                [24, 24, 40],
            ),
            screens: vec!["MOCK LOBBY".to_string()],
            captures: 0,
            taps: Vec::new(),
            fail_capture_at: None,
            fail_tap_at: None,
        }
    }

    /// Captions shown on successive captures (cycled)
    pub fn with_screens<I, S>(mut self, screens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let screens: Vec<String> = screens.into_iter().map(Into::into).collect();
        if !screens.is_empty() {
            self.screens = screens;
        }
        self
    }

    /// Make the n-th capture (1-based) fail as if the device disconnected
    pub fn fail_capture_at(mut self, n: u64) -> Self {
        self.fail_capture_at = Some(n);
        self
    }

    /// Make the n-th tap (1-based) fail as if the device disconnected
    pub fn fail_tap_at(mut self, n: usize) -> Self {
        self.fail_tap_at = Some(n);
        self
    }

    /// Every tap injected so far, in order
    pub fn taps(&self) -> &[(i32, i32)] {
        &self.taps
    }

    /// Number of capture attempts so far (including a failed one)
    pub fn capture_count(&self) -> u64 {
        self.captures
    }

    fn render(&mut self, label: &str) -> DeviceResult<Vec<u8>> {
        let caption = &self.screens[((self.captures - 1) as usize) % self.screens.len()];
        let fb = &mut self.framebuffer;
        fb.draw_rect(0, 0, fb.width(), 40, [0, 0, 0]);
        fb.draw_text(8, 8, caption, [255, 255, 255], [0, 0, 0]);
        fb.draw_text(8, 24, &format!("#{} {}", self.captures, label), [160, 160, 160], [0, 0, 0]);
        fb.to_png()
    }
}

impl DeviceBridge for MockDevice {
    fn capture(&mut self, label: &str) -> DeviceResult<ScreenshotRef> {
        self.captures += 1;
        if self.fail_capture_at == Some(self.captures) {
            return Err(DeviceError::Disconnected(format!(
                "mock capture #{} failed",
                self.captures
            )));
        }

        let png = self.render(label)?;
        fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(capture_file_name(self.captures, label));
        fs::write(&path, png)?;

        Ok(ScreenshotRef::new(path, label, self.captures))
    }

    fn tap(&mut self, x: i32, y: i32) -> DeviceResult<()> {
        if self.fail_tap_at == Some(self.taps.len() + 1) {
            return Err(DeviceError::Disconnected(format!("mock tap at ({}, {}) failed", x, y)));
        }
        self.taps.push((x, y));

        // Leave a marker where the tap landed
        if x >= 0 && y >= 0 {
            let (px, py) = (x as u32 / RENDER_SCALE, y as u32 / RENDER_SCALE);
            self.framebuffer
                .draw_rect(px.saturating_sub(2), py.saturating_sub(2), 5, 5, [255, 64, 64]);
        }
        Ok(())
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_framebuffer_draw_rect() {
        let mut fb = MockFramebuffer::new(20, 20);
        fb.draw_rect(5, 5, 10, 10, [255, 0, 0]);

        assert_eq!(fb.get_pixel(4, 4), [0, 0, 0]);
        assert_eq!(fb.get_pixel(5, 5), [255, 0, 0]);
        assert_eq!(fb.get_pixel(14, 14), [255, 0, 0]);
        assert_eq!(fb.get_pixel(15, 15), [0, 0, 0]);
    }

    #[test]
    fn test_framebuffer_draw_text_has_foreground() {
        let mut fb = MockFramebuffer::new(80, 16);
        fb.draw_text(0, 0, "Hi", [255, 255, 255], [0, 0, 0]);

        let lit = (0..8).flat_map(|y| (0..8).map(move |x| (x, y)))
            .any(|(x, y)| fb.get_pixel(x, y) == [255, 255, 255]);
        assert!(lit, "glyph 'H' should have foreground pixels");
    }

    #[test]
    fn test_framebuffer_png_roundtrip() {
        let mut fb = MockFramebuffer::with_color(32, 32, [100, 150, 200]);
        fb.draw_rect(8, 8, 16, 16, [255, 0, 0]);

        let png = fb.to_png().unwrap();
        let fb2 = MockFramebuffer::from_png_bytes(&png).unwrap();
        assert_eq!(fb2.get_pixel(0, 0), [100, 150, 200]);
        assert_eq!(fb2.get_pixel(10, 10), [255, 0, 0]);
    }

    #[test]
    fn test_mock_device_captures_unique_pngs() {
        let dir = tempfile::tempdir().unwrap();
        let mut device = MockDevice::new(dir.path()).with_screens(["LOBBY", "SLOTS"]);

        let a = device.capture("screen").unwrap();
        let b = device.capture("screen").unwrap();
        assert_ne!(a.path, b.path);
        assert_eq!((a.sequence, b.sequence), (1, 2));

        let bytes = a.read_bytes().unwrap();
        assert!(crate::device::types::is_png(&bytes));
    }

    #[test]
    fn test_mock_device_records_taps_and_fails_on_schedule() {
        let dir = tempfile::tempdir().unwrap();
        let mut device = MockDevice::new(dir.path()).fail_capture_at(2).fail_tap_at(3);

        device.tap(100, 200).unwrap();
        device.tap(-5, 10).unwrap();
        assert!(device.tap(1, 1).is_err());
        assert_eq!(device.taps(), &[(100, 200), (-5, 10)]);

        assert!(device.capture("one").is_ok());
        assert!(matches!(device.capture("two"), Err(DeviceError::Disconnected(_))));
        assert_eq!(device.capture_count(), 2);
    }
}
