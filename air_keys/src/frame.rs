//! Camera frames and the two external collaborators that touch them.

use crate::error::{KeysError, Result};
use crate::finger::Hand;

/// Bytes per pixel in a [`Frame`] (interleaved RGB).
pub const CHANNELS: usize = 3;

/// One captured image, row-major interleaved RGB8.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    width:  u32,
    height: u32,
    data:   Vec<u8>,
}

impl Frame {
    /// Wrap a raw buffer, checking it matches `width × height × 3`.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * CHANNELS;
        if data.len() != expected {
            return Err(KeysError::FrameSize { expected, actual: data.len() });
        }
        Ok(Frame { width, height, data })
    }

    /// A frame filled with a single colour.
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let data = rgb.iter().copied()
            .cycle()
            .take(width as usize * height as usize * CHANNELS)
            .collect();
        Frame { width, height, data }
    }

    pub fn width(&self)  -> u32   { self.width }
    pub fn height(&self) -> u32   { self.height }
    pub fn data(&self)   -> &[u8] { &self.data }

}

// ════════════════════════════════════════════════════════════════════════════
// Collaborator traits
// ════════════════════════════════════════════════════════════════════════════

/// A camera, or anything that can stand in for one.
pub trait FrameSource {
    /// Device name, used when reporting a failed capture.
    fn name(&self) -> &str;

    /// Block until the next frame.  `None` means capture failed, which ends
    /// the run.
    fn read(&mut self) -> Option<Frame>;

    /// Release the device.  Called exactly once, by the finalizer.
    fn release(&mut self);
}

/// The hand-landmark model: one image in, zero or more hands out.
pub trait HandDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Hand>>;
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
