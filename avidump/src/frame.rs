//! Owned video frames handed to the muxer worker.

/// One tightly packed `0x00RRGGBB` frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Row-major pixels, stride equals width
    pub pixels: Vec<u32>,
    pub width: u32,
    pub height: u32,
    pub fps_n: u32,
    pub fps_d: u32,
    /// Start a new segment with this frame
    pub force_break: bool,
}

impl Frame {
    /// Whether the frame has these dimensions and this frame rate.
    pub fn same_format(&self, width: u32, height: u32, fps_n: u32, fps_d: u32) -> bool {
        self.width == width
            && self.height == height
            && self.fps_n as u64 * fps_d as u64 == fps_n as u64 * self.fps_d as u64
    }
}
