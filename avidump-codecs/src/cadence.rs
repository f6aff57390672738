//! Keyframe scheduling shared by the inter-frame codecs.

/// Decides which frames are keyframes.
///
/// After a reset (or a forced request) the next frame is a keyframe. Otherwise
/// a keyframe is due once `interval - 1` delta frames have followed the last
/// one, so keyframes land on frames 0, K, 2K, ...
#[derive(Debug, Clone)]
pub struct KeyframeCadence {
    interval: u32,
    pframes: u32,
    forced: bool,
}

impl KeyframeCadence {
    pub fn new(interval: u32) -> Self {
        KeyframeCadence {
            interval,
            pframes: 0,
            forced: true,
        }
    }

    pub fn interval(&self) -> u32 {
        self.interval
    }

    /// Start over; the next frame is a keyframe.
    pub fn reset(&mut self) {
        self.pframes = 0;
        self.forced = true;
    }

    /// Advance by one frame and report whether it is a keyframe.
    pub fn next_is_keyframe(&mut self) -> bool {
        if self.forced || self.pframes + 1 >= self.interval {
            self.forced = false;
            self.pframes = 0;
            true
        } else {
            self.pframes += 1;
            false
        }
    }
}
