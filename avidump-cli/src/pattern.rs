//! Synthetic source: scrolling color bars with a bouncing box, and a tone.

use std::f64::consts::TAU;

const BARS: [u32; 8] = [
    0x00FF_FFFF,
    0x00FF_FF00,
    0x0000_FFFF,
    0x0000_FF00,
    0x00FF_00FF,
    0x00FF_0000,
    0x0000_00FF,
    0x0000_0000,
];

/// Parse `N` or `N/D` into a positive ratio.
pub fn parse_rational(s: &str) -> Result<(u32, u32), String> {
    let (n, d) = match s.split_once('/') {
        Some((n, d)) => (n, d),
        None => (s, "1"),
    };
    let n: u32 = n.trim().parse().map_err(|_| format!("'{}' is not a number", n))?;
    let d: u32 = d.trim().parse().map_err(|_| format!("'{}' is not a number", d))?;
    if n == 0 || d == 0 {
        return Err(format!("'{}' must be positive", s));
    }
    Ok((n, d))
}

/// Parse `key=value`.
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("'{}' is not of the form key=value", s))?;
    Ok((key.trim().to_string(), value.trim().to_string()))
}

/// Frame generator.
pub struct TestPattern {
    width: usize,
    height: usize,
    frame: usize,
    pixels: Vec<u32>,
}

impl TestPattern {
    pub fn new(width: u32, height: u32) -> Self {
        TestPattern {
            width: width as usize,
            height: height as usize,
            frame: 0,
            pixels: vec![0; width as usize * height as usize],
        }
    }

    /// Render the next frame.
    pub fn next_frame(&mut self) -> &[u32] {
        let bar_width = (self.width / BARS.len()).max(1);
        for y in 0..self.height {
            let row = &mut self.pixels[y * self.width..(y + 1) * self.width];
            for (x, px) in row.iter_mut().enumerate() {
                let bar = ((x + self.frame) / bar_width) % BARS.len();
                *px = BARS[bar];
            }
        }

        let size = (self.width.min(self.height) / 8).max(1);
        let span_x = self.width.saturating_sub(size).max(1);
        let span_y = self.height.saturating_sub(size).max(1);
        let bx = bounce(self.frame * 3, span_x);
        let by = bounce(self.frame * 2, span_y);
        for y in by..(by + size).min(self.height) {
            for x in bx..(bx + size).min(self.width) {
                self.pixels[y * self.width + x] = 0x0080_8080;
            }
        }

        self.frame += 1;
        &self.pixels
    }
}

fn bounce(t: usize, span: usize) -> usize {
    let period = span * 2;
    let t = t % period;
    if t < span {
        t
    } else {
        period - t - 1
    }
}

/// Stereo sine generator.
pub struct Tone {
    phase: f64,
    step: f64,
}

impl Tone {
    pub fn new(frequency: f64, sample_rate: f64) -> Self {
        Tone {
            phase: 0.0,
            step: TAU * frequency / sample_rate,
        }
    }

    /// Write `frames` interleaved stereo frames into `out`.
    pub fn fill(&mut self, frames: usize, out: &mut Vec<i16>) {
        out.clear();
        for _ in 0..frames {
            let s = (self.phase.sin() * 6000.0) as i16;
            out.extend_from_slice(&[s, s]);
            self.phase = (self.phase + self.step) % TAU;
        }
    }
}
