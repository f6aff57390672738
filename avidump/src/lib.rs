//! # avidump
//!
//! Real-time segmented AVI dumping for emulators.
//!
//! The emulation loop pushes rendered frames and interleaved stereo samples
//! into an [`AviWriter`]; a muxer thread encodes them with a pair of codecs
//! from an [`avidump_codecs::CodecRegistry`] and writes `prefix_NNNNN.avi`
//! segments.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use avidump::{AviWriter, DumpConfig, SourceRate};
//! use avidump_codecs::CodecRegistry;
//!
//! fn main() -> avidump::Result<()> {
//!     let mut config = DumpConfig::default();
//!     config.set_option("max-frames-per-segment", "36000")?;
//!
//!     let registry = CodecRegistry::with_builtin();
//!     let mut writer = AviWriter::start(&config, &registry, "cscd/pcm", SourceRate::new(64081, 2)?, "run")?;
//!
//!     let frame = vec![0u32; 256 * 240];
//!     writer.push_frame(&frame, 256, 256, 240, 60, 1, false)?;
//!     writer.end()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Threads
//!
//! - the caller's thread: validation, scaling and borders
//! - `avidump-muxer`: encoding, segment breaks, file output
//! - `avidump-resample`: only for the `hq-*` sound rate modes
//!
//! Only one frame is in flight at a time: `push_frame` blocks until the
//! previous frame has been encoded.

pub mod config;
pub mod error;
pub mod frame;
pub mod resample_worker;
pub mod sample_queue;
pub mod segment;
pub mod sound_rate;
pub mod timer;
pub mod transform;
pub mod worker;
mod writer;

pub use config::{DumpConfig, SoundRateMode};
pub use error::{DumpError, Result};
pub use frame::Frame;
pub use sample_queue::SampleQueue;
pub use segment::{segment_path, DumpStats, SegmentInfo};
pub use sound_rate::{AudioPlan, SourceRate};
pub use timer::Timer;
pub use transform::FrameTransform;
pub use writer::AviWriter;
