//! Video codecs.

pub mod cscd;
pub mod uncompressed;
pub mod zmbv;

pub use cscd::CscdCodec;
pub use uncompressed::UncompressedCodec;
pub use zmbv::ZmbvCodec;
