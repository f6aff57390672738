//! CLI subcommand implementations.

pub mod codecs;
pub mod dump;
pub mod info;

pub use codecs::CmdCodecs;
pub use dump::CmdDump;
pub use info::CmdInfo;
