//! avidump CLI - dump a synthetic source, inspect segments, list codecs.

mod commands;
mod pattern;

use clap::{Parser, Subcommand};
use commands::{CmdCodecs, CmdDump, CmdInfo};
use tracing_subscriber::EnvFilter;

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "avidump")]
#[command(version)]
#[command(about = "Real-time segmented AVI dumping")]
#[command(long_about = "Drives the avidump engine with a synthetic test pattern and tone.\n\n\
    EXAMPLES:\n    \
    avidump dump --frames 600 --codecs zmbv/pcm\n    \
    avidump dump --sound-rate 64081/2 -o sound-rate-mode=hq-48000 --verify\n    \
    avidump dump --config capture.toml --json\n    \
    avidump info capture_00000.avi")]
struct Cli {
    /// More logging (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Dump a synthetic pattern and tone to AVI segments
    Dump(CmdDump),
    /// Show the structure of an AVI segment
    Info(CmdInfo),
    /// List registered codecs
    Codecs(CmdCodecs),
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let quiet = match &cli.command {
        Command::Dump(cmd) => cmd.json,
        Command::Info(cmd) => cmd.json,
        Command::Codecs(cmd) => cmd.json,
    };
    init_logging(cli.verbose, quiet);

    match cli.command {
        Command::Dump(cmd) => cmd.run(),
        Command::Info(cmd) => cmd.run(),
        Command::Codecs(cmd) => cmd.run(),
    }
}
