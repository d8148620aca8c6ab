// CLI definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cfontz_driver")]
#[command(author, version, about = "CrystalFontz CFA-533/631/633/635 LCD driver")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file (default: <config dir>/cfontz/display.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Serial device, overrides the config file
    #[arg(short, long, global = true, value_name = "PATH")]
    pub device: Option<PathBuf>,

    /// Module number (533, 631, 633, 635), overrides the config file
    #[arg(short, long, global = true)]
    pub model: Option<u32>,

    /// Enable transport monitoring (prints all packets)
    #[arg(long, global = true)]
    pub monitor: bool,

    /// Show raw hex dump alongside decoded output
    #[arg(long, global = true)]
    pub hex: bool,

    /// Filter monitor output (all, keys, commands, cmd=0xNN)
    #[arg(long, global = true)]
    pub filter: Option<String>,

    /// Monitor output format (text, json)
    #[arg(long, global = true, default_value = "text")]
    pub format: String,

    /// Log level when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    // === Query Commands ===
    /// Show model, firmware version and transport counters
    #[command(visible_aliases = ["version", "ver", "v"])]
    Info,

    /// Ping the module and report the round trip
    #[command(visible_alias = "p")]
    Ping {
        /// Number of pings
        #[arg(short, long, default_value = "1")]
        count: u32,
    },

    /// Compute the packet CRC of hex bytes (no device needed)
    Crc {
        /// Bytes as hex, e.g. "0d 01 19" or "0d0119"
        #[arg(required = true, num_args = 1..)]
        bytes: Vec<String>,
    },

    // === Set Commands ===
    /// Blank the screen
    #[command(visible_alias = "cls")]
    Clear,

    /// Write text on a row
    #[command(visible_alias = "t")]
    Text {
        /// Row, starting at 1
        #[arg(value_parser = clap::value_parser!(u8).range(1..))]
        row: u8,
        /// Text to show; longer than the row is cut off
        text: String,
        /// Starting column, starting at 1
        #[arg(short, long, default_value = "1")]
        column: u8,
    },

    /// Set contrast
    #[command(visible_alias = "c")]
    Contrast {
        /// Contrast in promille (0-1000)
        #[arg(value_parser = clap::value_parser!(u16).range(0..=1000))]
        promille: u16,
    },

    /// Switch the backlight
    #[command(visible_alias = "bl")]
    Backlight {
        state: BacklightArg,
        /// Brightness to use for this state (0-1000)
        #[arg(short, long, value_parser = clap::value_parser!(u16).range(0..=1000))]
        brightness: Option<u16>,
    },

    /// Set the status LEDs (CFA-635)
    ///
    /// Bits 0-3 light the green LEDs, bits 4-7 the red ones.
    Leds {
        /// LED mask, decimal or 0x-prefixed hex
        mask: String,
    },

    /// Reboot the module and reinitialize it
    Reboot,

    /// Store the current screen as the boot screen
    StoreBoot,

    // === Watch Commands ===
    /// Print key presses until Ctrl-C
    #[command(visible_alias = "k")]
    Keys,

    /// Clock, bars and key echo until Ctrl-C
    Demo {
        /// Refresh interval in milliseconds
        #[arg(short, long, default_value = "125")]
        interval: u64,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum BacklightArg {
    On,
    Off,
}
