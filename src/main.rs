//! CrystalFontz LCD driver CLI
//!
//! A command-line interface for CFA-533/631/633/635 packet-protocol modules.

use anyhow::Result;
use clap::Parser;

// CLI definitions
mod cli;
use cli::{Cli, Commands};

// Command handlers
mod commands;
use commands::Session;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // The CRC tool needs no device or config
    if let Some(Commands::Crc { bytes }) = &cli.command {
        return commands::query::crc(bytes);
    }

    // Create printer config if monitoring is enabled
    let printer_config =
        commands::create_printer_config(cli.monitor, cli.hex, cli.filter.as_deref(), &cli.format)?;
    let session = Session::new(
        cli.config.as_deref(),
        cli.device.as_deref(),
        cli.model,
        printer_config,
    )?;

    match cli.command {
        None | Some(Commands::Info) => commands::query::info(&session)?,
        Some(Commands::Ping { count }) => commands::query::ping(&session, count)?,
        Some(Commands::Crc { bytes }) => commands::query::crc(&bytes)?,

        Some(Commands::Clear) => commands::set::clear(&session)?,
        Some(Commands::Text { row, text, column }) => {
            commands::set::text(&session, row, column, &text)?
        }
        Some(Commands::Contrast { promille }) => commands::set::contrast(&session, promille)?,
        Some(Commands::Backlight { state, brightness }) => {
            commands::set::backlight(&session, state, brightness)?
        }
        Some(Commands::Leds { mask }) => commands::set::leds(&session, &mask)?,
        Some(Commands::Reboot) => commands::set::reboot(&session)?,
        Some(Commands::StoreBoot) => commands::set::store_boot(&session)?,

        Some(Commands::Keys) => commands::watch::keys(&session).await?,
        Some(Commands::Demo { interval }) => commands::watch::demo(&session, interval).await?,
    }

    Ok(())
}
