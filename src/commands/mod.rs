//! Command handlers for the CLI application.
//!
//! This module organizes command handlers by category:
//! - `query`: Read-only commands (info, ping, crc)
//! - `set`: Commands that change the module (clear, text, contrast, backlight, leds, reboot)
//! - `watch`: Long-running commands (keys, demo)

pub mod query;
pub mod set;
pub mod watch;

use anyhow::Context;
use cfontz_display::{CfontzDisplay, DisplaySettings};
use cfontz_driver::config::DisplayConfig;
use cfontz_transport::{
    OutputFormat, PacketFilter, PacketPrinter, PrinterConfig, SerialPort, Transport,
};
use std::path::Path;
use tracing::info;

/// Result type for command handlers
pub type CommandResult = anyhow::Result<()>;

/// A display on a real serial port
pub type SerialDisplay = CfontzDisplay<SerialPort>;

/// Everything a handler needs to reach the module
pub struct Session {
    pub config: DisplayConfig,
    pub printer: Option<PrinterConfig>,
}

impl Session {
    /// Load the config file and apply command line overrides
    pub fn new(
        config_path: Option<&Path>,
        device: Option<&Path>,
        model: Option<u32>,
        printer: Option<PrinterConfig>,
    ) -> anyhow::Result<Self> {
        let path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(DisplayConfig::default_path);
        let mut config = DisplayConfig::load(&path)
            .with_context(|| format!("reading config {}", path.display()))?;
        if let Some(device) = device {
            config.device = device.to_path_buf();
        }
        if let Some(model) = model {
            config.model = model;
        }
        Ok(Self { config, printer })
    }

    fn settings(&self) -> anyhow::Result<DisplaySettings> {
        Ok(self.config.to_settings()?)
    }

    /// Open the port without touching the module's state
    pub fn connect(&self) -> anyhow::Result<SerialDisplay> {
        let settings = self.settings()?;
        let serial = self.config.serial_config()?;
        info!("using Device {}", serial.device.display());
        let port = SerialPort::open(&serial)
            .with_context(|| format!("opening {}", serial.device.display()))?;

        let mut transport = Transport::with_mode(port, self.config.response_mode());
        if let Some(printer) = &self.printer {
            transport.set_observer(Box::new(PacketPrinter::new(printer.clone())));
        }
        Ok(CfontzDisplay::new(transport, settings)?)
    }

    /// Open the port and run the full init sequence (clears the screen)
    pub fn open_display(&self) -> anyhow::Result<SerialDisplay> {
        let mut display = self.connect()?;
        display.init().context("initializing display")?;
        Ok(display)
    }
}

/// Create printer config if monitoring is enabled
pub fn create_printer_config(
    monitor: bool,
    hex: bool,
    filter: Option<&str>,
    format: &str,
) -> anyhow::Result<Option<PrinterConfig>> {
    if !monitor {
        return Ok(None);
    }

    let filter = match filter {
        Some(f) => f.parse::<PacketFilter>().map_err(anyhow::Error::msg)?,
        None => PacketFilter::All,
    };
    let format = format.parse::<OutputFormat>().map_err(anyhow::Error::msg)?;

    Ok(Some(
        PrinterConfig::default()
            .with_hex(hex)
            .with_discards(hex)
            .with_filter(filter)
            .with_format(format),
    ))
}

/// Parse a number given as decimal or 0x-prefixed hex
pub fn parse_number(s: &str) -> anyhow::Result<u32> {
    let s = s.trim();
    let value = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    };
    value.with_context(|| format!("invalid number: {s}"))
}
