//! Packet monitor for watching protocol traffic
//!
//! Installed on a [`Transport`](crate::Transport) as a [`PacketObserver`],
//! it prints every request, reply, stray packet and resync byte to stderr.
//!
//! # Example
//!
//! ```ignore
//! use cfontz_transport::{PacketPrinter, PrinterConfig, Transport};
//!
//! let mut transport = Transport::new(port);
//! transport.set_observer(Box::new(PacketPrinter::new(PrinterConfig::default())));
//! ```

use crate::packet::{Packet, PacketKind};
use crate::protocol::{cmd, tag};
use crate::transport::PacketObserver;
use crossterm::style::Stylize;
use serde_json::json;
use std::str::FromStr;

/// Output format for the printer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Packet filter for selective display
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PacketFilter {
    #[default]
    All,
    /// Key activity reports only
    Keys,
    /// Requests and their replies, no reports
    Commands,
    /// One operation id, any type tag
    Cmd(u8),
}

impl FromStr for PacketFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" | "" => Ok(Self::All),
            "keys" | "key" => Ok(Self::Keys),
            "commands" | "cmd" | "cmds" => Ok(Self::Commands),
            s if s.starts_with("cmd=") || s.starts_with("0x") => {
                let hex_str = s.strip_prefix("cmd=").unwrap_or(s);
                let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);
                u8::from_str_radix(hex_str, 16)
                    .map(|c| Self::Cmd(c & tag::OPERATION_MASK))
                    .map_err(|e| format!("Invalid command byte: {}", e))
            }
            _ => Err(format!("Unknown filter: {}", s)),
        }
    }
}

/// Configuration for the PacketPrinter
#[derive(Debug, Clone, Default)]
pub struct PrinterConfig {
    /// Show raw wire bytes alongside decoded output
    pub show_hex: bool,
    /// Show bytes dropped during resync
    pub show_discards: bool,
    pub filter: PacketFilter,
    pub format: OutputFormat,
}

impl PrinterConfig {
    pub fn with_hex(mut self, show: bool) -> Self {
        self.show_hex = show;
        self
    }

    pub fn with_discards(mut self, show: bool) -> Self {
        self.show_discards = show;
        self
    }

    pub fn with_filter(mut self, filter: PacketFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }
}

#[derive(Clone, Copy)]
enum Direction {
    Sent,
    Received,
    Unexpected,
}

impl Direction {
    fn label(self) -> &'static str {
        match self {
            Self::Sent => "tx",
            Self::Received => "rx",
            Self::Unexpected => "stray",
        }
    }
}

/// Observer that prints traffic to stderr
pub struct PacketPrinter {
    config: PrinterConfig,
}

impl PacketPrinter {
    pub fn new(config: PrinterConfig) -> Self {
        Self { config }
    }

    fn should_show(&self, packet: &Packet) -> bool {
        match &self.config.filter {
            PacketFilter::All => true,
            PacketFilter::Keys => packet.is_key_activity(),
            PacketFilter::Commands => packet.kind() != PacketKind::Report,
            PacketFilter::Cmd(c) => packet.operation() == *c && packet.kind() != PacketKind::Report,
        }
    }

    /// One line describing the packet, as it would be printed
    pub fn format_packet(&self, packet: &Packet, direction: &str) -> String {
        match self.config.format {
            OutputFormat::Json => json!({
                "direction": direction,
                "kind": packet.kind(),
                "command": packet.command,
                "name": cmd::name(packet.command),
                "data": packet.payload(),
                "crc": packet.crc,
            })
            .to_string(),
            OutputFormat::Text => {
                let name = if packet.is_key_activity() {
                    "KEY_ACTIVITY"
                } else {
                    cmd::name(packet.command)
                };
                format!(
                    "{} 0x{:02x} {} {:02x?}",
                    tag::name(packet.command),
                    packet.command,
                    name,
                    packet.payload()
                )
            }
        }
    }

    fn print(&self, packet: &Packet, direction: Direction) {
        if !self.should_show(packet) {
            return;
        }
        let line = self.format_packet(packet, direction.label());
        match (self.config.format, direction) {
            (OutputFormat::Json, _) => eprintln!("{line}"),
            (OutputFormat::Text, Direction::Sent) => eprintln!("{} {}", ">>>".cyan(), line),
            (OutputFormat::Text, Direction::Received) => {
                let marker = match packet.kind() {
                    PacketKind::Error => "<<<".red().bold(),
                    PacketKind::Report => "<<<".magenta(),
                    _ => "<<<".green(),
                };
                eprintln!("{} {}", marker, line);
            }
            (OutputFormat::Text, Direction::Unexpected) => {
                eprintln!("{} {} {}", "???".yellow(), line, "(unclaimed)".dim());
            }
        }
        if self.config.show_hex && self.config.format == OutputFormat::Text {
            eprintln!("    {}  {:02x?}", "HEX".dim(), packet.encode());
        }
    }
}

impl PacketObserver for PacketPrinter {
    fn on_send(&self, packet: &Packet) {
        self.print(packet, Direction::Sent);
    }

    fn on_receive(&self, packet: &Packet) {
        self.print(packet, Direction::Received);
    }

    fn on_unexpected(&self, packet: &Packet) {
        self.print(packet, Direction::Unexpected);
    }

    fn on_discard(&self, byte: u8) {
        if self.config.show_discards {
            eprintln!("{} dropped 0x{:02x}", "~~~".dim(), byte);
        }
    }

    fn on_timeout(&self, command: u8) {
        eprintln!(
            "{} no reply to 0x{:02x} {}",
            "!!!".red().bold(),
            command,
            cmd::name(command)
        );
    }
}
