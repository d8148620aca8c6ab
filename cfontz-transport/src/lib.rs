//! Packet protocol transport for CrystalFontz character LCD modules
//!
//! The CFA-533, CFA-631, CFA-633 and CFA-635 speak the same framed protocol
//! over RS-232 or USB-CDC: a command byte whose top two bits carry a type tag,
//! a length byte, up to [`MAX_DATA_LENGTH`] payload bytes and a CRC-16/X-25.
//!
//! This crate provides the layers from the checksum up to the
//! request/acknowledge exchange:
//!
//! - [`crc`]: table-driven CRC16
//! - [`ReceiveBuffer`]: circular buffer with peek/commit look-ahead
//! - [`KeyRing`]: FIFO for key activity reports
//! - [`PacketParser`]: framer with one-byte resynchronisation
//! - [`Transport`]: bounded acknowledgement wait with key-event siphoning
//! - [`SerialPort`] / [`ScriptedLink`]: hardware and in-memory [`Link`]s
//! - [`PacketPrinter`]: traffic monitor

pub mod crc;
pub mod error;
pub mod key_ring;
pub mod link;
pub mod mock;
pub mod packet;
pub mod parser;
pub mod printer;
pub mod protocol;
pub mod receive_buffer;
pub mod serial;
pub mod transport;

pub use crc::{crc16, CRC_SEED};
pub use error::TransportError;
pub use key_ring::KeyRing;
pub use link::Link;
pub use mock::{ScriptedHandle, ScriptedLink};
pub use packet::{Packet, PacketKind};
pub use parser::{PacketParser, ParseOutcome};
pub use printer::{OutputFormat, PacketFilter, PacketPrinter, PrinterConfig};
pub use protocol::{cmd, MAX_COMMAND, MAX_DATA_LENGTH};
pub use receive_buffer::ReceiveBuffer;
pub use serial::{SerialConfig, SerialPort};
pub use transport::{Delivery, PacketObserver, ResponseMode, Transport, TransportStats};
