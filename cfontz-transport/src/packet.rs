//! Packet representation and wire encoding

use crate::crc::{crc16, CRC_SEED};
use crate::protocol::{cmd, tag, MAX_DATA_LENGTH, PACKET_OVERHEAD};
use serde::Serialize;
use std::fmt;

/// What a packet's type tag says about it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PacketKind {
    Request,
    Ack,
    Report,
    Error,
}

/// One protocol packet: command, length, payload and checksum
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Packet {
    pub command: u8,
    pub data_length: u8,
    pub data: [u8; MAX_DATA_LENGTH],
    pub crc: u16,
}

impl Packet {
    /// Build a packet and compute its checksum. Payload beyond
    /// [`MAX_DATA_LENGTH`] is cut off.
    pub fn new(command: u8, payload: &[u8]) -> Self {
        let len = payload.len().min(MAX_DATA_LENGTH);
        let mut data = [0u8; MAX_DATA_LENGTH];
        data[..len].copy_from_slice(&payload[..len]);
        let mut packet = Self {
            command,
            data_length: len as u8,
            data,
            crc: 0,
        };
        packet.crc = packet.compute_crc();
        packet
    }

    /// The valid part of the payload
    pub fn payload(&self) -> &[u8] {
        &self.data[..(self.data_length as usize).min(MAX_DATA_LENGTH)]
    }

    /// Checksum over command, length and payload
    pub fn compute_crc(&self) -> u16 {
        let mut header = [0u8; MAX_DATA_LENGTH + 2];
        header[0] = self.command;
        header[1] = self.data_length;
        let payload = self.payload();
        header[2..2 + payload.len()].copy_from_slice(payload);
        crc16(&header[..2 + payload.len()], CRC_SEED)
    }

    /// Wire bytes: command, length, payload, CRC low, CRC high
    pub fn encode(&self) -> Vec<u8> {
        let payload = self.payload();
        let mut out = Vec::with_capacity(payload.len() + PACKET_OVERHEAD);
        out.push(self.command);
        out.push(payload.len() as u8);
        out.extend_from_slice(payload);
        out.extend_from_slice(&self.crc.to_le_bytes());
        out
    }

    pub fn kind(&self) -> PacketKind {
        match self.command & tag::MASK {
            tag::REQUEST => PacketKind::Request,
            tag::ACK => PacketKind::Ack,
            tag::REPORT => PacketKind::Report,
            _ => PacketKind::Error,
        }
    }

    /// Operation id without the type tag
    pub fn operation(&self) -> u8 {
        self.command & tag::OPERATION_MASK
    }

    pub fn is_key_activity(&self) -> bool {
        self.command == tag::KEY_ACTIVITY
    }

    pub fn is_ack_for(&self, command: u8) -> bool {
        self.command == tag::ACK | (command & tag::OPERATION_MASK)
    }

    pub fn is_error_for(&self, command: u8) -> bool {
        self.command == tag::ERROR | (command & tag::OPERATION_MASK)
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("command", &format_args!("0x{:02X}", self.command))
            .field("name", &cmd::name(self.command))
            .field("data", &format_args!("{:02x?}", self.payload()))
            .field("crc", &format_args!("0x{:04X}", self.crc))
            .finish()
    }
}
