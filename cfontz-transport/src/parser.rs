//! Packet framer with one-byte resynchronisation
//!
//! The stream has no start marker, so framing is recovered by trying to read
//! a packet at the committed position and, when the header is implausible or
//! the checksum does not match, discarding exactly one byte and trying again.

use crate::crc::{crc16, CRC_SEED};
use crate::link::Link;
use crate::packet::Packet;
use crate::protocol::{tag, MAX_COMMAND, MAX_DATA_LENGTH, PACKET_OVERHEAD};
use crate::receive_buffer::ReceiveBuffer;
use crate::TransportError;
use std::time::Duration;
use tracing::trace;

/// Result of one parse attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    /// Not enough data for a packet yet
    GiveUp,
    /// A byte was discarded while resynchronising; call again right away
    TryAgain { discarded: u8 },
    /// A CRC-valid packet was consumed from the buffer
    Packet(Packet),
}

#[derive(Default)]
pub struct PacketParser {
    buffer: ReceiveBuffer,
    discarded: u64,
}

impl PacketParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_buffer(buffer: ReceiveBuffer) -> Self {
        Self {
            buffer,
            discarded: 0,
        }
    }

    pub fn buffer(&self) -> &ReceiveBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut ReceiveBuffer {
        &mut self.buffer
    }

    /// Bytes thrown away while resynchronising since creation
    pub fn discarded_bytes(&self) -> u64 {
        self.discarded
    }

    pub fn reset(&mut self) {
        self.buffer.reset();
    }

    /// Read once from `link` (waiting at most `wait`) and try to extract a packet.
    pub fn poll<L: Link + ?Sized>(
        &mut self,
        link: &mut L,
        wait: Duration,
    ) -> Result<ParseOutcome, TransportError> {
        self.buffer.fill(link, MAX_DATA_LENGTH, wait)?;
        Ok(self.parse_buffered())
    }

    /// Try to extract a packet from what is already buffered.
    pub fn parse_buffered(&mut self) -> ParseOutcome {
        if self.buffer.bytes_available() < PACKET_OVERHEAD {
            return ParseOutcome::GiveUp;
        }

        self.buffer.sync_peek();

        let command = self.buffer.peek_byte();
        if command & tag::OPERATION_MASK > MAX_COMMAND {
            return self.discard("command out of range");
        }

        let length = self.buffer.peek_byte();
        if length as usize > MAX_DATA_LENGTH {
            return self.discard("length out of range");
        }

        if self.buffer.peek_bytes_available() < length as usize + 2 {
            return ParseOutcome::GiveUp;
        }

        let mut data = [0u8; MAX_DATA_LENGTH];
        for slot in data.iter_mut().take(length as usize) {
            *slot = self.buffer.peek_byte();
        }
        let received = u16::from_le_bytes([self.buffer.peek_byte(), self.buffer.peek_byte()]);

        let mut covered = [0u8; MAX_DATA_LENGTH + 2];
        covered[0] = command;
        covered[1] = length;
        covered[2..2 + length as usize].copy_from_slice(&data[..length as usize]);
        let expected = crc16(&covered[..2 + length as usize], CRC_SEED);

        if expected != received {
            return self.discard("crc mismatch");
        }

        self.buffer.accept_peeked();
        ParseOutcome::Packet(Packet {
            command,
            data_length: length,
            data,
            crc: received,
        })
    }

    fn discard(&mut self, reason: &str) -> ParseOutcome {
        let byte = self.buffer.get_byte();
        self.discarded += 1;
        trace!("resync: dropped 0x{byte:02X} ({reason})");
        ParseOutcome::TryAgain { discarded: byte }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::cmd;

    fn parser_with(bytes: &[u8]) -> PacketParser {
        let mut parser = PacketParser::new();
        parser.buffer_mut().extend_from_slice(bytes);
        parser
    }

    fn drain(parser: &mut PacketParser) -> (usize, Vec<Packet>) {
        let mut retries = 0;
        let mut packets = Vec::new();
        loop {
            match parser.parse_buffered() {
                ParseOutcome::GiveUp => return (retries, packets),
                ParseOutcome::TryAgain { .. } => retries += 1,
                ParseOutcome::Packet(p) => packets.push(p),
            }
        }
    }

    #[test]
    fn test_clean_packet() {
        let packet = Packet::new(tag::ACK | cmd::SET_CONTRAST, &[]);
        let mut parser = parser_with(&packet.encode());
        assert_eq!(parser.parse_buffered(), ParseOutcome::Packet(packet));
        assert_eq!(parser.buffer().bytes_available(), 0);
    }

    #[test]
    fn test_resync_after_garbage() {
        let packet = Packet::new(tag::ACK | cmd::PING, &[1, 2, 3]);
        for k in [0usize, 1, 5, 100] {
            let mut stream = vec![0xFF; k];
            stream.extend_from_slice(&packet.encode());
            let mut parser = parser_with(&stream);
            let (retries, packets) = drain(&mut parser);
            assert_eq!(retries, k, "garbage prefix of {k}");
            assert_eq!(packets, vec![packet]);
            assert_eq!(parser.discarded_bytes(), k as u64);
        }
    }

    #[test]
    fn test_crc_corruption_drops_one_byte() {
        let mut bytes = Packet::new(tag::ACK | cmd::SET_CONTRAST, &[]).encode();
        bytes[2] ^= 0x01;
        let mut parser = parser_with(&bytes);
        let before = parser.buffer().bytes_available();
        assert_eq!(
            parser.parse_buffered(),
            ParseOutcome::TryAgain { discarded: 0x4D }
        );
        assert_eq!(parser.buffer().bytes_available(), before - 1);
        let (_, packets) = drain(&mut parser);
        assert!(packets.is_empty());
    }

    #[test]
    fn test_resync_after_plausible_header() {
        // legal command and length, wrong CRC, then the contrast ack
        let mut parser = parser_with(&[0x05, 0x04, 0x00, 0x00, 0x4D, 0x00, 0x59, 0xF9]);
        for expected in [0x05, 0x04, 0x00, 0x00] {
            assert_eq!(
                parser.parse_buffered(),
                ParseOutcome::TryAgain { discarded: expected }
            );
        }
        match parser.parse_buffered() {
            ParseOutcome::Packet(p) => assert!(p.is_ack_for(cmd::SET_CONTRAST)),
            other => panic!("expected the ack, got {other:?}"),
        }
        assert_eq!(parser.parse_buffered(), ParseOutcome::GiveUp);
        assert_eq!(parser.discarded_bytes(), 4);
    }

    #[test]
    fn test_plausible_header_waits_for_its_length() {
        // the bogus header claims 4 data bytes, so nothing is dropped until
        // enough has arrived to check its CRC
        let mut parser = parser_with(&[0x05, 0x04, 0x00, 0x00, 0x4D, 0x00]);
        assert_eq!(parser.parse_buffered(), ParseOutcome::GiveUp);
        assert_eq!(parser.discarded_bytes(), 0);
        assert_eq!(parser.buffer().bytes_available(), 6);

        parser.buffer_mut().extend_from_slice(&[0x59, 0xF9]);
        let (retries, packets) = drain(&mut parser);
        assert_eq!(retries, 4);
        assert_eq!(packets.len(), 1);
        assert!(packets[0].is_ack_for(cmd::SET_CONTRAST));
    }

    #[test]
    fn test_oversized_length_is_rejected() {
        let mut parser = parser_with(&[cmd::PING, 0x30, 0, 0, 0]);
        assert_eq!(
            parser.parse_buffered(),
            ParseOutcome::TryAgain { discarded: cmd::PING }
        );
    }

    #[test]
    fn test_partial_packet_waits() {
        let bytes = Packet::new(tag::ACK | cmd::GET_VERSION, b"CFA633:h1.4,k1.9").encode();
        let mut parser = parser_with(&bytes[..8]);
        assert_eq!(parser.parse_buffered(), ParseOutcome::GiveUp);
        assert_eq!(parser.buffer().bytes_available(), 8);
        parser.buffer_mut().extend_from_slice(&bytes[8..]);
        assert!(matches!(parser.parse_buffered(), ParseOutcome::Packet(_)));
    }

    #[test]
    fn test_fewer_than_four_bytes() {
        let mut parser = parser_with(&[0x40, 0x00, 0x11]);
        assert_eq!(parser.parse_buffered(), ParseOutcome::GiveUp);
        assert_eq!(parser.discarded_bytes(), 0);
    }

    #[test]
    fn test_back_to_back_packets() {
        let a = Packet::new(tag::KEY_ACTIVITY, &[5]);
        let b = Packet::new(tag::ACK | cmd::CLEAR_SCREEN, &[]);
        let mut stream = a.encode();
        stream.extend_from_slice(&b.encode());
        let mut parser = parser_with(&stream);
        let (retries, packets) = drain(&mut parser);
        assert_eq!(retries, 0);
        assert_eq!(packets, vec![a, b]);
    }
}
