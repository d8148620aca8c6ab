//! Scripted in-memory link for exercising the protocol without hardware

use crate::link::Link;
use crate::packet::Packet;
use crate::parser::{PacketParser, ParseOutcome};
use crate::protocol::{cmd, tag};
use crate::TransportError;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct Script {
    written: Vec<Vec<u8>>,
    incoming: VecDeque<u8>,
    replies: VecDeque<Vec<u8>>,
    auto_ack: bool,
    version: Vec<u8>,
    disconnected: bool,
}

/// A [`Link`] that records every write and plays back scripted device output.
///
/// Replies can be queued per write ([`ScriptedLink::queue_reply`]), injected at
/// any time ([`ScriptedHandle::inject`]), or generated automatically with
/// [`ScriptedLink::auto_ack`], which answers each request with its
/// acknowledgement the way an idle module does.
pub struct ScriptedLink {
    script: Arc<Mutex<Script>>,
}

/// Shared view of a [`ScriptedLink`] that stays usable after the link has
/// been moved into a transport or onto another thread.
#[derive(Clone)]
pub struct ScriptedHandle {
    script: Arc<Mutex<Script>>,
}

impl Default for ScriptedLink {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedLink {
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(Script {
                version: b"CFA633:h1.5,k1.9".to_vec(),
                ..Default::default()
            })),
        }
    }

    /// A link that acknowledges every request
    pub fn auto_ack() -> Self {
        let link = Self::new();
        link.script.lock().auto_ack = true;
        link
    }

    /// Set the version string returned for `GET_VERSION` in auto-ack mode
    pub fn with_version(self, version: &str) -> Self {
        self.script.lock().version = version.as_bytes().to_vec();
        self
    }

    pub fn handle(&self) -> ScriptedHandle {
        ScriptedHandle {
            script: Arc::clone(&self.script),
        }
    }

    /// Bytes the device will emit in response to the next write
    pub fn queue_reply(&self, bytes: impl Into<Vec<u8>>) {
        self.script.lock().replies.push_back(bytes.into());
    }

    pub fn inject(&self, bytes: &[u8]) {
        self.handle().inject(bytes);
    }

    pub fn written(&self) -> Vec<Vec<u8>> {
        self.handle().written()
    }

    pub fn written_packets(&self) -> Vec<Packet> {
        self.handle().written_packets()
    }
}

impl ScriptedHandle {
    /// Make bytes readable immediately
    pub fn inject(&self, bytes: &[u8]) {
        self.script.lock().incoming.extend(bytes.iter().copied());
    }

    pub fn queue_reply(&self, bytes: impl Into<Vec<u8>>) {
        self.script.lock().replies.push_back(bytes.into());
    }

    pub fn set_auto_ack(&self, enabled: bool) {
        self.script.lock().auto_ack = enabled;
    }

    /// Fail every following read and write
    pub fn disconnect(&self) {
        self.script.lock().disconnected = true;
    }

    /// Each `write_all` call, in order
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.script.lock().written.clone()
    }

    /// Every CRC-valid packet the host has written so far
    pub fn written_packets(&self) -> Vec<Packet> {
        let mut parser = PacketParser::new();
        let mut packets = Vec::new();
        for chunk in self.written() {
            parser.buffer_mut().extend_from_slice(&chunk);
            loop {
                match parser.parse_buffered() {
                    ParseOutcome::Packet(packet) => packets.push(packet),
                    ParseOutcome::TryAgain { .. } => continue,
                    ParseOutcome::GiveUp => break,
                }
            }
        }
        packets
    }

    /// Commands of the written packets, in order
    pub fn written_commands(&self) -> Vec<u8> {
        self.written_packets().iter().map(|p| p.command).collect()
    }

    pub fn clear_written(&self) {
        self.script.lock().written.clear();
    }

    pub fn pending_input(&self) -> usize {
        self.script.lock().incoming.len()
    }
}

impl Link for ScriptedLink {
    fn write_all(&mut self, buf: &[u8]) -> Result<(), TransportError> {
        let mut script = self.script.lock();
        if script.disconnected {
            return Err(TransportError::Disconnected);
        }
        script.written.push(buf.to_vec());

        if let Some(reply) = script.replies.pop_front() {
            script.incoming.extend(reply);
        } else if script.auto_ack && buf.len() >= 2 {
            let operation = buf[0] & tag::OPERATION_MASK;
            let payload = if operation == cmd::GET_VERSION {
                script.version.clone()
            } else {
                Vec::new()
            };
            let ack = Packet::new(tag::ACK | operation, &payload).encode();
            script.incoming.extend(ack);
        }
        Ok(())
    }

    fn read_available(&mut self, buf: &mut [u8], wait: Duration) -> Result<usize, TransportError> {
        {
            let mut script = self.script.lock();
            if script.disconnected {
                return Err(TransportError::Disconnected);
            }
            if !script.incoming.is_empty() {
                let n = buf.len().min(script.incoming.len());
                for (slot, byte) in buf.iter_mut().zip(script.incoming.drain(..n)) {
                    *slot = byte;
                }
                return Ok(n);
            }
        }
        if !wait.is_zero() {
            std::thread::sleep(wait);
        }
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_ack_answers_requests() {
        let mut link = ScriptedLink::auto_ack();
        link.write_all(&Packet::new(cmd::CLEAR_SCREEN, &[]).encode())
            .unwrap();
        let mut buf = [0u8; 16];
        let n = link.read_available(&mut buf, Duration::ZERO).unwrap();
        assert_eq!(&buf[..n], Packet::new(0x46, &[]).encode().as_slice());
    }

    #[test]
    fn test_queued_reply_takes_priority() {
        let mut link = ScriptedLink::auto_ack();
        link.queue_reply(vec![1, 2, 3]);
        link.write_all(&Packet::new(cmd::PING, &[]).encode()).unwrap();
        let mut buf = [0u8; 16];
        assert_eq!(link.read_available(&mut buf, Duration::ZERO).unwrap(), 3);
    }

    #[test]
    fn test_written_packets() {
        let mut link = ScriptedLink::new();
        link.write_all(&Packet::new(cmd::PING, b"hi").encode()).unwrap();
        link.write_all(&Packet::new(cmd::SET_CONTRAST, &[25]).encode())
            .unwrap();
        assert_eq!(link.handle().written_commands(), vec![cmd::PING, cmd::SET_CONTRAST]);
        assert_eq!(link.written_packets()[1].payload(), &[25]);
    }

    #[test]
    fn test_disconnect() {
        let mut link = ScriptedLink::new();
        link.handle().disconnect();
        assert!(matches!(
            link.write_all(&[0, 0, 0, 0]),
            Err(TransportError::Disconnected)
        ));
    }
}
