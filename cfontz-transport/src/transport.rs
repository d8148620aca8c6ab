//! Request/acknowledge transport over a [`Link`]
//!
//! Every request is written as one packet and, in the default mode, followed
//! by a bounded wait for the matching acknowledgement. Key activity reports
//! that arrive in the meantime are siphoned into the key ring so they are
//! never lost behind command traffic.

use crate::key_ring::KeyRing;
use crate::link::Link;
use crate::packet::{Packet, PacketKind};
use crate::parser::{PacketParser, ParseOutcome};
use crate::protocol::{cmd, timing, MAX_DATA_LENGTH};
use crate::TransportError;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// How `send` treats the device's reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// Block until the acknowledgement arrives or `timeout` passes
    WaitForAck {
        timeout: Duration,
        poll_interval: Duration,
    },
    /// Write and return; replies are drained opportunistically
    FireAndForget,
}

impl Default for ResponseMode {
    fn default() -> Self {
        Self::WaitForAck {
            timeout: Duration::from_millis(timing::RESPONSE_TIMEOUT_MS),
            poll_interval: Duration::from_micros(timing::POLL_INTERVAL_US),
        }
    }
}

impl ResponseMode {
    /// A zero timeout selects fire-and-forget
    pub fn from_config(timeout_ms: u64, poll_interval_us: u64) -> Self {
        if timeout_ms == 0 {
            Self::FireAndForget
        } else {
            Self::WaitForAck {
                timeout: Duration::from_millis(timeout_ms),
                poll_interval: Duration::from_micros(poll_interval_us.max(1)),
            }
        }
    }
}

/// Outcome of a successful send
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Acknowledged(Packet),
    Unconfirmed,
}

impl Delivery {
    pub fn packet(&self) -> Option<&Packet> {
        match self {
            Self::Acknowledged(packet) => Some(packet),
            Self::Unconfirmed => None,
        }
    }

    /// Acknowledgement payload; empty when unconfirmed
    pub fn payload(&self) -> &[u8] {
        self.packet().map(Packet::payload).unwrap_or(&[])
    }
}

/// Counters kept per connection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TransportStats {
    pub packets_sent: u64,
    pub acknowledged: u64,
    pub rejected: u64,
    pub timeouts: u64,
    pub key_events: u64,
    pub keys_dropped: u64,
    /// Reports and requests nobody asked for
    pub unexpected_packets: u64,
    /// Acknowledgements or error replies that arrived after their wait ended
    pub late_replies: u64,
    pub discarded_bytes: u64,
}

/// Hook for watching traffic (see [`PacketPrinter`](crate::PacketPrinter))
pub trait PacketObserver: Send {
    fn on_send(&self, _packet: &Packet) {}
    fn on_receive(&self, _packet: &Packet) {}
    fn on_unexpected(&self, _packet: &Packet) {}
    fn on_discard(&self, _byte: u8) {}
    fn on_timeout(&self, _command: u8) {}
}

pub struct Transport<L: Link> {
    link: L,
    parser: PacketParser,
    keys: KeyRing,
    mode: ResponseMode,
    stats: TransportStats,
    observer: Option<Box<dyn PacketObserver>>,
}

impl<L: Link> Transport<L> {
    pub fn new(link: L) -> Self {
        Self::with_mode(link, ResponseMode::default())
    }

    pub fn with_mode(link: L, mode: ResponseMode) -> Self {
        Self {
            link,
            parser: PacketParser::new(),
            keys: KeyRing::new(),
            mode,
            stats: TransportStats::default(),
            observer: None,
        }
    }

    pub fn response_mode(&self) -> ResponseMode {
        self.mode
    }

    pub fn set_response_mode(&mut self, mode: ResponseMode) {
        self.mode = mode;
    }

    pub fn set_observer(&mut self, observer: Box<dyn PacketObserver>) {
        self.observer = Some(observer);
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn into_inner(self) -> L {
        self.link
    }

    pub fn key_ring(&self) -> &KeyRing {
        &self.keys
    }

    pub fn parser(&self) -> &PacketParser {
        &self.parser
    }

    pub fn stats(&self) -> TransportStats {
        TransportStats {
            discarded_bytes: self.parser.discarded_bytes(),
            ..self.stats
        }
    }

    /// Empty the receive buffer and the key ring
    pub fn reset(&mut self) {
        self.parser.reset();
        self.keys.reset();
    }

    /// Oldest queued key code, if any
    pub fn pop_key(&mut self) -> Option<u8> {
        match self.keys.pop() {
            0 => None,
            code => Some(code),
        }
    }

    pub fn send_zero_byte(&mut self, command: u8) -> Result<Delivery, TransportError> {
        self.send(command, &[])
    }

    pub fn send_one_byte(&mut self, command: u8, value: u8) -> Result<Delivery, TransportError> {
        self.send(command, &[value])
    }

    /// Write one request and, unless fire-and-forget, wait for its acknowledgement.
    pub fn send(&mut self, command: u8, payload: &[u8]) -> Result<Delivery, TransportError> {
        if payload.len() > MAX_DATA_LENGTH {
            warn!(
                "Payload for 0x{:02X} truncated from {} to {} bytes",
                command,
                payload.len(),
                MAX_DATA_LENGTH
            );
        }

        let packet = Packet::new(command, payload);
        let bytes = packet.encode();
        trace!("tx {:02x?}", bytes);
        if let Some(observer) = &self.observer {
            observer.on_send(&packet);
        }
        self.link.write_all(&bytes)?;
        self.stats.packets_sent += 1;

        match self.mode {
            ResponseMode::FireAndForget => {
                self.poll_events()?;
                Ok(Delivery::Unconfirmed)
            }
            ResponseMode::WaitForAck {
                timeout,
                poll_interval,
            } => self.wait_for_reply(command, timeout, poll_interval),
        }
    }

    /// Drain everything decodable right now without sending.
    /// Returns the number of key events queued.
    pub fn poll_events(&mut self) -> Result<usize, TransportError> {
        let before = self.stats.key_events;
        loop {
            match self.poll_once(Duration::ZERO)? {
                ParseOutcome::GiveUp => break,
                ParseOutcome::TryAgain { .. } => continue,
                ParseOutcome::Packet(packet) => {
                    if !self.siphon_key(&packet) {
                        self.note_unclaimed(&packet);
                    }
                }
            }
        }
        Ok((self.stats.key_events - before) as usize)
    }

    /// Wait up to `wait` for the next packet that is not a key event.
    /// Key events seen on the way are queued as usual.
    pub fn receive(&mut self, wait: Duration) -> Result<Option<Packet>, TransportError> {
        let deadline = Instant::now() + wait;
        let poll_interval = match self.mode {
            ResponseMode::WaitForAck { poll_interval, .. } => poll_interval,
            ResponseMode::FireAndForget => Duration::from_micros(timing::POLL_INTERVAL_US),
        };
        let mut next_wait = Duration::ZERO;
        loop {
            match self.poll_once(next_wait)? {
                ParseOutcome::Packet(packet) if !self.siphon_key(&packet) => {
                    self.report_received(&packet);
                    return Ok(Some(packet));
                }
                ParseOutcome::GiveUp => next_wait = poll_interval,
                _ => next_wait = Duration::ZERO,
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
        }
    }

    fn wait_for_reply(
        &mut self,
        command: u8,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<Delivery, TransportError> {
        let deadline = Instant::now() + timeout;
        let mut wait = poll_interval;
        loop {
            match self.poll_once(wait)? {
                ParseOutcome::GiveUp => wait = poll_interval,
                ParseOutcome::TryAgain { .. } => wait = Duration::ZERO,
                ParseOutcome::Packet(packet) => {
                    wait = Duration::ZERO;
                    if self.siphon_key(&packet) {
                        // keep waiting
                    } else if packet.is_ack_for(command) {
                        self.report_received(&packet);
                        self.stats.acknowledged += 1;
                        return Ok(Delivery::Acknowledged(packet));
                    } else if packet.is_error_for(command) {
                        self.report_received(&packet);
                        self.stats.rejected += 1;
                        warn!(
                            "Device rejected 0x{:02X} ({})",
                            command,
                            cmd::name(command)
                        );
                        return Err(TransportError::Rejected { command });
                    } else {
                        self.note_unclaimed(&packet);
                    }
                }
            }

            if Instant::now() >= deadline {
                self.stats.timeouts += 1;
                if let Some(observer) = &self.observer {
                    observer.on_timeout(command);
                }
                warn!(
                    "No acknowledgement for 0x{:02X} ({}) within {:?}",
                    command,
                    cmd::name(command),
                    timeout
                );
                return Err(TransportError::Timeout { command });
            }
        }
    }

    /// Packets are reported to the observer by whoever claims them, so each
    /// one is seen exactly once: as received or as unexpected.
    fn poll_once(&mut self, wait: Duration) -> Result<ParseOutcome, TransportError> {
        let outcome = self.parser.poll(&mut self.link, wait)?;
        if let ParseOutcome::TryAgain { discarded } = &outcome {
            if let Some(observer) = &self.observer {
                observer.on_discard(*discarded);
            }
        }
        Ok(outcome)
    }

    fn report_received(&self, packet: &Packet) {
        if let Some(observer) = &self.observer {
            observer.on_receive(packet);
        }
    }

    /// Queue the key code carried by a key activity report.
    /// Returns false if the packet is something else.
    fn siphon_key(&mut self, packet: &Packet) -> bool {
        if !packet.is_key_activity() {
            return false;
        }
        self.report_received(packet);
        let code = packet.data[0];
        if packet.data_length == 0 || code == 0 {
            debug!("Ignoring empty key activity report");
        } else if self.keys.push(code) {
            self.stats.key_events += 1;
            debug!("Key activity {}", code);
        } else {
            self.stats.keys_dropped += 1;
            debug!("Key ring full, dropped key {}", code);
        }
        true
    }

    fn note_unclaimed(&mut self, packet: &Packet) {
        match packet.kind() {
            PacketKind::Ack | PacketKind::Error => {
                self.stats.late_replies += 1;
                trace!("Late reply {:?}", packet);
            }
            PacketKind::Request | PacketKind::Report => {
                self.stats.unexpected_packets += 1;
                debug!("Ignoring unexpected packet {:?}", packet);
            }
        }
        if let Some(observer) = &self.observer {
            observer.on_unexpected(packet);
        }
    }
}
