//! End-to-end exchanges against a scripted module

use cfontz_transport::protocol::{key, tag};
use cfontz_transport::{
    cmd, Delivery, Packet, PacketObserver, ResponseMode, ScriptedLink, Transport, TransportError,
};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[test]
fn contrast_request_and_ack_on_the_wire() {
    let link = ScriptedLink::new();
    link.queue_reply(vec![0x4D, 0x00, 0x59, 0xF9]);
    let handle = link.handle();

    let mut transport = Transport::new(link);
    let delivery = transport.send(cmd::SET_CONTRAST, &[25]).unwrap();

    assert_eq!(handle.written(), vec![vec![0x0D, 0x01, 0x19, 0x2B, 0xAD]]);
    let ack = delivery.packet().unwrap();
    assert_eq!(ack.command, 0x4D);
    assert_eq!(ack.data_length, 0);
}

#[test]
fn ack_found_behind_corrupt_plausible_header() {
    let link = ScriptedLink::new();
    link.queue_reply(vec![0x05, 0x04, 0x00, 0x00, 0x4D, 0x00, 0x59, 0xF9]);

    let mut transport = Transport::new(link);
    let delivery = transport.send(cmd::SET_CONTRAST, &[25]).unwrap();

    assert!(delivery.packet().unwrap().is_ack_for(cmd::SET_CONTRAST));
    let stats = transport.stats();
    assert_eq!(stats.discarded_bytes, 4);
    assert_eq!(stats.acknowledged, 1);
    assert_eq!(stats.unexpected_packets, 0);
}

#[test]
fn split_corrupt_header_is_resolved_once_the_rest_arrives() {
    let link = ScriptedLink::new();
    let handle = link.handle();
    link.queue_reply(vec![0x05, 0x04, 0x00, 0x00]);

    let mut transport = Transport::with_mode(link, ResponseMode::from_config(30, 250));
    let err = transport.send(cmd::SET_CONTRAST, &[25]).unwrap_err();
    assert!(matches!(err, TransportError::Timeout { command: cmd::SET_CONTRAST }));
    assert_eq!(transport.stats().discarded_bytes, 0);

    handle.inject(&[0x4D, 0x00, 0x59, 0xF9]);
    let late = transport.receive(Duration::from_millis(50)).unwrap().unwrap();
    assert!(late.is_ack_for(cmd::SET_CONTRAST));
    assert_eq!(transport.stats().discarded_bytes, 4);
}

#[test]
fn timeout_then_late_reply_is_still_parsed() {
    let link = ScriptedLink::new();
    let handle = link.handle();
    let ack = Packet::new(tag::ACK | cmd::SET_CONTRAST, &[]).encode();
    link.queue_reply(ack[..2].to_vec());

    let mut transport = Transport::new(link);
    let started = Instant::now();
    let err = transport.send(cmd::SET_CONTRAST, &[25]).unwrap_err();
    let elapsed = started.elapsed();

    assert!(matches!(err, TransportError::Timeout { command: cmd::SET_CONTRAST }));
    assert!(elapsed >= Duration::from_millis(250), "{elapsed:?}");
    assert!(elapsed < Duration::from_secs(2), "{elapsed:?}");

    handle.inject(&ack[2..]);
    let late = transport.receive(Duration::from_millis(50)).unwrap().unwrap();
    assert!(late.is_ack_for(cmd::SET_CONTRAST));
}

#[test]
fn keys_survive_garbage_and_command_traffic() {
    let link = ScriptedLink::new();
    let mut reply = vec![0xFF, 0xFE, 0x3F];
    reply.extend(Packet::new(tag::KEY_ACTIVITY, &[key::UP_PRESS]).encode());
    reply.push(0xEE);
    reply.extend(Packet::new(tag::KEY_ACTIVITY, &[key::UP_RELEASE]).encode());
    reply.extend(Packet::new(tag::ACK | cmd::PING, &[]).encode());
    link.queue_reply(reply);

    let mut transport = Transport::new(link);
    assert!(matches!(
        transport.send_zero_byte(cmd::PING).unwrap(),
        Delivery::Acknowledged(_)
    ));
    assert_eq!(transport.pop_key(), Some(key::UP_PRESS));
    assert_eq!(transport.pop_key(), Some(key::UP_RELEASE));
    assert_eq!(transport.pop_key(), None);
    assert_eq!(transport.stats().discarded_bytes, 4);
}

#[derive(Default)]
struct Recorder {
    events: Arc<Mutex<Vec<String>>>,
}

impl PacketObserver for Recorder {
    fn on_send(&self, packet: &Packet) {
        self.events.lock().unwrap().push(format!("send {:02x}", packet.command));
    }

    fn on_receive(&self, packet: &Packet) {
        self.events.lock().unwrap().push(format!("recv {:02x}", packet.command));
    }

    fn on_unexpected(&self, packet: &Packet) {
        self.events.lock().unwrap().push(format!("stray {:02x}", packet.command));
    }

    fn on_timeout(&self, command: u8) {
        self.events.lock().unwrap().push(format!("timeout {command:02x}"));
    }
}

#[test]
fn observer_reports_each_packet_once() {
    let link = ScriptedLink::new();
    let mut reply = Packet::new(tag::FAN_REPORT, &[0, 0, 0, 0]).encode();
    reply.extend(Packet::new(tag::KEY_ACTIVITY, &[key::ENTER_PRESS]).encode());
    reply.extend(Packet::new(tag::ACK | cmd::CLEAR_SCREEN, &[]).encode());
    link.queue_reply(reply);

    let recorder = Recorder::default();
    let events = Arc::clone(&recorder.events);
    let mut transport = Transport::with_mode(
        link,
        ResponseMode::WaitForAck {
            timeout: Duration::from_millis(10),
            poll_interval: Duration::from_micros(250),
        },
    );
    transport.set_observer(Box::new(recorder));

    transport.send_zero_byte(cmd::CLEAR_SCREEN).unwrap();
    let _ = transport.send_zero_byte(cmd::PING);

    assert_eq!(
        *events.lock().unwrap(),
        vec![
            "send 06",
            "stray 81",
            "recv 80",
            "recv 46",
            "send 00",
            "timeout 00"
        ]
    );
    assert_eq!(transport.stats().unexpected_packets, 1);
}
