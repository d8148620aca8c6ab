//! Query (read-only) command handlers.

use super::{CommandResult, Session};
use anyhow::{bail, Context};
use cfontz_display::Driver;
use cfontz_transport::{crc16, Delivery, CRC_SEED};
use std::time::Instant;

/// Show model, firmware version and transport counters
pub fn info(session: &Session) -> CommandResult {
    let mut display = session.connect()?;
    let model = display.model();
    println!("{}", display.get_info());
    println!(
        "Size:      {}x{} ({}x{} pixel cells)",
        display.width(),
        display.height(),
        model.cell_width,
        model.cell_height
    );
    println!("Device:    {}", session.config.device.display());

    match display.firmware_version()? {
        Some(version) => println!("Firmware:  {version}"),
        None => println!("Firmware:  (not acknowledged)"),
    }

    let stats = serde_json::to_string_pretty(&display.stats())?;
    println!("Transport: {stats}");
    Ok(())
}

/// Ping the module `count` times
pub fn ping(session: &Session, count: u32) -> CommandResult {
    let mut display = session.connect()?;
    let mut acknowledged = 0;

    for n in 1..=count {
        let start = Instant::now();
        match display.ping() {
            Ok(Delivery::Acknowledged(_)) => {
                acknowledged += 1;
                println!("ping {n}: ack in {:.1}ms", start.elapsed().as_secs_f64() * 1000.0);
            }
            Ok(Delivery::Unconfirmed) => println!("ping {n}: sent (not waiting for ack)"),
            Err(e) => println!("ping {n}: {e}"),
        }
    }

    let stats = display.stats();
    println!(
        "{acknowledged}/{count} acknowledged, {} timeouts, {} bytes discarded",
        stats.timeouts, stats.discarded_bytes
    );
    Ok(())
}

/// Parse "0d 01 19", "0d0119" or "0x0d,0x01" into bytes
pub fn parse_hex_bytes(parts: &[String]) -> anyhow::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    for part in parts {
        for token in part.split([' ', ',', ':']).filter(|t| !t.is_empty()) {
            let digits = token
                .strip_prefix("0x")
                .or_else(|| token.strip_prefix("0X"))
                .unwrap_or(token);
            if digits.len() % 2 != 0 {
                bail!("odd number of hex digits in {token:?}");
            }
            for i in (0..digits.len()).step_by(2) {
                let pair = digits.get(i..i + 2).context("non-ASCII hex input")?;
                let byte = u8::from_str_radix(pair, 16)
                    .with_context(|| format!("invalid hex byte {pair:?}"))?;
                bytes.push(byte);
            }
        }
    }
    Ok(bytes)
}

/// Print the packet CRC of some bytes
pub fn crc(parts: &[String]) -> CommandResult {
    let bytes = parse_hex_bytes(parts)?;
    let crc = crc16(&bytes, CRC_SEED);
    let hex: Vec<String> = bytes.iter().map(|b| format!("{b:02X}")).collect();
    println!("Data: {}", hex.join(" "));
    println!("CRC:  0x{:04X} (wire: {:02X} {:02X})", crc, crc & 0xFF, crc >> 8);
    Ok(())
}
