//! Long-running command handlers.
//!
//! Both run the display on a [`DisplayWorker`] and stop on Ctrl-C.

use super::{CommandResult, Session};
use cfontz_display::{Driver, Key};
use cfontz_driver::worker::DisplayWorker;
use crossterm::style::Stylize;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

/// Refresh interval while only watching keys
const KEY_REFRESH: Duration = Duration::from_millis(50);

/// Contrast change per Up/Down press in the demo
const CONTRAST_STEP: u16 = 50;

/// Print key presses until Ctrl-C
pub async fn keys(session: &Session) -> CommandResult {
    let display = session.open_display()?;
    let worker = DisplayWorker::spawn(display, KEY_REFRESH)?;
    let mut keys = worker.subscribe_keys();

    println!("Press keys on the module, Ctrl-C to stop");
    loop {
        tokio::select! {
            key = keys.recv() => match key {
                Ok(key) => println!("{}", key.name().green()),
                Err(RecvError::Lagged(n)) => warn!("Missed {} key events", n),
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    let status = worker.status();
    info!("{} refreshes, {} keys", status.ticks, status.keys);
    worker.shutdown().await?;
    Ok(())
}

/// UTC wall clock as HH:MM:SS
fn clock_text(now: SystemTime) -> String {
    let secs = now.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0) % 86_400;
    format!("{:02}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60)
}

/// Triangle wave over 0..=1000 with a period of `steps` frames
fn sweep(frame: u64, steps: u64) -> u32 {
    let half = steps / 2;
    let pos = frame % steps;
    let rising = if pos <= half { pos } else { steps - pos };
    (rising * 1000 / half) as u32
}

/// Draw one demo frame: clock and last key on top, a sweeping bar below
fn draw_frame<D: Driver>(display: &mut D, frame: u64, last_key: Option<Key>) -> anyhow::Result<()> {
    let width = display.width();
    let blank = " ".repeat(width);

    display.string(1, 1, &blank);
    display.string(1, 1, &clock_text(SystemTime::now()));
    if let Some(key) = last_key {
        let name = key.name();
        display.string((width - name.len().min(width)) as i32 + 1, 1, name);
    }

    let bar_row = display.height().min(2) as i32;
    if bar_row > 1 {
        display.string(1, bar_row, &blank);
        display.hbar(1, bar_row, width, sweep(frame, 40))?;
    }
    Ok(())
}

/// Clock, bar and key echo until Ctrl-C or Escape
pub async fn demo(session: &Session, interval_ms: u64) -> CommandResult {
    let refresh = Duration::from_millis(interval_ms.max(10));
    let display = session.open_display()?;
    let worker = DisplayWorker::spawn(display, refresh)?;
    let mut keys = worker.subscribe_keys();
    let mut ticker = tokio::time::interval(refresh);
    let mut frame = 0u64;
    let mut last_key = None;

    println!("Demo running; Up/Down change contrast, Escape or Ctrl-C stops");
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                frame += 1;
                let result = worker.call(move |d| draw_frame(d, frame, last_key)).await?;
                if let Err(e) = result {
                    warn!("Drawing frame {} failed: {}", frame, e);
                }
            }
            key = keys.recv() => match key {
                Ok(Key::Escape) | Err(RecvError::Closed) => break,
                Ok(key) => {
                    last_key = Some(key);
                    if matches!(key, Key::Up | Key::Down) {
                        let result = worker.call(move |d| {
                            let current = d.get_contrast();
                            let next = if key == Key::Up {
                                (current + CONTRAST_STEP).min(1000)
                            } else {
                                current.saturating_sub(CONTRAST_STEP)
                            };
                            d.set_contrast(next).map(|_| next)
                        }).await?;
                        match result {
                            Ok(contrast) => info!("Contrast {}", contrast),
                            Err(e) => warn!("Contrast change failed: {}", e),
                        }
                    }
                }
                Err(RecvError::Lagged(n)) => warn!("Missed {} key events", n),
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    let status = worker.status();
    info!(
        "{} refreshes, {} flush errors, {} keys",
        status.ticks, status.flush_errors, status.keys
    );
    let mut display = worker.shutdown().await?;
    display.clear();
    display.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_text() {
        let t = UNIX_EPOCH + Duration::from_secs(86_400 * 3 + 3600 * 13 + 60 * 7 + 9);
        assert_eq!(clock_text(t), "13:07:09");
    }

    #[test]
    fn test_sweep_is_triangle() {
        assert_eq!(sweep(0, 40), 0);
        assert_eq!(sweep(10, 40), 500);
        assert_eq!(sweep(20, 40), 1000);
        assert_eq!(sweep(30, 40), 500);
        assert_eq!(sweep(40, 40), 0);
    }
}
