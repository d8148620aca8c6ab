//! Setting command handlers.

use super::{parse_number, CommandResult, Session};
use crate::cli::BacklightArg;
use anyhow::bail;
use cfontz_display::{Backlight, Driver};

/// Blank the screen
pub fn clear(session: &Session) -> CommandResult {
    let mut display = session.connect()?;
    display.hardware_clear()?;
    println!("Screen cleared");
    Ok(())
}

/// Reinitialize and show `text` on `row` starting at `column`
pub fn text(session: &Session, row: u8, column: u8, text: &str) -> CommandResult {
    let mut display = session.open_display()?;
    if row as usize > display.height() {
        bail!("row {} is past the last row ({})", row, display.height());
    }
    display.string(column as i32, row as i32, text);
    display.flush()?;
    Ok(())
}

pub fn contrast(session: &Session, promille: u16) -> CommandResult {
    let mut display = session.connect()?;
    display.set_contrast(promille)?;
    println!("Contrast set to {promille}");
    Ok(())
}

pub fn backlight(session: &Session, state: BacklightArg, brightness: Option<u16>) -> CommandResult {
    let mut display = session.connect()?;
    let state = match state {
        BacklightArg::On => Backlight::On,
        BacklightArg::Off => Backlight::Off,
    };
    if let Some(brightness) = brightness {
        display.set_brightness(state, brightness)?;
    }
    display.backlight(state)?;
    println!(
        "Backlight {:?} (brightness {})",
        state,
        display.get_brightness(state)
    );
    Ok(())
}

pub fn leds(session: &Session, mask: &str) -> CommandResult {
    let mask = parse_number(mask)?;
    if mask > 0xFF {
        bail!("LED mask 0x{mask:X} has more than 8 bits");
    }
    let mut display = session.connect()?;
    if !display.model().has_leds() {
        println!("{} has no status LEDs", display.model().name());
        return Ok(());
    }
    display.output(mask as u16)?;
    println!("LEDs set to 0x{mask:02X}");
    Ok(())
}

/// Reboot the module, then bring it back to a known state
pub fn reboot(session: &Session) -> CommandResult {
    let mut display = session.connect()?;
    println!("Rebooting {}...", display.model().name());
    display.reboot()?;
    display.init()?;
    println!("Done");
    Ok(())
}

pub fn store_boot(session: &Session) -> CommandResult {
    let mut display = session.connect()?;
    display.store_boot_state()?;
    println!("Boot state stored");
    Ok(())
}
