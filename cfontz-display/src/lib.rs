//! LCDproc-style display driver for CrystalFontz packet-protocol modules
//!
//! [`CfontzDisplay`] keeps a character framebuffer for the module, renders
//! text, bars, big numbers and icons into it, and sends only what changed on
//! [`Driver::flush`]. Everything goes through a
//! [`Transport`](cfontz_transport::Transport), so the same code drives a
//! serial port or a scripted link.

pub mod charmap;
pub mod driver;
pub mod error;
pub mod framebuffer;
pub mod glyphs;
pub mod keys;
pub mod model;

pub use charmap::Charmap;
pub use driver::{Backlight, CursorStyle, Driver};
pub use error::DisplayError;
pub use framebuffer::FrameBuffer;
pub use glyphs::{Bitmap, Icon, IconOutcome, NUM_CUSTOM_CHARS};
pub use keys::Key;
pub use model::CfaModel;

use cfontz_transport::protocol::{timing, REBOOT_MAGIC};
use cfontz_transport::{cmd, Delivery, Link, Transport, TransportStats, MAX_DATA_LENGTH};
use glyphs::{BarCell, BigCell};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_CONTRAST: u16 = 560;
pub const DEFAULT_BRIGHTNESS: u16 = 1000;
pub const DEFAULT_OFF_BRIGHTNESS: u16 = 0;

/// Largest supported dimension in either direction
pub const MAX_DIMENSION: usize = 256;

/// GPIO pins of the CFA-635 status LEDs: green top to bottom, then red
const CFA635_LEDS: [u8; 8] = [11, 9, 7, 5, 12, 10, 8, 6];

/// Which glyph set currently owns the custom characters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomCharMode {
    Standard,
    Vbar,
    Hbar,
    Bignum,
}

/// Per-display settings, usually taken from the configuration file
#[derive(Debug, Clone)]
pub struct DisplaySettings {
    pub model: &'static CfaModel,
    pub width: usize,
    pub height: usize,
    pub contrast: u16,
    pub brightness: u16,
    pub off_brightness: u16,
    /// CFA-633 firmware that only takes whole-line updates
    pub old_firmware: bool,
    /// Reboot the module during init
    pub reboot: bool,
}

impl DisplaySettings {
    /// Defaults for a model number
    pub fn for_model(number: u32) -> Result<Self, DisplayError> {
        let model = CfaModel::lookup(number)?;
        Ok(Self {
            model,
            width: model.width,
            height: model.height,
            contrast: DEFAULT_CONTRAST,
            brightness: DEFAULT_BRIGHTNESS,
            off_brightness: DEFAULT_OFF_BRIGHTNESS,
            old_firmware: false,
            reboot: false,
        })
    }

    fn validate(&self) -> Result<(), DisplayError> {
        if self.width == 0 || self.height == 0 {
            return Err(DisplayError::InvalidParameter(format!(
                "size {}x{} is empty",
                self.width, self.height
            )));
        }
        if self.width > MAX_DATA_LENGTH - 2 || self.height > MAX_DIMENSION {
            return Err(DisplayError::InvalidParameter(format!(
                "size {}x{} exceeds what one row update can carry",
                self.width, self.height
            )));
        }
        for (name, value) in [
            ("contrast", self.contrast),
            ("brightness", self.brightness),
            ("off_brightness", self.off_brightness),
        ] {
            if value > 1000 {
                return Err(DisplayError::InvalidParameter(format!(
                    "{name} {value} is outside 0..=1000"
                )));
            }
        }
        Ok(())
    }
}

fn check_promille(what: &str, promille: u16) -> Result<(), DisplayError> {
    if promille > 1000 {
        return Err(DisplayError::InvalidParameter(format!(
            "{what} {promille} is outside 0..=1000"
        )));
    }
    Ok(())
}

/// Latin-1 byte for a character, `?` when it has none
fn latin1(c: char) -> u8 {
    u8::try_from(c as u32).unwrap_or(b'?')
}

/// A CrystalFontz module driven through a packet transport
pub struct CfontzDisplay<L: Link> {
    transport: Transport<L>,
    settings: DisplaySettings,
    framebuffer: FrameBuffer,
    cc_mode: CustomCharMode,
    led_state: u16,
    reboot_delay: Duration,
}

impl<L: Link> CfontzDisplay<L> {
    /// Wrap a transport; nothing is sent until [`CfontzDisplay::init`].
    pub fn new(transport: Transport<L>, settings: DisplaySettings) -> Result<Self, DisplayError> {
        settings.validate()?;
        Ok(Self {
            framebuffer: FrameBuffer::new(settings.width, settings.height),
            transport,
            settings,
            cc_mode: CustomCharMode::Standard,
            led_state: 0xFFFF,
            reboot_delay: Duration::from_millis(timing::REBOOT_DELAY_MS),
        })
    }

    /// Bring the module into a known state: optional reboot, cursor hidden,
    /// contrast applied, live reports off, screen cleared, LEDs off.
    pub fn init(&mut self) -> Result<(), DisplayError> {
        self.transport.reset();
        self.framebuffer = FrameBuffer::new(self.settings.width, self.settings.height);
        self.cc_mode = CustomCharMode::Standard;

        if self.settings.reboot {
            info!("Rebooting {}", self.settings.model.name());
            self.reboot()?;
            self.settings.reboot = false;
        }

        self.hide_cursor()?;
        self.set_contrast(self.settings.contrast)?;
        self.stop_live_display()?;
        self.hardware_clear()?;
        self.led_state = 0xFFFF;
        self.output(0)?;

        info!(
            "{} ready ({}x{})",
            self.settings.model.name(),
            self.settings.width,
            self.settings.height
        );
        Ok(())
    }

    pub fn model(&self) -> &'static CfaModel {
        self.settings.model
    }

    pub fn settings(&self) -> &DisplaySettings {
        &self.settings
    }

    pub fn framebuffer(&self) -> &FrameBuffer {
        &self.framebuffer
    }

    pub fn custom_char_mode(&self) -> CustomCharMode {
        self.cc_mode
    }

    pub fn transport(&self) -> &Transport<L> {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut Transport<L> {
        &mut self.transport
    }

    pub fn stats(&self) -> TransportStats {
        self.transport.stats()
    }

    /// Time to wait after a reboot before talking to the module again
    pub fn set_reboot_delay(&mut self, delay: Duration) {
        self.reboot_delay = delay;
    }

    /// Release the link
    pub fn close(self) -> L {
        self.transport.into_inner()
    }

    pub fn ping(&mut self) -> Result<Delivery, DisplayError> {
        Ok(self.transport.send_zero_byte(cmd::PING)?)
    }

    /// Hardware and firmware version string, e.g. `CFA633:h1.5,k1.9`.
    /// `None` in fire-and-forget mode.
    pub fn firmware_version(&mut self) -> Result<Option<String>, DisplayError> {
        let delivery = self.transport.send_zero_byte(cmd::GET_VERSION)?;
        Ok(delivery
            .packet()
            .map(|p| String::from_utf8_lossy(p.payload()).trim().to_string()))
    }

    pub fn reboot(&mut self) -> Result<(), DisplayError> {
        self.transport.send(cmd::REBOOT, &REBOOT_MAGIC)?;
        std::thread::sleep(self.reboot_delay);
        self.transport.reset();
        Ok(())
    }

    /// Make the current screen and settings the power-on state
    pub fn store_boot_state(&mut self) -> Result<(), DisplayError> {
        self.transport.send_zero_byte(cmd::STORE_BOOT_STATE)?;
        Ok(())
    }

    pub fn hardware_clear(&mut self) -> Result<(), DisplayError> {
        self.transport.send_zero_byte(cmd::CLEAR_SCREEN)?;
        self.framebuffer.mark_cleared();
        Ok(())
    }

    fn hide_cursor(&mut self) -> Result<(), DisplayError> {
        self.transport.send_one_byte(cmd::SET_CURSOR_STYLE, 0)?;
        Ok(())
    }

    /// Switch off every live fan/temperature slot
    pub fn stop_live_display(&mut self) -> Result<(), DisplayError> {
        for slot in 0..self.settings.model.live_slots() {
            self.transport.send(cmd::SET_LIVE_DISPLAY, &[slot, 0])?;
        }
        Ok(())
    }

    /// Stop fan speed reports on modules with fan connectors
    pub fn stop_fan_reporting(&mut self) -> Result<(), DisplayError> {
        if self.settings.model.fans {
            self.transport.send_one_byte(cmd::SET_FAN_REPORTING, 0)?;
        }
        Ok(())
    }

    /// Stop temperature reports on modules with sensor support
    pub fn stop_temperature_reporting(&mut self) -> Result<(), DisplayError> {
        if self.settings.model.temperatures {
            self.transport.send(cmd::SET_TEMP_REPORTING, &[0, 0, 0, 0])?;
        }
        Ok(())
    }

    /// Pull pending key events off the link without sending anything
    pub fn poll_keys(&mut self) -> Result<usize, DisplayError> {
        Ok(self.transport.poll_events()?)
    }

    /// Store a byte without character translation
    pub fn raw_chr(&mut self, x: i32, y: i32, c: u8) {
        if x >= 1 && y >= 1 {
            self.framebuffer.set(x as usize - 1, y as usize - 1, c);
        }
    }

    fn block_char(&self) -> u8 {
        if self.settings.model.ks0073 {
            214
        } else {
            255
        }
    }

    /// Claim the custom characters for `mode`, uploading `definitions` the first
    /// time. Returns false when another glyph set owns them. The mode is only
    /// recorded once every glyph is on the module, so a failed upload is
    /// retried by the next call.
    fn enter_mode(
        &mut self,
        mode: CustomCharMode,
        definitions: impl IntoIterator<Item = (usize, Bitmap)>,
    ) -> Result<bool, DisplayError> {
        if self.cc_mode == mode {
            return Ok(true);
        }
        if self.cc_mode != CustomCharMode::Standard {
            warn!(
                "Cannot use {:?} while custom characters hold {:?}",
                mode, self.cc_mode
            );
            return Ok(false);
        }
        for (n, bitmap) in definitions {
            self.define_char(n, &bitmap, mode)?;
        }
        self.cc_mode = mode;
        Ok(true)
    }

    /// Upload custom character `n` as it should look while `mode` holds the
    /// custom characters
    fn define_char(
        &mut self,
        n: usize,
        bitmap: &Bitmap,
        mode: CustomCharMode,
    ) -> Result<(), DisplayError> {
        if n >= NUM_CUSTOM_CHARS {
            return Err(DisplayError::InvalidParameter(format!(
                "custom character {n} is outside 0..{NUM_CUSTOM_CHARS}"
            )));
        }
        let mask = ((1u16 << self.cell_width()) - 1) as u8;
        let mut out = [0u8; 1 + glyphs::CELL_HEIGHT];
        out[0] = n as u8;
        for (slot, row) in out[1..].iter_mut().zip(bitmap) {
            *slot = row & mask;
        }
        if self.settings.model.ks0073 && mode != CustomCharMode::Bignum {
            out[glyphs::CELL_HEIGHT] = 0;
        }
        self.transport.send(cmd::SET_SPECIAL_CHAR, &out)?;
        Ok(())
    }

    fn flush_old_firmware(&mut self) -> Result<usize, DisplayError> {
        let mut sent = 0;
        for (row, command) in [cmd::SET_LINE_1, cmd::SET_LINE_2].into_iter().enumerate() {
            if row >= self.framebuffer.height() || !self.framebuffer.row_changed(row) {
                continue;
            }
            let line = self.framebuffer.row(row).to_vec();
            self.transport.send(command, &line)?;
            self.framebuffer.commit_row(row);
            sent += 1;
        }
        Ok(sent)
    }

    fn flush_delta(&mut self) -> Result<usize, DisplayError> {
        let mut sent = 0;
        for row in 0..self.framebuffer.height() {
            let Some(span) = self.framebuffer.dirty_span(row) else {
                continue;
            };
            let mut out = Vec::with_capacity(span.len + 2);
            out.push(span.column as u8);
            out.push(row as u8);
            out.extend_from_slice(self.framebuffer.span_bytes(&span));
            debug!(
                "Row {} update at column {}: {:?}",
                row,
                span.column,
                String::from_utf8_lossy(&out[2..])
            );
            self.transport.send(cmd::SEND_DATA, &out)?;
            self.framebuffer.commit_row(row);
            sent += 1;
        }
        Ok(sent)
    }
}

impl<L: Link> Driver for CfontzDisplay<L> {
    fn width(&self) -> usize {
        self.settings.width
    }

    fn height(&self) -> usize {
        self.settings.height
    }

    fn cell_width(&self) -> usize {
        self.settings.model.cell_width
    }

    fn cell_height(&self) -> usize {
        self.settings.model.cell_height
    }

    fn clear(&mut self) {
        self.framebuffer.clear();
        self.cc_mode = CustomCharMode::Standard;
    }

    /// Send changed rows. A row is only marked as shown once its update went
    /// through, so a failed row is retried on the next flush. When nothing
    /// changed a Ping goes out instead, which lets key events arrive.
    fn flush(&mut self) -> Result<(), DisplayError> {
        let sent = if self.settings.old_firmware && self.settings.model.number == 633 {
            self.flush_old_firmware()?
        } else {
            self.flush_delta()?
        };
        if sent == 0 {
            self.transport.send_zero_byte(cmd::PING)?;
        }
        Ok(())
    }

    fn chr(&mut self, x: i32, y: i32, c: u8) {
        let mapped = self.settings.model.charmap.map(c);
        self.raw_chr(x, y, mapped);
    }

    fn string(&mut self, x: i32, y: i32, text: &str) {
        if y < 1 || y as usize > self.settings.height {
            return;
        }
        let charmap = self.settings.model.charmap;
        for (i, c) in text.chars().enumerate() {
            let col = x + i as i32;
            if col > self.settings.width as i32 {
                break;
            }
            if col >= 1 {
                self.raw_chr(col, y, charmap.map(latin1(c)));
            }
        }
    }

    fn vbar(&mut self, x: i32, y: i32, len: usize, promille: u32) -> Result<(), DisplayError> {
        let cell_height = self.cell_height();
        let bar_glyphs = (1..cell_height).map(|rows| (rows, glyphs::vbar_glyph(rows)));
        if !self.enter_mode(CustomCharMode::Vbar, bar_glyphs)? {
            return Ok(());
        }
        let len = len.min(self.settings.height);
        let block = self.block_char();
        for (pos, cell) in glyphs::bar_cells(len, promille, cell_height).into_iter().enumerate() {
            let row = y - pos as i32;
            match cell {
                BarCell::Full => self.raw_chr(x, row, block),
                BarCell::Partial(pixels) => self.chr(x, row, pixels),
            }
        }
        Ok(())
    }

    fn hbar(&mut self, x: i32, y: i32, len: usize, promille: u32) -> Result<(), DisplayError> {
        let cell_width = self.cell_width();
        let bar_glyphs =
            (1..=cell_width).map(|columns| (columns, glyphs::hbar_glyph(columns, cell_width)));
        if !self.enter_mode(CustomCharMode::Hbar, bar_glyphs)? {
            return Ok(());
        }
        let len = len.min(self.settings.width);
        let block = self.block_char();
        for (pos, cell) in glyphs::bar_cells(len, promille, cell_width).into_iter().enumerate() {
            let col = x + pos as i32;
            match cell {
                BarCell::Full => self.raw_chr(col, y, block),
                BarCell::Partial(pixels) => self.chr(col, y, pixels),
            }
        }
        Ok(())
    }

    fn num(&mut self, x: i32, num: usize) -> Result<(), DisplayError> {
        if num > 10 {
            return Err(DisplayError::InvalidParameter(format!(
                "big number {num} is outside 0..=10"
            )));
        }
        let height = self.settings.height;
        let Some(cells) = glyphs::bignum_cells(num, height) else {
            warn!("Big numbers need at least two rows");
            return Ok(());
        };
        let half_blocks = if height < 4 {
            vec![
                (glyphs::BIGNUM_UPPER_HALF as usize, glyphs::UPPER_HALF),
                (glyphs::BIGNUM_LOWER_HALF as usize, glyphs::LOWER_HALF),
            ]
        } else {
            Vec::new()
        };
        if !self.enter_mode(CustomCharMode::Bignum, half_blocks)? {
            return Ok(());
        }

        let top = ((height - cells.len()) / 2) as i32 + 1;
        let block = self.block_char();
        for (r, row) in cells.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                let byte = match cell {
                    BigCell::Blank => b' ',
                    BigCell::Full => block,
                    BigCell::UpperHalf => glyphs::BIGNUM_UPPER_HALF,
                    BigCell::LowerHalf => glyphs::BIGNUM_LOWER_HALF,
                };
                self.raw_chr(x + c as i32, top + r as i32, byte);
            }
        }
        Ok(())
    }

    fn icon(&mut self, x: i32, y: i32, icon: Icon) -> Result<IconOutcome, DisplayError> {
        let ks0073 = self.settings.model.ks0073;
        match icon {
            Icon::BlockFilled => {
                let block = self.block_char();
                self.raw_chr(x, y, block);
            }
            Icon::HeartFilled => {
                self.set_char(0, &glyphs::HEART_FILLED)?;
                self.chr(x, y, 0);
            }
            Icon::HeartOpen => {
                self.set_char(0, &glyphs::HEART_OPEN)?;
                self.chr(x, y, 0);
            }
            Icon::ArrowUp if ks0073 => self.raw_chr(x, y, 0xDE),
            Icon::ArrowUp => {
                self.set_char(1, &glyphs::ARROW_UP)?;
                self.chr(x, y, 1);
            }
            Icon::ArrowDown if ks0073 => self.raw_chr(x, y, 0xE0),
            Icon::ArrowDown => {
                self.set_char(2, &glyphs::ARROW_DOWN)?;
                self.chr(x, y, 2);
            }
            Icon::ArrowLeft => self.raw_chr(x, y, if ks0073 { 0xE1 } else { 0x7F }),
            Icon::ArrowRight => self.raw_chr(x, y, if ks0073 { 0xDF } else { 0x7E }),
            Icon::CheckboxOff => {
                self.set_char(3, &glyphs::CHECKBOX_OFF)?;
                self.chr(x, y, 3);
            }
            Icon::CheckboxOn => {
                self.set_char(4, &glyphs::CHECKBOX_ON)?;
                self.chr(x, y, 4);
            }
            Icon::CheckboxGray => {
                self.set_char(5, &glyphs::CHECKBOX_GRAY)?;
                self.chr(x, y, 5);
            }
            Icon::SelectorAtLeft if ks0073 => self.raw_chr(x, y, 0x10),
            Icon::SelectorAtRight if ks0073 => self.raw_chr(x, y, 0x11),
            _ => return Ok(IconOutcome::Unsupported),
        }
        Ok(IconOutcome::Drawn)
    }

    fn get_free_chars(&self) -> usize {
        NUM_CUSTOM_CHARS
    }

    /// Define custom character `n`. Rows are masked to the cell width; on
    /// KS0073 modules the bottom row stays blank outside big number mode.
    fn set_char(&mut self, n: usize, bitmap: &Bitmap) -> Result<(), DisplayError> {
        self.define_char(n, bitmap, self.cc_mode)
    }

    fn get_contrast(&self) -> u16 {
        self.settings.contrast
    }

    fn set_contrast(&mut self, promille: u16) -> Result<(), DisplayError> {
        check_promille("contrast", promille)?;
        self.settings.contrast = promille;
        let value = self.settings.model.hardware_contrast(promille);
        self.transport.send_one_byte(cmd::SET_CONTRAST, value)?;
        Ok(())
    }

    fn get_brightness(&self, state: Backlight) -> u16 {
        match state {
            Backlight::On => self.settings.brightness,
            Backlight::Off => self.settings.off_brightness,
        }
    }

    fn set_brightness(&mut self, state: Backlight, promille: u16) -> Result<(), DisplayError> {
        check_promille("brightness", promille)?;
        match state {
            Backlight::On => self.settings.brightness = promille,
            Backlight::Off => self.settings.off_brightness = promille,
        }
        Ok(())
    }

    fn backlight(&mut self, state: Backlight) -> Result<(), DisplayError> {
        let value = self.get_brightness(state) / 10;
        self.transport.send_one_byte(cmd::SET_BACKLIGHT, value as u8)?;
        Ok(())
    }

    fn output(&mut self, state: u16) -> Result<(), DisplayError> {
        if !self.settings.model.has_leds() {
            return Ok(());
        }
        for (led, pin) in CFA635_LEDS.iter().enumerate() {
            let mask = 1u16 << led;
            let on = state & mask != 0;
            if (self.led_state & mask != 0) != on {
                self.transport
                    .send(cmd::SET_GPIO, &[*pin, if on { 100 } else { 0 }])?;
            }
        }
        self.led_state = state;
        Ok(())
    }

    fn cursor(&mut self, x: i32, y: i32, style: CursorStyle) -> Result<(), DisplayError> {
        if self.settings.old_firmware {
            return Ok(());
        }
        match style {
            CursorStyle::Off => {
                self.transport.send_one_byte(cmd::SET_CURSOR_STYLE, 0)?;
            }
            CursorStyle::Under => {
                self.transport.send_one_byte(cmd::SET_CURSOR_STYLE, 2)?;
            }
            CursorStyle::Block => {
                if self.settings.model.has_block_cursor() {
                    self.transport.send_one_byte(cmd::SET_CURSOR_STYLE, 4)?;
                }
            }
            CursorStyle::DefaultOn => {
                self.transport.send_one_byte(cmd::SET_CURSOR_STYLE, 1)?;
            }
        }

        let column = if x > 0 && x as usize <= self.settings.width { x - 1 } else { 0 };
        let row = if y > 0 && y as usize <= self.settings.height { y - 1 } else { 0 };
        self.transport
            .send(cmd::SET_CURSOR_POSITION, &[column as u8, row as u8])?;
        Ok(())
    }

    /// Pop queued key codes until one maps to a key press
    fn get_key(&mut self) -> Option<Key> {
        while let Some(code) = self.transport.pop_key() {
            if let Some(key) = Key::from_code(code) {
                return Some(key);
            }
            if !cfontz_transport::protocol::key::is_release(code) {
                info!("Untreated key 0x{:02X}", code);
            }
        }
        None
    }

    fn get_info(&self) -> String {
        format!("CrystalFontz Driver: CFA-{}", self.settings.model.number)
    }
}
