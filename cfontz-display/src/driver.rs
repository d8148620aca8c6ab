//! Capability interface exposed to a display host

use crate::error::DisplayError;
use crate::glyphs::{Bitmap, Icon, IconOutcome};
use crate::keys::Key;

/// Which stored brightness a call refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backlight {
    Off,
    On,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorStyle {
    Off,
    #[default]
    DefaultOn,
    Under,
    Block,
}

/// Operations a host performs on a character display.
///
/// Coordinates are 1-based with (1, 1) at the top left. Drawing calls only
/// touch the framebuffer; [`Driver::flush`] sends the changes.
pub trait Driver: Send {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn cell_width(&self) -> usize;
    fn cell_height(&self) -> usize;

    /// Blank the framebuffer and release custom characters
    fn clear(&mut self);
    fn flush(&mut self) -> Result<(), DisplayError>;

    fn chr(&mut self, x: i32, y: i32, c: u8);
    fn string(&mut self, x: i32, y: i32, text: &str);

    fn vbar(&mut self, x: i32, y: i32, len: usize, promille: u32) -> Result<(), DisplayError>;
    fn hbar(&mut self, x: i32, y: i32, len: usize, promille: u32) -> Result<(), DisplayError>;
    fn num(&mut self, x: i32, num: usize) -> Result<(), DisplayError>;
    fn icon(&mut self, x: i32, y: i32, icon: Icon) -> Result<IconOutcome, DisplayError>;

    fn get_free_chars(&self) -> usize;
    fn set_char(&mut self, n: usize, bitmap: &Bitmap) -> Result<(), DisplayError>;

    fn get_contrast(&self) -> u16;
    fn set_contrast(&mut self, promille: u16) -> Result<(), DisplayError>;
    fn get_brightness(&self, state: Backlight) -> u16;
    fn set_brightness(&mut self, state: Backlight, promille: u16) -> Result<(), DisplayError>;
    fn backlight(&mut self, state: Backlight) -> Result<(), DisplayError>;

    /// Drive the status outputs (LEDs) from a bit mask
    fn output(&mut self, state: u16) -> Result<(), DisplayError>;
    fn cursor(&mut self, x: i32, y: i32, style: CursorStyle) -> Result<(), DisplayError>;

    /// Next pending key press, if any
    fn get_key(&mut self) -> Option<Key>;
    fn get_info(&self) -> String;
}
