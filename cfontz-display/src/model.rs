//! Supported CrystalFontz modules and their properties

use crate::charmap::Charmap;
use crate::error::DisplayError;
use serde::Serialize;

/// Static description of one module type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CfaModel {
    pub number: u16,
    pub width: usize,
    pub height: usize,
    pub cell_width: usize,
    pub cell_height: usize,
    pub baud_rate: u32,
    pub charmap: Charmap,
    /// Fan reporting can be switched off with `SET_FAN_REPORTING`
    pub fans: bool,
    /// Temperature reporting can be switched off with `SET_TEMP_REPORTING`
    pub temperatures: bool,
    /// KS0073 controller: reserved bottom row, different ROM glyphs
    pub ks0073: bool,
    /// Live display has 4 slots instead of 8
    pub four_live_slots: bool,
}

pub const CFA533: CfaModel = CfaModel {
    number: 533,
    width: 16,
    height: 2,
    cell_width: 5,
    cell_height: 8,
    baud_rate: 19200,
    charmap: Charmap::Hd44780,
    fans: false,
    temperatures: true,
    ks0073: false,
    four_live_slots: true,
};

pub const CFA631: CfaModel = CfaModel {
    number: 631,
    width: 20,
    height: 2,
    cell_width: 5,
    cell_height: 8,
    baud_rate: 115200,
    charmap: Charmap::Identity,
    fans: true,
    temperatures: true,
    ks0073: true,
    four_live_slots: true,
};

pub const CFA633: CfaModel = CfaModel {
    number: 633,
    width: 16,
    height: 2,
    cell_width: 5,
    cell_height: 8,
    baud_rate: 19200,
    charmap: Charmap::Hd44780,
    fans: true,
    temperatures: true,
    ks0073: false,
    four_live_slots: false,
};

pub const CFA635: CfaModel = CfaModel {
    number: 635,
    width: 20,
    height: 4,
    cell_width: 5,
    cell_height: 8,
    baud_rate: 115200,
    charmap: Charmap::Identity,
    fans: false,
    temperatures: false,
    ks0073: true,
    four_live_slots: false,
};

pub const MODELS: [CfaModel; 4] = [CFA533, CFA631, CFA633, CFA635];

impl CfaModel {
    pub fn lookup(number: u32) -> Result<&'static CfaModel, DisplayError> {
        MODELS
            .iter()
            .find(|m| m.number as u32 == number)
            .ok_or(DisplayError::UnknownModel(number))
    }

    /// Scale a 0..=1000 contrast to the module's register value
    pub fn hardware_contrast(&self, promille: u16) -> u8 {
        let promille = promille.min(1000) as u32;
        match self.number {
            533 | 633 => (promille / 20) as u8,
            _ => (promille * 255 / 1000) as u8,
        }
    }

    /// Live display slots to clear on init; none without fans or temperatures
    pub fn live_slots(&self) -> u8 {
        if !(self.fans || self.temperatures) {
            0
        } else if self.four_live_slots {
            4
        } else {
            8
        }
    }

    /// Block cursor style exists only on the KS0073 modules
    pub fn has_block_cursor(&self) -> bool {
        matches!(self.number, 631 | 635)
    }

    /// GPIO-driven status LEDs (CFA-635)
    pub fn has_leds(&self) -> bool {
        self.number == 635
    }

    pub fn name(&self) -> String {
        format!("CFA-{}", self.number)
    }
}
