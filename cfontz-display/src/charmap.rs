//! Host (ISO 8859-1) to display ROM character translation

use serde::Serialize;

/// Character translation table used by a module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Charmap {
    /// Bytes go to the display unchanged
    Identity,
    /// HD44780 ROM A00 approximation of Latin-1
    Hd44780,
}

const HD44780_HIGH: [u8; 96] = [
    // 0xA0
    160, 33, 236, 237, 164, 92, 124, 167, 34, 169, 170, 171, 172, 173, 174, 175, //
    223, 177, 178, 179, 39, 228, 247, 165, 44, 185, 186, 187, 188, 189, 190, 63, //
    // 0xC0
    65, 65, 65, 65, 225, 65, 65, 67, 69, 69, 69, 69, 73, 73, 73, 73, //
    68, 238, 79, 79, 79, 79, 239, 120, 48, 85, 85, 85, 245, 89, 240, 226, //
    // 0xE0
    97, 97, 97, 97, 225, 97, 97, 99, 101, 101, 101, 101, 105, 105, 105, 105, //
    111, 238, 111, 111, 111, 111, 239, 253, 48, 117, 117, 117, 245, 121, 240, 255, //
];

impl Charmap {
    pub fn map(self, c: u8) -> u8 {
        match self {
            Self::Identity => c,
            Self::Hd44780 => match c {
                26 => 126,
                27 => 127,
                b'\\' => 47,
                160..=255 => HD44780_HIGH[(c - 160) as usize],
                _ => c,
            },
        }
    }
}
