//! CRC-16/X-25 as used by the CrystalFontz packet framing

/// Seed for every packet checksum
pub const CRC_SEED: u16 = 0xFFFF;

/// Reflected form of polynomial 0x1021
const POLY_REFLECTED: u16 = 0x8408;

const fn build_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut acc = i as u16;
        let mut bit = 0;
        while bit < 8 {
            acc = if acc & 1 != 0 {
                (acc >> 1) ^ POLY_REFLECTED
            } else {
                acc >> 1
            };
            bit += 1;
        }
        table[i] = acc;
        i += 1;
    }
    table
}

static CRC_TABLE: [u16; 256] = build_table();

/// Checksum `data` starting from `seed`.
///
/// Packets are checksummed over command, length and payload with
/// [`CRC_SEED`]; the result goes on the wire little-endian.
pub fn crc16(data: &[u8], seed: u16) -> u16 {
    let acc = data.iter().fold(seed, |acc, &byte| {
        (acc >> 8) ^ CRC_TABLE[((acc ^ byte as u16) & 0xFF) as usize]
    });
    !acc
}
