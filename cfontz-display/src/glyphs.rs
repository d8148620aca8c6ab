//! Custom character bitmaps, bar layout and the big number font

/// Number of user-definable characters on every supported module
pub const NUM_CUSTOM_CHARS: usize = 8;

/// Rows in a character cell
pub const CELL_HEIGHT: usize = 8;

/// One custom character, top row first, low bits are pixels
pub type Bitmap = [u8; CELL_HEIGHT];

/// Icons the display layer knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Icon {
    BlockFilled,
    HeartOpen,
    HeartFilled,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    CheckboxOff,
    CheckboxOn,
    CheckboxGray,
    SelectorAtLeft,
    SelectorAtRight,
    Ellipsis,
    Stop,
    Pause,
    Play,
}

/// Whether an icon was drawn or must be rendered by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconOutcome {
    Drawn,
    Unsupported,
}

pub const HEART_OPEN: Bitmap = [0x1F, 0x15, 0x00, 0x00, 0x00, 0x11, 0x1B, 0x1F];
pub const HEART_FILLED: Bitmap = [0x1F, 0x15, 0x0A, 0x0E, 0x0E, 0x15, 0x1B, 0x1F];
pub const ARROW_UP: Bitmap = [0x04, 0x0E, 0x15, 0x04, 0x04, 0x04, 0x04, 0x00];
pub const ARROW_DOWN: Bitmap = [0x04, 0x04, 0x04, 0x04, 0x15, 0x0E, 0x04, 0x00];
pub const CHECKBOX_OFF: Bitmap = [0x00, 0x00, 0x1F, 0x11, 0x11, 0x11, 0x1F, 0x00];
pub const CHECKBOX_ON: Bitmap = [0x04, 0x04, 0x1D, 0x16, 0x15, 0x11, 0x1F, 0x00];
pub const CHECKBOX_GRAY: Bitmap = [0x00, 0x00, 0x1F, 0x15, 0x1B, 0x15, 0x1F, 0x00];

/// Glyph for a vertical bar partial cell holding `rows` lit rows (bottom up)
pub fn vbar_glyph(rows: usize) -> Bitmap {
    let mut glyph = [0u8; CELL_HEIGHT];
    for row in glyph.iter_mut().rev().take(rows.min(CELL_HEIGHT)) {
        *row = 0x1F;
    }
    glyph
}

/// Glyph for a horizontal bar partial cell holding `columns` lit columns (left first)
pub fn hbar_glyph(columns: usize, cell_width: usize) -> Bitmap {
    let columns = columns.min(cell_width);
    let value = 0xFFu8 & !((1u16 << (cell_width - columns)) - 1) as u8;
    [value; CELL_HEIGHT]
}

/// One cell of a bar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarCell {
    Full,
    /// Partial cell with this many pixels lit; also the custom char index
    Partial(u8),
}

/// Lay out a bar of `len` cells filled to `promille` with `cell_pixels`
/// pixels per cell. Cells past the filled end are omitted, and no bar is
/// longer than [`MAX_DIMENSION`](crate::MAX_DIMENSION) cells.
pub fn bar_cells(len: usize, promille: u32, cell_pixels: usize) -> Vec<BarCell> {
    let len = len.min(crate::MAX_DIMENSION);
    let promille = promille.min(1000) as u64;
    let total = (2 * len as u64 * cell_pixels as u64 + 1) * promille / 2000;
    let mut cells = Vec::with_capacity(len);
    for pos in 0..len as u64 {
        let pixels = total as i64 - (cell_pixels as u64 * pos) as i64;
        if pixels >= cell_pixels as i64 {
            cells.push(BarCell::Full);
        } else if pixels > 0 {
            cells.push(BarCell::Partial(pixels as u8));
            break;
        } else {
            break;
        }
    }
    cells
}

/// Pixel rows of the big number font; `#` is lit
const BIGNUM_FONT: [[&str; 4]; 11] = [
    ["###", "#.#", "#.#", "###"],
    [".#.", "##.", ".#.", "###"],
    ["###", "..#", "#..", "###"],
    ["###", ".##", "..#", "###"],
    ["#.#", "#.#", "###", "..#"],
    ["###", "#..", "..#", "###"],
    ["#..", "###", "#.#", "###"],
    ["###", "..#", "..#", "..#"],
    ["###", "#.#", "###", "###"],
    ["###", "#.#", "###", "..#"],
    [".", "#", ".", "#"],
];

/// Custom char slot holding the upper half block on short displays
pub const BIGNUM_UPPER_HALF: u8 = 1;
/// Custom char slot holding the lower half block on short displays
pub const BIGNUM_LOWER_HALF: u8 = 2;

pub const UPPER_HALF: Bitmap = [0x1F, 0x1F, 0x1F, 0x1F, 0x00, 0x00, 0x00, 0x00];
pub const LOWER_HALF: Bitmap = [0x00, 0x00, 0x00, 0x00, 0x1F, 0x1F, 0x1F, 0x1F];

/// One cell of a rendered big number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BigCell {
    Blank,
    Full,
    UpperHalf,
    LowerHalf,
}

/// Render big digit `num` (0..=9, 10 = colon) for a display `rows` high.
///
/// Four or more rows use one cell per font pixel; two or three rows fold
/// pixel rows pairwise into half-block cells. Returns rows of cells, or
/// `None` if the digit or height is not supported.
pub fn bignum_cells(num: usize, rows: usize) -> Option<Vec<Vec<BigCell>>> {
    let glyph = BIGNUM_FONT.get(num)?;
    let lit = |row: usize, col: usize| glyph[row].as_bytes()[col] == b'#';
    let width = glyph[0].len();

    if rows >= 4 {
        Some(
            (0..4)
                .map(|r| {
                    (0..width)
                        .map(|c| if lit(r, c) { BigCell::Full } else { BigCell::Blank })
                        .collect()
                })
                .collect(),
        )
    } else if rows >= 2 {
        Some(
            (0..2)
                .map(|r| {
                    (0..width)
                        .map(|c| match (lit(2 * r, c), lit(2 * r + 1, c)) {
                            (true, true) => BigCell::Full,
                            (true, false) => BigCell::UpperHalf,
                            (false, true) => BigCell::LowerHalf,
                            (false, false) => BigCell::Blank,
                        })
                        .collect()
                })
                .collect(),
        )
    } else {
        None
    }
}
