//! Character framebuffer with a backing store of what the module shows

/// The difference between one framebuffer row and the backing store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtySpan {
    pub row: usize,
    pub column: usize,
    pub len: usize,
}

pub struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<u8>,
    shown: Vec<u8>,
}

impl FrameBuffer {
    /// Both buffers start as spaces, matching a freshly cleared module
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![b' '; width * height],
            shown: vec![b' '; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn clear(&mut self) {
        self.cells.fill(b' ');
    }

    /// Store a byte at a 0-based position; out of range is ignored.
    pub fn set(&mut self, column: usize, row: usize, byte: u8) {
        if column < self.width && row < self.height {
            self.cells[row * self.width + column] = byte;
        }
    }

    pub fn get(&self, column: usize, row: usize) -> Option<u8> {
        (column < self.width && row < self.height).then(|| self.cells[row * self.width + column])
    }

    pub fn row(&self, row: usize) -> &[u8] {
        &self.cells[row * self.width..(row + 1) * self.width]
    }

    fn shown_row(&self, row: usize) -> &[u8] {
        &self.shown[row * self.width..(row + 1) * self.width]
    }

    /// Whether any byte of `row` differs from the backing store
    pub fn row_changed(&self, row: usize) -> bool {
        self.row(row) != self.shown_row(row)
    }

    /// The changed run of `row` with identical prefix and suffix trimmed
    pub fn dirty_span(&self, row: usize) -> Option<DirtySpan> {
        let now = self.row(row);
        let shown = self.shown_row(row);
        let first = now.iter().zip(shown).position(|(a, b)| a != b)?;
        let last = now.iter().zip(shown).rposition(|(a, b)| a != b)?;
        Some(DirtySpan {
            row,
            column: first,
            len: last - first + 1,
        })
    }

    /// Bytes to send for a span
    pub fn span_bytes(&self, span: &DirtySpan) -> &[u8] {
        &self.row(span.row)[span.column..span.column + span.len]
    }

    /// Record that `row` is now on the module
    pub fn commit_row(&mut self, row: usize) {
        let range = row * self.width..(row + 1) * self.width;
        self.shown[range.clone()].copy_from_slice(&self.cells[range]);
    }

    /// Forget what the module shows so the next flush resends everything
    pub fn invalidate(&mut self, shown_as: u8) {
        self.shown.fill(shown_as);
    }

    /// Assume the module was just cleared
    pub fn mark_cleared(&mut self) {
        self.shown.fill(b' ');
    }

    /// Rows as text for debugging
    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        (0..self.height).map(|r| String::from_utf8_lossy(self.row(r)).into_owned())
    }
}
