//! Character grid mirroring the editor's screen.
//!
//! Rows and columns are zero-based. Out-of-range positions are clamped or
//! ignored rather than treated as errors: the editor is authoritative and
//! the next `resize` fixes any disagreement.

use super::events::Highlight;

/// One screen cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    /// Cell contents; empty for the right half of a wide character.
    pub text: String,
    /// Attributes active when the cell was written.
    pub highlight: Highlight,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            text: " ".to_string(),
            highlight: Highlight::default(),
        }
    }
}

/// Rectangle affected by scrolling (inclusive bounds).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollRegion {
    /// First row.
    pub top: u16,
    /// Last row.
    pub bottom: u16,
    /// First column.
    pub left: u16,
    /// Last column.
    pub right: u16,
}

/// The editor's screen as a grid of cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    columns: u16,
    rows: u16,
    cells: Vec<Cell>,
    cursor: (u16, u16),
    region: ScrollRegion,
    highlight: Highlight,
}

impl Grid {
    /// A blank grid.
    pub fn new(columns: u16, rows: u16) -> Self {
        Self {
            columns,
            rows,
            cells: vec![Cell::default(); usize::from(columns) * usize::from(rows)],
            cursor: (0, 0),
            region: full_region(columns, rows),
            highlight: Highlight::default(),
        }
    }

    /// `(columns, rows)`.
    pub fn size(&self) -> (u16, u16) {
        (self.columns, self.rows)
    }

    /// `(row, col)`.
    pub fn cursor(&self) -> (u16, u16) {
        self.cursor
    }

    /// Current scroll region.
    pub fn scroll_region(&self) -> ScrollRegion {
        self.region
    }

    /// Cell at `(row, col)`, if inside the grid.
    pub fn cell(&self, row: u16, col: u16) -> Option<&Cell> {
        self.index(row, col).map(|i| &self.cells[i])
    }

    /// Text of one row (for tests and debugging).
    pub fn row_text(&self, row: u16) -> String {
        (0..self.columns)
            .filter_map(|col| self.cell(row, col))
            .map(|cell| cell.text.as_str())
            .collect()
    }

    /// Discard contents and start over at the new size.
    pub fn resize(&mut self, columns: u16, rows: u16) {
        *self = Self {
            highlight: std::mem::take(&mut self.highlight),
            ..Self::new(columns, rows)
        };
    }

    /// Blank every cell.
    pub fn clear(&mut self) {
        self.cells.fill(Cell::default());
    }

    /// Blank from the cursor to the end of its row.
    pub fn eol_clear(&mut self) {
        let (row, col) = self.cursor;
        for c in col..self.columns {
            if let Some(i) = self.index(row, c) {
                self.cells[i] = Cell::default();
            }
        }
    }

    /// Move the cursor, clamped to the grid.
    pub fn cursor_goto(&mut self, row: u16, col: u16) {
        self.cursor = (
            row.min(self.rows.saturating_sub(1)),
            col.min(self.columns.saturating_sub(1)),
        );
    }

    /// Attributes for subsequent writes.
    pub fn set_highlight(&mut self, highlight: Highlight) {
        self.highlight = highlight;
    }

    /// Write one cell at the cursor and advance it.
    ///
    /// Writes past the right edge are dropped.
    pub fn put(&mut self, text: &str) {
        let (row, col) = self.cursor;
        if let Some(i) = self.index(row, col) {
            self.cells[i] = Cell {
                text: text.to_string(),
                highlight: self.highlight.clone(),
            };
            self.cursor.1 = col.saturating_add(1);
        }
    }

    /// Set the region used by [`scroll`](Self::scroll), clamped to the grid.
    pub fn set_scroll_region(&mut self, top: u16, bottom: u16, left: u16, right: u16) {
        let max_row = self.rows.saturating_sub(1);
        let max_col = self.columns.saturating_sub(1);
        self.region = ScrollRegion {
            top: top.min(max_row),
            bottom: bottom.min(max_row),
            left: left.min(max_col),
            right: right.min(max_col),
        };
    }

    /// Scroll the region by `count` rows; positive moves text up.
    ///
    /// Rows uncovered by the scroll are blanked.
    pub fn scroll(&mut self, count: i64) {
        let ScrollRegion {
            top,
            bottom,
            left,
            right,
        } = self.region;
        if count == 0 || top > bottom || left > right {
            return;
        }
        let height = i64::from(bottom - top) + 1;
        let shift = count.clamp(-height, height);

        let rows: Vec<u16> = if shift > 0 {
            (top..=bottom).collect()
        } else {
            (top..=bottom).rev().collect()
        };
        for row in rows {
            let source = i64::from(row) + shift;
            let in_region = source >= i64::from(top) && source <= i64::from(bottom);
            for col in left..=right {
                let cell = if in_region {
                    u16::try_from(source)
                        .ok()
                        .and_then(|src| self.cell(src, col))
                        .cloned()
                        .unwrap_or_default()
                } else {
                    Cell::default()
                };
                if let Some(i) = self.index(row, col) {
                    self.cells[i] = cell;
                }
            }
        }
    }

    fn index(&self, row: u16, col: u16) -> Option<usize> {
        (row < self.rows && col < self.columns)
            .then(|| usize::from(row) * usize::from(self.columns) + usize::from(col))
    }
}

fn full_region(columns: u16, rows: u16) -> ScrollRegion {
    ScrollRegion {
        top: 0,
        bottom: rows.saturating_sub(1),
        left: 0,
        right: columns.saturating_sub(1),
    }
}
