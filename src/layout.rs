//! Grid layout arithmetic.
//!
//! A sprite is a grid of `columns × rows` cells holding `count` thumbnails in
//! timecode order, filled row by row. Every placement here is a pure function
//! of the timecode and the request's timeline, so results can be placed in
//! whatever order they arrive.

use std::time::Duration;

/// Shape of a sprite grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    count: u32,
    columns: u32,
    rows: u32,
}

impl GridLayout {
    /// Compute the layout for `count` cells.
    ///
    /// `columns == 0` means a single column (a vertical strip); a column
    /// count larger than `count` is clamped to `count`.
    pub fn new(count: u32, columns: u32) -> Self {
        let columns = columns.max(1).min(count.max(1));
        let rows = count.div_ceil(columns);
        Self {
            count,
            columns,
            rows,
        }
    }

    /// Number of cells the grid reserves.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Number of columns after defaulting and clamping.
    pub fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows, `ceil(count / columns)`.
    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// `(column, row)` of the cell at `position`, or `None` if the position
    /// lies outside the grid.
    pub fn cell(&self, position: u32) -> Option<(u32, u32)> {
        if position >= self.count {
            return None;
        }
        let row = position / self.columns;
        let column = position - row * self.columns;
        Some((column, row))
    }
}

/// Sampling timeline of a sprite: where it starts and how far apart cells are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeline {
    /// Timecode of the first cell.
    pub start: Duration,
    /// Distance between consecutive cells. Must be non-zero.
    pub interval: Duration,
}

impl Timeline {
    /// Position of `timecode` in the sprite, `floor((timecode - start) / interval)`.
    ///
    /// Returns `None` for timecodes before the start, a zero interval, or a
    /// position that does not fit in a `u32`.
    pub fn position(&self, timecode: Duration) -> Option<u32> {
        if self.interval.is_zero() {
            return None;
        }
        let offset = timecode.checked_sub(self.start)?;
        u32::try_from(offset.as_nanos() / self.interval.as_nanos()).ok()
    }
}
