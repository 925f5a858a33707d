//! Derive paging and lyric rows from the terminal size.

use super::navigator::Columns;

/// Rows kept below the menu for the song line and progress bar.
const PLAYER_ROWS: usize = 5;
/// Rows the menu leaves free so at least a 3-line lyric window fits.
const MIN_LYRIC_ROWS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub columns: Columns,
    pub page_size: usize,
    /// 0 (hidden), 3 or 5.
    pub lyric_rows: usize,
}

impl Layout {
    pub fn compute(width: u16, height: u16, max_page_size: usize, double_min_width: u16) -> Self {
        let height = usize::from(height);
        let columns = if width >= double_min_width {
            Columns::Double
        } else {
            Columns::Single
        };
        let per_row = columns.per_row();
        let max_rows = max_page_size.div_ceil(per_row).max(1);

        let start_row = height / 3;
        let available = height.saturating_sub(start_row + PLAYER_ROWS);
        let rows = available.saturating_sub(MIN_LYRIC_ROWS).min(max_rows).max(1);
        let page_size = rows * per_row;

        let bottom_row = start_row + rows - 1;
        let free = height.saturating_sub(PLAYER_ROWS + bottom_row);
        let lyric_rows = if free >= 5 {
            5
        } else if free >= 3 {
            3
        } else {
            0
        };

        Self {
            columns,
            page_size,
            lyric_rows,
        }
    }
}
