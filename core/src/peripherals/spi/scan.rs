//! Scan-line sequencing
//!
//! Each scan line latches the destination row in the output buffer, the
//! GRAM source row (after vertical scrolling and mirroring), and the
//! column direction for the pixel clock.

use super::{mode, mac, SpiPanel, IC_CTRL_DATA, LAST_COL, LAST_ROW, NUM_ROWS};

/// Is `row` outside the displayed partial area?
///
/// A reversed area (start > end) in partial mode wraps through row 0, so
/// only the rows strictly between end and start are blanked.
pub(super) fn row_blanked(panel_mode: u8, start: u16, end: u16, row: u16) -> bool {
    if panel_mode & mode::PARTIAL != 0 && start > end {
        start > row && row > end
    } else {
        start > row || row > end
    }
}

impl SpiPanel {
    /// Latch the scan state for `row`. Returns false past the last row.
    pub(super) fn scan_line(&mut self, row: u16) -> bool {
        if row > LAST_ROW {
            self.mode |= mode::IGNORE;
            return false;
        }
        self.mode &= !mode::IGNORE;

        if row_blanked(self.mode, self.partial_start, self.partial_end, row) {
            self.mode |= mode::BLANK;
        } else {
            self.mode &= !mode::BLANK;
        }

        self.row = row;
        self.dst_row = row;
        self.src_row = row;

        if self.mode & mode::SCROLL != 0 {
            let top = self.top_area;
            let bot = LAST_ROW.wrapping_sub(self.bottom_area);
            if row >= top && row <= bot {
                self.src_row = self.src_row.wrapping_add(self.scroll_start.wrapping_sub(top));
                if self.src_row > bot {
                    let area = (NUM_ROWS as u16).wrapping_sub(self.top_area).wrapping_sub(self.bottom_area);
                    self.src_row = self.src_row.wrapping_sub(area);
                }
                self.src_row &= 0x1FF;
            }
        }

        if self.mac & mac::VRO != 0 {
            self.dst_row = LAST_ROW - self.dst_row;
            self.src_row = LAST_ROW.wrapping_sub(self.src_row);
        }

        if self.mac & mac::HRO != 0 {
            self.col = LAST_COL;
            self.col_dir = -1;
        } else {
            self.col = 0;
            self.col_dir = 1;
        }
        true
    }

    /// Advance to the next scan line. Returns false once the frame is done.
    pub fn hsync(&mut self) -> bool {
        self.scan_line(self.row.wrapping_add(1))
    }

    /// Start a new frame at row 0. On the RGB interface this also rewinds
    /// the GRAM write cursor.
    pub fn vsync(&mut self) -> bool {
        if self.if_ctl & IC_CTRL_DATA != 0 {
            self.reset_cursor();
        }
        self.scan_line(0)
    }
}
