//! GRAM write cursor
//!
//! The cursor walks the address window set by CASET/RASET. With row/column
//! exchange (RCX) clear the window registers are interpreted transposed,
//! which is how the OS writes a landscape image into portrait GRAM.
//! Once the last cell of the window is written the cursor parks at an
//! out-of-range sentinel and further pixels are dropped until the next RAMWR.

use super::{mac, SpiPanel, NUM_COLS, NUM_ROWS};

/// Parked cursor after the window is exhausted
const EXHAUSTED: u16 = 0xFFFF;
/// Row register range (9 bits)
const ROW_MASK: u16 = 0x1FF;
/// Column register range (8 bits)
const COL_MASK: u16 = 0xFF;

impl SpiPanel {
    pub(super) fn reset_cursor(&mut self) {
        if self.mac & mac::RCX != 0 {
            self.row_reg = self.row_start;
            self.col_reg = self.col_start;
        } else {
            self.row_reg = self.col_start;
            self.col_reg = self.row_start;
        }
    }

    /// Row step: +1, or -1 (mod 512) with RAO set
    fn row_step(&self) -> u16 {
        1u16.wrapping_sub((self.mac >> 6) as u16 & 2)
    }

    /// Column step: +1, or -1 (mod 256) with CAO set
    fn col_step(&self) -> u16 {
        1u16.wrapping_sub((self.mac >> 5) as u16 & 2)
    }

    /// Store one pixel at the cursor and advance it
    pub(super) fn store_pixel(&mut self, pixel: [u8; 4]) {
        let (row, col) = (self.row_reg as usize, self.col_reg as usize);
        if row < NUM_ROWS && col < NUM_COLS {
            self.frame[row * NUM_COLS + col] = pixel;
        }

        if self.mac & mac::RCX != 0 {
            if self.col_reg == self.col_end {
                if self.row_reg == self.row_end && self.row_start <= self.row_end {
                    self.row_reg = EXHAUSTED;
                    self.col_reg = EXHAUSTED;
                } else {
                    self.col_reg = self.col_start;
                    self.row_reg = self.row_reg.wrapping_add(self.row_step()) & ROW_MASK;
                }
            } else if self.col_reg <= COL_MASK {
                self.col_reg = self.col_reg.wrapping_add(self.col_step()) & COL_MASK;
            }
        } else if self.row_reg == self.col_end {
            if self.col_reg == self.row_end && self.row_start <= self.row_end {
                self.row_reg = EXHAUSTED;
                self.col_reg = EXHAUSTED;
            } else {
                self.row_reg = self.col_start;
                self.col_reg = self.col_reg.wrapping_add(self.col_step()) & COL_MASK;
            }
        } else if self.row_reg <= ROW_MASK {
            self.row_reg = self.row_reg.wrapping_add(self.row_step()) & ROW_MASK;
        }
    }
}
