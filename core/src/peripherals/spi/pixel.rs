//! Pixel ingestion and refresh
//!
//! Incoming pixels are expanded to 8 bits per channel before they reach
//! GRAM. 18bpp channels replicate their top bits; 16bpp and 12bpp go through
//! the expansion table built at reset. Refresh reads GRAM at the scan
//! position and applies the output transforms (channel order, inversion,
//! idle-mode 1-bit color).

use super::{mode, mac, SpiPanel, ALPHA, BLUE, GREEN, LAST_COL, LAST_ROW, LUT_LEN, NUM_COLS, NUM_ROWS, RED};
use crate::bus::RandomSource;

/// Offsets of the channel tables within the expansion LUT
const LUT_RED: usize = 0;
const LUT_GREEN: usize = 32;
const LUT_BLUE: usize = 96;

/// Build the 5/6/5-bit to 8-bit expansion table
pub(super) fn build_lut() -> [u8; LUT_LEN] {
    let mut lut = [0u8; LUT_LEN];
    for c in 0..32u8 {
        lut[LUT_RED + c as usize] = c << 3 | c >> 2;
        lut[LUT_BLUE + c as usize] = c << 3 | c >> 2;
    }
    for c in 0..64u8 {
        lut[LUT_GREEN + c as usize] = c << 2 | c >> 4;
    }
    lut
}

impl SpiPanel {
    /// Demultiplex one serial pixel byte according to COLMOD
    pub(super) fn ingest_byte(&mut self, value: u8) {
        match self.if_bpp & 7 {
            // 18bpp: one byte per channel, top 6 bits significant
            6 => match self.param % 3 {
                0 => self.if_blue = value >> 2,
                1 => self.if_green = value >> 2,
                _ => {
                    self.if_red = value >> 2;
                    self.update_pixel_18bpp(self.if_red, self.if_green, self.if_blue);
                }
            },
            // 16bpp: 5-6-5 across two bytes
            5 => match self.param % 2 {
                0 => {
                    self.if_blue = value >> 3;
                    self.if_green = value << 3 & 0x38;
                }
                _ => {
                    self.if_green |= value >> 5;
                    self.if_red = value & 0x1F;
                    self.update_pixel_16bpp(self.if_red, self.if_green, self.if_blue);
                }
            },
            // 12bpp: two pixels packed in three bytes
            3 => match self.param % 3 {
                0 => {
                    self.if_blue = value >> 4;
                    self.if_green = value & 0xF;
                }
                1 => {
                    self.if_red = value >> 4;
                    self.update_pixel_12bpp(self.if_red, self.if_green, self.if_blue);
                    self.if_blue = value & 0xF;
                }
                _ => {
                    self.if_green = value >> 4;
                    self.if_red = value & 0xF;
                    self.update_pixel_12bpp(self.if_red, self.if_green, self.if_blue);
                }
            },
            _ => {}
        }
    }

    /// Store a pixel with 6-bit channels
    pub fn update_pixel_18bpp(&mut self, red: u8, green: u8, blue: u8) {
        assert!(red < 64 && green < 64 && blue < 64, "18bpp channel out of range");
        self.store_rgb(red << 2 | red >> 4, green << 2 | green >> 4, blue << 2 | blue >> 4);
    }

    /// Store a pixel with 5-bit red/blue and 6-bit green
    pub fn update_pixel_16bpp(&mut self, red: u8, green: u8, blue: u8) {
        assert!(red < 32 && green < 64 && blue < 32, "16bpp channel out of range");
        self.store_rgb(
            self.lut[LUT_RED + red as usize],
            self.lut[LUT_GREEN + green as usize],
            self.lut[LUT_BLUE + blue as usize],
        );
    }

    /// Store a pixel with 4-bit channels
    pub fn update_pixel_12bpp(&mut self, red: u8, green: u8, blue: u8) {
        assert!(red < 16 && green < 16 && blue < 16, "12bpp channel out of range");
        self.store_rgb(
            self.lut[LUT_RED + ((red as usize) << 1)],
            self.lut[LUT_GREEN + ((green as usize) << 2)],
            self.lut[LUT_BLUE + ((blue as usize) << 1)],
        );
    }

    fn store_rgb(&mut self, red: u8, green: u8, blue: u8) {
        let mut pixel = [0u8; 4];
        pixel[RED] = red;
        pixel[GREEN] = green;
        pixel[BLUE] = blue;
        self.store_pixel(pixel);
    }

    /// Emit one pixel of the current scan line into the display buffer.
    /// Returns false once the line is finished (or outside the scan).
    pub fn refresh_pixel<R: RandomSource + ?Sized>(&mut self, rng: &mut R) -> bool {
        if self.mode & mode::IGNORE != 0 {
            return false;
        }

        let col = self.col as usize;
        let (mut red, mut green, mut blue);
        if self.mode & (mode::SLEEP | mode::OFF | mode::BLANK) != 0 {
            red = 0xFF;
            green = 0xFF;
            blue = 0xFF;
        } else {
            if self.src_row > LAST_ROW {
                // Unconnected GRAM rows read as bus noise
                red = rng.next_byte();
                green = rng.next_byte();
                blue = rng.next_byte();
            } else {
                let pixel = self
                    .frame
                    .get(self.src_row as usize * NUM_COLS + col)
                    .copied()
                    .unwrap_or_default();
                red = pixel[RED];
                green = pixel[GREEN];
                blue = pixel[BLUE];
            }
            if self.mac & mac::BGR == 0 {
                std::mem::swap(&mut red, &mut blue);
            }
            if self.mode & mode::INVERT != 0 {
                red = !red;
                green = !green;
                blue = !blue;
            }
            if self.mode & mode::IDLE != 0 {
                red = ((red as i8) >> 7) as u8;
                green = ((green as i8) >> 7) as u8;
                blue = ((blue as i8) >> 7) as u8;
            }
        }

        if let Some(out) = self.display.get_mut(col * NUM_ROWS + self.dst_row as usize) {
            out[RED] = red;
            out[GREEN] = green;
            out[BLUE] = blue;
            out[ALPHA] = 0xFF;
        }

        self.col = self.col.wrapping_add(self.col_dir as u16);
        if self.col > LAST_COL {
            self.mode |= mode::IGNORE;
            return false;
        }
        true
    }
}
