//! Command / parameter state machine
//!
//! Every command byte resets the parameter index; parameter bytes are then
//! interpreted against the current command. Unknown commands and surplus
//! parameters are ignored, as on the real chip.

use super::{cmd, mode, mac, write_half, SpiPanel, IC_CTRL_DATA, GAMMA_RESET, LAST_COL, LAST_ROW, NUM_ROWS};
use crate::emu::log_event;

impl SpiPanel {
    /// Software reset (SWRESET): configuration back to power-on defaults.
    /// MAC, raw registers and GRAM are kept.
    pub(super) fn sw_reset(&mut self) {
        self.cmd = 0;
        self.fifo.clear();
        self.param = 0;
        self.gamma = GAMMA_RESET;
        self.mode = mode::SLEEP | mode::OFF;
        self.col_start = 0;
        self.col_end = if self.mac & mac::RCX != 0 { LAST_COL } else { LAST_ROW };
        self.row_start = 0;
        self.row_end = if self.mac & mac::RCX != 0 { LAST_ROW } else { LAST_COL };
        self.top_area = 0;
        self.scroll_area = NUM_ROWS as u16;
        self.bottom_area = 0;
        self.partial_start = 0;
        self.partial_end = LAST_ROW;
        self.scroll_start = 0;
        self.tear = false;
    }

    pub(super) fn write_cmd(&mut self, value: u8) {
        self.cmd = value;
        self.param = 0;

        match value {
            cmd::NOP => {}
            cmd::SWRESET => {
                self.sw_reset();
                log_event("SPI: software reset");
            }
            cmd::SLPIN => self.mode |= mode::SLEEP,
            cmd::SLPOUT => self.mode &= !mode::SLEEP,
            cmd::PTLON => {
                self.mode |= mode::PARTIAL;
                self.scroll_start = 0;
            }
            cmd::NORON => {
                self.mode &= !(mode::PARTIAL | mode::SCROLL);
                self.scroll_start = 0;
            }
            cmd::INVOFF => self.mode &= !mode::INVERT,
            cmd::INVON => self.mode |= mode::INVERT,
            cmd::DISPOFF => self.mode |= mode::OFF,
            cmd::DISPON => self.mode &= !mode::OFF,
            cmd::RAMWR => self.reset_cursor(),
            cmd::TEOFF => self.tear = false,
            cmd::TEON => self.tear = true,
            cmd::IDMOFF => self.mode &= !mode::IDLE,
            cmd::IDMON => self.mode |= mode::IDLE,
            _ => {}
        }
    }

    pub(super) fn write_param(&mut self, value: u8) {
        let word_param = self.param >> 1;

        match self.cmd {
            cmd::GAMSET => {
                if self.param == 0 {
                    self.gamma = value;
                }
            }
            cmd::CASET => match word_param {
                0 => write_half(&mut self.col_start, self.param, value),
                1 => write_half(&mut self.col_end, self.param, value),
                _ => {}
            },
            cmd::RASET => match word_param {
                0 => write_half(&mut self.row_start, self.param, value),
                1 => write_half(&mut self.row_end, self.param, value),
                _ => {}
            },
            cmd::RAMWR | cmd::RAMWRC => {
                // Serial pixels only while the RGB interface owns nothing
                if self.if_ctl & IC_CTRL_DATA == 0 {
                    self.ingest_byte(value);
                }
            }
            cmd::PTLAR => match word_param {
                0 => write_half(&mut self.partial_start, self.param, value),
                1 => write_half(&mut self.partial_end, self.param, value),
                _ => {}
            },
            cmd::VSCRDEF => match word_param {
                0 => write_half(&mut self.top_area, self.param, value),
                1 => write_half(&mut self.scroll_area, self.param, value),
                2 => write_half(&mut self.bottom_area, self.param, value),
                _ => {}
            },
            cmd::MADCTL => {
                if self.param == 0 {
                    self.mac = value;
                }
            }
            cmd::VSCSAD => {
                if word_param == 0 {
                    write_half(&mut self.scroll_start, self.param, value);
                    self.mode |= mode::SCROLL;
                }
            }
            cmd::COLMOD => {
                if word_param == 0 {
                    self.if_bpp = value;
                }
            }
            cmd::RAMCTRL => {
                // Word 1 (endianness / bus width) is reserved here
                if word_param == 0 {
                    self.if_ctl = value;
                }
            }
            cmd::PVGAMCTRL => self.store_gamma(0, value),
            cmd::NVGAMCTRL => self.store_gamma(1, value),
            _ => {}
        }

        self.param = self.param.wrapping_add(1);
    }

    fn store_gamma(&mut self, table: usize, value: u8) {
        if let Some(slot) = self.gamma_correction[table].get_mut(self.param as usize) {
            *slot = value;
        }
    }
}
