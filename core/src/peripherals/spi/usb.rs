//! Mass-storage bridge (revision M)
//!
//! Revision M silicon routes the SPI data port to an ARM coprocessor that
//! speaks bulk-only transport. Only host enumeration is answered: a command
//! block wrapper ("USBC") carrying SCSI INQUIRY arms a canned
//! identification response, which is then read out one byte per port read.

use super::SpiPanel;
use crate::emu::log_event;

/// Command block wrapper signature
const CBW_SIGNATURE: &[u8; 4] = b"USBC";
/// Offset of the SCSI opcode within the command block wrapper
const CBW_OPCODE: usize = 15;
/// Status wrapper signature byte replacing the 'C' of "USBC"
const CSW_SIGNATURE_TAIL: u8 = b'S';
const CBW_INDEX_MASK: u8 = 0x1F;

const SCSI_INQUIRY: u8 = 0x12;

/// Canned INQUIRY response: "TI      Python Adapter  3.00" followed by the
/// framed status wrapper
pub static INQUIRY_RESPONSE: [u8; 52] = [
    0xA5, 0x00, 0x80, 0x03, 0x02, 0x1F, 0x00, 0x00, 0x00, 0x54, 0x49, 0x20, 0x20,
    0x20, 0x20, 0x20, 0x20, 0x50, 0x79, 0x74, 0x68, 0x6F, 0x6E, 0x20, 0x41, 0x64,
    0x61, 0x70, 0x74, 0x65, 0x72, 0x20, 0x20, 0x33, 0x2E, 0x30, 0x30, 0x00, 0xA5,
    0x55, 0x53, 0x42, 0x53, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Rebuild a pending response from its remaining length
pub(super) fn response_tail(remaining: usize) -> Option<&'static [u8]> {
    let start = INQUIRY_RESPONSE.len().checked_sub(remaining)?;
    Some(&INQUIRY_RESPONSE[start..])
}

impl SpiPanel {
    pub(super) fn mass_storage_write(&mut self, value: u8) {
        if !self.mass_storage {
            return;
        }
        self.cbw[(self.cbw_index & CBW_INDEX_MASK) as usize] = value;
        self.cbw_index = self.cbw_index.wrapping_add(1);
    }

    pub(super) fn mass_storage_read(&mut self) -> u8 {
        if !self.mass_storage {
            return 0;
        }

        let mut value = 0;
        if let Some((&head, rest)) = self.response.split_first() {
            value = head;
            self.response = rest;
        } else if self.cbw.starts_with(CBW_SIGNATURE) {
            self.csw[..8].copy_from_slice(&self.cbw[..8]);
            self.csw[3] = CSW_SIGNATURE_TAIL;
            self.csw[8..13].fill(0);
            self.csw_index = 0;
            if self.cbw[CBW_OPCODE] == SCSI_INQUIRY {
                self.response = &INQUIRY_RESPONSE;
                log_event("SPI: INQUIRY response queued");
            }
        }

        // Every read restarts command block accumulation
        self.cbw_index = 0;
        self.cbw[0] = 0;
        value
    }

    /// Command status wrapper built for the last command block
    pub fn status_wrapper(&self) -> &[u8; 16] {
        &self.csw
    }
}
