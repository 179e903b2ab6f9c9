//! SPI Display Panel
//!
//! Port range 0xD (0xD000-0xDFFF via IN/OUT), offsets masked to 0xFFF.
//!
//! The TI-84 Plus CE drives its 320x240 panel through an ST7789-class driver
//! chip behind the SPI controller. Configuration travels as 9-bit serial
//! frames (1 data/command bit + 8 data bits) shifted in 3 bits per port write.
//! Pixel data arrives either over the same serial path or directly from the
//! LCD controller's DMA through the `update_pixel_*` entry points.
//!
//! Register map (offsets):
//! - 0x00-0x17: raw SPI controller registers (stored verbatim)
//! - 0x12: routing selector for the data port (0 = panel, 1 = mass-storage bridge)
//! - 0x18: data port
//!
//! GRAM is 320 rows x 240 columns. The panel scans rows on hsync and columns
//! on each pixel clock, writing into `display` in physical scan order
//! (`display[col][row]`), which the GUI reads as a 320x240 landscape image.

mod command;
mod cursor;
mod pixel;
mod scan;
mod usb;

use std::io::{Read, Write};

use crate::snapshot::{ByteReader, ByteWriter, SnapshotError, SnapshotResult};

pub use usb::INQUIRY_RESPONSE;

/// GRAM rows (scan lines)
pub const NUM_ROWS: usize = 320;
/// GRAM columns (pixels per scan line)
pub const NUM_COLS: usize = 240;
pub const LAST_ROW: u16 = NUM_ROWS as u16 - 1;
pub const LAST_COL: u16 = NUM_COLS as u16 - 1;

/// Number of raw byte registers below the data port
const REG_COUNT: usize = 0x18;
/// Data port offset
const DATA_PORT: u16 = 0x18;
/// Data port routing selector register
const ROUTE_REG: usize = 0x12;
/// Power-on value of register 0x0C
const REG_0C_RESET: u8 = 0xF2;

/// Data port routing (register 0x12)
mod route {
    pub const PANEL: u8 = 0;
    pub const MASS_STORAGE: u8 = 1;
}

/// Panel command opcodes
pub mod cmd {
    pub const NOP: u8 = 0x00;
    pub const SWRESET: u8 = 0x01;
    pub const SLPIN: u8 = 0x10;
    pub const SLPOUT: u8 = 0x11;
    pub const PTLON: u8 = 0x12;
    pub const NORON: u8 = 0x13;
    pub const INVOFF: u8 = 0x20;
    pub const INVON: u8 = 0x21;
    pub const GAMSET: u8 = 0x26;
    pub const DISPOFF: u8 = 0x28;
    pub const DISPON: u8 = 0x29;
    pub const CASET: u8 = 0x2A;
    pub const RASET: u8 = 0x2B;
    pub const RAMWR: u8 = 0x2C;
    pub const PTLAR: u8 = 0x30;
    pub const VSCRDEF: u8 = 0x33;
    pub const TEOFF: u8 = 0x34;
    pub const TEON: u8 = 0x35;
    pub const MADCTL: u8 = 0x36;
    pub const VSCSAD: u8 = 0x37;
    pub const IDMOFF: u8 = 0x38;
    pub const IDMON: u8 = 0x39;
    pub const COLMOD: u8 = 0x3A;
    pub const RAMWRC: u8 = 0x3C;
    pub const RAMCTRL: u8 = 0xB0;
    pub const PVGAMCTRL: u8 = 0xE0;
    pub const NVGAMCTRL: u8 = 0xE1;
}

/// Display mode bits
pub mod mode {
    pub const SLEEP: u8 = 1 << 0;
    pub const OFF: u8 = 1 << 1;
    /// Current row lies outside the partial area
    pub const BLANK: u8 = 1 << 2;
    pub const PARTIAL: u8 = 1 << 3;
    pub const INVERT: u8 = 1 << 4;
    pub const IDLE: u8 = 1 << 5;
    pub const SCROLL: u8 = 1 << 6;
    /// Outside the active scan (past the last row or column)
    pub const IGNORE: u8 = 1 << 7;
}

/// Memory access control (MADCTL) bits
pub mod mac {
    /// Horizontal refresh order
    pub const HRO: u8 = 1 << 2;
    /// Set = BGR panel order, clear = red/blue swapped on output
    pub const BGR: u8 = 1 << 3;
    /// Vertical refresh order
    pub const VRO: u8 = 1 << 4;
    /// Row/column exchange
    pub const RCX: u8 = 1 << 5;
    /// Column address order (cursor decrements)
    pub const CAO: u8 = 1 << 6;
    /// Row address order (cursor decrements)
    pub const RAO: u8 = 1 << 7;
}

/// Interface control (RAMCTRL word 0): pixels come from the RGB/DMA path,
/// the serial path carries configuration only
pub const IC_CTRL_DATA: u8 = 1 << 4;

/// Channel slots within a stored pixel (little-endian ARGB8888)
pub const BLUE: usize = 0;
pub const GREEN: usize = 1;
pub const RED: usize = 2;
pub const ALPHA: usize = 3;

/// Power-on interface pixel format (18 bpp on both interfaces)
const COLMOD_RESET: u8 = 0x66;
/// Gamma curve selected after reset
const GAMMA_RESET: u8 = 1;
/// Entries per gamma correction table
const GAMMA_TABLE_LEN: usize = 16;
/// 5-bit red, 6-bit green, 5-bit blue expansion tables
const LUT_LEN: usize = 32 + 64 + 32;

/// A completed 9-bit serial frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialWord {
    Command(u8),
    Parameter(u8),
}

/// Serial shift register: three 3-bit chunks make one 9-bit frame, the
/// first bit of which selects parameter (1) or command (0).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ShiftRegister {
    bits: u16,
    chunks: u8,
}

impl ShiftRegister {
    const CHUNKS_PER_WORD: u8 = 3;
    const PARAM_BIT: u16 = 1 << 8;

    /// Shift in the low 3 bits of `byte`, returning the frame once complete
    fn push(&mut self, byte: u8) -> Option<SerialWord> {
        self.bits = self.bits << 3 | (byte & 7) as u16;
        self.chunks += 1;
        if self.chunks < Self::CHUNKS_PER_WORD {
            return None;
        }
        let frame = self.bits;
        self.clear();
        let value = frame as u8;
        Some(if frame & Self::PARAM_BIT != 0 {
            SerialWord::Parameter(value)
        } else {
            SerialWord::Command(value)
        })
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

/// SPI display panel state
#[derive(Debug, Clone)]
pub struct SpiPanel {
    /// Raw SPI controller registers 0x00-0x17
    regs: [u8; REG_COUNT],
    fifo: ShiftRegister,

    /// Current command
    cmd: u8,
    /// Parameter bytes received since the last command
    param: u32,
    /// Display mode bits (see [`mode`])
    mode: u8,
    /// Memory access control (see [`mac`])
    mac: u8,

    // === GRAM write window (9-bit) ===
    col_start: u16,
    col_end: u16,
    row_start: u16,
    row_end: u16,

    // === Partial display and vertical scroll ===
    partial_start: u16,
    partial_end: u16,
    top_area: u16,
    scroll_area: u16,
    bottom_area: u16,
    scroll_start: u16,

    // === Scan position ===
    row: u16,
    col: u16,
    col_dir: i8,
    /// GRAM row feeding the current scan line (after scroll and mirroring)
    src_row: u16,
    /// Output row for the current scan line (after mirroring)
    dst_row: u16,

    // === GRAM write cursor ===
    row_reg: u16,
    col_reg: u16,

    // === Interface ===
    if_bpp: u8,
    if_ctl: u8,
    if_red: u8,
    if_green: u8,
    if_blue: u8,

    gamma: u8,
    /// Positive / negative gamma correction tables (accepted, not applied)
    gamma_correction: [[u8; GAMMA_TABLE_LEN]; 2],
    /// Channel expansion tables: red at 0, green at 32, blue at 96
    lut: [u8; LUT_LEN],

    // === Mass-storage bridge (revision M) ===
    cbw: [u8; 32],
    cbw_index: u8,
    csw: [u8; 16],
    csw_index: u8,
    /// Unread tail of the pending response
    response: &'static [u8],

    /// Tearing effect output enabled
    tear: bool,

    /// Revision-dependent: mass-storage bridge present. Configuration, not
    /// part of the snapshot.
    mass_storage: bool,

    /// GRAM, row-major `[NUM_ROWS][NUM_COLS]`
    frame: Vec<[u8; 4]>,
    /// Output buffer, `[NUM_COLS][NUM_ROWS]` in scan order
    display: Vec<[u8; 4]>,
}

impl SpiPanel {
    /// Register/state portion of the snapshot
    const STATE_SIZE: usize = 285;
    /// Size of one pixel buffer in bytes
    const BUFFER_SIZE: usize = NUM_ROWS * NUM_COLS * 4;
    /// Size of the panel snapshot in bytes
    pub const SNAPSHOT_SIZE: usize = Self::STATE_SIZE + 2 * Self::BUFFER_SIZE;

    /// Create a panel in its hardware reset state
    pub fn new() -> Self {
        let mut panel = Self::zeroed(
            vec![[0; 4]; NUM_ROWS * NUM_COLS],
            vec![[0; 4]; NUM_COLS * NUM_ROWS],
            false,
        );
        panel.hw_reset();
        panel
    }

    /// All-zero state around the given pixel buffers
    fn zeroed(frame: Vec<[u8; 4]>, display: Vec<[u8; 4]>, mass_storage: bool) -> Self {
        Self {
            regs: [0; REG_COUNT],
            fifo: ShiftRegister::default(),
            cmd: 0,
            param: 0,
            mode: 0,
            mac: 0,
            col_start: 0,
            col_end: 0,
            row_start: 0,
            row_end: 0,
            partial_start: 0,
            partial_end: 0,
            top_area: 0,
            scroll_area: 0,
            bottom_area: 0,
            scroll_start: 0,
            row: 0,
            col: 0,
            col_dir: 0,
            src_row: 0,
            dst_row: 0,
            row_reg: 0,
            col_reg: 0,
            if_bpp: 0,
            if_ctl: 0,
            if_red: 0,
            if_green: 0,
            if_blue: 0,
            gamma: 0,
            gamma_correction: [[0; GAMMA_TABLE_LEN]; 2],
            lut: [0; LUT_LEN],
            cbw: [0; 32],
            cbw_index: 0,
            csw: [0; 16],
            csw_index: 0,
            response: &[],
            tear: false,
            mass_storage,
            frame,
            display,
        }
    }

    /// Hardware reset: zero everything except the revision configuration,
    /// then apply power-on defaults
    pub fn reset(&mut self) {
        let mut frame = std::mem::take(&mut self.frame);
        let mut display = std::mem::take(&mut self.display);
        frame.fill([0; 4]);
        display.fill([0; 4]);
        *self = Self::zeroed(frame, display, self.mass_storage);
        self.hw_reset();
    }

    fn hw_reset(&mut self) {
        self.regs[0x0C] = REG_0C_RESET;
        self.mac = 0;
        self.if_bpp = COLMOD_RESET;
        self.lut = pixel::build_lut();
        self.sw_reset();
    }

    /// Enable the revision M mass-storage bridge on the data port
    pub fn set_mass_storage_bridge(&mut self, enabled: bool) {
        self.mass_storage = enabled;
    }

    pub fn mass_storage_bridge(&self) -> bool {
        self.mass_storage
    }

    /// Read from the SPI port range.
    /// `peek` is accepted for the debugger, but the mass-storage path still
    /// consumes response bytes and clears its accumulator when peeked.
    pub fn read(&mut self, offset: u16, _peek: bool) -> u8 {
        match offset {
            o if (o as usize) < REG_COUNT => self.regs[o as usize],
            DATA_PORT => match self.regs[ROUTE_REG] {
                route::MASS_STORAGE => self.mass_storage_read(),
                _ => 0,
            },
            _ => 0,
        }
    }

    /// Write to the SPI port range
    pub fn write(&mut self, offset: u16, value: u8) {
        match offset {
            o if (o as usize) < REG_COUNT => self.regs[o as usize] = value,
            DATA_PORT => match self.regs[ROUTE_REG] {
                route::PANEL => match self.fifo.push(value) {
                    Some(SerialWord::Command(c)) => self.write_cmd(c),
                    Some(SerialWord::Parameter(p)) => self.write_param(p),
                    None => {}
                },
                route::MASS_STORAGE => self.mass_storage_write(value),
                _ => {}
            },
            _ => {}
        }
    }

    /// Send one 9-bit frame as three data port writes
    pub fn write_word(&mut self, word: SerialWord) {
        let frame = match word {
            SerialWord::Command(c) => c as u16,
            SerialWord::Parameter(p) => ShiftRegister::PARAM_BIT | p as u16,
        };
        self.write(DATA_PORT, (frame >> 6) as u8 & 7);
        self.write(DATA_PORT, (frame >> 3) as u8 & 7);
        self.write(DATA_PORT, frame as u8 & 7);
    }

    /// Send a command byte over the serial path
    pub fn send_command(&mut self, command: u8) {
        self.write_word(SerialWord::Command(command));
    }

    /// Send parameter bytes over the serial path
    pub fn send_parameters(&mut self, params: &[u8]) {
        for &p in params {
            self.write_word(SerialWord::Parameter(p));
        }
    }

    // === Accessors ===

    pub fn mode(&self) -> u8 {
        self.mode
    }

    pub fn mac(&self) -> u8 {
        self.mac
    }

    pub fn command(&self) -> u8 {
        self.cmd
    }

    pub fn tear(&self) -> bool {
        self.tear
    }

    pub fn gamma(&self) -> u8 {
        self.gamma
    }

    pub fn gamma_table(&self, index: usize) -> &[u8; GAMMA_TABLE_LEN] {
        &self.gamma_correction[index & 1]
    }

    pub fn interface_format(&self) -> u8 {
        self.if_bpp
    }

    pub fn interface_control(&self) -> u8 {
        self.if_ctl
    }

    /// (start, end) of the column address window
    pub fn column_window(&self) -> (u16, u16) {
        (self.col_start, self.col_end)
    }

    /// (start, end) of the row address window
    pub fn row_window(&self) -> (u16, u16) {
        (self.row_start, self.row_end)
    }

    pub fn partial_window(&self) -> (u16, u16) {
        (self.partial_start, self.partial_end)
    }

    /// (top, scroll, bottom) area heights
    pub fn scroll_areas(&self) -> (u16, u16, u16) {
        (self.top_area, self.scroll_area, self.bottom_area)
    }

    pub fn scroll_start(&self) -> u16 {
        self.scroll_start
    }

    /// (row_reg, col_reg) of the GRAM write cursor
    pub fn cursor(&self) -> (u16, u16) {
        (self.row_reg, self.col_reg)
    }

    pub fn row(&self) -> u16 {
        self.row
    }

    pub fn col(&self) -> u16 {
        self.col
    }

    pub fn src_row(&self) -> u16 {
        self.src_row
    }

    pub fn dst_row(&self) -> u16 {
        self.dst_row
    }

    pub fn lut(&self) -> &[u8; LUT_LEN] {
        &self.lut
    }

    pub fn raw_register(&self, offset: usize) -> u8 {
        self.regs[offset % REG_COUNT]
    }

    /// Bytes left in the pending mass-storage response
    pub fn pending_response(&self) -> usize {
        self.response.len()
    }

    /// Stored GRAM pixel at (row, col); alpha slot unused
    pub fn frame_pixel(&self, row: usize, col: usize) -> [u8; 4] {
        self.frame[row * NUM_COLS + col]
    }

    /// Output pixel at physical (col, row)
    pub fn display_pixel(&self, col: usize, row: usize) -> [u8; 4] {
        self.display[col * NUM_ROWS + row]
    }

    /// Output buffer: NUM_COLS lines of NUM_ROWS pixels
    pub fn display_pixels(&self) -> &[[u8; 4]] {
        &self.display
    }

    // ========== State Persistence ==========

    /// Save panel state to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = ByteWriter::with_capacity(Self::SNAPSHOT_SIZE);

        w.bytes(&self.regs);
        w.u16(self.fifo.bits);
        w.u8(self.fifo.chunks);
        w.u8(self.cmd);
        w.u32(self.param);
        w.u8(self.mode);
        w.u8(self.mac);

        for v in [
            self.col_start, self.col_end, self.row_start, self.row_end,
            self.partial_start, self.partial_end,
            self.top_area, self.scroll_area, self.bottom_area, self.scroll_start,
            self.row, self.col,
        ] {
            w.u16(v);
        }
        w.u8(self.col_dir as u8);
        w.u16(self.src_row);
        w.u16(self.dst_row);
        w.u16(self.row_reg);
        w.u16(self.col_reg);

        w.u8(self.if_bpp);
        w.u8(self.if_ctl);
        w.u8(self.if_red);
        w.u8(self.if_green);
        w.u8(self.if_blue);
        w.u8(self.gamma);
        w.bytes(&self.gamma_correction[0]);
        w.bytes(&self.gamma_correction[1]);
        w.bytes(&self.lut);

        w.bytes(&self.cbw);
        w.u8(self.cbw_index);
        w.bytes(&self.csw);
        w.u8(self.csw_index);
        w.u8(self.response.len() as u8);
        w.bool(self.tear);
        debug_assert_eq!(w.len(), Self::STATE_SIZE);

        w.bytes(self.frame.as_flattened());
        w.bytes(self.display.as_flattened());
        w.into_inner()
    }

    /// Load panel state from bytes. On error the panel is left untouched.
    pub fn from_bytes(&mut self, buf: &[u8]) -> SnapshotResult<()> {
        if buf.len() < Self::SNAPSHOT_SIZE {
            return Err(SnapshotError::Corrupt("panel record truncated"));
        }
        let mut r = ByteReader::new(buf);
        let mut next = Self::new();

        next.regs = r.array()?;
        next.fifo.bits = r.u16()?;
        next.fifo.chunks = r.u8()?;
        if next.fifo.chunks >= ShiftRegister::CHUNKS_PER_WORD {
            return Err(SnapshotError::Corrupt("serial shift register"));
        }
        next.cmd = r.u8()?;
        next.param = r.u32()?;
        next.mode = r.u8()?;
        next.mac = r.u8()?;

        next.col_start = r.u16()?;
        next.col_end = r.u16()?;
        next.row_start = r.u16()?;
        next.row_end = r.u16()?;
        next.partial_start = r.u16()?;
        next.partial_end = r.u16()?;
        next.top_area = r.u16()?;
        next.scroll_area = r.u16()?;
        next.bottom_area = r.u16()?;
        next.scroll_start = r.u16()?;
        next.row = r.u16()?;
        next.col = r.u16()?;
        next.col_dir = r.u8()? as i8;
        next.src_row = r.u16()?;
        next.dst_row = r.u16()?;
        next.row_reg = r.u16()?;
        next.col_reg = r.u16()?;

        next.if_bpp = r.u8()?;
        next.if_ctl = r.u8()?;
        next.if_red = r.u8()?;
        next.if_green = r.u8()?;
        next.if_blue = r.u8()?;
        next.gamma = r.u8()?;
        next.gamma_correction[0] = r.array()?;
        next.gamma_correction[1] = r.array()?;
        next.lut = r.array()?;

        next.cbw = r.array()?;
        next.cbw_index = r.u8()?;
        next.csw = r.array()?;
        next.csw_index = r.u8()?;
        let pending = r.u8()? as usize;
        next.response = usb::response_tail(pending)
            .ok_or(SnapshotError::Corrupt("mass-storage response length"))?;
        next.tear = r.bool()?;

        for (dst, src) in next.frame.iter_mut().zip(r.bytes(Self::BUFFER_SIZE)?.chunks_exact(4)) {
            dst.copy_from_slice(src);
        }
        for (dst, src) in next.display.iter_mut().zip(r.bytes(Self::BUFFER_SIZE)?.chunks_exact(4)) {
            dst.copy_from_slice(src);
        }

        next.mass_storage = self.mass_storage;
        *self = next;
        Ok(())
    }

    /// Write the panel snapshot to a stream
    pub fn save<W: Write>(&self, out: &mut W) -> SnapshotResult<()> {
        out.write_all(&self.to_bytes())?;
        Ok(())
    }

    /// Read a panel snapshot from a stream; all or nothing
    pub fn restore<R: Read>(&mut self, input: &mut R) -> SnapshotResult<()> {
        let mut buf = vec![0u8; Self::SNAPSHOT_SIZE];
        input.read_exact(&mut buf)?;
        self.from_bytes(&buf)
    }
}

impl Default for SpiPanel {
    fn default() -> Self {
        Self::new()
    }
}

/// Write one byte of a 9-bit field: even parameter indices carry the high
/// byte (bit 8 only), odd indices the low byte.
fn write_half(field: &mut u16, param: u32, value: u8) {
    let shift = if param & 1 == 0 { 8 } else { 0 };
    let value = value as u16 & (0x1FF >> shift);
    *field = (*field & !(0xFF << shift)) | value << shift;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hw_reset_defaults() {
        let panel = SpiPanel::new();
        assert_eq!(panel.raw_register(0x0C), 0xF2);
        assert_eq!(panel.mac(), 0);
        assert_eq!(panel.mode(), mode::SLEEP | mode::OFF);
        assert_eq!(panel.gamma(), 1);
        assert_eq!(panel.interface_format(), 0x66);
        assert_eq!(panel.column_window(), (0, LAST_ROW));
        assert_eq!(panel.row_window(), (0, LAST_COL));
        assert_eq!(panel.partial_window(), (0, LAST_ROW));
        assert_eq!(panel.scroll_areas(), (0, NUM_ROWS as u16, 0));
        assert!(!panel.tear());
    }

    #[test]
    fn test_lut_contents() {
        let panel = SpiPanel::new();
        let lut = panel.lut();
        assert_eq!(lut[0], 0x00);
        assert_eq!(lut[31], 0xFF);
        assert_eq!(lut[32], 0x00);
        assert_eq!(lut[32 + 63], 0xFF);
        assert_eq!(lut[96 + 31], 0xFF);
        // 5-bit 0b10000 -> 0b10000100
        assert_eq!(lut[16], 0x84);
        // 6-bit 0b100000 -> 0b10000010
        assert_eq!(lut[32 + 32], 0x82);
    }

    #[test]
    fn test_raw_registers_store() {
        let mut panel = SpiPanel::new();
        for offset in 0..0x18u16 {
            panel.write(offset, offset as u8 ^ 0x5A);
        }
        for offset in 0..0x18u16 {
            assert_eq!(panel.read(offset, false), offset as u8 ^ 0x5A);
        }
        // Beyond the data port: ignored
        panel.write(0x40, 0x12);
        assert_eq!(panel.read(0x40, false), 0);
    }

    #[test]
    fn test_data_port_reads_zero_on_panel_path() {
        let mut panel = SpiPanel::new();
        panel.write(DATA_PORT, 0x07);
        assert_eq!(panel.read(DATA_PORT, false), 0);
    }

    #[test]
    fn test_shift_register_needs_three_chunks() {
        let mut fifo = ShiftRegister::default();
        assert_eq!(fifo.push(0x01), None);
        assert_eq!(fifo.push(0x02), None);
        // 001 010 011 -> 0x053, bit 8 clear
        assert_eq!(fifo.push(0x0B), Some(SerialWord::Command(0x53)));
        assert_eq!(fifo, ShiftRegister::default());

        assert_eq!(fifo.push(0x04), None);
        assert_eq!(fifo.push(0x00), None);
        assert_eq!(fifo.push(0x07), Some(SerialWord::Parameter(0x07)));
    }

    #[test]
    fn test_shift_register_masks_upper_bits() {
        let mut fifo = ShiftRegister::default();
        fifo.push(0xF8);
        fifo.push(0xF8);
        assert_eq!(fifo.push(0xF9), Some(SerialWord::Command(0x01)));
    }

    #[test]
    fn test_routing_selector_other_values_inert() {
        let mut panel = SpiPanel::new();
        panel.write(ROUTE_REG as u16, 2);
        panel.send_command(cmd::SLPOUT);
        assert_ne!(panel.mode() & mode::SLEEP, 0);
        assert_eq!(panel.read(DATA_PORT, false), 0);
    }

    #[test]
    fn test_write_half_masks_to_nine_bits() {
        let mut field = 0u16;
        write_half(&mut field, 0, 0xFF);
        assert_eq!(field, 0x100);
        write_half(&mut field, 1, 0x3F);
        assert_eq!(field, 0x13F);
        write_half(&mut field, 2, 0x00);
        assert_eq!(field, 0x03F);
    }

    #[test]
    fn test_snapshot_size() {
        let panel = SpiPanel::new();
        assert_eq!(panel.to_bytes().len(), SpiPanel::SNAPSHOT_SIZE);
    }

    #[test]
    fn test_snapshot_roundtrip_bit_identical() {
        let mut panel = SpiPanel::new();
        panel.send_command(cmd::SLPOUT);
        panel.send_command(cmd::DISPON);
        panel.send_command(cmd::MADCTL);
        panel.send_parameters(&[mac::BGR | mac::HRO]);
        panel.send_command(cmd::PVGAMCTRL);
        panel.send_parameters(&[1, 2, 3, 4]);
        panel.send_command(cmd::RAMWR);
        panel.send_parameters(&[0xFC, 0x80, 0x40, 0x10]);
        panel.vsync();
        let mut rng = crate::bus::BusRng::new();
        while panel.refresh_pixel(&mut rng) {}
        // Leave a half-shifted frame behind
        panel.write(DATA_PORT, 0x04);

        let bytes = panel.to_bytes();
        let mut restored = SpiPanel::new();
        restored.from_bytes(&bytes).unwrap();
        assert_eq!(restored.to_bytes(), bytes);
        assert_eq!(restored.fifo, panel.fifo);
        assert_eq!(restored.frame_pixel(0, 0), panel.frame_pixel(0, 0));
    }

    #[test]
    fn test_snapshot_stream_roundtrip() {
        let mut panel = SpiPanel::new();
        panel.send_command(cmd::INVON);
        let mut blob = Vec::new();
        panel.save(&mut blob).unwrap();
        assert_eq!(blob.len(), SpiPanel::SNAPSHOT_SIZE);

        let mut restored = SpiPanel::new();
        restored.restore(&mut blob.as_slice()).unwrap();
        assert_ne!(restored.mode() & mode::INVERT, 0);
    }

    #[test]
    fn test_restore_short_read_leaves_state() {
        let mut panel = SpiPanel::new();
        panel.send_command(cmd::SLPOUT);
        let blob = SpiPanel::new().to_bytes();

        let truncated = &blob[..blob.len() - 1];
        assert!(matches!(panel.restore(&mut &truncated[..]), Err(SnapshotError::Io(_))));
        assert!(panel.from_bytes(truncated).is_err());
        assert_eq!(panel.mode() & mode::SLEEP, 0);
    }

    #[test]
    fn test_restore_rejects_bad_response_length() {
        let mut bytes = SpiPanel::new().to_bytes();
        // response length byte sits just before the tear flag
        bytes[SpiPanel::STATE_SIZE - 2] = 0xFF;
        let mut panel = SpiPanel::new();
        assert!(matches!(panel.from_bytes(&bytes), Err(SnapshotError::Corrupt(_))));
    }

    #[test]
    fn test_reset_keeps_mass_storage_configuration() {
        let mut panel = SpiPanel::new();
        panel.set_mass_storage_bridge(true);
        panel.reset();
        assert!(panel.mass_storage_bridge());
    }
}
