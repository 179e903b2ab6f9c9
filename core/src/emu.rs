//! Emulator orchestrator
//!
//! Coordinates the ASIC configuration, the SPI display panel and the bus
//! randomness source. Port I/O for range 0xD is routed to the panel and the
//! video timing calls are forwarded in scan order.

use crate::asic::{Asic, AsicRevision, DeviceType};
use crate::bus::BusRng;
use crate::peripherals::{decode_port, SpiPanel, NUM_COLS, NUM_ROWS, SPI_PORT_RANGE};
use crate::snapshot::{ByteReader, ByteWriter, SnapshotError, SnapshotResult};
use std::ffi::CString;
use std::io::{Read, Write};
use std::os::raw::c_char;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

/// Display output dimensions (landscape, as presented)
pub const SCREEN_WIDTH: usize = NUM_ROWS;
pub const SCREEN_HEIGHT: usize = NUM_COLS;

static LOG_CALLBACK: AtomicPtr<std::ffi::c_void> = AtomicPtr::new(ptr::null_mut());

pub(crate) fn set_log_callback(cb: Option<extern "C" fn(*const c_char)>) {
    let ptr = cb.map(|f| f as *mut std::ffi::c_void).unwrap_or(ptr::null_mut());
    LOG_CALLBACK.store(ptr, Ordering::SeqCst);
}

/// Public logging function for use by other modules
pub fn log_event(message: &str) {
    let cb_ptr = LOG_CALLBACK.load(Ordering::SeqCst);
    if !cb_ptr.is_null() {
        let cb: extern "C" fn(*const c_char) = unsafe { std::mem::transmute(cb_ptr) };
        if let Ok(cstr) = CString::new(message) {
            cb(cstr.as_ptr());
        }
    }
}

/// Main emulator state
pub struct Emu {
    /// Device and revision configuration
    asic: Asic,
    /// SPI display panel
    spi: SpiPanel,
    /// Source for undefined reads (unconnected GRAM rows)
    rng: BusRng,
}

impl Emu {
    /// Create a new emulator instance in its power-on state
    pub fn new() -> Self {
        let asic = Asic::new();
        let mut spi = SpiPanel::new();
        spi.set_mass_storage_bridge(asic.rev_m());
        Self {
            asic,
            spi,
            rng: BusRng::new(),
        }
    }

    /// Reset to power-on state, latching the configured revision
    pub fn reset(&mut self) {
        self.asic.reset();
        self.spi.set_mass_storage_bridge(self.asic.rev_m());
        self.spi.reset();
        self.rng.reset();
        log_event(&format!(
            "RESET device={:?} revision={:?}",
            self.asic.device_type(),
            self.asic.revision()
        ));
    }

    // ========== Configuration ==========

    pub fn set_device_type(&mut self, device: DeviceType) {
        self.asic.set_device_type(device);
        log_event(&format!("CONFIG: device={:?}", device));
    }

    /// Request an ASIC revision; applied at the next reset
    pub fn set_revision(&mut self, revision: AsicRevision) {
        self.asic.set_revision(revision);
        log_event(&format!("CONFIG: revision={:?}", revision));
    }

    /// Set what `AsicRevision::Auto` resolves to; applied at the next reset
    pub fn set_auto_revision(&mut self, revision: AsicRevision) {
        self.asic.set_auto_revision(revision);
        log_event(&format!("CONFIG: auto_revision={:?}", revision));
    }

    pub fn asic(&self) -> &Asic {
        &self.asic
    }

    pub fn panel(&self) -> &SpiPanel {
        &self.spi
    }

    pub fn panel_mut(&mut self) -> &mut SpiPanel {
        &mut self.spi
    }

    // ========== Port I/O ==========

    /// Read a port. Ranges other than the SPI panel read as 0.
    pub fn port_read(&mut self, port: u16, peek: bool) -> u8 {
        match decode_port(port) {
            (SPI_PORT_RANGE, offset) => self.spi.read(offset, peek),
            _ => 0,
        }
    }

    /// Write a port. Ranges other than the SPI panel are ignored.
    pub fn port_write(&mut self, port: u16, value: u8) {
        if let (SPI_PORT_RANGE, offset) = decode_port(port) {
            self.spi.write(offset, value);
        }
    }

    // ========== Video timing ==========

    pub fn hsync(&mut self) -> bool {
        self.spi.hsync()
    }

    pub fn vsync(&mut self) -> bool {
        self.spi.vsync()
    }

    pub fn refresh_pixel(&mut self) -> bool {
        self.spi.refresh_pixel(&mut self.rng)
    }

    /// Scan one full frame into the display buffer: one vsync, then each
    /// line is refreshed pixel by pixel before the next hsync
    pub fn render_frame(&mut self) {
        if !self.spi.vsync() {
            return;
        }
        loop {
            while self.spi.refresh_pixel(&mut self.rng) {}
            if !self.spi.hsync() {
                break;
            }
        }
    }

    /// Get display dimensions (width, height)
    pub fn display_size(&self) -> (usize, usize) {
        (SCREEN_WIDTH, SCREEN_HEIGHT)
    }

    /// Display buffer: SCREEN_HEIGHT lines of SCREEN_WIDTH ARGB8888 pixels
    /// (little-endian byte order B, G, R, A)
    pub fn display_pixels(&self) -> &[[u8; 4]] {
        self.spi.display_pixels()
    }

    /// Get raw pointer to the display buffer
    pub fn display_ptr(&self) -> *const u8 {
        self.spi.display_pixels().as_flattened().as_ptr()
    }

    // ========== State Persistence ==========

    /// State format version
    const STATE_VERSION: u32 = 1;
    /// Magic bytes for state file identification
    const STATE_MAGIC: [u8; 4] = *b"CESP";
    /// Header size: magic(4) + version(4) + data_len(4) = 12
    const STATE_HEADER_SIZE: usize = 12;
    /// Bus RNG state
    const RNG_STATE_SIZE: usize = 3;

    fn state_data_size() -> usize {
        Asic::SNAPSHOT_SIZE + Self::RNG_STATE_SIZE + SpiPanel::SNAPSHOT_SIZE
    }

    /// Get size required for save state buffer
    pub fn save_state_size(&self) -> usize {
        Self::STATE_HEADER_SIZE + Self::state_data_size()
    }

    /// Save emulator state to buffer
    /// Returns number of bytes written on success
    pub fn save_state(&self, buffer: &mut [u8]) -> SnapshotResult<usize> {
        let required = self.save_state_size();
        if buffer.len() < required {
            return Err(SnapshotError::BufferTooSmall { needed: required, available: buffer.len() });
        }

        let state = self.encode_state();
        buffer[..state.len()].copy_from_slice(&state);
        log_event(&format!("STATE_SAVED: {} bytes", state.len()));
        Ok(state.len())
    }

    fn encode_state(&self) -> Vec<u8> {
        let mut w = ByteWriter::with_capacity(self.save_state_size());
        w.bytes(&Self::STATE_MAGIC);
        w.u32(Self::STATE_VERSION);
        w.u32(Self::state_data_size() as u32);
        w.bytes(&self.asic.to_bytes());
        w.bytes(&self.rng.state());
        w.bytes(&self.spi.to_bytes());
        w.into_inner()
    }

    /// Load emulator state from buffer. On error nothing is changed.
    pub fn load_state(&mut self, buffer: &[u8]) -> SnapshotResult<()> {
        let mut r = ByteReader::new(buffer);
        let data_len = Self::read_header(&mut r)?;
        if r.remaining() < data_len {
            return Err(SnapshotError::Corrupt("payload length"));
        }

        let mut asic = self.asic.clone();
        let asic_record: [u8; Asic::SNAPSHOT_SIZE] = r.array()?;
        asic.from_bytes(&asic_record)
            .map_err(|_| SnapshotError::Corrupt("asic configuration"))?;

        let [s1, s2, s3] = r.array::<3>()?;
        let mut rng = BusRng::new();
        rng.seed(s1, s2, s3);

        let mut spi = SpiPanel::new();
        spi.set_mass_storage_bridge(asic.rev_m());
        spi.from_bytes(r.bytes(SpiPanel::SNAPSHOT_SIZE)?)?;

        self.asic = asic;
        self.rng = rng;
        self.spi = spi;
        log_event("STATE_LOADED");
        Ok(())
    }

    /// Validate magic, version and payload length; returns the payload length
    fn read_header(r: &mut ByteReader<'_>) -> SnapshotResult<usize> {
        if r.remaining() < Self::STATE_HEADER_SIZE {
            return Err(SnapshotError::InvalidMagic);
        }
        if r.array::<4>()? != Self::STATE_MAGIC {
            return Err(SnapshotError::InvalidMagic);
        }
        let version = r.u32()?;
        if version != Self::STATE_VERSION {
            return Err(SnapshotError::UnsupportedVersion(version));
        }
        let data_len = r.u32()? as usize;
        if data_len != Self::state_data_size() {
            return Err(SnapshotError::Corrupt("payload length"));
        }
        Ok(data_len)
    }

    /// Write the emulator state to a stream
    pub fn save<W: Write>(&self, out: &mut W) -> SnapshotResult<()> {
        let state = self.encode_state();
        out.write_all(&state)?;
        log_event(&format!("STATE_SAVED: {} bytes", state.len()));
        Ok(())
    }

    /// Read emulator state from a stream; all or nothing
    pub fn restore<R: Read>(&mut self, input: &mut R) -> SnapshotResult<()> {
        let mut header = [0u8; Self::STATE_HEADER_SIZE];
        input.read_exact(&mut header)?;
        let data_len = Self::read_header(&mut ByteReader::new(&header))?;

        let mut buffer = header.to_vec();
        buffer.resize(Self::STATE_HEADER_SIZE + data_len, 0);
        input.read_exact(&mut buffer[Self::STATE_HEADER_SIZE..])?;
        self.load_state(&buffer)
    }
}

impl Default for Emu {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peripherals::spi::{cmd, mode};
    use std::sync::atomic::AtomicUsize;

    /// Send a 9-bit serial frame through the port interface
    fn serial(emu: &mut Emu, frame: u16) {
        emu.port_write(0xD018, (frame >> 6) as u8 & 7);
        emu.port_write(0xD018, (frame >> 3) as u8 & 7);
        emu.port_write(0xD018, frame as u8 & 7);
    }

    #[test]
    fn test_new_emu() {
        let emu = Emu::new();
        assert_eq!(emu.asic().revision(), AsicRevision::A);
        assert!(!emu.panel().mass_storage_bridge());
        assert_eq!(emu.display_pixels().len(), SCREEN_WIDTH * SCREEN_HEIGHT);
        assert_eq!(emu.display_size(), (320, 240));
    }

    #[test]
    fn test_revision_applies_at_reset() {
        let mut emu = Emu::new();
        emu.set_revision(AsicRevision::M);
        assert!(!emu.panel().mass_storage_bridge());
        emu.reset();
        assert_eq!(emu.asic().revision(), AsicRevision::M);
        assert!(emu.panel().mass_storage_bridge());

        emu.set_revision(AsicRevision::Auto);
        emu.set_auto_revision(AsicRevision::I);
        emu.reset();
        assert_eq!(emu.asic().revision(), AsicRevision::I);
        assert!(!emu.panel().mass_storage_bridge());
    }

    #[test]
    fn test_port_routing() {
        let mut emu = Emu::new();
        emu.port_write(0xD004, 0x5A);
        assert_eq!(emu.port_read(0xD004, false), 0x5A);
        // Offsets are masked within the range
        assert_eq!(emu.panel().raw_register(0x04), 0x5A);

        // Other ranges are not the panel
        emu.port_write(0x5004, 0x77);
        assert_eq!(emu.port_read(0x5004, false), 0);
        assert_eq!(emu.port_read(0xD004, false), 0x5A);
    }

    #[test]
    fn test_serial_commands_through_ports() {
        let mut emu = Emu::new();
        serial(&mut emu, cmd::SLPOUT as u16);
        serial(&mut emu, cmd::INVON as u16);
        assert_eq!(emu.panel().mode() & mode::SLEEP, 0);
        assert_ne!(emu.panel().mode() & mode::INVERT, 0);
    }

    #[test]
    fn test_render_frame_asleep_is_white() {
        let mut emu = Emu::new();
        emu.render_frame();
        assert!(emu.display_pixels().iter().all(|p| *p == [0xFF; 4]));
        assert_eq!(emu.panel().row(), 319);
    }

    #[test]
    fn test_render_frame_reads_gram() {
        let mut emu = Emu::new();
        let panel = emu.panel_mut();
        panel.send_command(cmd::SLPOUT);
        panel.send_command(cmd::DISPON);
        panel.update_pixel_18bpp(63, 0, 0);
        emu.render_frame();
        // BGR clear: stored red comes out in the blue slot
        assert_eq!(emu.display_pixels()[0], [0xFF, 0x00, 0x00, 0xFF]);
        assert_eq!(emu.display_pixels()[1], [0x00, 0x00, 0x00, 0xFF]);
    }

    #[test]
    fn test_display_ptr_matches_buffer() {
        let emu = Emu::new();
        assert_eq!(emu.display_ptr(), emu.display_pixels().as_ptr() as *const u8);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let mut emu = Emu::new();
        emu.set_revision(AsicRevision::M);
        emu.reset();
        emu.panel_mut().send_command(cmd::SLPOUT);
        emu.refresh_pixel();

        let mut buf = vec![0u8; emu.save_state_size()];
        let written = emu.save_state(&mut buf).unwrap();
        assert_eq!(written, buf.len());

        let mut restored = Emu::new();
        restored.load_state(&buf).unwrap();
        assert_eq!(restored.asic().revision(), AsicRevision::M);
        assert!(restored.panel().mass_storage_bridge());
        assert_eq!(restored.panel().mode() & mode::SLEEP, 0);

        let mut again = vec![0u8; restored.save_state_size()];
        restored.save_state(&mut again).unwrap();
        assert_eq!(again, buf);
    }

    #[test]
    fn test_stream_roundtrip() {
        let mut emu = Emu::new();
        emu.panel_mut().send_command(cmd::IDMON);
        let mut blob = Vec::new();
        emu.save(&mut blob).unwrap();
        assert_eq!(blob.len(), emu.save_state_size());

        let mut restored = Emu::new();
        restored.restore(&mut blob.as_slice()).unwrap();
        assert_ne!(restored.panel().mode() & mode::IDLE, 0);
    }

    #[test]
    fn test_save_buffer_too_small() {
        let emu = Emu::new();
        let mut buf = vec![0u8; 16];
        let err = emu.save_state(&mut buf).unwrap_err();
        assert_eq!(err.code(), -101);
    }

    #[test]
    fn test_load_rejects_bad_header() {
        let emu = Emu::new();
        let mut buf = vec![0u8; emu.save_state_size()];
        emu.save_state(&mut buf).unwrap();

        let mut target = Emu::new();
        let mut bad_magic = buf.clone();
        bad_magic[0] = b'X';
        assert!(matches!(target.load_state(&bad_magic), Err(SnapshotError::InvalidMagic)));

        let mut bad_version = buf.clone();
        bad_version[4] = 99;
        assert!(matches!(target.load_state(&bad_version), Err(SnapshotError::UnsupportedVersion(99))));

        assert!(matches!(target.load_state(&buf[..8]), Err(SnapshotError::InvalidMagic)));
        assert!(matches!(target.load_state(&buf[..buf.len() - 1]), Err(SnapshotError::Corrupt(_))));
    }

    #[test]
    fn test_header_length_must_match_payload() {
        let mut header = Vec::new();
        header.extend_from_slice(&Emu::STATE_MAGIC);
        header.extend_from_slice(&Emu::STATE_VERSION.to_le_bytes());
        header.extend_from_slice(&(1u32 << 30).to_le_bytes());

        // Rejected from the header alone, before any payload is read
        let mut emu = Emu::new();
        let err = emu.restore(&mut header.as_slice()).unwrap_err();
        assert!(matches!(err, SnapshotError::Corrupt(_)));

        // Oversized length with a full payload behind it
        let mut buf = vec![0u8; emu.save_state_size()];
        emu.save_state(&mut buf).unwrap();
        buf[8..12].copy_from_slice(&(Emu::state_data_size() as u32 + 1).to_le_bytes());
        buf.push(0);
        assert!(matches!(emu.load_state(&buf), Err(SnapshotError::Corrupt(_))));
    }

    #[test]
    fn test_truncated_asic_record_is_an_error() {
        let emu = Emu::new();
        let mut buf = vec![0u8; emu.save_state_size()];
        emu.save_state(&mut buf).unwrap();
        for len in [Emu::STATE_HEADER_SIZE, Emu::STATE_HEADER_SIZE + 4] {
            let mut target = Emu::new();
            assert!(matches!(target.load_state(&buf[..len]), Err(SnapshotError::Corrupt(_))));
        }
    }

    #[test]
    fn test_failed_load_leaves_state() {
        let mut emu = Emu::new();
        emu.panel_mut().send_command(cmd::SLPOUT);
        let mut buf = vec![0u8; emu.save_state_size()];
        Emu::new().save_state(&mut buf).unwrap();
        // Effective revision Auto is invalid
        buf[Emu::STATE_HEADER_SIZE + 3] = 0;
        assert!(emu.load_state(&buf).is_err());
        assert_eq!(emu.panel().mode() & mode::SLEEP, 0);
    }

    static LOG_COUNT: AtomicUsize = AtomicUsize::new(0);

    extern "C" fn count_log(_msg: *const c_char) {
        LOG_COUNT.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    fn test_log_callback_receives_reset() {
        set_log_callback(Some(count_log));
        let before = LOG_COUNT.load(Ordering::SeqCst);
        let mut emu = Emu::new();
        emu.reset();
        assert!(LOG_COUNT.load(Ordering::SeqCst) > before);
        set_log_callback(None);
    }
}
