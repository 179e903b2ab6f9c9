//! TI-84 Plus CE Display Panel Core
//!
//! This crate provides a platform-agnostic emulation of the calculator's SPI
//! display panel and ASIC revision model with a stable C ABI.
//! No OS APIs are used - all I/O is done through byte buffers.
//!
//! # Architecture
//!
//! - `asic`: device type and silicon revision configuration
//! - `bus`: randomness source for undefined reads
//! - `peripherals`: the SPI panel (command state machine, GRAM cursor,
//!   pixel pipeline, scan timing, mass-storage bridge)
//! - `snapshot`: binary state helpers and errors
//! - `emu`: orchestrator, logging and whole-state persistence
//!
//! # Port Map
//!
//! | Port Range      | Peripheral          |
//! |-----------------|---------------------|
//! | 0xD000 - 0xD017 | SPI registers       |
//! | 0xD018          | SPI data port       |

pub mod asic;
pub mod bus;
pub mod peripherals;
pub mod snapshot;
mod emu;

#[cfg(all(target_arch = "wasm32", feature = "wasm"))]
mod wasm;

#[cfg(all(target_arch = "wasm32", feature = "wasm"))]
pub use wasm::*;


use std::os::raw::c_char;
use std::ptr;
use std::slice;
use std::sync::{Mutex, MutexGuard, PoisonError};

pub use asic::{Asic, AsicRevision, ConfigError, DeviceType};
pub use bus::{BusRng, RandomSource};
pub use emu::{log_event, Emu, SCREEN_HEIGHT, SCREEN_WIDTH};
pub use peripherals::SpiPanel;
pub use snapshot::{SnapshotError, SnapshotResult};

/// Thread-safe wrapper for the emulator.
/// All FFI calls go through this mutex to prevent data races between
/// the presentation thread (display reads) and the emulation thread.
/// This is an opaque type from C's perspective (used via void*).
pub struct SyncEmu {
    inner: Mutex<Emu>,
}

impl SyncEmu {
    fn new() -> Self {
        Self {
            inner: Mutex::new(Emu::new()),
        }
    }

    /// Lock, recovering the guard from a poisoned mutex
    fn lock(&self) -> MutexGuard<'_, Emu> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Create a new emulator instance.
/// The returned pointer is thread-safe - all operations are synchronized.
#[cfg_attr(not(feature = "ios_prefixed"), no_mangle)]
#[cfg_attr(feature = "ios_prefixed", export_name = "rust_emu_create")]
pub extern "C" fn emu_create() -> *mut SyncEmu {
    let emu = Box::new(SyncEmu::new());
    Box::into_raw(emu)
}

/// Destroy an emulator instance.
/// Safe to call with null pointer.
#[cfg_attr(not(feature = "ios_prefixed"), no_mangle)]
#[cfg_attr(feature = "ios_prefixed", export_name = "rust_emu_destroy")]
pub extern "C" fn emu_destroy(emu: *mut SyncEmu) {
    if !emu.is_null() {
        unsafe {
            drop(Box::from_raw(emu));
        }
    }
}

/// Set an optional log callback for emulator events.
/// The callback is called with a null-terminated C string.
#[cfg_attr(not(feature = "ios_prefixed"), no_mangle)]
#[cfg_attr(feature = "ios_prefixed", export_name = "rust_emu_set_log_callback")]
pub extern "C" fn emu_set_log_callback(cb: Option<extern "C" fn(*const c_char)>) {
    emu::set_log_callback(cb);
}

/// Reset the emulator to power-on state with the configured revision.
#[cfg_attr(not(feature = "ios_prefixed"), no_mangle)]
#[cfg_attr(feature = "ios_prefixed", export_name = "rust_emu_reset")]
pub extern "C" fn emu_reset(emu: *mut SyncEmu) {
    if emu.is_null() {
        return;
    }

    let sync_emu = unsafe { &*emu };
    sync_emu.lock().reset();
}

/// Set the device type (0 = TI-84 Plus CE, 1 = TI-83 Premium CE).
/// Returns 0 on success, negative error code on failure.
#[cfg_attr(not(feature = "ios_prefixed"), no_mangle)]
#[cfg_attr(feature = "ios_prefixed", export_name = "rust_emu_set_device_type")]
pub extern "C" fn emu_set_device_type(emu: *mut SyncEmu, device: u8) -> i32 {
    if emu.is_null() {
        return -1;
    }

    let sync_emu = unsafe { &*emu };
    match DeviceType::try_from(device) {
        Ok(device) => {
            sync_emu.lock().set_device_type(device);
            0
        }
        Err(err) => err.code(),
    }
}

/// Request an ASIC revision (0 = auto, 1 = A, 2 = I, 3 = M).
/// Takes effect at the next reset.
/// Returns 0 on success, negative error code on failure.
#[cfg_attr(not(feature = "ios_prefixed"), no_mangle)]
#[cfg_attr(feature = "ios_prefixed", export_name = "rust_emu_set_asic_revision")]
pub extern "C" fn emu_set_asic_revision(emu: *mut SyncEmu, revision: u8) -> i32 {
    if emu.is_null() {
        return -1;
    }

    let sync_emu = unsafe { &*emu };
    match AsicRevision::try_from(revision) {
        Ok(revision) => {
            sync_emu.lock().set_revision(revision);
            0
        }
        Err(err) => err.code(),
    }
}

/// Set the revision that auto resolves to. Takes effect at the next reset.
/// Returns 0 on success, negative error code on failure.
#[cfg_attr(not(feature = "ios_prefixed"), no_mangle)]
#[cfg_attr(feature = "ios_prefixed", export_name = "rust_emu_set_auto_revision")]
pub extern "C" fn emu_set_auto_revision(emu: *mut SyncEmu, revision: u8) -> i32 {
    if emu.is_null() {
        return -1;
    }

    let sync_emu = unsafe { &*emu };
    match AsicRevision::try_from(revision) {
        Ok(revision) => {
            sync_emu.lock().set_auto_revision(revision);
            0
        }
        Err(err) => err.code(),
    }
}

/// Get the effective ASIC revision latched at the last reset.
/// Returns 0 if emulator pointer is null.
#[cfg_attr(not(feature = "ios_prefixed"), no_mangle)]
#[cfg_attr(feature = "ios_prefixed", export_name = "rust_emu_get_asic_revision")]
pub extern "C" fn emu_get_asic_revision(emu: *const SyncEmu) -> u8 {
    if emu.is_null() {
        return 0;
    }

    let sync_emu = unsafe { &*emu };
    sync_emu.lock().asic().revision() as u8
}

/// Read a port. `peek` non-zero marks a debugger read.
#[cfg_attr(not(feature = "ios_prefixed"), no_mangle)]
#[cfg_attr(feature = "ios_prefixed", export_name = "rust_emu_port_read")]
pub extern "C" fn emu_port_read(emu: *mut SyncEmu, port: u16, peek: i32) -> u8 {
    if emu.is_null() {
        return 0;
    }

    let sync_emu = unsafe { &*emu };
    sync_emu.lock().port_read(port, peek != 0)
}

/// Write a port.
#[cfg_attr(not(feature = "ios_prefixed"), no_mangle)]
#[cfg_attr(feature = "ios_prefixed", export_name = "rust_emu_port_write")]
pub extern "C" fn emu_port_write(emu: *mut SyncEmu, port: u16, value: u8) {
    if emu.is_null() {
        return;
    }

    let sync_emu = unsafe { &*emu };
    sync_emu.lock().port_write(port, value);
}

/// Advance to the next scan line.
/// Returns 1 while the frame continues, 0 past the last line.
#[cfg_attr(not(feature = "ios_prefixed"), no_mangle)]
#[cfg_attr(feature = "ios_prefixed", export_name = "rust_emu_hsync")]
pub extern "C" fn emu_hsync(emu: *mut SyncEmu) -> i32 {
    if emu.is_null() {
        return 0;
    }

    let sync_emu = unsafe { &*emu };
    if sync_emu.lock().hsync() { 1 } else { 0 }
}

/// Start a new frame. Returns 1 (row 0 is always in range).
#[cfg_attr(not(feature = "ios_prefixed"), no_mangle)]
#[cfg_attr(feature = "ios_prefixed", export_name = "rust_emu_vsync")]
pub extern "C" fn emu_vsync(emu: *mut SyncEmu) -> i32 {
    if emu.is_null() {
        return 0;
    }

    let sync_emu = unsafe { &*emu };
    if sync_emu.lock().vsync() { 1 } else { 0 }
}

/// Emit one pixel of the current scan line.
/// Returns 1 while the line continues, 0 once it is finished.
#[cfg_attr(not(feature = "ios_prefixed"), no_mangle)]
#[cfg_attr(feature = "ios_prefixed", export_name = "rust_emu_refresh_pixel")]
pub extern "C" fn emu_refresh_pixel(emu: *mut SyncEmu) -> i32 {
    if emu.is_null() {
        return 0;
    }

    let sync_emu = unsafe { &*emu };
    if sync_emu.lock().refresh_pixel() { 1 } else { 0 }
}

/// Scan one complete frame into the display buffer.
#[cfg_attr(not(feature = "ios_prefixed"), no_mangle)]
#[cfg_attr(feature = "ios_prefixed", export_name = "rust_emu_render_frame")]
pub extern "C" fn emu_render_frame(emu: *mut SyncEmu) {
    if emu.is_null() {
        return;
    }

    let sync_emu = unsafe { &*emu };
    sync_emu.lock().render_frame();
}

/// Get a pointer to the display buffer.
/// The buffer is ARGB8888 (bytes B, G, R, A), owned by the emulator.
/// Writes width and height to the provided pointers if non-null.
/// Returns null if emulator pointer is null.
///
/// WARNING: The buffer is updated by refresh calls without further
/// synchronization. The caller should copy it between frames.
#[cfg_attr(not(feature = "ios_prefixed"), no_mangle)]
#[cfg_attr(feature = "ios_prefixed", export_name = "rust_emu_display")]
pub extern "C" fn emu_display(emu: *const SyncEmu, w: *mut i32, h: *mut i32) -> *const u8 {
    if emu.is_null() {
        return ptr::null();
    }

    let sync_emu = unsafe { &*emu };
    let emu = sync_emu.lock();
    let (width, height) = emu.display_size();

    if !w.is_null() {
        unsafe { *w = width as i32 };
    }
    if !h.is_null() {
        unsafe { *h = height as i32 };
    }

    emu.display_ptr()
}

/// Get the size needed for a save state buffer.
#[cfg_attr(not(feature = "ios_prefixed"), no_mangle)]
#[cfg_attr(feature = "ios_prefixed", export_name = "rust_emu_save_state_size")]
pub extern "C" fn emu_save_state_size(emu: *const SyncEmu) -> usize {
    if emu.is_null() {
        return 0;
    }

    let sync_emu = unsafe { &*emu };
    sync_emu.lock().save_state_size()
}

/// Save emulator state to a buffer.
/// Returns bytes written on success, negative error code on failure.
#[cfg_attr(not(feature = "ios_prefixed"), no_mangle)]
#[cfg_attr(feature = "ios_prefixed", export_name = "rust_emu_save_state")]
pub extern "C" fn emu_save_state(emu: *const SyncEmu, out: *mut u8, cap: usize) -> i32 {
    if emu.is_null() || out.is_null() {
        return -1;
    }

    let sync_emu = unsafe { &*emu };
    let emu = sync_emu.lock();
    let buffer = unsafe { slice::from_raw_parts_mut(out, cap) };

    match emu.save_state(buffer) {
        Ok(size) => size as i32,
        Err(err) => err.code(),
    }
}

/// Load emulator state from a buffer.
/// Returns 0 on success, negative error code on failure.
#[cfg_attr(not(feature = "ios_prefixed"), no_mangle)]
#[cfg_attr(feature = "ios_prefixed", export_name = "rust_emu_load_state")]
pub extern "C" fn emu_load_state(emu: *mut SyncEmu, data: *const u8, len: usize) -> i32 {
    if emu.is_null() || data.is_null() {
        return -1;
    }

    let sync_emu = unsafe { &*emu };
    let mut emu = sync_emu.lock();
    let buffer = unsafe { slice::from_raw_parts(data, len) };

    match emu.load_state(buffer) {
        Ok(()) => 0,
        Err(err) => err.code(),
    }
}
