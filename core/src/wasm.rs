//! WebAssembly bindings for the TI-84 Plus CE display panel core
//!
//! This module provides JavaScript-friendly APIs using wasm-bindgen.

use js_sys::Uint8Array;
use wasm_bindgen::prelude::*;
use web_sys::console;
use crate::asic::{AsicRevision, DeviceType};
use crate::emu::Emu;
use crate::peripherals::spi::{ALPHA, BLUE, GREEN, RED};

fn warn(s: &str) {
    console::warn_1(&JsValue::from_str(s));
}

fn log(s: &str) {
    console::log_1(&JsValue::from_str(s));
}

/// WASM-friendly wrapper around the emulator.
/// Unlike the C FFI, this owns the emulator directly without mutex
/// since WASM is single-threaded.
#[wasm_bindgen]
pub struct WasmEmu {
    inner: Emu,
}

#[wasm_bindgen]
impl WasmEmu {
    /// Create a new emulator instance.
    #[wasm_bindgen(constructor)]
    pub fn new() -> WasmEmu {
        // Set up console panic hook for better error messages
        console_error_panic_hook::set_once();

        WasmEmu { inner: Emu::new() }
    }

    /// Reset to power-on state with the configured revision.
    #[wasm_bindgen]
    pub fn reset(&mut self) {
        self.inner.reset();
    }

    /// Set the device type (0 = TI-84 Plus CE, 1 = TI-83 Premium CE).
    /// Returns 0 on success, negative error code on failure.
    #[wasm_bindgen]
    pub fn set_device_type(&mut self, device: u8) -> i32 {
        match DeviceType::try_from(device) {
            Ok(device) => {
                self.inner.set_device_type(device);
                0
            }
            Err(err) => {
                warn(&format!("[WASM] set_device_type: {}", err));
                err.code()
            }
        }
    }

    /// Request an ASIC revision (0 = auto, 1 = A, 2 = I, 3 = M), applied at reset.
    #[wasm_bindgen]
    pub fn set_asic_revision(&mut self, revision: u8) -> i32 {
        match AsicRevision::try_from(revision) {
            Ok(revision) => {
                self.inner.set_revision(revision);
                0
            }
            Err(err) => {
                warn(&format!("[WASM] set_asic_revision: {}", err));
                err.code()
            }
        }
    }

    /// Set the revision auto resolves to, applied at reset.
    #[wasm_bindgen]
    pub fn set_auto_revision(&mut self, revision: u8) -> i32 {
        match AsicRevision::try_from(revision) {
            Ok(revision) => {
                self.inner.set_auto_revision(revision);
                0
            }
            Err(err) => {
                warn(&format!("[WASM] set_auto_revision: {}", err));
                err.code()
            }
        }
    }

    /// Effective revision latched at the last reset.
    #[wasm_bindgen]
    pub fn asic_revision(&self) -> u8 {
        self.inner.asic().revision() as u8
    }

    #[wasm_bindgen]
    pub fn port_read(&mut self, port: u16, peek: bool) -> u8 {
        self.inner.port_read(port, peek)
    }

    #[wasm_bindgen]
    pub fn port_write(&mut self, port: u16, value: u8) {
        self.inner.port_write(port, value);
    }

    #[wasm_bindgen]
    pub fn hsync(&mut self) -> bool {
        self.inner.hsync()
    }

    #[wasm_bindgen]
    pub fn vsync(&mut self) -> bool {
        self.inner.vsync()
    }

    #[wasm_bindgen]
    pub fn refresh_pixel(&mut self) -> bool {
        self.inner.refresh_pixel()
    }

    /// Scan one complete frame into the display buffer.
    #[wasm_bindgen]
    pub fn render_frame(&mut self) {
        self.inner.render_frame();
    }

    #[wasm_bindgen]
    pub fn framebuffer_width(&self) -> i32 {
        self.inner.display_size().0 as i32
    }

    #[wasm_bindgen]
    pub fn framebuffer_height(&self) -> i32 {
        self.inner.display_size().1 as i32
    }

    /// Copy display data for canvas rendering.
    /// Returns RGBA8888 format suitable for ImageData.
    #[wasm_bindgen]
    pub fn get_framebuffer_rgba(&self) -> Vec<u8> {
        let display = self.inner.display_pixels();
        let mut rgba = Vec::with_capacity(display.len() * 4);
        for pixel in display {
            rgba.extend_from_slice(&[pixel[RED], pixel[GREEN], pixel[BLUE], pixel[ALPHA]]);
        }
        rgba
    }

    /// Copy of the raw display buffer (B, G, R, A per pixel, column-major).
    #[wasm_bindgen]
    pub fn display_bytes(&self) -> Uint8Array {
        Uint8Array::from(self.inner.display_pixels().as_flattened())
    }

    /// Get the size needed for a save state buffer.
    #[wasm_bindgen]
    pub fn save_state_size(&self) -> usize {
        self.inner.save_state_size()
    }

    /// Save emulator state to a byte array.
    /// Returns the state data or an empty array on failure.
    #[wasm_bindgen]
    pub fn save_state(&self) -> Vec<u8> {
        let size = self.inner.save_state_size();
        let mut buffer = vec![0u8; size];
        match self.inner.save_state(&mut buffer) {
            Ok(written) => {
                buffer.truncate(written);
                buffer
            }
            Err(err) => {
                warn(&format!("[WASM] save_state FAILED: {}", err));
                Vec::new()
            }
        }
    }

    /// Load emulator state from a byte array.
    /// Returns 0 on success, negative error code on failure.
    #[wasm_bindgen]
    pub fn load_state(&mut self, data: &[u8]) -> i32 {
        log(&format!("[WASM] load_state: {} bytes", data.len()));
        match self.inner.load_state(data) {
            Ok(()) => {
                log(&format!(
                    "[WASM] load_state OK: revision={:?} mode={:02X}",
                    self.inner.asic().revision(),
                    self.inner.panel().mode()
                ));
                0
            }
            Err(err) => {
                warn(&format!("[WASM] load_state FAILED: {}", err));
                err.code()
            }
        }
    }
}

impl Default for WasmEmu {
    fn default() -> Self {
        Self::new()
    }
}
