//! ASIC device type and silicon revision model
//!
//! The TI-84 Plus CE and TI-83 Premium CE share one ASIC family. Later
//! silicon revisions change peripheral behavior: revision I dropped the IM 2
//! quirk, and revision M routes a mass-storage bridge through the SPI data
//! port. The revision is configured before reset and latched at reset.

use thiserror::Error;

/// Errors from converting raw configuration values (C ABI, wasm)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unknown device type {0}")]
    UnknownDevice(u8),
    #[error("unknown ASIC revision {0}")]
    UnknownRevision(u8),
}

impl ConfigError {
    /// Negative code for the C ABI
    pub fn code(&self) -> i32 {
        match self {
            ConfigError::UnknownDevice(_) => -201,
            ConfigError::UnknownRevision(_) => -202,
        }
    }
}

/// Calculator model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum DeviceType {
    #[default]
    Ti84pce = 0,
    Ti83pce = 1,
}

impl TryFrom<u8> for DeviceType {
    type Error = ConfigError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(DeviceType::Ti84pce),
            1 => Ok(DeviceType::Ti83pce),
            other => Err(ConfigError::UnknownDevice(other)),
        }
    }
}

/// ASIC silicon revision. Ordering follows silicon age.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum AsicRevision {
    /// Resolve through the auto-revision default at reset
    #[default]
    Auto = 0,
    A = 1,
    I = 2,
    M = 3,
}

impl TryFrom<u8> for AsicRevision {
    type Error = ConfigError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(AsicRevision::Auto),
            1 => Ok(AsicRevision::A),
            2 => Ok(AsicRevision::I),
            3 => Ok(AsicRevision::M),
            other => Err(ConfigError::UnknownRevision(other)),
        }
    }
}

/// Device / revision configuration
#[derive(Debug, Clone)]
pub struct Asic {
    device: DeviceType,
    /// Revision requested by configuration (may be Auto)
    requested: AsicRevision,
    /// Revision used when `requested` is Auto
    auto_revision: AsicRevision,
    /// Effective revision, only updated on reset
    revision: AsicRevision,
    /// Pre-revision-I interrupt mode 2 behavior, latched at reset
    im2: bool,
}

impl Asic {
    /// Fallback when the auto default is itself Auto
    const FALLBACK_REVISION: AsicRevision = AsicRevision::A;

    /// Snapshot: device, requested, auto, effective, im2 + padding
    pub const SNAPSHOT_SIZE: usize = 8;

    pub fn new() -> Self {
        let mut asic = Self {
            device: DeviceType::default(),
            requested: AsicRevision::Auto,
            auto_revision: Self::FALLBACK_REVISION,
            revision: Self::FALLBACK_REVISION,
            im2: false,
        };
        asic.reset();
        asic
    }

    /// Latch the effective revision and derived flags
    pub fn reset(&mut self) {
        self.revision = match self.requested {
            AsicRevision::Auto => match self.auto_revision {
                AsicRevision::Auto => Self::FALLBACK_REVISION,
                rev => rev,
            },
            rev => rev,
        };
        self.im2 = self.revision < AsicRevision::I;
    }

    pub fn set_device_type(&mut self, device: DeviceType) {
        self.device = device;
    }

    pub fn device_type(&self) -> DeviceType {
        self.device
    }

    /// Request a revision; takes effect at the next reset
    pub fn set_revision(&mut self, revision: AsicRevision) {
        self.requested = revision;
    }

    /// Set the revision `Auto` resolves to at the next reset
    pub fn set_auto_revision(&mut self, revision: AsicRevision) {
        self.auto_revision = revision;
    }

    pub fn requested_revision(&self) -> AsicRevision {
        self.requested
    }

    /// Effective revision (never Auto)
    pub fn revision(&self) -> AsicRevision {
        self.revision
    }

    pub fn im2(&self) -> bool {
        self.im2
    }

    /// Revision M or newer exposes the mass-storage bridge on the SPI port
    pub fn rev_m(&self) -> bool {
        self.revision >= AsicRevision::M
    }

    pub fn to_bytes(&self) -> [u8; Self::SNAPSHOT_SIZE] {
        let mut buf = [0u8; Self::SNAPSHOT_SIZE];
        buf[0] = self.device as u8;
        buf[1] = self.requested as u8;
        buf[2] = self.auto_revision as u8;
        buf[3] = self.revision as u8;
        buf[4] = self.im2 as u8;
        buf
    }

    /// Restore configuration from a `to_bytes` record
    pub fn from_bytes(&mut self, buf: &[u8; Self::SNAPSHOT_SIZE]) -> Result<(), ConfigError> {
        let device = DeviceType::try_from(buf[0])?;
        let requested = AsicRevision::try_from(buf[1])?;
        let auto_revision = AsicRevision::try_from(buf[2])?;
        let revision = AsicRevision::try_from(buf[3])?;
        if revision == AsicRevision::Auto {
            return Err(ConfigError::UnknownRevision(buf[3]));
        }
        self.device = device;
        self.requested = requested;
        self.auto_revision = auto_revision;
        self.revision = revision;
        self.im2 = buf[4] != 0;
        Ok(())
    }
}

impl Default for Asic {
    fn default() -> Self {
        Self::new()
    }
}
