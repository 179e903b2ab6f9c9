//! Fixed-layout binary snapshot helpers
//!
//! Snapshots are flat little-endian records with no per-field tags: the
//! layout is whatever the writer emits, so blobs are only portable between
//! identical builds. The reader never panics on short input; it reports
//! [`SnapshotError::Corrupt`] instead.

use std::io;
use thiserror::Error;

pub type SnapshotResult<T> = Result<T, SnapshotError>;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("buffer too small (need {needed} bytes, have {available})")]
    BufferTooSmall { needed: usize, available: usize },

    #[error("invalid snapshot magic")]
    InvalidMagic,

    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u32),

    #[error("corrupt snapshot: {0}")]
    Corrupt(&'static str),
}

impl SnapshotError {
    /// Negative code for the C ABI (matches the emulator's state error codes)
    pub fn code(&self) -> i32 {
        match self {
            SnapshotError::BufferTooSmall { .. } => -101,
            SnapshotError::InvalidMagic => -102,
            SnapshotError::UnsupportedVersion(_) => -103,
            SnapshotError::Corrupt(_) => -105,
            SnapshotError::Io(_) => -106,
        }
    }
}

/// Append-only little-endian writer
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { buf: Vec::with_capacity(capacity) }
    }

    pub fn u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn bool(&mut self, value: bool) {
        self.buf.push(value as u8);
    }

    pub fn u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn bytes(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

/// Cursor over a snapshot record
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn bytes(&mut self, len: usize) -> SnapshotResult<&'a [u8]> {
        let end = self.pos.checked_add(len).ok_or(SnapshotError::Corrupt("length overflow"))?;
        let data = self.buf.get(self.pos..end).ok_or(SnapshotError::Corrupt("truncated record"))?;
        self.pos = end;
        Ok(data)
    }

    pub fn array<const N: usize>(&mut self) -> SnapshotResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N)?);
        Ok(out)
    }

    pub fn u8(&mut self) -> SnapshotResult<u8> {
        Ok(self.bytes(1)?[0])
    }

    pub fn bool(&mut self) -> SnapshotResult<bool> {
        Ok(self.u8()? != 0)
    }

    pub fn u16(&mut self) -> SnapshotResult<u16> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    pub fn u32(&mut self) -> SnapshotResult<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_reports_truncation() {
        let mut reader = ByteReader::new(&[0x34, 0x12, 0x01]);
        assert_eq!(reader.u16().unwrap(), 0x1234);
        assert!(matches!(reader.u16(), Err(SnapshotError::Corrupt(_))));
        // Failed read does not advance
        assert_eq!(reader.position(), 2);
        assert_eq!(reader.u8().unwrap(), 0x01);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_writer_layout_is_little_endian() {
        let mut writer = ByteWriter::with_capacity(8);
        writer.u8(0xAA);
        writer.u16(0x0102);
        writer.u32(0x03040506);
        writer.bool(true);
        assert_eq!(writer.len(), 8);
        assert_eq!(writer.into_inner(), vec![0xAA, 0x02, 0x01, 0x06, 0x05, 0x04, 0x03, 0x01]);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(SnapshotError::InvalidMagic.code(), -102);
        assert_eq!(SnapshotError::UnsupportedVersion(9).code(), -103);
        assert_eq!(SnapshotError::Corrupt("x").code(), -105);
        assert_eq!(SnapshotError::BufferTooSmall { needed: 2, available: 1 }.code(), -101);
    }
}
