//! Defines the `Checksum` trait and concrete implementations.
//!
//! A checksum here is a running accumulator: the decode stream feeds every
//! byte it consumes into it, and the event decoder compares the accumulated
//! value against the 4-byte trailer at the end of each event.

use crate::error::{Error, Result};
use tracing::warn;

/// How a trailer mismatch is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValidationMode {
    /// A mismatch is reported as `Error::ChecksumMismatch`.
    #[default]
    Strict,
    /// A mismatch is logged and otherwise ignored.
    Lenient,
}

/// Checksum algorithm negotiated for the binlog (`binlog_checksum`).
///
/// The `Crc32` kind only exists with the `crc32` feature, so a session can
/// never claim to validate trailers it has no algorithm for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChecksumKind {
    /// Events carry no trailer.
    None,
    /// Events end with a 4-byte little-endian CRC32.
    #[cfg(feature = "crc32")]
    Crc32,
}

#[cfg(feature = "crc32")]
impl Default for ChecksumKind {
    fn default() -> Self {
        Self::Crc32
    }
}

#[cfg(not(feature = "crc32"))]
impl Default for ChecksumKind {
    fn default() -> Self {
        Self::None
    }
}

impl ChecksumKind {
    /// Maps the algorithm code found in a format description event.
    ///
    /// Code 1 (CRC32) is rejected when the crate is built without `crc32`.
    pub fn from_format_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(Self::None),
            #[cfg(feature = "crc32")]
            1 => Ok(Self::Crc32),
            #[cfg(not(feature = "crc32"))]
            1 => Err(Error::invalid_event(
                "CRC32 checksums require the `crc32` feature",
            )),
            other => Err(Error::invalid_event(format!(
                "unknown checksum algorithm code {other}"
            ))),
        }
    }

    /// Number of trailer bytes each event reserves for the checksum.
    pub fn trailer_len(self) -> usize {
        match self {
            Self::None => 0,
            #[cfg(feature = "crc32")]
            Self::Crc32 => 4,
        }
    }

    /// Builds a fresh accumulator for this algorithm.
    pub fn accumulator(self) -> Box<dyn Checksum + Send> {
        match self {
            Self::None => Box::new(NoChecksum),
            #[cfg(feature = "crc32")]
            Self::Crc32 => Box::new(Crc32::new()),
        }
    }
}

/// A trait for running checksum algorithms.
pub trait Checksum {
    /// Absorbs a range of bytes.
    fn update(&mut self, bytes: &[u8]);

    /// Absorbs a single byte.
    fn update_byte(&mut self, byte: u8) {
        self.update(&[byte]);
    }

    /// The checksum of every byte absorbed since the last reset.
    fn value(&self) -> u32;

    /// Restores the algorithm's initial state.
    fn reset(&mut self);

    /// Compares `expected` against `value()` under the given mode.
    fn validate(&self, expected: u32, mode: ValidationMode) -> Result<()> {
        let calculated = self.value();
        if calculated == expected {
            return Ok(());
        }
        match mode {
            ValidationMode::Strict => Err(Error::checksum_mismatch(expected, calculated)),
            ValidationMode::Lenient => {
                warn!(expected, calculated, "ignoring checksum mismatch");
                Ok(())
            }
        }
    }

    /// Validates, then resets so the next event starts from a clean state.
    ///
    /// The reset happens even when validation fails.
    fn validate_and_reset(&mut self, expected: u32, mode: ValidationMode) -> Result<()> {
        let outcome = self.validate(expected, mode);
        self.reset();
        outcome
    }
}

impl<C: Checksum + ?Sized> Checksum for Box<C> {
    fn update(&mut self, bytes: &[u8]) {
        (**self).update(bytes)
    }

    fn update_byte(&mut self, byte: u8) {
        (**self).update_byte(byte)
    }

    fn value(&self) -> u32 {
        (**self).value()
    }

    fn reset(&mut self) {
        (**self).reset()
    }

    fn validate(&self, expected: u32, mode: ValidationMode) -> Result<()> {
        (**self).validate(expected, mode)
    }
}

/// CRC-32 (IEEE) as used by the binlog event trailer.
#[cfg(feature = "crc32")]
#[derive(Default, Clone)]
pub struct Crc32 {
    hasher: crc32fast::Hasher,
}

#[cfg(feature = "crc32")]
impl Crc32 {
    pub fn new() -> Self {
        Self {
            hasher: crc32fast::Hasher::new(),
        }
    }
}

#[cfg(feature = "crc32")]
impl std::fmt::Debug for Crc32 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Crc32")
            .field("value", &format_args!("{:#010x}", self.value()))
            .finish()
    }
}

#[cfg(feature = "crc32")]
impl Checksum for Crc32 {
    fn update(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    fn value(&self) -> u32 {
        // finalize consumes the hasher, so work on a copy of the state
        self.hasher.clone().finalize()
    }

    fn reset(&mut self) {
        self.hasher.reset();
    }
}

/// A no-op checksum for reads that must not be accumulated.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoChecksum;

impl NoChecksum {
    pub fn new() -> Self {
        Self
    }
}

impl Checksum for NoChecksum {
    #[inline(always)]
    fn update(&mut self, _bytes: &[u8]) {}

    #[inline(always)]
    fn update_byte(&mut self, _byte: u8) {}

    fn value(&self) -> u32 {
        0
    }

    fn reset(&mut self) {}

    fn validate(&self, _expected: u32, _mode: ValidationMode) -> Result<()> {
        // Always succeeds - nothing was accumulated
        Ok(())
    }
}
