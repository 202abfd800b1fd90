//! Decoder configuration.

use crate::checksum::{ChecksumKind, ValidationMode};
use crate::stream::DEFAULT_BUFFER_SIZE;

/// Settings for a `BinlogParser` session.
///
/// The checksum kind must match the server's `binlog_checksum` setting;
/// the validation mode decides whether a trailer mismatch is fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DecoderConfig {
    /// Size of the internal read buffer in bytes.
    pub buffer_size: usize,
    pub checksum: ChecksumKind,
    pub validation: ValidationMode,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            checksum: ChecksumKind::default(),
            validation: ValidationMode::Strict,
        }
    }
}

impl DecoderConfig {
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_checksum(mut self, checksum: ChecksumKind) -> Self {
        self.checksum = checksum;
        self
    }

    pub fn with_validation(mut self, validation: ValidationMode) -> Self {
        self.validation = validation;
        self
    }
}
