use thiserror::Error;

/// Custom error types for the binlogstream library.
#[derive(Error, Debug)]
pub enum Error {
    /// Underlying I/O errors other than end of stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The byte source returned no data while the buffer needed a refill.
    #[error("Unexpected end of stream while refilling the decode buffer")]
    EndOfStream,

    /// A read or skip would cross the active read-limit window.
    #[error("Read limit exceeded: requested {requested} bytes with {available} of {limit} left")]
    LimitExceeded {
        limit: usize,
        requested: usize,
        available: usize,
    },

    /// A row event referenced a table id with no known metadata.
    #[error("Unresolved table id {table_id}")]
    UnresolvedTable { table_id: u64 },

    /// Checksum mismatch between the event trailer and the accumulated value.
    #[error("Checksum mismatch: expected {expected:#010x}, got {calculated:#010x}")]
    ChecksumMismatch { expected: u32, calculated: u32 },

    /// A length-encoded integer started with the reserved 0xFF prefix.
    #[error("Malformed length-encoded integer prefix {prefix:#04x}")]
    MalformedLengthPrefix { prefix: u8 },

    /// An update event carried an odd number of row images.
    #[error("Update event carried {count} row images, expected an even count")]
    UnevenRowPairCount { count: usize },

    /// Structurally invalid event content (bad widths, short events, empty continuations).
    #[error("Invalid event: {message}")]
    InvalidEvent { message: String },
}

impl Error {
    /// Create a new `InvalidEvent` error with a descriptive message.
    pub fn invalid_event(message: impl Into<String>) -> Self {
        Self::InvalidEvent {
            message: message.into(),
        }
    }

    /// Create a new `ChecksumMismatch` error with expected and calculated values.
    pub fn checksum_mismatch(expected: u32, calculated: u32) -> Self {
        Self::ChecksumMismatch {
            expected,
            calculated,
        }
    }

    pub(crate) fn limit_exceeded(limit: usize, requested: usize, available: usize) -> Self {
        Self::LimitExceeded {
            limit,
            requested,
            available,
        }
    }
}

/// Result type alias for the library operations.
pub type Result<T> = std::result::Result<T, Error>;
