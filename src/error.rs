// Conversion error handling

use std::fmt;
use std::io;

/// Errors that abort a conversion run.
///
/// Overlapping writes are deliberately not represented here: they are a
/// non-fatal condition, logged as a warning while processing continues.
#[derive(Debug)]
pub enum ShrinkError {
    /// A block header whose bytes did not XOR to zero, with the stream
    /// offset where the header starts.
    Format { offset: u64 },
    /// An underlying read, seek or write failure.
    Io(io::Error),
}

impl fmt::Display for ShrinkError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ShrinkError::Format { offset } => {
                write!(f, "checksum failed @ 0x{:02x}", offset)
            }
            ShrinkError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for ShrinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ShrinkError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ShrinkError {
    fn from(e: io::Error) -> Self {
        ShrinkError::Io(e)
    }
}
