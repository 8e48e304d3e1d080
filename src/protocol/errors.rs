//! Connection setup errors

use std::io;
use thiserror::Error;

/// Fatal conditions of the setup exchange.
///
/// None of these are recoverable on the same stream: once a read fails the
/// byte offset is lost and the caller has to reconnect.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("stream ended while reading {field}")]
    ShortRead { field: &'static str },
    #[error(
        "setup reply length {extra_data_length} too small for vendor length \
         {vendor_length} and {screen_count} screens"
    )]
    LengthUnderflow {
        extra_data_length: u16,
        vendor_length: u16,
        screen_count: u8,
    },
    #[error("unknown setup status {0}")]
    UnknownStatus(u8),
    #[error("unknown backing-store code {0}")]
    UnknownBackingStore(u8),
    #[error("unknown visual class {0}")]
    UnknownVisualClass(u8),
    #[error("credential field of {len} bytes does not fit a 16-bit length")]
    CredentialTooLong { len: usize },
    #[error("invalid byte-order byte 0x{0:02x}")]
    BadByteOrder(u8),
    #[error("transport failure: {0}")]
    Transport(#[source] io::Error),
}

impl SetupError {
    /// Map an I/O error raised while reading `field`
    pub fn from_read(err: io::Error, field: &'static str) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            SetupError::ShortRead { field }
        } else {
            SetupError::Transport(err)
        }
    }

    /// True for errors caused by the reply being shorter than it claims
    pub fn is_short_read(&self) -> bool {
        matches!(
            self,
            SetupError::ShortRead { .. } | SetupError::LengthUnderflow { .. }
        )
    }
}

impl From<io::Error> for SetupError {
    fn from(err: io::Error) -> Self {
        SetupError::Transport(err)
    }
}

/// Result type for setup operations
pub type SetupResult<T> = Result<T, SetupError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eof_becomes_short_read() {
        let err = SetupError::from_read(io::ErrorKind::UnexpectedEof.into(), "vendor");
        assert!(matches!(err, SetupError::ShortRead { field: "vendor" }));
        assert!(err.is_short_read());
    }

    #[test]
    fn test_other_io_errors_are_transport() {
        let err = SetupError::from_read(io::ErrorKind::ConnectionReset.into(), "status");
        assert!(matches!(err, SetupError::Transport(_)));
        assert!(!err.is_short_read());
    }

    #[test]
    fn test_underflow_is_short_read_class() {
        let err = SetupError::LengthUnderflow {
            extra_data_length: 2,
            vendor_length: 0,
            screen_count: 0,
        };
        assert!(err.is_short_read());
        assert!(err.to_string().contains("too small"));
    }
}
