/// X11 connection setup protocol
///
/// This module implements the wire side of the setup exchange: the byte-order
/// codec, the client hello, and the decoder for the server's setup reply.

pub mod types;
pub mod errors;
pub mod codec;
pub mod setup;

pub use types::*;
pub use errors::*;
pub use codec::*;
pub use setup::*;

/// X11 protocol version
pub const PROTOCOL_MAJOR_VERSION: u16 = 11;
pub const PROTOCOL_MINOR_VERSION: u16 = 0;

/// Padding helper - X11 requires data to be padded to 4-byte boundaries
pub fn pad(n: usize) -> usize {
    (4 - (n % 4)) % 4
}

/// Calculate padded length
pub fn padded_len(n: usize) -> usize {
    n + pad(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_small_values() {
        assert_eq!(pad(0), 0);
        assert_eq!(pad(1), 3);
        assert_eq!(pad(2), 2);
        assert_eq!(pad(3), 1);
        assert_eq!(pad(4), 0);
        assert_eq!(padded_len(18), 20);
    }

    #[test]
    fn test_pad_properties() {
        for n in 0..1024usize {
            let p = pad(n);
            assert!(p < 4);
            assert_eq!(p, pad(n % 4));
            assert_eq!((n + p) % 4, 0);
        }
        assert_eq!(pad(usize::MAX), pad(usize::MAX % 4));
    }
}
