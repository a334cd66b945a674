//! Errors for fallible cube-sphere conversions.

/// A face index outside `0..6`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cube face index {0} out of range (expected 0..6)")]
pub struct CubeFaceError(pub u8);

/// Errors that can occur when decoding a quadkey string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuadkeyError {
    /// A character other than `0`..`3` was found.
    #[error("invalid quadkey digit {digit:?} at position {position}")]
    InvalidDigit {
        /// The offending character.
        digit: char,
        /// Zero-based position within the key.
        position: usize,
    },

    /// The key encodes more levels than a `u32` tile coordinate can hold.
    #[error("quadkey of length {0} exceeds the 31 supported levels")]
    TooLong(usize),
}
