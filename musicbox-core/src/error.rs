//! Error types for the music box core.

use core::fmt;

/// Errors raised by the song buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SongError {
    /// The buffer already holds [`MAX_NOTES`](crate::MAX_NOTES) entries.
    Full,
}

/// Errors raised when handling node identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NodeError {
    /// Raw value is outside 0-15.
    OutOfRange(u8),
    /// The node ID can only change while the node is not playing.
    Busy,
}

impl fmt::Display for SongError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SongError::Full => write!(f, "song buffer is full"),
        }
    }
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NodeError::OutOfRange(raw) => write!(f, "node ID {} out of range (must be 0-15)", raw),
            NodeError::Busy => write!(f, "node ID cannot change during playback"),
        }
    }
}
