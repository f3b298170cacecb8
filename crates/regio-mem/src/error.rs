//! Error types for arena operations.
//!
//! Every failure is local and recoverable: the arena is left exactly as it
//! was before the failing call.

use std::fmt;

/// Errors returned by arena allocation and lifecycle operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArenaError {
    /// The arena has no head block (default-constructed, destroyed, or its
    /// first block could not be reserved).
    InvalidArena,

    /// A zero-byte allocation was requested.
    ZeroSize,

    /// An external buffer was empty.
    InvalidBuffer,

    /// `count * size` does not fit in `usize`.
    SizeOverflow {
        /// Number of elements requested.
        count: usize,
        /// Size of each element.
        size: usize,
    },

    /// A fixed-capacity arena cannot fit the request.
    CapacityExceeded {
        /// The requested allocation size.
        requested: usize,
        /// Free bytes left in the head block.
        available: usize,
    },

    /// The system allocator refused a block of this size.
    ReservationFailed {
        /// The requested block capacity.
        size: usize,
    },

    /// A typed allocation needs more alignment than the arena supports.
    AlignmentTooLarge {
        /// Alignment required by the type.
        align: usize,
        /// The arena's maximum alignment.
        max: usize,
    },

    /// The pointer was not issued by this arena, or the stated size does not
    /// match what was issued.
    UnknownAllocation {
        /// Address of the offending pointer.
        ptr: usize,
    },
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArenaError::InvalidArena => write!(f, "Arena has no storage"),
            ArenaError::ZeroSize => write!(f, "Zero-sized allocation"),
            ArenaError::InvalidBuffer => write!(f, "External buffer is empty"),
            ArenaError::SizeOverflow { count, size } => {
                write!(f, "Size overflow: {count} elements of {size} bytes")
            }
            ArenaError::CapacityExceeded { requested, available } => {
                write!(
                    f,
                    "Arena full: requested {requested} bytes, available {available} bytes"
                )
            }
            ArenaError::ReservationFailed { size } => {
                write!(f, "Failed to reserve block of {size} bytes")
            }
            ArenaError::AlignmentTooLarge { align, max } => {
                write!(f, "Alignment {align} exceeds arena maximum {max}")
            }
            ArenaError::UnknownAllocation { ptr } => {
                write!(f, "Unknown allocation: {ptr:#x}")
            }
        }
    }
}

impl std::error::Error for ArenaError {}

/// Result type for arena operations.
pub type Result<T> = std::result::Result<T, ArenaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(ArenaError::ZeroSize.to_string(), "Zero-sized allocation");
        assert_eq!(
            ArenaError::CapacityExceeded { requested: 30, available: 20 }.to_string(),
            "Arena full: requested 30 bytes, available 20 bytes"
        );
        assert_eq!(
            ArenaError::SizeOverflow { count: usize::MAX, size: 2 }.to_string(),
            format!("Size overflow: {} elements of 2 bytes", usize::MAX)
        );
        assert_eq!(
            ArenaError::UnknownAllocation { ptr: 0x1000 }.to_string(),
            "Unknown allocation: 0x1000"
        );
    }

    #[test]
    fn test_error_equality() {
        assert_eq!(ArenaError::InvalidArena, ArenaError::InvalidArena);
        assert_ne!(
            ArenaError::ReservationFailed { size: 64 },
            ArenaError::ReservationFailed { size: 128 }
        );
    }

    #[test]
    fn test_error_is_std_error() {
        let err: Box<dyn std::error::Error> = Box::new(ArenaError::InvalidBuffer);
        assert_eq!(err.to_string(), "External buffer is empty");
    }
}
