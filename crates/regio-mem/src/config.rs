//! Arena configuration.
//!
//! Alignment rules applied by [`ArenaConfig::normalized`]:
//!
//! - a maximum alignment that is not a power of two falls back to
//!   [`MAX_ALIGNMENT`]
//! - a default alignment that is zero or not a power of two falls back to
//!   [`DEFAULT_ALIGNMENT`]
//! - the default alignment is clamped to the maximum
//!
//! The same zero/non-power-of-two/clamp rules are applied to the alignment of
//! every individual allocation request.

/// Default alignment for arena allocations.
pub const DEFAULT_ALIGNMENT: usize = 8;

/// Cap on any requested alignment unless configured otherwise.
pub const MAX_ALIGNMENT: usize = 16;

/// Capacity used when an arena is created with capacity zero.
pub const DEFAULT_CAPACITY: usize = 1024;

/// What the arena does when the head block cannot fit a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Growth {
    /// Reserve a new, larger head block.
    #[default]
    Grow,
    /// Fail the request; the arena never reserves more storage.
    Fixed,
}

/// Settings for a new [`Arena`](crate::Arena).
///
/// ```
/// use regio_mem::{ArenaConfig, Growth};
///
/// let config = ArenaConfig::new()
///     .with_capacity(4096)
///     .with_alignment(3) // not a power of two
///     .with_growth(Growth::Fixed);
///
/// assert_eq!(config.normalized().alignment, 8);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Capacity of the first block in bytes; zero means [`DEFAULT_CAPACITY`].
    /// Ignored for external-buffer arenas.
    pub capacity: usize,
    /// Alignment used by `alloc` and friends.
    pub alignment: usize,
    /// Hard cap on any requested alignment.
    pub max_alignment: usize,
    pub growth: Growth,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ArenaConfig {
    /// Default capacity and alignments, growing.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            alignment: DEFAULT_ALIGNMENT,
            max_alignment: MAX_ALIGNMENT,
            growth: Growth::Grow,
        }
    }

    /// First block size in bytes. Zero selects the default.
    #[must_use]
    pub const fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Alignment used by [`Arena::alloc`](crate::Arena::alloc).
    #[must_use]
    pub const fn with_alignment(mut self, alignment: usize) -> Self {
        self.alignment = alignment;
        self
    }

    /// Upper bound for any per-request alignment.
    #[must_use]
    pub const fn with_max_alignment(mut self, max_alignment: usize) -> Self {
        self.max_alignment = max_alignment;
        self
    }

    /// Sets the behavior when the head block is full.
    #[must_use]
    pub const fn with_growth(mut self, growth: Growth) -> Self {
        self.growth = growth;
        self
    }

    /// Returns a copy with capacity and alignments made valid.
    #[must_use]
    pub const fn normalized(self) -> Self {
        let max_alignment = if self.max_alignment.is_power_of_two() {
            self.max_alignment
        } else {
            MAX_ALIGNMENT
        };
        let alignment = if self.alignment.is_power_of_two() {
            self.alignment
        } else {
            DEFAULT_ALIGNMENT
        };
        let alignment = if alignment > max_alignment {
            max_alignment
        } else {
            alignment
        };
        let capacity = if self.capacity == 0 {
            DEFAULT_CAPACITY
        } else {
            self.capacity
        };

        Self {
            capacity,
            alignment,
            max_alignment,
            growth: self.growth,
        }
    }
}
