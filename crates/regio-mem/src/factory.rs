//! Factory for phase-scoped arenas.
//!
//! `ArenaFactory` stores one [`ArenaConfig`] and stamps out fresh arenas
//! from it: one per request, per parse, per frame. Arenas are never pooled;
//! each is dropped (and its storage released) when its phase ends.
//!
//! # Examples
//!
//! ```
//! use regio_mem::{ArenaConfig, ArenaFactory};
//!
//! let factory = ArenaFactory::with_config(ArenaConfig::new().with_capacity(16 * 1024));
//!
//! for request in ["GET /", "GET /health"] {
//!     let mut arena = factory.create_arena();
//!     let copy = arena.alloc_str(request).unwrap();
//!     # let _ = copy;
//!     // arena dropped here
//! }
//! ```
//!
//! # Thread-local Usage
//!
//! ```ignore
//! use regio_mem::{Arena, ArenaFactory};
//! use std::thread_local;
//!
//! thread_local! {
//!     static FRAME_ARENAS: ArenaFactory = ArenaFactory::new(64 * 1024);
//! }
//!
//! fn with_frame_arena<F, R>(f: F) -> R
//! where
//!     F: FnOnce(&mut Arena<'static>) -> R,
//! {
//!     FRAME_ARENAS.with(|factory| f(&mut factory.create_arena()))
//! }
//! ```

use crate::arena::Arena;
use crate::config::ArenaConfig;
use crate::error::Result;

/// Creates arenas that share one configuration.
///
/// `Copy` and a few words in size; clone it into every worker that needs
/// its own arenas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArenaFactory {
    config: ArenaConfig,
}

impl ArenaFactory {
    /// A factory for growing arenas whose first block holds `capacity` bytes.
    #[must_use]
    pub const fn new(capacity: usize) -> Self {
        Self::with_config(ArenaConfig::new().with_capacity(capacity))
    }

    /// A factory for arenas built from `config`.
    #[must_use]
    pub const fn with_config(config: ArenaConfig) -> Self {
        Self { config }
    }

    /// The configuration every new arena starts from.
    #[must_use]
    pub const fn config(&self) -> ArenaConfig {
        self.config
    }

    /// Creates a fresh arena.
    ///
    /// Reservation failure yields a headless arena, as with
    /// [`Arena::with_config`].
    #[must_use]
    pub fn create_arena(&self) -> Arena<'static> {
        Arena::with_config(self.config)
    }

    /// Creates a fresh arena, reporting reservation failure.
    pub fn try_create_arena(&self) -> Result<Arena<'static>> {
        Arena::try_with_config(self.config)
    }

    /// Runs `f` with a fresh arena that is released as soon as `f` returns.
    pub fn with_arena<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Arena<'static>) -> R,
    {
        let mut arena = self.create_arena();
        f(&mut arena)
    }
}
