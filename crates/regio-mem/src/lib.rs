//! `regio` region allocator
//!
//! Bump-pointer arenas for phase-scoped data: per-request state, per-parse
//! syntax trees, per-frame scratch buffers. Memory is handed out from large
//! blocks and released in bulk, never one allocation at a time.
//!
//! - [`Arena`]: block chain, bump allocation, growth, reset
//! - [`TempScope`] / [`ScopeGuard`]: nested checkpoints that roll usage back
//! - [`ArenaConfig`] / [`ArenaFactory`]: alignment and growth settings
//! - `TrackedArena`: bookkeeping wrapper that validates reallocation
//!   (requires the `tracking` feature)
//!
//! ```
//! use regio_mem::Arena;
//!
//! let mut arena = Arena::new(1024);
//! let a = arena.alloc(10).unwrap();
//! let b = arena.alloc(10).unwrap();
//!
//! // Default alignment is 8, so the second allocation starts at offset 16.
//! assert_eq!(b.as_ptr() as usize - a.as_ptr() as usize, 16);
//! assert_eq!(arena.used(), 26);
//!
//! arena.reset();
//! assert_eq!(arena.used(), 0);
//! ```

pub mod arena;
pub mod config;
pub mod error;
pub mod factory;
pub mod scope;
#[cfg(feature = "tracking")]
pub mod tracked;

pub use arena::{Arena, ArenaStats};
pub use config::{ArenaConfig, Growth};
pub use error::{ArenaError, Result};
pub use factory::ArenaFactory;
pub use scope::{ScopeGuard, TempScope};
#[cfg(feature = "tracking")]
pub use tracked::{TrackedArena, TrackedScope};
