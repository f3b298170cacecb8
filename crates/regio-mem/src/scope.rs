//! Temporary scopes: checkpoints that roll arena usage back.
//!
//! [`Arena::temp_begin`] captures where the head block currently ends;
//! [`Arena::temp_end`] returns the arena to that point, invalidating every
//! pointer handed out in between. Scopes nest and must be ended in reverse
//! order of opening.
//!
//! A scope also remembers which block was the head. Blocks grown while the
//! scope was open are emptied and set aside for later growth, so ending a
//! scope restores [`Arena::used`] exactly even across growth.
//!
//! [`Arena::scope`] wraps the same mechanism in a guard that ends the scope
//! when dropped.
//!
//! ```
//! use regio_mem::Arena;
//!
//! let mut arena = Arena::new(1024);
//! arena.alloc(100).unwrap();
//! let before = arena.used();
//!
//! let scope = arena.temp_begin();
//! arena.alloc(200).unwrap();
//! arena.temp_end(scope);
//!
//! assert_eq!(arena.used(), before);
//! ```

use std::ops::{Deref, DerefMut};

use regio_log::trace;

use crate::arena::Arena;

/// Rollback token returned by [`Arena::temp_begin`].
///
/// A token taken from a headless arena, or one that no longer matches the
/// arena's blocks (after a reset, destroy, or use on a different arena),
/// does nothing when ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "a temporary scope rolls nothing back unless passed to `temp_end`"]
pub struct TempScope {
    mark: Option<Mark>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Mark {
    /// Index of the head block at `temp_begin`.
    index: usize,
    /// Start address of that block, to recognize tokens from elsewhere.
    base: usize,
    /// The head block's `used` at `temp_begin`.
    used: usize,
}

impl TempScope {
    /// Whether ending this scope can roll anything back.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.mark.is_some()
    }

    /// Head-block usage captured when the scope was opened.
    #[inline]
    pub fn head_used(&self) -> usize {
        self.mark.map_or(0, |mark| mark.used)
    }
}

impl<'buf> Arena<'buf> {
    /// Opens a temporary scope at the current end of the head block.
    pub fn temp_begin(&self) -> TempScope {
        let mark = self.blocks.last().map(|head| Mark {
            index: self.blocks.len() - 1,
            base: head.base_addr(),
            used: head.used(),
        });
        TempScope { mark }
    }

    /// Rolls the arena back to where `scope` was opened.
    ///
    /// Blocks grown since then are emptied and kept for reuse. Tokens that do
    /// not match this arena's state are ignored. Returns whether a rollback
    /// took place.
    pub fn temp_end(&mut self, scope: TempScope) -> bool {
        let Some(mark) = scope.mark else {
            return false;
        };
        let Some(block) = self.blocks.get(mark.index) else {
            trace!("ignoring stale scope: block #{} is gone", mark.index);
            return false;
        };
        if block.base_addr() != mark.base || block.used() < mark.used {
            trace!("ignoring stale scope for block #{}", mark.index);
            return false;
        }

        let grown = self.blocks.len() - mark.index - 1;
        if grown > 0 {
            for mut block in self.blocks.drain(mark.index + 1..) {
                block.clear();
                self.spare.push(block);
            }
            trace!("scope end retired {grown} grown blocks");
        }

        self.blocks[mark.index].rewind(mark.used);
        true
    }

    /// Opens a temporary scope that ends when the guard is dropped.
    ///
    /// The guard dereferences to the arena, so allocations go through it:
    ///
    /// ```
    /// use regio_mem::Arena;
    ///
    /// let mut arena = Arena::new(256);
    /// {
    ///     let mut scratch = arena.scope();
    ///     scratch.alloc(64).unwrap();
    ///     assert_eq!(scratch.used(), 64);
    /// }
    /// assert_eq!(arena.used(), 0);
    /// ```
    pub fn scope(&mut self) -> ScopeGuard<'_, 'buf> {
        let scope = self.temp_begin();
        ScopeGuard { arena: self, scope }
    }
}

/// RAII form of [`TempScope`], created by [`Arena::scope`].
pub struct ScopeGuard<'a, 'buf> {
    arena: &'a mut Arena<'buf>,
    scope: TempScope,
}

impl ScopeGuard<'_, '_> {
    /// The token this guard will end on drop.
    pub fn token(&self) -> TempScope {
        self.scope
    }
}

impl<'buf> Deref for ScopeGuard<'_, 'buf> {
    type Target = Arena<'buf>;

    fn deref(&self) -> &Self::Target {
        self.arena
    }
}

impl DerefMut for ScopeGuard<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.arena
    }
}

impl Drop for ScopeGuard<'_, '_> {
    fn drop(&mut self) {
        self.arena.temp_end(self.scope);
    }
}
