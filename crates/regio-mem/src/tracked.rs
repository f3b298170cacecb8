//! Allocation bookkeeping layered over [`Arena`].
//!
//! The core arena trusts its callers: `realloc` is `unsafe` because the arena
//! cannot tell whether a pointer is one of its own. `TrackedArena` records
//! every live allocation (address and size) in a hash map, which lets it
//! offer a safe `realloc` that rejects foreign or stale pointers, and report
//! how many allocations are live.
//!
//! Bookkeeping costs a hash insert per allocation, so this is a debugging
//! and testing aid, not a replacement for [`Arena`] on hot paths.
//!
//! ```
//! use regio_mem::{Arena, ArenaError, TrackedArena};
//!
//! let mut arena = TrackedArena::new(Arena::new(1024));
//! let buf = arena.alloc(16).unwrap();
//!
//! let grown = arena.realloc(Some(buf), 16, 64).unwrap();
//! assert_eq!(grown, buf);
//!
//! let mut local = [0u8; 8];
//! let foreign = std::ptr::NonNull::from(&mut local).cast::<u8>();
//! assert!(matches!(
//!     arena.realloc(Some(foreign), 8, 32),
//!     Err(ArenaError::UnknownAllocation { .. })
//! ));
//! ```

use std::ffi::CStr;
use std::ops::Deref;
use std::ptr::NonNull;

use hashbrown::HashMap;
use regio_log::debug;

use crate::arena::Arena;
use crate::error::{ArenaError, Result};
use crate::scope::TempScope;

#[derive(Debug, Clone, Copy)]
struct Record {
    size: usize,
    /// Allocation sequence number, used to drop records on scope end.
    seq: u64,
}

/// Rollback token for [`TrackedArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "a temporary scope rolls nothing back unless passed to `temp_end`"]
pub struct TrackedScope {
    inner: TempScope,
    seq: u64,
}

/// An [`Arena`] that remembers what it handed out.
///
/// Dereferences to the underlying arena for read-only introspection.
#[derive(Debug)]
pub struct TrackedArena<'buf> {
    arena: Arena<'buf>,
    live: HashMap<usize, Record>,
    next_seq: u64,
}

impl<'buf> TrackedArena<'buf> {
    /// Wraps `arena`. Allocations made before wrapping are not tracked.
    pub fn new(arena: Arena<'buf>) -> Self {
        Self {
            arena,
            live: HashMap::new(),
            next_seq: 0,
        }
    }

    /// Drops the bookkeeping and returns the arena.
    pub fn into_inner(self) -> Arena<'buf> {
        self.arena
    }

    /// Number of allocations not yet invalidated by reset or scope end.
    pub fn live_allocations(&self) -> usize {
        self.live.len()
    }

    /// Sum of the sizes of live allocations, padding excluded.
    pub fn live_bytes(&self) -> usize {
        self.live.values().map(|record| record.size).sum()
    }

    /// Size of the live allocation starting at `ptr`, if any.
    pub fn allocation_size(&self, ptr: NonNull<u8>) -> Option<usize> {
        self.live.get(&ptr.as_ptr().addr()).map(|record| record.size)
    }

    fn record(&mut self, ptr: NonNull<u8>, size: usize) -> NonNull<u8> {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.live.insert(ptr.as_ptr().addr(), Record { size, seq });
        ptr
    }

    /// Tracked [`Arena::alloc`].
    pub fn alloc(&mut self, size: usize) -> Result<NonNull<u8>> {
        let ptr = self.arena.alloc(size)?;
        Ok(self.record(ptr, size))
    }

    /// Tracked [`Arena::alloc_aligned`].
    pub fn alloc_aligned(&mut self, size: usize, align: usize) -> Result<NonNull<u8>> {
        let ptr = self.arena.alloc_aligned(size, align)?;
        Ok(self.record(ptr, size))
    }

    /// Tracked [`Arena::alloc_zeroed`].
    pub fn alloc_zeroed(&mut self, size: usize) -> Result<NonNull<u8>> {
        let ptr = self.arena.alloc_zeroed(size)?;
        Ok(self.record(ptr, size))
    }

    /// Tracked [`Arena::calloc`].
    pub fn calloc(&mut self, count: usize, size: usize) -> Result<NonNull<u8>> {
        let ptr = self.arena.calloc(count, size)?;
        // calloc succeeded, so the product did not overflow.
        Ok(self.record(ptr, count * size))
    }

    /// Tracked [`Arena::strdup`].
    pub fn strdup(&mut self, s: &CStr) -> Result<NonNull<u8>> {
        let ptr = self.arena.strdup(s)?;
        Ok(self.record(ptr, s.to_bytes_with_nul().len()))
    }

    /// Tracked [`Arena::strndup`].
    pub fn strndup(&mut self, s: &CStr, n: usize) -> Result<NonNull<u8>> {
        let ptr = self.arena.strndup(s, n)?;
        Ok(self.record(ptr, s.to_bytes().len().min(n) + 1))
    }

    /// Safe counterpart of [`Arena::realloc`].
    ///
    /// `ptr` must be a live allocation from this arena of at least
    /// `old_size` bytes; anything else fails with
    /// [`ArenaError::UnknownAllocation`] and changes nothing.
    pub fn realloc(
        &mut self,
        ptr: Option<NonNull<u8>>,
        old_size: usize,
        new_size: usize,
    ) -> Result<NonNull<u8>> {
        let Some(old) = ptr else {
            return self.alloc(new_size);
        };
        let addr = old.as_ptr().addr();
        match self.live.get(&addr) {
            Some(record) if old_size <= record.size => {}
            _ => {
                debug!("rejected realloc of untracked pointer {addr:#x}");
                return Err(ArenaError::UnknownAllocation { ptr: addr });
            }
        }

        // SAFETY: `old` is a live allocation of at least old_size bytes that
        // no reset or scope end has invalidated.
        let new = unsafe { self.arena.realloc(Some(old), old_size, new_size) }?;
        if new == old {
            if let Some(record) = self.live.get_mut(&addr) {
                record.size = new_size;
            }
            Ok(new)
        } else {
            Ok(self.record(new, new_size))
        }
    }

    /// Resets the arena and forgets every allocation.
    pub fn reset(&mut self) {
        self.arena.reset();
        self.live.clear();
    }

    /// Destroys the arena and forgets every allocation.
    pub fn destroy(&mut self) {
        self.arena.destroy();
        self.live.clear();
    }

    /// Opens a temporary scope; see [`Arena::temp_begin`].
    pub fn temp_begin(&self) -> TrackedScope {
        TrackedScope {
            inner: self.arena.temp_begin(),
            seq: self.next_seq,
        }
    }

    /// Ends a scope and forgets every allocation made inside it.
    pub fn temp_end(&mut self, scope: TrackedScope) -> bool {
        if self.arena.temp_end(scope.inner) {
            self.live.retain(|_, record| record.seq < scope.seq);
            return true;
        }
        false
    }
}

impl<'buf> Deref for TrackedArena<'buf> {
    type Target = Arena<'buf>;

    fn deref(&self) -> &Self::Target {
        &self.arena
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_allocations() {
        let mut arena = TrackedArena::new(Arena::new(1024));

        let a = arena.alloc(10).unwrap();
        arena.calloc(4, 8).unwrap();
        arena.strdup(c"abc").unwrap();

        assert_eq!(arena.live_allocations(), 3);
        assert_eq!(arena.live_bytes(), 10 + 32 + 4);
        assert_eq!(arena.allocation_size(a), Some(10));
    }

    #[test]
    fn test_failed_allocations_are_not_recorded() {
        let mut arena = TrackedArena::new(Arena::new(64));

        assert!(arena.alloc(0).is_err());
        assert!(arena.calloc(usize::MAX, 2).is_err());
        assert_eq!(arena.live_allocations(), 0);
    }

    #[test]
    fn test_realloc_in_place_updates_size() {
        let mut arena = TrackedArena::new(Arena::new(1024));

        let ptr = arena.alloc(16).unwrap();
        let grown = arena.realloc(Some(ptr), 16, 48).unwrap();

        assert_eq!(grown, ptr);
        assert_eq!(arena.allocation_size(ptr), Some(48));
        assert_eq!(arena.live_allocations(), 1);
    }

    #[test]
    fn test_realloc_shrink_in_place_updates_size() {
        let mut arena = TrackedArena::new(Arena::new(1024));

        let ptr = arena.alloc(64).unwrap();
        arena.realloc(Some(ptr), 64, 16).unwrap();
        assert_eq!(arena.allocation_size(ptr), Some(16));
        assert_eq!(arena.used(), 16);

        // The recorded size is now 16, so a 64-byte claim is refused.
        assert!(matches!(
            arena.realloc(Some(ptr), 64, 128),
            Err(ArenaError::UnknownAllocation { .. })
        ));

        let regrown = arena.realloc(Some(ptr), 16, 32).unwrap();
        assert_eq!(regrown, ptr);
        assert_eq!(arena.allocation_size(ptr), Some(32));
    }

    #[test]
    fn test_realloc_move_keeps_old_live() {
        let mut arena = TrackedArena::new(Arena::new(1024));

        let first = arena.alloc(8).unwrap();
        arena.alloc(8).unwrap();
        let moved = arena.realloc(Some(first), 8, 32).unwrap();

        assert_ne!(moved, first);
        assert_eq!(arena.allocation_size(first), Some(8));
        assert_eq!(arena.allocation_size(moved), Some(32));
    }

    #[test]
    fn test_realloc_rejects_unknown_pointer() {
        let mut arena = TrackedArena::new(Arena::new(1024));
        let ptr = arena.alloc(16).unwrap();

        let inner = unsafe { NonNull::new_unchecked(ptr.as_ptr().add(4)) };
        assert_eq!(
            arena.realloc(Some(inner), 4, 32),
            Err(ArenaError::UnknownAllocation { ptr: inner.as_ptr().addr() })
        );
    }

    #[test]
    fn test_realloc_rejects_oversized_claim() {
        let mut arena = TrackedArena::new(Arena::new(1024));
        let ptr = arena.alloc(16).unwrap();

        assert!(matches!(
            arena.realloc(Some(ptr), 64, 128),
            Err(ArenaError::UnknownAllocation { .. })
        ));
        assert_eq!(arena.used(), 16);
    }

    #[test]
    fn test_realloc_rejects_after_reset() {
        let mut arena = TrackedArena::new(Arena::new(1024));
        let ptr = arena.alloc(16).unwrap();

        arena.reset();
        assert_eq!(arena.live_allocations(), 0);
        assert!(arena.realloc(Some(ptr), 16, 32).is_err());
    }

    #[test]
    fn test_scope_end_forgets_inner_allocations() {
        let mut arena = TrackedArena::new(Arena::new(64));
        let outer = arena.alloc(8).unwrap();

        let scope = arena.temp_begin();
        let inner = arena.alloc(16).unwrap();
        arena.alloc(200).unwrap();
        arena.temp_end(scope);

        assert_eq!(arena.live_allocations(), 1);
        assert_eq!(arena.allocation_size(outer), Some(8));
        assert_eq!(arena.allocation_size(inner), None);
        assert_eq!(arena.used(), 8);
    }

    #[test]
    fn test_into_inner() {
        let mut arena = TrackedArena::new(Arena::new(128));
        arena.alloc(24).unwrap();

        let inner = arena.into_inner();
        assert_eq!(inner.used(), 24);
    }
}
