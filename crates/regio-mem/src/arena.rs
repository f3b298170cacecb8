//! Bump arena with growth, reallocation and bulk reset.
//!
//! An [`Arena`] owns a chain of blocks. Only the newest block (the head)
//! receives allocations; when a request does not fit, a new head at least
//! twice as large as the old head (and twice the request) is reserved.
//! Older blocks keep their contents until [`Arena::reset`] or
//! [`Arena::destroy`].
//!
//! # Pointer validity
//!
//! Allocations are returned as raw [`NonNull`] pointers. They stay valid
//! until the arena is reset, destroyed or dropped, or until a temporary scope
//! opened before them is ended. The arena never runs destructors for values
//! placed in it.
//!
//! # Examples
//!
//! ```
//! use regio_mem::Arena;
//!
//! let mut arena = Arena::new(100);
//! arena.alloc(50).unwrap();
//! assert_eq!(arena.used(), 50);
//!
//! // 50 + 60 > 100: the arena grows a second block of at least 200 bytes.
//! arena.alloc(60).unwrap();
//! assert_eq!(arena.block_count(), 2);
//! assert_eq!(arena.used(), 110);
//! ```
//!
//! External storage, fixed capacity:
//!
//! ```
//! use regio_mem::{Arena, ArenaError};
//!
//! let mut buffer = [0u8; 64];
//! let mut arena = Arena::from_buffer(&mut buffer).unwrap();
//!
//! arena.alloc_aligned(48, 1).unwrap();
//! assert!(matches!(arena.alloc(32), Err(ArenaError::CapacityExceeded { .. })));
//! assert_eq!(arena.used(), 48);
//! ```

use std::alloc::{self, Layout};
use std::ffi::CStr;
use std::marker::PhantomData;
use std::mem::{align_of, size_of, size_of_val};
use std::ptr::{self, NonNull};

use regio_log::{debug, trace, warn};

use crate::config::{ArenaConfig, Growth};
use crate::error::{ArenaError, Result};

/// Snapshot of arena usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaStats {
    /// Bytes used across all blocks, alignment padding included.
    pub used: usize,
    /// Bytes reserved across all blocks, spare blocks included.
    pub capacity: usize,
    /// Free bytes in the head block.
    pub remaining: usize,
    /// Blocks in the chain, head included.
    pub block_count: usize,
    /// Retired blocks kept for reuse by growth.
    pub spare_blocks: usize,
}

#[derive(Debug)]
enum Storage {
    /// Reserved from the global allocator; released on drop.
    Owned(Layout),
    /// Caller-supplied; never released by the arena.
    Borrowed,
}

/// One contiguous buffer plus a bump offset.
#[derive(Debug)]
pub(crate) struct Block {
    start: NonNull<u8>,
    capacity: usize,
    /// Bytes handed out, padding included. Never exceeds `capacity`.
    used: usize,
    /// Offset of the most recent allocation, if it is still intact.
    last: Option<usize>,
    storage: Storage,
}

impl Block {
    /// Reserves a block whose start is aligned to `align`.
    fn reserve(capacity: usize, align: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(ArenaError::ReservationFailed { size: 0 });
        }
        let layout = Layout::from_size_align(capacity, align)
            .map_err(|_| ArenaError::ReservationFailed { size: capacity })?;

        // SAFETY: layout has a non-zero size (checked above).
        let start = unsafe { alloc::alloc(layout) };
        let start = NonNull::new(start).ok_or(ArenaError::ReservationFailed { size: capacity })?;

        Ok(Block {
            start,
            capacity,
            used: 0,
            last: None,
            storage: Storage::Owned(layout),
        })
    }

    fn borrowed(buffer: &mut [u8]) -> Self {
        let capacity = buffer.len();
        Block {
            start: NonNull::from(buffer).cast(),
            capacity,
            used: 0,
            last: None,
            storage: Storage::Borrowed,
        }
    }

    #[inline]
    pub(crate) fn base_addr(&self) -> usize {
        self.start.as_ptr().addr()
    }

    #[inline]
    pub(crate) fn used(&self) -> usize {
        self.used
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    fn remaining(&self) -> usize {
        self.capacity - self.used
    }

    /// Bumps `used` past `size` bytes at the next `align` boundary.
    ///
    /// Returns `None`, leaving the block untouched, when the request does not
    /// fit. `align` must be a power of two.
    #[must_use]
    #[inline(always)]
    fn try_bump(&mut self, size: usize, align: usize) -> Option<NonNull<u8>> {
        let current = self.base_addr().checked_add(self.used)?;
        let padding = current.wrapping_neg() & (align - 1);
        let offset = self.used.checked_add(padding)?;
        let end = offset.checked_add(size)?;
        if end > self.capacity {
            return None;
        }

        self.used = end;
        self.last = Some(offset);
        // SAFETY: offset < end <= capacity, so the result stays inside the
        // buffer and inherits its provenance.
        Some(unsafe { self.start.add(offset) })
    }

    /// Resizes the most recent allocation in place.
    ///
    /// Only succeeds when `ptr` is exactly the last allocation made from this
    /// block, `old_size` reaches the current end of the used region, and
    /// `new_size` fits. Shrinking returns the tail to the block.
    fn extend_in_place(&mut self, ptr: NonNull<u8>, old_size: usize, new_size: usize) -> bool {
        let Some(offset) = self.last else {
            return false;
        };
        if ptr.as_ptr().addr() != self.base_addr() + offset {
            return false;
        }
        if offset.checked_add(old_size) != Some(self.used) {
            return false;
        }
        match offset.checked_add(new_size) {
            Some(end) if end <= self.capacity => {
                self.used = end;
                true
            }
            _ => false,
        }
    }

    /// Rolls `used` back to an earlier value.
    pub(crate) fn rewind(&mut self, used: usize) {
        debug_assert!(used <= self.used);
        self.used = used;
        self.last = None;
    }

    pub(crate) fn clear(&mut self) {
        self.rewind(0);
    }
}

impl Drop for Block {
    fn drop(&mut self) {
        if let Storage::Owned(layout) = self.storage {
            // SAFETY: start was returned by alloc::alloc with this layout.
            unsafe { alloc::dealloc(self.start.as_ptr(), layout) };
        }
    }
}

/// Region allocator over a chain of blocks.
///
/// `'buf` is `'static` for heap-backed arenas and the borrow of the caller's
/// buffer for arenas created with [`Arena::from_buffer`].
///
/// An arena without a head block (see [`Arena::is_valid`]) fails every
/// allocation with [`ArenaError::InvalidArena`] and reports zero usage.
///
/// `Arena` is `Send` but not `Sync`: move it between threads freely, but
/// share it only behind external synchronization.
#[derive(Debug)]
pub struct Arena<'buf> {
    /// Oldest first; the last element is the head.
    pub(crate) blocks: Vec<Block>,
    /// Blocks retired by temporary scopes, all empty.
    pub(crate) spare: Vec<Block>,
    alignment: usize,
    max_align: usize,
    growth: Growth,
    _buffer: PhantomData<&'buf mut [u8]>,
}

// SAFETY: blocks are exclusively owned by the arena (or exclusively borrowed
// for 'buf), and no state is shared with other arenas.
unsafe impl Send for Arena<'_> {}

impl Default for Arena<'_> {
    /// An arena with no storage. Every allocation fails until it is replaced.
    fn default() -> Self {
        Self::headless(ArenaConfig::new())
    }
}

impl Arena<'static> {
    /// Creates an arena whose first block holds `capacity` bytes
    /// (1024 when `capacity` is zero), with default alignment.
    ///
    /// If the first block cannot be reserved, the returned arena has no head
    /// and every allocation fails; check [`Arena::is_valid`] or use
    /// [`Arena::try_new`].
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self::with_config(ArenaConfig::new().with_capacity(capacity))
    }

    /// Like [`Arena::new`], with a caller-chosen default alignment.
    ///
    /// Zero or non-power-of-two alignments are replaced by the default;
    /// larger-than-maximum ones are clamped.
    #[must_use]
    pub fn with_alignment(capacity: usize, alignment: usize) -> Self {
        Self::with_config(
            ArenaConfig::new()
                .with_capacity(capacity)
                .with_alignment(alignment),
        )
    }

    /// Creates an arena from `config`.
    ///
    /// Reservation failure is logged and yields a headless arena.
    #[must_use]
    pub fn with_config(config: ArenaConfig) -> Self {
        match Self::try_with_config(config) {
            Ok(arena) => arena,
            Err(err) => {
                warn!("arena creation failed: {err}");
                Self::headless(config.normalized())
            }
        }
    }

    /// Like [`Arena::new`], but reports reservation failure.
    pub fn try_new(capacity: usize) -> Result<Self> {
        Self::try_with_config(ArenaConfig::new().with_capacity(capacity))
    }

    /// Like [`Arena::with_config`], but reports reservation failure.
    pub fn try_with_config(config: ArenaConfig) -> Result<Self> {
        let config = config.normalized();
        let block = Block::reserve(config.capacity, config.max_alignment)?;
        trace!("arena created: {} bytes, align {}", config.capacity, config.alignment);
        Ok(Self::from_parts(block, config))
    }
}

impl<'buf> Arena<'buf> {
    /// Uses `buffer` as the arena's first block.
    ///
    /// The arena is fixed-capacity: a request that does not fit fails with
    /// [`ArenaError::CapacityExceeded`]. The buffer is never freed by the
    /// arena, so destroying or dropping it is always safe.
    pub fn from_buffer(buffer: &'buf mut [u8]) -> Result<Self> {
        Self::from_buffer_with_config(buffer, ArenaConfig::new().with_growth(Growth::Fixed))
    }

    /// Uses `buffer` as the first block with explicit settings.
    ///
    /// `config.capacity` is ignored. With [`Growth::Grow`], overflow blocks
    /// are reserved from the heap and released by the arena.
    pub fn from_buffer_with_config(buffer: &'buf mut [u8], config: ArenaConfig) -> Result<Self> {
        if buffer.is_empty() {
            return Err(ArenaError::InvalidBuffer);
        }
        let config = config.normalized();
        Ok(Self::from_parts(Block::borrowed(buffer), config))
    }

    fn headless(config: ArenaConfig) -> Self {
        Arena {
            blocks: Vec::new(),
            spare: Vec::new(),
            alignment: config.alignment,
            max_align: config.max_alignment,
            growth: config.growth,
            _buffer: PhantomData,
        }
    }

    fn from_parts(block: Block, config: ArenaConfig) -> Self {
        let mut arena = Self::headless(config);
        arena.blocks.push(block);
        arena
    }

    /// Whether the arena has a head block to allocate from.
    #[inline]
    pub fn is_valid(&self) -> bool {
        !self.blocks.is_empty()
    }

    /// Default alignment of [`Arena::alloc`].
    #[inline]
    pub fn alignment(&self) -> usize {
        self.alignment
    }

    /// Cap applied to every requested alignment.
    #[inline]
    pub fn max_alignment(&self) -> usize {
        self.max_align
    }

    /// What happens when the head block runs out of room.
    #[inline]
    pub fn growth(&self) -> Growth {
        self.growth
    }

    /// Total bytes used across every block, alignment padding included.
    pub fn used(&self) -> usize {
        self.blocks.iter().map(Block::used).sum()
    }

    /// Free bytes in the head block.
    ///
    /// Only the head block accepts allocations, so this is the largest
    /// request (before alignment padding) that can succeed without growth.
    /// Unlike [`Arena::used`], earlier blocks are not counted.
    pub fn remaining(&self) -> usize {
        self.blocks.last().map_or(0, Block::remaining)
    }

    /// Bytes reserved across all blocks, spare blocks included.
    pub fn capacity(&self) -> usize {
        self.blocks
            .iter()
            .chain(&self.spare)
            .map(Block::capacity)
            .sum()
    }

    /// Number of blocks in the chain, spares excluded.
    #[inline]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// `(used, capacity)` of each block, head first.
    pub fn block_usage(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.blocks.iter().rev().map(|b| (b.used(), b.capacity()))
    }

    /// Snapshot of usage across the whole arena.
    #[must_use]
    pub fn stats(&self) -> ArenaStats {
        ArenaStats {
            used: self.used(),
            capacity: self.capacity(),
            remaining: self.remaining(),
            block_count: self.block_count(),
            spare_blocks: self.spare.len(),
        }
    }

    /// Marks every block empty, keeping all storage.
    ///
    /// Every pointer previously returned by this arena becomes invalid.
    pub fn reset(&mut self) {
        for block in &mut self.blocks {
            block.clear();
        }
        trace!("arena reset: {} blocks retained", self.blocks.len());
    }

    /// Releases every block the arena owns and leaves it headless.
    ///
    /// Borrowed buffers are detached, not freed. Calling this on an arena
    /// that is already headless does nothing.
    pub fn destroy(&mut self) {
        if self.blocks.is_empty() && self.spare.is_empty() {
            return;
        }
        trace!(
            "arena destroyed: {} blocks, {} spare",
            self.blocks.len(),
            self.spare.len()
        );
        self.blocks.clear();
        self.spare.clear();
    }

    /// Applies the alignment rules to a per-request alignment.
    #[inline]
    fn effective_alignment(&self, align: usize) -> usize {
        let align = if align.is_power_of_two() {
            align
        } else {
            self.alignment
        };
        align.min(self.max_align)
    }

    /// Allocates `size` bytes at the default alignment.
    #[inline]
    pub fn alloc(&mut self, size: usize) -> Result<NonNull<u8>> {
        self.alloc_aligned(size, self.alignment)
    }

    /// Allocates `size` bytes aligned to `align`.
    ///
    /// Zero or non-power-of-two alignments fall back to the arena default;
    /// alignments above [`Arena::max_alignment`] are clamped. If the head
    /// block is full the arena grows (unless it is fixed-capacity).
    pub fn alloc_aligned(&mut self, size: usize, align: usize) -> Result<NonNull<u8>> {
        let align = self.effective_alignment(align);
        let head = self.blocks.last_mut().ok_or(ArenaError::InvalidArena)?;
        if size == 0 {
            return Err(ArenaError::ZeroSize);
        }

        if let Some(ptr) = head.try_bump(size, align) {
            return Ok(ptr);
        }

        self.grow(size, align)
    }

    /// Makes a new head block able to hold `size` bytes and allocates from it.
    #[cold]
    fn grow(&mut self, size: usize, align: usize) -> Result<NonNull<u8>> {
        let head_capacity = self
            .blocks
            .last()
            .map(Block::capacity)
            .ok_or(ArenaError::InvalidArena)?;

        if self.growth == Growth::Fixed {
            return Err(ArenaError::CapacityExceeded {
                requested: size,
                available: self.remaining(),
            });
        }

        let capacity = head_capacity.saturating_mul(2).max(size.saturating_mul(2));
        let mut block = match self.take_spare(capacity) {
            Some(block) => block,
            None => Block::reserve(capacity, self.max_align)
                .inspect_err(|err| warn!("arena growth failed: {err}"))?,
        };

        // Fresh blocks start at max alignment, so this only fails for
        // requests the capacity computation saturated on.
        let Some(ptr) = block.try_bump(size, align) else {
            self.spare.push(block);
            return Err(ArenaError::ReservationFailed { size: capacity });
        };

        debug!(
            "arena grew: block #{} holds {} bytes for a {size}-byte request",
            self.blocks.len(),
            block.capacity()
        );
        self.blocks.push(block);
        Ok(ptr)
    }

    /// Removes a spare block of at least `min_capacity` bytes.
    fn take_spare(&mut self, min_capacity: usize) -> Option<Block> {
        let index = self
            .spare
            .iter()
            .position(|block| block.capacity() >= min_capacity)?;
        trace!("reusing spare block of {} bytes", self.spare[index].capacity());
        Some(self.spare.swap_remove(index))
    }

    /// Allocates `size` zeroed bytes.
    pub fn alloc_zeroed(&mut self, size: usize) -> Result<NonNull<u8>> {
        let ptr = self.alloc(size)?;
        // SAFETY: ptr is valid for writes of size bytes.
        unsafe { ptr::write_bytes(ptr.as_ptr(), 0, size) };
        Ok(ptr)
    }

    /// Allocates `count * size` zeroed bytes.
    ///
    /// Fails with [`ArenaError::SizeOverflow`] before touching the arena when
    /// the product does not fit in `usize`.
    pub fn calloc(&mut self, count: usize, size: usize) -> Result<NonNull<u8>> {
        let total = count
            .checked_mul(size)
            .ok_or(ArenaError::SizeOverflow { count, size })?;
        self.alloc_zeroed(total)
    }

    /// Resizes an allocation.
    ///
    /// When `ptr` is the most recent allocation in the head block and the new
    /// size fits, it is resized in place and returned unchanged. Otherwise a
    /// new region is allocated and `min(old_size, new_size)` bytes are copied
    /// over; the old region stays valid but is no longer tracked.
    ///
    /// `None` behaves like `alloc(new_size)`. A `new_size` of zero fails and
    /// leaves the allocation untouched, as does any other failure.
    ///
    /// # Safety
    ///
    /// If `ptr` is `Some`, it must be valid for reads of `old_size` bytes and
    /// must not overlap storage the arena has since handed out again (it must
    /// not predate a reset or an ended scope). An allocation from this arena
    /// of at least `old_size` bytes satisfies both.
    pub unsafe fn realloc(
        &mut self,
        ptr: Option<NonNull<u8>>,
        old_size: usize,
        new_size: usize,
    ) -> Result<NonNull<u8>> {
        let Some(ptr) = ptr else {
            return self.alloc(new_size);
        };
        let head = self.blocks.last_mut().ok_or(ArenaError::InvalidArena)?;
        if new_size == 0 {
            return Err(ArenaError::ZeroSize);
        }

        if head.extend_in_place(ptr, old_size, new_size) {
            return Ok(ptr);
        }

        let new_ptr = self.alloc(new_size)?;
        // SAFETY: the caller guarantees ptr is readable for old_size bytes and
        // not part of live arena storage; new_ptr is a fresh allocation of
        // new_size bytes.
        unsafe {
            ptr::copy_nonoverlapping(ptr.as_ptr(), new_ptr.as_ptr(), old_size.min(new_size));
        }
        Ok(new_ptr)
    }

    /// Copies `s`, including its NUL terminator, into the arena.
    pub fn strdup(&mut self, s: &CStr) -> Result<NonNull<u8>> {
        self.alloc_bytes_with_nul(s.to_bytes())
    }

    /// Copies at most `n` bytes of `s` into the arena, always NUL-terminated.
    pub fn strndup(&mut self, s: &CStr, n: usize) -> Result<NonNull<u8>> {
        let bytes = s.to_bytes();
        self.alloc_bytes_with_nul(&bytes[..bytes.len().min(n)])
    }

    /// Copies a UTF-8 string into the arena, followed by a NUL byte.
    pub fn alloc_str(&mut self, s: &str) -> Result<NonNull<u8>> {
        self.alloc_bytes_with_nul(s.as_bytes())
    }

    fn alloc_bytes_with_nul(&mut self, bytes: &[u8]) -> Result<NonNull<u8>> {
        let len = bytes.len();
        let ptr = self.alloc(len + 1)?;

        // SAFETY: ptr is valid for len + 1 bytes and freshly allocated, so it
        // cannot overlap `bytes`.
        unsafe {
            ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.as_ptr(), len);
            ptr.as_ptr().add(len).write(0);
        }
        Ok(ptr)
    }

    /// Moves `value` into the arena.
    ///
    /// The value is never dropped by the arena. Zero-sized types fail with
    /// [`ArenaError::ZeroSize`]; types aligned beyond
    /// [`Arena::max_alignment`] fail with [`ArenaError::AlignmentTooLarge`].
    pub fn alloc_value<T>(&mut self, value: T) -> Result<NonNull<T>> {
        let align = self.type_alignment::<T>()?;
        let ptr = self.alloc_aligned(size_of::<T>(), align)?.cast::<T>();

        // SAFETY: ptr is aligned for T and valid for size_of::<T>() bytes.
        unsafe { ptr.write(value) };
        Ok(ptr)
    }

    /// Copies a slice into the arena.
    pub fn alloc_slice_copy<T: Copy>(&mut self, src: &[T]) -> Result<NonNull<[T]>> {
        let align = self.type_alignment::<T>()?;
        let ptr = self.alloc_aligned(size_of_val(src), align)?.cast::<T>();

        // SAFETY: ptr is aligned for T, valid for src.len() elements and
        // freshly allocated.
        unsafe { ptr::copy_nonoverlapping(src.as_ptr(), ptr.as_ptr(), src.len()) };
        Ok(NonNull::slice_from_raw_parts(ptr, src.len()))
    }

    fn type_alignment<T>(&self) -> Result<usize> {
        let align = align_of::<T>();
        if align > self.max_align {
            return Err(ArenaError::AlignmentTooLarge {
                align,
                max: self.max_align,
            });
        }
        Ok(align.max(self.alignment))
    }
}
