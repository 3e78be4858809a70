use std::ptr::NonNull;

use log::{debug, trace, warn};

use crate::{
  align,
  arena::Arena,
  block::{HEADER_SIZE, Header},
  coalesce,
  config::HeapConfig,
  error::AllocError,
  free_list::FreeList,
  region::{MmapRegion, RegionProvider},
};

/// The arena and the list of its free blocks, present once initialized.
pub(crate) struct Heap {
  pub(crate) arena: Arena,
  pub(crate) free: FreeList,
}

/// First-fit allocator over a single fixed-size region.
///
/// The region is reserved from `R` on the first [`allocate`](Self::allocate)
/// (or an explicit [`init`](Self::init)) and never grows. Free blocks are
/// kept on an address-ordered list and merged with their neighbors as soon as
/// they become contiguous.
///
/// Not thread-safe: callers must serialize access.
pub struct FreeListAllocator<R: RegionProvider = MmapRegion> {
  config: HeapConfig,
  provider: R,
  pub(crate) heap: Option<Heap>,
}

impl FreeListAllocator<MmapRegion> {
  /// An allocator whose arena is reserved with `mmap`.
  pub fn new(config: HeapConfig) -> Self {
    Self::with_provider(config, MmapRegion)
  }
}

impl Default for FreeListAllocator<MmapRegion> {
  fn default() -> Self {
    Self::new(HeapConfig::default())
  }
}

impl<R: RegionProvider> FreeListAllocator<R> {
  pub fn with_provider(
    config: HeapConfig,
    provider: R,
  ) -> Self {
    Self {
      config,
      provider,
      heap: None,
    }
  }

  pub fn config(&self) -> &HeapConfig {
    &self.config
  }

  pub fn is_initialized(&self) -> bool {
    self.heap.is_some()
  }

  /// Bytes of the reserved arena, headers included. Zero before
  /// initialization.
  pub fn capacity(&self) -> usize {
    self.heap.as_ref().map_or(0, |heap| heap.arena.capacity())
  }

  /// Largest payload the arena could ever serve: its capacity minus one
  /// header. Zero before initialization.
  pub fn usable_capacity(&self) -> usize {
    self.capacity().saturating_sub(HEADER_SIZE)
  }

  /// Reserves the arena and installs it as a single free block.
  ///
  /// Does nothing once initialized. A failed attempt leaves the allocator
  /// uninitialized so a later call can retry.
  pub fn init(&mut self) -> Result<(), AllocError> {
    self.heap_mut().map(|_| ())
  }

  /// The initialized heap, reserving the arena first if needed.
  fn heap_mut(&mut self) -> Result<&mut Heap, AllocError> {
    let heap = match self.heap.take() {
      Some(heap) => heap,
      None => self.reserve_heap()?,
    };

    Ok(self.heap.insert(heap))
  }

  fn reserve_heap(&mut self) -> Result<Heap, AllocError> {
    let Some(capacity) = self.config.aligned_size() else {
      let max_heap_size = self.config.max_heap_size;
      warn!("heap size {max_heap_size} overflows when aligned");
      return Err(AllocError::RegionDenied);
    };

    if capacity < HEADER_SIZE {
      warn!("heap size {capacity} cannot hold a {HEADER_SIZE} byte header");
      return Err(AllocError::RegionTooSmall);
    }

    let base = self.provider.reserve(capacity)?;
    // SAFETY: `RegionProvider` guarantees `capacity` exclusive, aligned bytes.
    let mut arena = unsafe { Arena::new(base, capacity) };
    let mut free = FreeList::new();
    let usable = capacity - HEADER_SIZE;

    arena.write_header(0, Header::detached(usable));
    free.insert_after(&mut arena, None, 0);

    debug!("heap initialized at {base:?}: {capacity} bytes, {usable} usable");

    Ok(Heap { arena, free })
  }

  /// Returns a pointer to at least `bytes` word-aligned bytes.
  ///
  /// The first free block in address order that fits is used. It is split
  /// when the rest can hold another header, and handed out whole otherwise.
  ///
  /// # Panics
  ///
  /// If `bytes` is zero.
  pub fn allocate(
    &mut self,
    bytes: usize,
  ) -> Result<NonNull<u8>, AllocError> {
    assert!(bytes > 0, "allocate called with a zero-byte request");

    let Heap { arena, free } = self.heap_mut()?;

    if bytes > arena.capacity() {
      warn!("request of {bytes} bytes exceeds the arena");
      return Err(AllocError::OutOfMemory);
    }

    if free.is_empty() {
      warn!("out of memory: every block is allocated");
      return Err(AllocError::OutOfMemory);
    }

    let need = align!(bytes);

    let Some(offset) = free.iter(arena).find(|&offset| {
      let size = arena.header(offset).size;
      trace!("first-fit probe {offset:#x}: {size} bytes for {need}");
      size >= need
    }) else {
      warn!("out of memory: no free block holds {need} bytes");
      return Err(AllocError::OutOfMemory);
    };

    let size = arena.header(offset).size;

    if size >= need + HEADER_SIZE {
      let remainder = offset + HEADER_SIZE + need;
      let rest = size - need - HEADER_SIZE;

      arena.write_header(remainder, Header::detached(rest));
      free.replace(arena, offset, remainder);
      arena.write_header(offset, Header::detached(need));

      debug!("split {offset:#x}: {need} allocated, {rest} left free at {remainder:#x}");
    } else {
      free.remove(arena, offset);

      debug!("consumed {offset:#x} whole: {size} bytes for {need}");
    }

    Ok(arena.payload(offset))
  }

  /// Returns the block owning `ptr` to the free list and merges it with any
  /// contiguous free neighbor.
  ///
  /// # Safety
  ///
  /// `ptr` must have been returned by [`allocate`](Self::allocate) on this
  /// allocator and not deallocated since. Pointers whose header would fall
  /// outside the arena are caught and panic; stale or double-freed pointers
  /// inside it are not always detected.
  pub unsafe fn deallocate(
    &mut self,
    ptr: NonNull<u8>,
  ) {
    let Some(heap) = self.heap.as_mut() else {
      panic!("deallocate of {ptr:?} before the heap was initialized");
    };
    let Heap { arena, free } = heap;

    let offset = arena.block_of(ptr);
    free.insert_sorted(arena, offset);

    let size = arena.header(offset).size;
    debug!("freed {offset:#x} ({size} bytes)");

    coalesce::coalesce(free, arena, offset);
  }
}
