use crate::align::ALIGNMENT;

/// Arena size reserved when no other size is configured: 1 MiB.
pub const DEFAULT_MAX_HEAP_SIZE: usize = 1 << 20;

/// Static configuration of a [`FreeListAllocator`](crate::FreeListAllocator).
///
/// The heap never grows past the size reserved at initialization, so this is
/// the only knob the allocator has.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct HeapConfig {
  /// Maximum number of bytes reserved for the arena, headers included.
  pub max_heap_size: usize,
}

impl HeapConfig {
  pub const fn with_max_heap_size(max_heap_size: usize) -> Self {
    Self { max_heap_size }
  }

  /// The arena capacity actually reserved: `max_heap_size` rounded up to the
  /// word alignment. `None` when rounding up would overflow.
  pub fn aligned_size(&self) -> Option<usize> {
    self
      .max_heap_size
      .checked_add(ALIGNMENT - 1)
      .map(|size| size & !(ALIGNMENT - 1))
  }
}

impl Default for HeapConfig {
  fn default() -> Self {
    Self::with_max_heap_size(DEFAULT_MAX_HEAP_SIZE)
  }
}
