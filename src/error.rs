use std::fmt;

/// Recoverable failures reported by the allocator.
///
/// Contract violations (zero-sized requests, pointers outside the arena) are
/// not represented here: they panic.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AllocError {
  /// No free block is large enough for the request.
  OutOfMemory,
  /// The operating system refused to reserve the arena.
  RegionDenied,
  /// The configured heap size cannot hold even a single block header.
  RegionTooSmall,
}

impl fmt::Display for AllocError {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      AllocError::OutOfMemory => write!(f, "out of memory: no free block fits the request"),
      AllocError::RegionDenied => write!(f, "arena reservation was denied"),
      AllocError::RegionTooSmall => write!(f, "configured heap size is smaller than a block header"),
    }
  }
}

impl std::error::Error for AllocError {}

/// A broken structural property found by
/// [`FreeListAllocator::check_invariants`](crate::FreeListAllocator::check_invariants).
///
/// Offsets are relative to the arena base.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InvariantViolation {
  /// Two list neighbors are not in strictly ascending address order.
  Unordered { left: usize, right: usize },
  /// Two list neighbors overlap.
  Overlapping { left: usize, right: usize },
  /// Two list neighbors touch and should have been coalesced.
  Uncoalesced { left: usize, right: usize },
  /// A block's offset or size is not word aligned.
  Misaligned { offset: usize },
  /// `prev` of a free block does not point back at its list predecessor.
  BrokenBackLink { offset: usize },
  /// A free block lies (partially) outside the arena.
  OutOfBounds { offset: usize },
  /// Walking the blocks by size does not end exactly at the arena end.
  Tiling { reached: usize, capacity: usize },
  /// A free-list entry is not the start of any block in the physical walk.
  Detached { offset: usize },
}

impl fmt::Display for InvariantViolation {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match *self {
      InvariantViolation::Unordered { left, right } => {
        write!(f, "free blocks out of order: {left:#x} before {right:#x}")
      }
      InvariantViolation::Overlapping { left, right } => {
        write!(f, "free blocks overlap: {left:#x} runs into {right:#x}")
      }
      InvariantViolation::Uncoalesced { left, right } => {
        write!(f, "contiguous free blocks left unmerged: {left:#x} and {right:#x}")
      }
      InvariantViolation::Misaligned { offset } => write!(f, "misaligned block at {offset:#x}"),
      InvariantViolation::BrokenBackLink { offset } => {
        write!(f, "prev link of free block {offset:#x} is inconsistent")
      }
      InvariantViolation::OutOfBounds { offset } => {
        write!(f, "free block {offset:#x} extends past the arena")
      }
      InvariantViolation::Tiling { reached, capacity } => {
        write!(f, "blocks tile {reached:#x} bytes of a {capacity:#x} byte arena")
      }
      InvariantViolation::Detached { offset } => {
        write!(f, "free block {offset:#x} is not on a block boundary")
      }
    }
  }
}

impl std::error::Error for InvariantViolation {}
