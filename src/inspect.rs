//! Read-only views of the heap: free-list dumps, block walks, usage numbers
//! and a structural self-check. None of these change allocator state.

use std::{fmt, iter::Peekable};

use crate::{
  FreeListAllocator,
  align::is_aligned,
  arena::Arena,
  block::HEADER_SIZE,
  error::InvariantViolation,
  free_list,
  region::RegionProvider,
};

/// One entry of the free list.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FreeBlockInfo {
  /// Offset of the header from the arena base.
  pub offset: usize,
  /// Absolute address of the header.
  pub address: usize,
  pub size: usize,
  pub prev: Option<usize>,
  pub next: Option<usize>,
}

impl fmt::Display for FreeBlockInfo {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    write!(
      f,
      "Freelist Size:{}, Head:{:#x} (+{:#x}), Prev:{}, Next:{}",
      self.size,
      self.address,
      self.offset,
      Link(self.prev),
      Link(self.next)
    )
  }
}

struct Link(Option<usize>);

impl fmt::Display for Link {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self.0 {
      Some(offset) => write!(f, "+{:#x}", offset),
      None => write!(f, "nil"),
    }
  }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BlockState {
  Free,
  Allocated,
}

/// One block of the arena, free or allocated.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BlockInfo {
  pub offset: usize,
  pub size: usize,
  pub state: BlockState,
}

/// Heap usage at a point in time. Header bytes count toward neither
/// `free_bytes` nor `allocated_bytes`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct HeapStats {
  pub capacity: usize,
  pub free_bytes: usize,
  pub allocated_bytes: usize,
  pub free_blocks: usize,
  pub allocated_blocks: usize,
  pub largest_free: usize,
}

impl HeapStats {
  pub fn header_bytes(&self) -> usize {
    (self.free_blocks + self.allocated_blocks) * HEADER_SIZE
  }
}

/// Walks the arena block by block, following header sizes.
pub struct Blocks<'a> {
  arena: &'a Arena,
  offset: usize,
  free: Peekable<free_list::Iter<'a>>,
}

impl Iterator for Blocks<'_> {
  type Item = BlockInfo;

  fn next(&mut self) -> Option<BlockInfo> {
    if self.offset + HEADER_SIZE > self.arena.capacity() {
      return None;
    }

    let offset = self.offset;
    let header = self.arena.header(offset);

    while self.free.next_if(|&free| free < offset).is_some() {}

    let state = if self.free.next_if_eq(&offset).is_some() {
      BlockState::Free
    } else {
      BlockState::Allocated
    };

    self.offset = offset + header.span();

    Some(BlockInfo {
      offset,
      size: header.size,
      state,
    })
  }
}

impl<R: RegionProvider> FreeListAllocator<R> {
  /// The free list in address order. Empty before initialization.
  pub fn free_blocks(&self) -> impl Iterator<Item = FreeBlockInfo> + '_ {
    self.heap.iter().flat_map(|heap| {
      heap.free.iter(&heap.arena).map(move |offset| {
        let header = heap.arena.header(offset);
        FreeBlockInfo {
          offset,
          address: heap.arena.address(offset),
          size: header.size,
          prev: header.prev(),
          next: header.next(),
        }
      })
    })
  }

  /// Every block of the arena in address order.
  pub fn blocks(&self) -> impl Iterator<Item = BlockInfo> + '_ {
    self.heap.iter().flat_map(|heap| Blocks {
      arena: &heap.arena,
      offset: 0,
      free: heap.free.iter(&heap.arena).peekable(),
    })
  }

  pub fn stats(&self) -> HeapStats {
    let mut stats = HeapStats {
      capacity: self.capacity(),
      ..HeapStats::default()
    };

    for block in self.blocks() {
      match block.state {
        BlockState::Free => {
          stats.free_blocks += 1;
          stats.free_bytes += block.size;
          stats.largest_free = stats.largest_free.max(block.size);
        }
        BlockState::Allocated => {
          stats.allocated_blocks += 1;
          stats.allocated_bytes += block.size;
        }
      }
    }

    stats
  }

  /// Logs every free block at `debug` level. Compiled out of release builds.
  pub fn dump_free_list(&self) {
    #[cfg(debug_assertions)]
    {
      for block in self.free_blocks() {
        log::debug!("\t{}", block);
      }
      let count = self.heap.as_ref().map_or(0, |heap| heap.free.len());
      log::debug!("\t{count} free block(s)");
    }
  }

  /// Verifies the structural invariants of the heap: blocks tile the arena
  /// exactly, every block is aligned, and the free list is strictly ascending,
  /// back-linked, and free of contiguous neighbors.
  ///
  /// Reports the first violation found. An uninitialized heap is trivially
  /// consistent.
  pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
    let Some(heap) = self.heap.as_ref() else {
      return Ok(());
    };
    let arena = &heap.arena;
    let capacity = arena.capacity();

    let mut starts = Vec::new();
    let mut offset = 0;

    while offset < capacity {
      if !is_aligned(offset) {
        return Err(InvariantViolation::Misaligned { offset });
      }
      if offset + HEADER_SIZE > capacity {
        return Err(InvariantViolation::Tiling {
          reached: offset,
          capacity,
        });
      }

      let header = arena.header(offset);
      if !is_aligned(header.size) {
        return Err(InvariantViolation::Misaligned { offset });
      }

      starts.push(offset);
      offset = offset.saturating_add(HEADER_SIZE).saturating_add(header.size);
    }

    if offset != capacity {
      return Err(InvariantViolation::Tiling {
        reached: offset,
        capacity,
      });
    }

    let mut prev: Option<usize> = None;
    let mut current = heap.free.head();

    while let Some(offset) = current {
      if !is_aligned(offset) {
        return Err(InvariantViolation::Misaligned { offset });
      }
      if offset + HEADER_SIZE > capacity {
        return Err(InvariantViolation::OutOfBounds { offset });
      }

      if let Some(left) = prev {
        if left >= offset {
          return Err(InvariantViolation::Unordered {
            left,
            right: offset,
          });
        }

        let left_end = arena.end_of(left);
        if left_end > offset {
          return Err(InvariantViolation::Overlapping {
            left,
            right: offset,
          });
        }
        if left_end == offset {
          return Err(InvariantViolation::Uncoalesced {
            left,
            right: offset,
          });
        }
      }

      if starts.binary_search(&offset).is_err() {
        return Err(InvariantViolation::Detached { offset });
      }

      let header = arena.header(offset);
      if header.prev() != prev {
        return Err(InvariantViolation::BrokenBackLink { offset });
      }

      prev = Some(offset);
      current = header.next();
    }

    Ok(())
  }
}
