use std::mem;

use crate::align;

/// Link value meaning "no neighbor". Never a valid offset: the arena cannot
/// be `usize::MAX` bytes long.
pub const NIL: usize = usize::MAX;

/// Bytes taken by a [`Header`] at the start of every block, aligned.
pub const HEADER_SIZE: usize = align!(mem::size_of::<Header>());

/// Metadata at the start of every block, free or allocated.
///
/// Links are byte offsets from the arena base rather than addresses. They
/// are only meaningful while the block is free; allocated blocks carry
/// [`NIL`] in both.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Header {
  /// Usable payload bytes, excluding the header itself.
  pub size: usize,
  pub next: usize,
  pub prev: usize,
}

impl Header {
  pub fn new(
    size: usize,
    next: Option<usize>,
    prev: Option<usize>,
  ) -> Self {
    Self {
      size,
      next: next.unwrap_or(NIL),
      prev: prev.unwrap_or(NIL),
    }
  }

  /// A header for a block that is not on the free list.
  pub fn detached(size: usize) -> Self {
    Self::new(size, None, None)
  }

  pub fn next(&self) -> Option<usize> {
    link(self.next)
  }

  pub fn prev(&self) -> Option<usize> {
    link(self.prev)
  }

  pub fn set_next(
    &mut self,
    next: Option<usize>,
  ) {
    self.next = next.unwrap_or(NIL);
  }

  pub fn set_prev(
    &mut self,
    prev: Option<usize>,
  ) {
    self.prev = prev.unwrap_or(NIL);
  }

  /// Clears both links, as required for an allocated block.
  pub fn unlink(&mut self) {
    self.next = NIL;
    self.prev = NIL;
  }

  /// Bytes spanned by the whole block, header included.
  pub fn span(&self) -> usize {
    HEADER_SIZE + self.size
  }
}

fn link(raw: usize) -> Option<usize> {
  if raw == NIL { None } else { Some(raw) }
}
