//! Address-ordered, doubly linked list over the free blocks of an [`Arena`].
//!
//! The list is intrusive: its links live in the block headers, so every
//! splice takes the arena it operates on. Each splice is total on its stated
//! precondition and leaves the list sorted.

use log::trace;

use crate::arena::Arena;

#[derive(Debug, Default)]
pub struct FreeList {
  head: Option<usize>,
  len: usize,
}

impl FreeList {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn head(&self) -> Option<usize> {
    self.head
  }

  pub fn len(&self) -> usize {
    self.len
  }

  pub fn is_empty(&self) -> bool {
    self.head.is_none()
  }

  /// Free block offsets in ascending address order.
  pub fn iter<'a>(
    &self,
    arena: &'a Arena,
  ) -> Iter<'a> {
    Iter {
      arena,
      current: self.head,
    }
  }

  /// Links the detached block `offset` right after `prev`, or at the head
  /// when `prev` is `None`.
  ///
  /// Caller guarantees `prev < offset < successor(prev)`.
  pub fn insert_after(
    &mut self,
    arena: &mut Arena,
    prev: Option<usize>,
    offset: usize,
  ) {
    let next = match prev {
      Some(prev) => arena.header(prev).next(),
      None => self.head,
    };

    debug_assert!(prev.is_none_or(|prev| prev < offset));
    debug_assert!(next.is_none_or(|next| offset < next));

    arena.update(offset, |header| {
      header.set_prev(prev);
      header.set_next(next);
    });

    match prev {
      Some(prev) => arena.update(prev, |header| header.set_next(Some(offset))),
      None => self.head = Some(offset),
    }

    if let Some(next) = next {
      arena.update(next, |header| header.set_prev(Some(offset)));
    }

    self.len += 1;
  }

  /// Finds the free block that should precede `offset`: the last one with a
  /// lower address, or `None` if `offset` belongs at the head.
  pub fn predecessor_of(
    &self,
    arena: &Arena,
    offset: usize,
  ) -> Option<usize> {
    let mut prev = None;

    for candidate in self.iter(arena) {
      trace!("insert scan at {:#x} for {:#x}", candidate, offset);

      assert_ne!(candidate, offset, "block {:#x} is already free", offset);

      if candidate > offset {
        break;
      }

      prev = Some(candidate);
    }

    prev
  }

  /// Links `offset` at its address-sorted position and returns its new
  /// predecessor.
  pub fn insert_sorted(
    &mut self,
    arena: &mut Arena,
    offset: usize,
  ) -> Option<usize> {
    let prev = self.predecessor_of(arena, offset);
    self.insert_after(arena, prev, offset);
    prev
  }

  /// Unlinks `offset` from the list and clears its links.
  pub fn remove(
    &mut self,
    arena: &mut Arena,
    offset: usize,
  ) {
    let header = arena.header(offset);
    let (prev, next) = (header.prev(), header.next());

    match prev {
      Some(prev) => arena.update(prev, |header| header.set_next(next)),
      None => {
        debug_assert_eq!(self.head, Some(offset));
        self.head = next;
      }
    }

    if let Some(next) = next {
      arena.update(next, |header| header.set_prev(prev));
    }

    arena.update(offset, |header| header.unlink());
    self.len -= 1;
  }

  /// Puts the detached block `new` in the list position held by `old`, and
  /// clears `old`'s links.
  ///
  /// Caller guarantees `new` sorts between `old`'s neighbors.
  pub fn replace(
    &mut self,
    arena: &mut Arena,
    old: usize,
    new: usize,
  ) {
    let header = arena.header(old);
    let (prev, next) = (header.prev(), header.next());

    debug_assert!(prev.is_none_or(|prev| prev < new));
    debug_assert!(next.is_none_or(|next| new < next));

    arena.update(new, |header| {
      header.set_prev(prev);
      header.set_next(next);
    });

    match prev {
      Some(prev) => arena.update(prev, |header| header.set_next(Some(new))),
      None => self.head = Some(new),
    }

    if let Some(next) = next {
      arena.update(next, |header| header.set_prev(Some(new)));
    }

    arena.update(old, |header| header.unlink());
  }

  /// Absorbs the list successor of `left` into `left`: its span is added to
  /// `left`'s size and its header leaves the list.
  ///
  /// Returns the offset of the retired header.
  pub fn merge_with_next(
    &mut self,
    arena: &mut Arena,
    left: usize,
  ) -> usize {
    let left_header = arena.header(left);
    let right = left_header
      .next()
      .unwrap_or_else(|| panic!("free block {:#x} has no successor to merge", left));
    let right_header = arena.header(right);
    let after = right_header.next();

    arena.update(left, |header| {
      header.size += right_header.span();
      header.set_next(after);
    });

    if let Some(after) = after {
      arena.update(after, |header| header.set_prev(Some(left)));
    }

    arena.update(right, |header| header.unlink());
    self.len -= 1;

    right
  }
}

pub struct Iter<'a> {
  arena: &'a Arena,
  current: Option<usize>,
}

impl Iterator for Iter<'_> {
  type Item = usize;

  fn next(&mut self) -> Option<usize> {
    let current = self.current?;
    self.current = self.arena.header(current).next();
    Some(current)
  }
}
