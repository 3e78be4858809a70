//! Merging of address-contiguous free blocks.

use log::debug;

use crate::{arena::Arena, free_list::FreeList};

/// Whether `right` starts exactly where `left` ends.
pub fn contiguous(
  arena: &Arena,
  left: usize,
  right: usize,
) -> bool {
  arena.end_of(left) == right
}

/// Fuses `right` into `left`. Both must be free, list neighbors, and
/// contiguous. `left` keeps its position; `right`'s header is retired.
pub fn merge(
  list: &mut FreeList,
  arena: &mut Arena,
  left: usize,
  right: usize,
) {
  assert_eq!(
    arena.header(left).next(),
    Some(right),
    "{left:#x} and {right:#x} are not free-list neighbors"
  );
  assert!(
    contiguous(arena, left, right),
    "{left:#x} and {right:#x} are not contiguous"
  );

  list.merge_with_next(arena, left);

  let size = arena.header(left).size;
  debug!("merged {right:#x} into {left:#x}, size now {size}");
}

/// Merges the freshly inserted block at `offset` with its contiguous list
/// neighbors: first into its left neighbor, then the result with its right
/// neighbor. Returns the offset of the surviving block.
pub fn coalesce(
  list: &mut FreeList,
  arena: &mut Arena,
  offset: usize,
) -> usize {
  let mut block = offset;

  if let Some(left) = arena.header(block).prev() {
    if contiguous(arena, left, block) {
      merge(list, arena, left, block);
      block = left;
    }
  }

  if let Some(right) = arena.header(block).next() {
    if contiguous(arena, block, right) {
      merge(list, arena, block, right);
    }
  }

  block
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    block::{HEADER_SIZE, Header},
    region::{BufferRegion, RegionProvider},
  };

  const BLOCK: usize = 32;
  const SPAN: usize = HEADER_SIZE + BLOCK;

  fn setup(count: usize) -> (BufferRegion, Arena, FreeList) {
    let capacity = count * SPAN;
    let mut region = BufferRegion::new(capacity);
    let base = region.reserve(capacity).unwrap();
    let mut arena = unsafe { Arena::new(base, capacity) };

    for i in 0..count {
      arena.write_header(i * SPAN, Header::detached(BLOCK));
    }

    (region, arena, FreeList::new())
  }

  #[test]
  fn test_coalesce_without_neighbors_is_noop() {
    let (_region, mut arena, mut list) = setup(5);
    list.insert_sorted(&mut arena, 0);
    list.insert_sorted(&mut arena, 4 * SPAN);
    list.insert_sorted(&mut arena, 2 * SPAN);

    assert_eq!(coalesce(&mut list, &mut arena, 2 * SPAN), 2 * SPAN);
    assert_eq!(list.len(), 3);
    assert_eq!(arena.header(2 * SPAN).size, BLOCK);
  }

  #[test]
  fn test_coalesce_left_only() {
    let (_region, mut arena, mut list) = setup(3);
    list.insert_sorted(&mut arena, 0);
    list.insert_sorted(&mut arena, SPAN);

    assert_eq!(coalesce(&mut list, &mut arena, SPAN), 0);
    assert_eq!(list.len(), 1);
    assert_eq!(arena.header(0).size, BLOCK + SPAN);
  }

  #[test]
  fn test_coalesce_right_only() {
    let (_region, mut arena, mut list) = setup(3);
    list.insert_sorted(&mut arena, 2 * SPAN);
    list.insert_sorted(&mut arena, SPAN);

    assert_eq!(coalesce(&mut list, &mut arena, SPAN), SPAN);
    assert_eq!(list.len(), 1);
    assert_eq!(arena.header(SPAN).size, BLOCK + SPAN);
  }

  #[test]
  fn test_coalesce_both_sides() {
    let (_region, mut arena, mut list) = setup(3);
    list.insert_sorted(&mut arena, 0);
    list.insert_sorted(&mut arena, 2 * SPAN);
    list.insert_sorted(&mut arena, SPAN);

    assert_eq!(coalesce(&mut list, &mut arena, SPAN), 0);
    assert_eq!(list.len(), 1);
    assert_eq!(arena.header(0).size, 3 * SPAN - HEADER_SIZE);
    assert_eq!(arena.header(0).next(), None);
  }

  #[test]
  #[should_panic(expected = "not contiguous")]
  fn test_merge_rejects_gap() {
    let (_region, mut arena, mut list) = setup(3);
    list.insert_sorted(&mut arena, 0);
    list.insert_sorted(&mut arena, 2 * SPAN);

    merge(&mut list, &mut arena, 0, 2 * SPAN);
  }
}
