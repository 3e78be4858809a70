//! Typed access to the headers embedded in the reserved region.
//!
//! Blocks are named by their byte offset from the arena base. Every access
//! goes through a bounds check against the arena extent, so a corrupted link
//! or foreign pointer turns into a panic instead of a wild write.

use std::ptr::NonNull;

use crate::{
  align::is_aligned,
  block::{HEADER_SIZE, Header},
};

pub struct Arena {
  base: NonNull<u8>,
  capacity: usize,
}

impl Arena {
  /// # Safety
  ///
  /// `base` must point to `capacity` readable and writable bytes, aligned to
  /// [`ALIGNMENT`](crate::align::ALIGNMENT), that stay valid and are not
  /// accessed through other paths for the lifetime of the arena.
  pub unsafe fn new(
    base: NonNull<u8>,
    capacity: usize,
  ) -> Self {
    debug_assert!(is_aligned(base.as_ptr() as usize));
    debug_assert!(capacity >= HEADER_SIZE);

    Self { base, capacity }
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  /// Absolute address of the block at `offset`.
  pub fn address(
    &self,
    offset: usize,
  ) -> usize {
    self.base.as_ptr() as usize + offset
  }

  pub fn header(
    &self,
    offset: usize,
  ) -> Header {
    self.check(offset);

    unsafe { self.base.as_ptr().add(offset).cast::<Header>().read() }
  }

  pub fn write_header(
    &mut self,
    offset: usize,
    header: Header,
  ) {
    self.check(offset);

    unsafe { self.base.as_ptr().add(offset).cast::<Header>().write(header) }
  }

  /// Reads, modifies and writes back the header at `offset`.
  pub fn update<F>(
    &mut self,
    offset: usize,
    f: F,
  ) where
    F: FnOnce(&mut Header),
  {
    let mut header = self.header(offset);
    f(&mut header);
    self.write_header(offset, header);
  }

  /// Offset one past the last payload byte of the block at `offset`.
  pub fn end_of(
    &self,
    offset: usize,
  ) -> usize {
    offset + self.header(offset).span()
  }

  /// Payload pointer handed to callers for the block at `offset`.
  pub fn payload(
    &self,
    offset: usize,
  ) -> NonNull<u8> {
    self.check(offset);

    unsafe { self.base.add(offset + HEADER_SIZE) }
  }

  /// Recovers the block offset from a payload pointer.
  ///
  /// Panics if the header would not lie inside the arena on an aligned
  /// boundary. This cannot tell a live allocation from a stale one.
  pub fn block_of(
    &self,
    payload: NonNull<u8>,
  ) -> usize {
    let address = payload.as_ptr() as usize;
    let start = self.base.as_ptr() as usize + HEADER_SIZE;

    assert!(
      address >= start && address - start + HEADER_SIZE <= self.capacity,
      "pointer {payload:?} does not belong to this arena"
    );

    let offset = address - start;
    self.check(offset);
    offset
  }

  fn check(
    &self,
    offset: usize,
  ) {
    let capacity = self.capacity;

    assert!(is_aligned(offset), "block offset {offset:#x} is not aligned");
    assert!(
      offset <= capacity - HEADER_SIZE,
      "block offset {offset:#x} lies outside the {capacity} byte arena"
    );
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::region::{BufferRegion, RegionProvider};

  fn arena(capacity: usize) -> (BufferRegion, Arena) {
    let mut region = BufferRegion::new(capacity);
    let base = region.reserve(capacity).unwrap();
    let arena = unsafe { Arena::new(base, capacity) };
    (region, arena)
  }

  #[test]
  fn test_header_round_trip() {
    let (_region, mut arena) = arena(256);

    arena.write_header(0, Header::new(64, Some(96), None));
    arena.update(0, |header| header.size = 72);

    let header = arena.header(0);
    assert_eq!(header.size, 72);
    assert_eq!(header.next(), Some(96));
    assert_eq!(arena.end_of(0), HEADER_SIZE + 72);
  }

  #[test]
  fn test_payload_and_block_of_agree() {
    let (_region, arena) = arena(256);

    let payload = arena.payload(64);
    assert_eq!(payload.as_ptr() as usize, arena.address(64) + HEADER_SIZE);
    assert_eq!(arena.block_of(payload), 64);
  }

  #[test]
  #[should_panic(expected = "does not belong to this arena")]
  fn test_block_of_rejects_foreign_pointer() {
    let (_region, arena) = arena(256);
    let mut outside = 0usize;

    arena.block_of(NonNull::from(&mut outside).cast());
  }

  #[test]
  #[should_panic(expected = "not aligned")]
  fn test_misaligned_offset_panics() {
    let (_region, arena) = arena(256);

    arena.header(3);
  }

  #[test]
  #[should_panic(expected = "outside")]
  fn test_offset_past_end_panics() {
    let (_region, arena) = arena(256);

    arena.header(256);
  }
}
