use std::ptr::NonNull;

use flalloc::{AllocError, BufferRegion, FreeListAllocator, HEADER_SIZE, HeapConfig, align};
use rand::{Rng, SeedableRng, rngs::StdRng};
use test_log::test;

fn allocator(capacity: usize) -> FreeListAllocator<BufferRegion> {
  FreeListAllocator::with_provider(
    HeapConfig::with_max_heap_size(capacity),
    BufferRegion::new(capacity),
  )
}

fn free_sizes(allocator: &FreeListAllocator<BufferRegion>) -> Vec<usize> {
  allocator.free_blocks().map(|block| block.size).collect()
}

fn addr(ptr: NonNull<u8>) -> usize {
  ptr.as_ptr() as usize
}

#[test]
fn two_allocations_coalesce_back_to_full_arena() {
  let mut allocator = allocator(1024);

  let p1 = allocator.allocate(100).unwrap();
  let p2 = allocator.allocate(200).unwrap();

  let base = allocator.free_blocks().next().unwrap().address - 2 * HEADER_SIZE - 104 - 200;
  assert_eq!(addr(p1), base + HEADER_SIZE);
  assert_eq!(addr(p2), addr(p1) + align!(100) + HEADER_SIZE);

  unsafe { allocator.deallocate(p1) };
  allocator.check_invariants().unwrap();
  assert_eq!(free_sizes(&allocator).len(), 2);

  unsafe { allocator.deallocate(p2) };
  allocator.check_invariants().unwrap();
  assert_eq!(free_sizes(&allocator), vec![1024 - HEADER_SIZE]);
}

#[test]
fn split_halves_coalesce_in_either_order() {
  for reverse in [false, true] {
    let mut allocator = allocator(1024);

    let a = allocator.allocate(64).unwrap();
    let b = allocator.allocate(64).unwrap();
    let _guard = allocator.allocate(16).unwrap();

    let (first, second) = if reverse { (b, a) } else { (a, b) };
    unsafe {
      allocator.deallocate(first);
      allocator.deallocate(second);
    }

    allocator.check_invariants().unwrap();
    let sizes = free_sizes(&allocator);
    assert_eq!(sizes[0], 64 + HEADER_SIZE + 64);
    assert_eq!(sizes.len(), 2);
  }
}

#[test]
#[should_panic(expected = "zero-byte request")]
fn zero_byte_allocation_is_fatal() {
  let mut allocator = allocator(1024);

  let _ = allocator.allocate(0);
}

#[test]
fn exhaustion_reports_out_of_memory_and_recovers() {
  let mut allocator = allocator(1024);
  let mut live = Vec::new();

  let error = loop {
    match allocator.allocate(40) {
      Ok(ptr) => live.push(ptr),
      Err(error) => break error,
    }
  };

  assert_eq!(error, AllocError::OutOfMemory);
  assert!(!live.is_empty());
  allocator.check_invariants().unwrap();

  unsafe { allocator.deallocate(live.pop().unwrap()) };
  assert!(allocator.allocate(8).is_ok());
  allocator.check_invariants().unwrap();
}

#[test]
fn freed_memory_is_reused() {
  let mut allocator = allocator(1024);

  let first = allocator.allocate(48).unwrap();
  let _pinned = allocator.allocate(8).unwrap();
  unsafe { allocator.deallocate(first) };

  assert_eq!(allocator.allocate(48).unwrap(), first);
}

#[test]
fn random_workload_preserves_invariants() {
  const CAPACITY: usize = 16 * 1024;

  let mut rng = StdRng::seed_from_u64(0x5eed);
  let mut allocator = allocator(CAPACITY);
  let mut live: Vec<(NonNull<u8>, usize, u8)> = Vec::new();

  for step in 0..2_000 {
    if live.is_empty() || rng.gen_bool(0.6) {
      let size = rng.gen_range(1..512);
      match allocator.allocate(size) {
        Ok(ptr) => {
          let tag = step as u8;
          unsafe { ptr.as_ptr().write_bytes(tag, size) };
          live.push((ptr, size, tag));
        }
        Err(error) => assert_eq!(error, AllocError::OutOfMemory),
      }
    } else {
      let (ptr, size, tag) = live.swap_remove(rng.gen_range(0..live.len()));
      let bytes = unsafe { std::slice::from_raw_parts(ptr.as_ptr(), size) };
      assert!(bytes.iter().all(|&byte| byte == tag), "payload clobbered");
      unsafe { allocator.deallocate(ptr) };
    }

    allocator.check_invariants().unwrap();

    let mut ranges: Vec<_> = live
      .iter()
      .map(|&(ptr, size, _)| (addr(ptr), addr(ptr) + size))
      .collect();
    ranges.sort_unstable();
    assert!(ranges.windows(2).all(|pair| pair[0].1 <= pair[1].0));

    let stats = allocator.stats();
    assert_eq!(stats.allocated_blocks, live.len());
    let used = stats.allocated_bytes + stats.allocated_blocks * HEADER_SIZE;
    assert!(used <= CAPACITY);
    assert_eq!(
      stats.free_bytes + stats.allocated_bytes + stats.header_bytes(),
      CAPACITY
    );
  }

  for (ptr, _, _) in live.drain(..) {
    unsafe { allocator.deallocate(ptr) };
  }

  allocator.check_invariants().unwrap();
  assert_eq!(free_sizes(&allocator), vec![CAPACITY - HEADER_SIZE]);
  assert_eq!(allocator.stats().allocated_blocks, 0);
}
