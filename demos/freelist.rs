use std::ptr::NonNull;

use flalloc::{FreeListAllocator, HeapConfig};

/// Prints every free block, lowest address first.
fn print_free_list(
  label: &str,
  allocator: &FreeListAllocator,
) {
  println!("[{}] free list:", label);
  for block in allocator.free_blocks() {
    println!("    {}", block);
  }

  let stats = allocator.stats();
  println!(
    "    {} allocated block(s) holding {} bytes, {} free bytes in {} block(s)",
    stats.allocated_blocks, stats.allocated_bytes, stats.free_bytes, stats.free_blocks
  );
}

fn report(
  label: &str,
  requested: usize,
  ptr: NonNull<u8>,
) {
  println!("\n[{}] Allocated {} bytes at {:?}", label, requested, ptr);
}

fn main() {
  // RUST_LOG=debug shows the allocator's own split/merge decisions.
  env_logger::init();

  // A small 1 KiB arena keeps the listings short.
  let mut allocator = FreeListAllocator::new(HeapConfig::with_max_heap_size(1024));

  // --------------------------------------------------------------------
  // 1) The first allocation reserves the arena and splits its only block.
  // --------------------------------------------------------------------
  let first = allocator.allocate(100).unwrap();
  report("1", 100, first);
  print_free_list("1", &allocator);

  // --------------------------------------------------------------------
  // 2) A second allocation is carved right after the first one.
  // --------------------------------------------------------------------
  let second = allocator.allocate(200).unwrap();
  report("2", 200, second);
  print_free_list("2", &allocator);

  // --------------------------------------------------------------------
  // 3) Freeing the first block leaves a hole in front of the second.
  // --------------------------------------------------------------------
  unsafe { allocator.deallocate(first) };
  println!("\n[3] Deallocated first block at {:?}", first);
  print_free_list("3", &allocator);

  // --------------------------------------------------------------------
  // 4) A small request is served from the hole (first fit).
  // --------------------------------------------------------------------
  let small = allocator.allocate(16).unwrap();
  report("4", 16, small);
  println!(
    "[4] small == first? {}",
    if small == first {
      "Yes, it reused the freed block"
    } else {
      "No, it allocated somewhere else"
    }
  );
  print_free_list("4", &allocator);

  // --------------------------------------------------------------------
  // 5) Freeing everything merges the arena back into a single block.
  // --------------------------------------------------------------------
  unsafe {
    allocator.deallocate(small);
    allocator.deallocate(second);
  }
  println!("\n[5] Deallocated everything");
  print_free_list("5", &allocator);
  allocator.dump_free_list();

  // --------------------------------------------------------------------
  // 6) Exhaust the arena, then recover by freeing one block.
  // --------------------------------------------------------------------
  let mut live = Vec::new();
  let error = loop {
    match allocator.allocate(64) {
      Ok(ptr) => live.push(ptr),
      Err(error) => break error,
    }
  };
  println!("\n[6] Arena exhausted after {} allocations: {}", live.len(), error);

  if let Some(ptr) = live.pop() {
    unsafe { allocator.deallocate(ptr) };
  }
  let retry = allocator.allocate(8);
  println!("[6] After one free, allocate(8) -> {:?}", retry);
  print_free_list("6", &allocator);

  match allocator.check_invariants() {
    Ok(()) => println!("\n[7] Heap invariants hold."),
    Err(violation) => println!("\n[7] Heap invariant broken: {}", violation),
  }
}
