//! One-time acquisition of the arena backing memory.

use std::ptr::{self, NonNull};

use log::{debug, warn};

use crate::{align::ALIGNMENT, error::AllocError};

/// Source of the single contiguous region an allocator manages.
///
/// `reserve` is called at most once per successful allocator initialization.
///
/// # Safety
///
/// A successful `reserve(size)` must return a pointer to at least `size`
/// readable and writable bytes, aligned to [`ALIGNMENT`], that nothing else
/// accesses and that stay valid for as long as the provider lives, moves of
/// the provider included. The allocator writes block headers through it
/// without further checks.
pub unsafe trait RegionProvider {
  fn reserve(
    &mut self,
    size: usize,
  ) -> Result<NonNull<u8>, AllocError>;
}

/// Reserves the arena with a private anonymous `mmap`.
///
/// The mapping is never released: the heap lives until process exit.
#[derive(Debug, Default)]
pub struct MmapRegion;

// SAFETY: a successful anonymous mapping is page aligned, read/write, private
// to this provider and never unmapped.
unsafe impl RegionProvider for MmapRegion {
  fn reserve(
    &mut self,
    size: usize,
  ) -> Result<NonNull<u8>, AllocError> {
    let address = unsafe {
      libc::mmap(
        ptr::null_mut(),
        size,
        libc::PROT_READ | libc::PROT_WRITE,
        libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
        -1,
        0,
      )
    };

    if address == libc::MAP_FAILED {
      warn!("mmap of {size} bytes failed");
      return Err(AllocError::RegionDenied);
    }

    debug!("mapped {size} bytes at {address:?}");

    NonNull::new(address as *mut u8).ok_or(AllocError::RegionDenied)
  }
}

/// Reserves the arena from a buffer owned by the provider.
///
/// Useful where `mmap` is unavailable and for tests. `limit` caps what the
/// provider is willing to hand out, which makes a denied reservation easy to
/// reproduce. The buffer is held as a raw pointer so moving the provider
/// leaves pointers into it valid; it is freed on drop.
#[derive(Debug)]
pub struct BufferRegion {
  limit: usize,
  buffer: Option<NonNull<[usize]>>,
}

impl BufferRegion {
  pub fn new(limit: usize) -> Self {
    Self { limit, buffer: None }
  }
}

// SAFETY: the buffer is word aligned, zeroed, at least `size` bytes, only
// reachable through the returned pointer, and lives until the provider drops.
unsafe impl RegionProvider for BufferRegion {
  fn reserve(
    &mut self,
    size: usize,
  ) -> Result<NonNull<u8>, AllocError> {
    let reserved = self.buffer.is_some();
    if reserved || size > self.limit {
      let limit = self.limit;
      warn!("buffer region refused {size} bytes (limit {limit}, reserved {reserved})");
      return Err(AllocError::RegionDenied);
    }

    let words = size.div_ceil(ALIGNMENT);
    let mut buffer = Vec::new();

    if buffer.try_reserve_exact(words).is_err() {
      warn!("buffer region could not allocate {size} bytes");
      return Err(AllocError::RegionDenied);
    }
    buffer.resize(words, 0usize);

    let buffer = NonNull::from(Box::leak(buffer.into_boxed_slice()));
    self.buffer = Some(buffer);

    Ok(buffer.cast::<u8>())
  }
}

impl Drop for BufferRegion {
  fn drop(&mut self) {
    if let Some(buffer) = self.buffer.take() {
      drop(unsafe { Box::from_raw(buffer.as_ptr()) });
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::align::is_aligned;

  #[test]
  fn test_mmap_region_is_writable() {
    let mut region = MmapRegion;
    let base = region.reserve(4096).unwrap();

    assert!(is_aligned(base.as_ptr() as usize));

    unsafe {
      base.as_ptr().write(0xAB);
      base.as_ptr().add(4095).write(0xCD);

      assert_eq!(base.as_ptr().read(), 0xAB);
      assert_eq!(base.as_ptr().add(4095).read(), 0xCD);
    }
  }

  #[test]
  fn test_buffer_region_reserves_once() {
    let mut region = BufferRegion::new(1024);

    let base = region.reserve(1024).unwrap();
    assert!(is_aligned(base.as_ptr() as usize));

    assert_eq!(region.reserve(8), Err(AllocError::RegionDenied));
  }

  #[test]
  #[cfg(target_pointer_width = "64")]
  fn test_buffer_region_reports_failed_allocation() {
    let mut region = BufferRegion::new(usize::MAX);

    assert_eq!(region.reserve(1 << 60), Err(AllocError::RegionDenied));
    assert!(region.reserve(64).is_ok());
  }

  #[test]
  fn test_buffer_region_survives_move() {
    let mut region = BufferRegion::new(64);
    let base = region.reserve(64).unwrap();

    unsafe { base.as_ptr().write(0x5A) };

    let moved = vec![region];
    assert_eq!(unsafe { base.as_ptr().read() }, 0x5A);
    drop(moved);
  }

  #[test]
  fn test_buffer_region_respects_limit() {
    let mut region = BufferRegion::new(512);

    assert_eq!(region.reserve(1024), Err(AllocError::RegionDenied));
    assert!(region.reserve(512).is_ok());
  }
}
