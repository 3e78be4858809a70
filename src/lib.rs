//! # flalloc - A First-Fit Free-List Allocator
//!
//! This crate provides a **free-list allocator** that hands out memory from a
//! single fixed-size arena reserved once from the operating system with
//! `mmap`.
//!
//! ## Overview
//!
//! Every block in the arena, free or allocated, starts with a header. Free
//! blocks are additionally linked into a list sorted by address:
//!
//! ```text
//!   Arena Layout:
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                              ARENA                                   │
//!   │                                                                      │
//!   │   ┌───┬──────┬───┬─────────┬───┬────┬───┬─────────────────────────┐  │
//!   │   │ H │ used │ H │  free   │ H │used│ H │          free           │  │
//!   │   └───┴──────┴───┴─────────┴───┴────┴───┴─────────────────────────┘  │
//!   │                ▲                      ▲                              │
//!   │                │      next ───────►   │                              │
//!   │                └──────────── ◄─── prev┘                              │
//!   │                                                                      │
//!   └──────────────────────────────────────────────────────────────────────┘
//!
//!   The arena never grows. The free list only ever links free blocks.
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   flalloc
//!   ├── align      - Alignment macros (align!, align_to!)
//!   ├── config     - HeapConfig (maximum heap size)
//!   ├── error      - AllocError, InvariantViolation
//!   ├── block      - Block header (internal)
//!   ├── region     - RegionProvider, MmapRegion, BufferRegion
//!   ├── arena      - Bounds-checked header access (internal)
//!   ├── free_list  - Address-ordered free list (internal)
//!   ├── coalesce   - Neighbor merging (internal)
//!   ├── allocator  - FreeListAllocator
//!   └── inspect    - Free-list dumps, block walks, stats, self-check
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use flalloc::{FreeListAllocator, HeapConfig};
//!
//! let mut allocator = FreeListAllocator::new(HeapConfig::with_max_heap_size(4096));
//!
//! let ptr = allocator.allocate(8).unwrap().cast::<u64>();
//!
//! unsafe {
//!     // Use the memory
//!     ptr.as_ptr().write(42);
//!     assert_eq!(ptr.as_ptr().read(), 42);
//!
//!     // Free the memory
//!     allocator.deallocate(ptr.cast());
//! }
//! ```
//!
//! ## How It Works
//!
//! Allocation scans the free list in address order and takes the first block
//! large enough (first fit). If what is left over can hold another header, the
//! block is split:
//!
//! ```text
//!   Splitting a free block for a request of N bytes:
//!
//!   before  ┌────────┬─────────────────────────────────────────────┐
//!           │ H size │                    free                     │
//!           └────────┴─────────────────────────────────────────────┘
//!
//!   after   ┌────────┬───────────┬────────┬────────────────────────┐
//!           │ H  N   │ user data │ H rest │          free          │
//!           └────────┴───────────┴────────┴────────────────────────┘
//!                    ▲
//!                    └── Pointer returned to user
//! ```
//!
//! Deallocation inserts the block back at its sorted position and merges it
//! with a free neighbor on either side when they touch:
//!
//! ```text
//!   Coalescing after freeing B:
//!
//!   ┌───┬───────┬───┬───────┬───┬───────┐        ┌───┬─────────────────────────┐
//!   │ H │ A free│ H │ B     │ H │ C free│  ───►  │ H │        A+B+C free       │
//!   └───┴───────┴───┴───────┴───┴───────┘        └───┴─────────────────────────┘
//! ```
//!
//! ## Limitations
//!
//! - **Single-threaded only**: No synchronization primitives
//! - **Fixed capacity**: The arena is never grown or returned to the OS
//! - **Unchecked frees**: Double frees are only partially detected
//! - **Unix-only mmap**: `MmapRegion` requires `libc`; `BufferRegion` works anywhere
//!
//! ## Logging
//!
//! Decisions are reported through the `log` facade: `debug` for splits,
//! merges and initialization, `warn` for exhaustion, `trace` for each
//! first-fit probe.

pub mod align;
mod allocator;
mod arena;
mod block;
mod coalesce;
pub mod config;
pub mod error;
mod free_list;
mod inspect;
pub mod region;

pub use allocator::FreeListAllocator;
pub use block::HEADER_SIZE;
pub use config::{DEFAULT_MAX_HEAP_SIZE, HeapConfig};
pub use error::{AllocError, InvariantViolation};
pub use inspect::{BlockInfo, BlockState, FreeBlockInfo, HeapStats};
pub use region::{BufferRegion, MmapRegion, RegionProvider};
