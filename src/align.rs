use std::mem;

/// Alignment of every block address and payload size: one machine word.
pub const ALIGNMENT: usize = mem::size_of::<usize>();

/// Rounds `value` up to the next multiple of `align`, which must be a power of two.
///
/// # Examples
///
/// ```rust
/// use flalloc::align_to;
///
/// assert_eq!(align_to!(13, 16), 16);
/// assert_eq!(align_to!(32, 16), 32);
/// ```
#[macro_export]
macro_rules! align_to {
  ($value:expr, $align:expr) => {
    ($value + $align - 1) & !($align - 1)
  };
}

/// Calculates the machine word alignment for the given size.
///
/// # Examples
///
/// ```rust
/// use std::mem;
/// use flalloc::align;
///
/// match mem::size_of::<usize>() {
///     8 => assert_eq!(align!(13), 16), // 64 bit machine.
///     4 => assert_eq!(align!(11), 12), // 32 bit machine.
///     _ => {},
/// };
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    $crate::align_to!($value, $crate::align::ALIGNMENT)
  };
}

/// Whether `value` already sits on an [`ALIGNMENT`] boundary.
#[inline]
pub const fn is_aligned(value: usize) -> bool {
  value & (ALIGNMENT - 1) == 0
}
