//! Layout utilities.

use std::alloc::Layout;

/// Align a size or address up to the given alignment.
///
/// `align` must be a power of two.
#[inline]
pub const fn align_up(value: usize, align: usize) -> usize {
    (value + align - 1) & !(align - 1)
}

/// Offset from `base` that must be skipped so that `base + head + offset`
/// is aligned to `align`.
#[inline]
pub fn padding_at(base: *const u8, head: usize, align: usize) -> usize {
    let addr = base as usize + head;
    align_up(addr, align) - addr
}

/// Layout actually requested from a backing store.
///
/// Zero-sized requests are widened to one byte so a successful allocation
/// always hands out real storage.
#[inline]
pub fn storage_layout(layout: Layout) -> Layout {
    if layout.size() == 0 {
        // SAFETY: align came from a valid layout and 1 never overflows it.
        unsafe { Layout::from_size_align_unchecked(1, layout.align()) }
    } else {
        layout
    }
}
