//! Allocation strategies for indirect slot storage.
//!
//! A callable that does not fit inline is moved into a block obtained from
//! an [`AllocStrategy`]. The strategy is part of the wrapper's static
//! configuration and is stored by value next to the slot, so the same
//! instance that allocated a block is the one that releases it.

use core::{alloc::Layout, ptr::NonNull};

/// Source of memory for callables stored out of line.
///
/// Implementations must behave like a conventional allocator: a block
/// returned by [`allocate`](AllocStrategy::allocate) stays valid until it is
/// passed to [`deallocate`](AllocStrategy::deallocate) on the same instance or
/// on a clone of it.
///
/// # Examples
///
/// ```
/// use core::{alloc::Layout, ptr::NonNull};
///
/// use callbox_internals::alloc::{AllocError, AllocStrategy, Global};
///
/// /// Keeps every target out of line.
/// #[derive(Clone, Copy, Default)]
/// struct AlwaysHeap;
///
/// impl AllocStrategy for AlwaysHeap {
///     const ALLOW_INLINE: bool = false;
///
///     fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
///         Global.allocate(layout)
///     }
///
///     unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
///         // SAFETY: forwarded from our own caller, and `allocate` above
///         // always hands out blocks from `Global`.
///         unsafe { Global.deallocate(ptr, layout) }
///     }
/// }
/// ```
pub trait AllocStrategy: Clone + 'static {
    /// Whether small targets may be stored inline inside the wrapper.
    ///
    /// When `false`, every target with a non-zero size is stored in a block
    /// obtained from [`allocate`](AllocStrategy::allocate).
    const ALLOW_INLINE: bool = true;

    /// Allocates a block of memory fitting `layout`.
    ///
    /// A zero-sized `layout` must still succeed and return a well-aligned
    /// pointer.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] if the memory could not be obtained.
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError>;

    /// Releases a block of memory.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `ptr` was returned by [`allocate`](AllocStrategy::allocate) on this
    ///    instance or a clone of it.
    /// 2. `layout` is the layout that was passed to that call.
    /// 3. The block has not already been released.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

/// The global allocator, used by default.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct Global;

impl AllocStrategy for Global {
    #[inline]
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        if layout.size() == 0 {
            return Ok(dangling(layout));
        }

        // SAFETY: The layout has a non-zero size, checked above.
        let ptr = unsafe { alloc_crate::alloc::alloc(layout) };
        NonNull::new(ptr).ok_or(AllocError::new(layout))
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() == 0 {
            return;
        }

        // SAFETY:
        // 1. Blocks with a non-zero size only come from `alloc::alloc::alloc`
        //    above, with the same layout (guaranteed by the caller).
        // 2. The block is released only once (guaranteed by the caller).
        unsafe {
            alloc_crate::alloc::dealloc(ptr.as_ptr(), layout);
        }
    }
}

/// Returns a non-null pointer aligned for `layout`, without provenance.
fn dangling(layout: Layout) -> NonNull<u8> {
    NonNull::new(core::ptr::without_provenance_mut::<u8>(layout.align()))
        .unwrap_or(NonNull::dangling())
}

/// Error returned when an [`AllocStrategy`] could not provide memory for a
/// callable.
///
/// Carries the layout of the failed request, so that infallible callers can
/// forward it to [`handle_alloc_error`].
///
/// [`handle_alloc_error`]: alloc_crate::alloc::handle_alloc_error
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct AllocError {
    /// Layout of the request that failed
    layout: Layout,
}

impl AllocError {
    /// Creates an error for a failed request of `layout`.
    #[inline]
    pub const fn new(layout: Layout) -> Self {
        Self { layout }
    }

    /// Returns the layout of the request that failed.
    #[inline]
    pub const fn layout(&self) -> Layout {
        self.layout
    }
}

impl core::fmt::Display for AllocError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "memory allocation of {} bytes failed",
            self.layout.size()
        )
    }
}

impl core::error::Error for AllocError {}
