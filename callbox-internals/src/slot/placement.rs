//! The static inline-vs-indirect decision.

use core::mem::{align_of, size_of};

use crate::alloc::AllocStrategy;

/// Number of machine words available for inline storage.
pub const INLINE_WORDS: usize = 3;

/// Number of bytes available for inline storage.
pub const INLINE_SIZE: usize = INLINE_WORDS * size_of::<usize>();

/// Largest alignment an inline callable may require.
pub const INLINE_ALIGN: usize = align_of::<usize>();

/// Where a stored callable lives.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub enum Placement {
    /// The callable's bytes are stored directly in the slot.
    Inline,
    /// The callable lives in a separately allocated block owned by the slot.
    Indirect,
}

impl Placement {
    /// Returns the placement used for callables of type `F` stored with the
    /// allocation strategy `A`.
    ///
    /// A type is stored inline when its alignment is at most
    /// [`INLINE_ALIGN`], and it is either zero-sized or both fits in
    /// [`INLINE_SIZE`] bytes and `A` allows inline placement.
    ///
    /// # Examples
    ///
    /// ```
    /// use callbox_internals::{Global, Placement};
    ///
    /// assert_eq!(Placement::of::<fn(u8) -> u8, Global>(), Placement::Inline);
    /// assert_eq!(Placement::of::<[u64; 16], Global>(), Placement::Indirect);
    /// ```
    #[must_use]
    pub const fn of<F, A: AllocStrategy>() -> Self {
        let size = size_of::<F>();
        let fits = size == 0 || (A::ALLOW_INLINE && size <= INLINE_SIZE);

        if fits && align_of::<F>() <= INLINE_ALIGN {
            Placement::Inline
        } else {
            Placement::Indirect
        }
    }

    /// Returns `true` for [`Placement::Inline`].
    #[inline]
    #[must_use]
    pub const fn is_inline(self) -> bool {
        matches!(self, Placement::Inline)
    }
}

#[cfg(test)]
mod tests {
    use core::{alloc::Layout, ptr::NonNull};

    use super::*;
    use crate::alloc::{AllocError, Global};

    #[derive(Clone, Copy)]
    struct NoInline;

    impl AllocStrategy for NoInline {
        const ALLOW_INLINE: bool = false;

        fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
            Global.allocate(layout)
        }

        unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
            // SAFETY: Forwarded from the caller.
            unsafe { Global.deallocate(ptr, layout) }
        }
    }

    #[test]
    fn test_small_types_are_inline() {
        assert_eq!(Placement::of::<u8, Global>(), Placement::Inline);
        assert_eq!(Placement::of::<usize, Global>(), Placement::Inline);
        assert_eq!(Placement::of::<[usize; INLINE_WORDS], Global>(), Placement::Inline);
        assert_eq!(Placement::of::<fn(), Global>(), Placement::Inline);
    }

    #[test]
    fn test_large_types_are_indirect() {
        assert_eq!(
            Placement::of::<[usize; INLINE_WORDS + 1], Global>(),
            Placement::Indirect
        );
        assert_eq!(Placement::of::<[u8; INLINE_SIZE + 1], Global>(), Placement::Indirect);
    }

    #[test]
    fn test_over_aligned_types_are_indirect() {
        #[repr(align(32))]
        struct Aligned(#[allow(dead_code)] u8);

        #[repr(align(64))]
        struct AlignedZst;

        assert_eq!(Placement::of::<Aligned, Global>(), Placement::Indirect);
        assert_eq!(Placement::of::<AlignedZst, Global>(), Placement::Indirect);
    }

    #[test]
    fn test_strategy_can_disable_inline() {
        assert_eq!(Placement::of::<u8, NoInline>(), Placement::Indirect);
        assert_eq!(Placement::of::<(), NoInline>(), Placement::Inline);
        assert!(!Placement::of::<u8, NoInline>().is_inline());
    }
}
