//! The raw storage cell.
//!
//! [`SlotStorage`] does not know whether it is occupied or what it holds.
//! Every operation that reads it is `unsafe` and takes the type and
//! [`Placement`] from the caller, which in practice is always the
//! [`Manager`] created together with the value.
//!
//! [`Manager`]: crate::manager::Manager

use core::{
    alloc::Layout,
    cell::UnsafeCell,
    mem::{ManuallyDrop, MaybeUninit},
    ptr::NonNull,
};

use crate::{
    alloc::{AllocError, AllocStrategy},
    slot::placement::{INLINE_WORDS, Placement},
};

/// Inline buffer of a slot.
///
/// Shared calls hand out `&F` for the stored value, and `F` may mutate
/// itself through `Cell`, `RefCell` or atomics, so the bytes live in an
/// [`UnsafeCell`].
type InlineBuffer = UnsafeCell<MaybeUninit<[usize; INLINE_WORDS]>>;

/// Storage for one erased callable.
///
/// The inline variant is the callable's bytes, the indirect variant is a
/// pointer to a block obtained from an [`AllocStrategy`]. The union is
/// `#[repr(C)]`, so both variants start at the address of the union itself.
///
/// A slot owns what it holds and is neither `Copy` nor `Clone`; duplicating
/// a slot goes through the manager's clone operation.
#[repr(C)]
pub(crate) union SlotStorage {
    /// Buffer used by [`Placement::Inline`] values
    inline: ManuallyDrop<InlineBuffer>,
    /// Owned block used by [`Placement::Indirect`] values
    indirect: NonNull<u8>,
}

impl SlotStorage {
    /// Moves `value` into a new storage cell, using the placement
    /// [`Placement::of::<F, A>()`].
    ///
    /// An indirect placement performs exactly one allocation through `alloc`.
    /// If that allocation fails, `value` is dropped and the error returned.
    #[inline]
    pub(crate) fn store<F, A: AllocStrategy>(value: F, alloc: &A) -> Result<Self, AllocError> {
        match Placement::of::<F, A>() {
            Placement::Inline => {
                let mut storage = Self {
                    inline: ManuallyDrop::new(UnsafeCell::new(MaybeUninit::uninit())),
                };
                let ptr: *mut F = Self::inline_ptr(core::ptr::from_mut(&mut storage)).cast::<F>();

                // SAFETY:
                // - The pointer is valid for writes: it points to a local union whose
                //   inline variant is at least `size_of::<F>()` bytes, as required by
                //   `Placement::Inline`.
                // - The pointer is aligned: `Placement::Inline` requires
                //   `align_of::<F>() <= align_of::<usize>()`, and the union is aligned
                //   to `usize`.
                unsafe {
                    ptr.write(value);
                }

                Ok(storage)
            }
            Placement::Indirect => {
                let ptr = alloc.allocate(Layout::new::<F>())?;

                // SAFETY: The block was just allocated for `Layout::new::<F>()`, so
                // it is valid for writes of an `F` and properly aligned.
                unsafe {
                    ptr.cast::<F>().write(value);
                }

                Ok(Self { indirect: ptr })
            }
        }
    }

    /// Returns a pointer to the inline buffer of the slot at `this`.
    ///
    /// The pointer comes from [`UnsafeCell::raw_get`], so it permits writes
    /// whenever `this` does, and also when `this` was derived from a shared
    /// reference.
    #[inline]
    fn inline_ptr(this: *const Self) -> *mut u8 {
        // `ManuallyDrop` and `UnsafeCell` are `repr(transparent)`, and the union
        // is `repr(C)`, so the buffer starts at the address of the union.
        UnsafeCell::raw_get(this.cast::<InlineBuffer>()).cast::<u8>()
    }

    /// Returns a pointer to the stored value, valid for shared access.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. This storage currently holds a value stored with `placement`.
    #[inline]
    pub(crate) unsafe fn data(&self, placement: Placement) -> NonNull<u8> {
        match placement {
            Placement::Inline => {
                let ptr = Self::inline_ptr(core::ptr::from_ref(self));

                // SAFETY: `ptr` was derived from a reference, so it is not null.
                unsafe { NonNull::new_unchecked(ptr) }
            }
            // SAFETY: The storage holds an indirect value (guaranteed by the
            // caller), so the `indirect` variant is initialized.
            Placement::Indirect => unsafe { self.indirect },
        }
    }

    /// Returns a pointer to the stored value, valid for exclusive access.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. This storage currently holds a value stored with `placement`.
    #[inline]
    pub(crate) unsafe fn data_mut(&mut self, placement: Placement) -> NonNull<u8> {
        match placement {
            Placement::Inline => {
                let ptr = Self::inline_ptr(core::ptr::from_mut(self));

                // SAFETY: `ptr` was derived from a reference, so it is not null.
                unsafe { NonNull::new_unchecked(ptr) }
            }
            // SAFETY: The storage holds an indirect value (guaranteed by the
            // caller), so the `indirect` variant is initialized.
            Placement::Indirect => unsafe { self.indirect },
        }
    }

    /// Returns a reference to the stored value.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. This storage currently holds a live value of type `F`, stored with
    ///    [`Placement::of::<F, A>()`] for the strategy `A` it was stored with.
    #[inline]
    pub(crate) unsafe fn get<F, A: AllocStrategy>(&self) -> &F {
        // SAFETY: The placement matches the stored value (guaranteed by the caller).
        let data = unsafe { self.data(Placement::of::<F, A>()) };

        // SAFETY: The pointer refers to a live, aligned `F` (guaranteed by the
        // caller), and the returned borrow is tied to `&self`.
        unsafe { data.cast::<F>().as_ref() }
    }

    /// Returns an exclusive reference to the stored value.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. This storage currently holds a live value of type `F`, stored with
    ///    [`Placement::of::<F, A>()`] for the strategy `A` it was stored with.
    #[inline]
    pub(crate) unsafe fn get_mut<F, A: AllocStrategy>(&mut self) -> &mut F {
        // SAFETY: The placement matches the stored value (guaranteed by the caller).
        let data = unsafe { self.data_mut(Placement::of::<F, A>()) };

        // SAFETY: The pointer refers to a live, aligned `F` (guaranteed by the
        // caller), derived from `&mut self`, and the returned borrow is tied to it.
        unsafe { data.cast::<F>().as_mut() }
    }

    /// Drops the stored value and releases its block, if any.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. This storage currently holds a live value of type `F`, stored with
    ///    [`Placement::of::<F, A>()`].
    /// 2. `alloc` is the strategy instance (or a clone of it) the value was
    ///    stored with.
    /// 3. The storage is not read again until a new value is stored in it.
    #[inline]
    pub(crate) unsafe fn release<F, A: AllocStrategy>(&mut self, alloc: &A) {
        let placement = Placement::of::<F, A>();

        // SAFETY: The placement matches the stored value (guaranteed by the caller).
        let data = unsafe { self.data_mut(placement) };

        // SAFETY: The pointer refers to a live `F` (guaranteed by the caller), and
        // it is never used again (guaranteed by the caller).
        unsafe {
            core::ptr::drop_in_place(data.cast::<F>().as_ptr());
        }

        if placement == Placement::Indirect {
            // SAFETY:
            // 1. The block came from `alloc.allocate` in `store` (guaranteed by the
            //    caller)
            // 2. `store` used `Layout::new::<F>()`
            // 3. The block is released only here, and the caller guarantees that
            //    `release` is not called twice for the same value
            unsafe {
                alloc.deallocate(data, Layout::new::<F>());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc_crate::{rc::Rc, string::String, vec::Vec};
    use core::cell::Cell;

    use super::*;
    use crate::alloc::Global;

    static_assertions::assert_not_impl_any!(SlotStorage: Copy, Clone, Send, Sync);

    #[test]
    fn test_storage_size() {
        assert_eq!(
            core::mem::size_of::<SlotStorage>(),
            INLINE_WORDS * core::mem::size_of::<usize>()
        );
        assert_eq!(
            core::mem::align_of::<SlotStorage>(),
            core::mem::align_of::<usize>()
        );
    }

    #[test]
    fn test_inline_store_and_release() {
        let drops = Rc::new(Cell::new(0));

        struct Tracked(Rc<Cell<u32>>);
        impl Drop for Tracked {
            fn drop(&mut self) {
                self.0.set(self.0.get() + 1);
            }
        }

        let mut storage = SlotStorage::store(Tracked(drops.clone()), &Global).unwrap();
        assert_eq!(Placement::of::<Tracked, Global>(), Placement::Inline);

        // SAFETY: `storage` holds a `Tracked` stored with `Global`.
        let value = unsafe { storage.get::<Tracked, Global>() };
        assert!(Rc::ptr_eq(&value.0, &drops));
        assert_eq!(drops.get(), 0);

        // SAFETY: `storage` holds a `Tracked` stored with `Global` and is not
        // used afterwards.
        unsafe { storage.release::<Tracked, Global>(&Global) };
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn test_inline_interior_mutability_through_shared_access() {
        let mut storage = SlotStorage::store(Cell::new(1_u32), &Global).unwrap();
        assert_eq!(Placement::of::<Cell<u32>, Global>(), Placement::Inline);

        // SAFETY: `storage` holds a `Cell<u32>` stored with `Global`.
        let first = unsafe { storage.get::<Cell<u32>, Global>() };
        // SAFETY: As above; shared views may coexist.
        let second = unsafe { storage.get::<Cell<u32>, Global>() };
        first.set(first.get() + 1);
        second.set(second.get() * 10);
        assert_eq!(first.get(), 20);

        // SAFETY: As above.
        let exclusive = unsafe { storage.get_mut::<Cell<u32>, Global>() };
        *exclusive.get_mut() += 1;
        assert_eq!(exclusive.get(), 21);

        // SAFETY: `storage` holds a `Cell<u32>` stored with `Global` and is not
        // used afterwards.
        unsafe { storage.release::<Cell<u32>, Global>(&Global) };
    }

    #[test]
    fn test_indirect_interior_mutability_through_shared_access() {
        type Cells = [Cell<u64>; 8];

        let mut storage = SlotStorage::store::<Cells, Global>(Default::default(), &Global).unwrap();
        assert_eq!(Placement::of::<Cells, Global>(), Placement::Indirect);

        // SAFETY: `storage` holds a `[Cell<u64>; 8]` stored with `Global`.
        let cells = unsafe { storage.get::<Cells, Global>() };
        for (i, cell) in cells.iter().enumerate() {
            cell.set(i as u64);
        }
        // SAFETY: As above.
        let again = unsafe { storage.get::<Cells, Global>() };
        assert_eq!(again[7].get(), 7);

        // SAFETY: `storage` holds a `[Cell<u64>; 8]` stored with `Global` and is
        // not used afterwards.
        unsafe { storage.release::<Cells, Global>(&Global) };
    }

    /// Stores `target` inline and calls it twice through shared views.
    fn call_inline_twice<F: Fn() -> u8>(target: F) -> (u8, u8) {
        assert_eq!(Placement::of::<F, Global>(), Placement::Inline);
        let mut storage = SlotStorage::store(target, &Global).unwrap();

        // SAFETY: `storage` holds an `F` stored with `Global`.
        let shared = unsafe { storage.get::<F, Global>() };
        let calls = (shared(), shared());

        // SAFETY: `storage` holds an `F` stored with `Global` and is not used
        // afterwards.
        unsafe { storage.release::<F, Global>(&Global) };
        calls
    }

    #[test]
    fn test_inline_closure_with_cell_called_through_shared_view() {
        let counter = Cell::new(0_u8);
        let bump = move || {
            counter.set(counter.get() + 1);
            counter.get()
        };
        assert_eq!(call_inline_twice(bump), (1, 2));
    }

    #[test]
    fn test_indirect_store_and_release() {
        let big: Vec<String> = (0..4).map(|i| alloc_crate::format!("item {i}")).collect();
        let value = [big.clone(), big.clone()];
        assert_eq!(Placement::of::<[Vec<String>; 2], Global>(), Placement::Indirect);

        let mut storage = SlotStorage::store(value, &Global).unwrap();

        // SAFETY: `storage` holds a `[Vec<String>; 2]` stored with `Global`.
        let stored = unsafe { storage.get_mut::<[Vec<String>; 2], Global>() };
        stored[1].push(String::from("extra"));
        assert_eq!(stored[0], big);
        assert_eq!(stored[1].len(), 5);

        // SAFETY: `storage` holds a `[Vec<String>; 2]` stored with `Global` and is
        // not used afterwards.
        unsafe { storage.release::<[Vec<String>; 2], Global>(&Global) };
    }
}
