//! The manual vtable managing the lifetime of an erased callable.
//!
//! This module contains the [`Manager`], which enables cloning, destroying
//! and inspecting the contents of a [`SlotStorage`] when the concrete
//! callable type `F` has been erased.
//!
//! This module encapsulates the fields of [`Manager`] so they cannot be
//! accessed directly. This visibility restriction guarantees the safety
//! invariant: **the manager's type parameters must match the actual callable
//! type and allocation strategy stored in the slot it is paired with**.
//!
//! # Safety Invariant
//!
//! This invariant is maintained because managers are created as `&'static`
//! references via [`Manager::new`], which pairs the function pointers with a
//! specific `F` at compile time, and because the only code pairing a manager
//! with a slot is [`RawCallable::new`], which stores an `F` in that slot.
//!
//! [`RawCallable::new`]: crate::RawCallable::new

use core::any::TypeId;

use crate::{
    alloc::{AllocError, AllocStrategy},
    slot::{Placement, SlotStorage},
};

/// Vtable for type-erased lifetime operations on a slot.
///
/// There is exactly one [`Manager`] per pair of callable type `F` and
/// allocation strategy `A`.
///
/// # Safety Invariant
///
/// The fields `clone` and `destroy` are guaranteed to point to the functions
/// defined below instantiated with the callable type `F` and strategy `A`
/// that were used to create this [`Manager`], and `placement` is
/// [`Placement::of::<F, A>()`].
pub(crate) struct Manager<A: 'static> {
    /// Gets the [`TypeId`] of the callable type that was used to create this
    /// [`Manager`].
    type_id: fn() -> TypeId,
    /// Gets the [`core::any::type_name`] of the callable type that was used to
    /// create this [`Manager`].
    type_name: fn() -> &'static str,
    /// Where callables managed by this [`Manager`] are stored.
    placement: Placement,
    /// Clones the callable into a new, independently owned slot.
    clone: unsafe fn(&SlotStorage, &A) -> Result<SlotStorage, AllocError>,
    /// Drops the callable and releases its slot.
    destroy: unsafe fn(&mut SlotStorage, &A),
}

impl<A: AllocStrategy> Manager<A> {
    /// Creates a new [`Manager`] for the callable type `F`.
    pub(crate) const fn new<F: Clone + 'static>() -> &'static Self {
        const {
            &Self {
                type_id: TypeId::of::<F>,
                type_name: core::any::type_name::<F>,
                placement: Placement::of::<F, A>(),
                clone: clone::<F, A>,
                destroy: destroy::<F, A>,
            }
        }
    }

    /// Gets the [`TypeId`] of the callable type that was used to create this
    /// [`Manager`].
    #[inline]
    pub(crate) fn type_id(&self) -> TypeId {
        (self.type_id)()
    }

    /// Gets the [`core::any::type_name`] of the callable type that was used
    /// to create this [`Manager`].
    #[inline]
    pub(crate) fn type_name(&self) -> &'static str {
        (self.type_name)()
    }

    /// Where the callables managed by this [`Manager`] are stored.
    #[inline]
    pub(crate) fn placement(&self) -> Placement {
        self.placement
    }

    /// Clones the callable held by `storage` into a new slot.
    ///
    /// The clone uses the same placement as the original. An indirect
    /// placement performs exactly one allocation through `alloc`.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `storage` holds a live callable of the type this [`Manager`] was
    ///    created for.
    #[inline]
    pub(crate) unsafe fn clone(
        &self,
        storage: &SlotStorage,
        alloc: &A,
    ) -> Result<SlotStorage, AllocError> {
        // SAFETY: We know that `self.clone` points to the function `clone::<F, A>`
        // below. That function's safety requirements are upheld:
        // 1. Guaranteed by the caller
        unsafe { (self.clone)(storage, alloc) }
    }

    /// Drops the callable held by `storage` and releases its block.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `storage` holds a live callable of the type this [`Manager`] was
    ///    created for.
    /// 2. `alloc` is the strategy instance the callable was stored with, or a
    ///    clone of it.
    /// 3. This method consumes the callable, so the caller must ensure that it
    ///    has not previously been destroyed and that `storage` is not read
    ///    again afterwards.
    #[inline]
    pub(crate) unsafe fn destroy(&self, storage: &mut SlotStorage, alloc: &A) {
        // SAFETY: We know that `self.destroy` points to the function
        // `destroy::<F, A>` below. That function's safety requirements are upheld:
        // 1. Guaranteed by the caller
        // 2. Guaranteed by the caller
        // 3. Guaranteed by the caller
        unsafe { (self.destroy)(storage, alloc) }
    }
}

/// Clones the `F` held by `storage` into a new slot.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. `storage` holds a live `F` stored with the strategy `A`.
unsafe fn clone<F: Clone, A: AllocStrategy>(
    storage: &SlotStorage,
    alloc: &A,
) -> Result<SlotStorage, AllocError> {
    // SAFETY:
    // 1. Guaranteed by the caller
    let value: &F = unsafe { storage.get::<F, A>() };
    SlotStorage::store::<F, A>(value.clone(), alloc)
}

/// Drops the `F` held by `storage` and releases its block.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. `storage` holds a live `F` stored with the strategy `A`.
/// 2. `alloc` is the strategy instance the `F` was stored with, or a clone
///    of it.
/// 3. `storage` is not read again afterwards.
unsafe fn destroy<F, A: AllocStrategy>(storage: &mut SlotStorage, alloc: &A) {
    // SAFETY:
    // 1. Guaranteed by the caller
    // 2. Guaranteed by the caller
    // 3. Guaranteed by the caller
    unsafe { storage.release::<F, A>(alloc) }
}
