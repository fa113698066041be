//! The owned, type-erased callable.
//!
//! This module encapsulates the fields of [`RawCallable`], ensuring they are
//! only visible within this module. This visibility restriction guarantees
//! the safety invariant: **the slot always holds a live callable of the type
//! the manager and invoker were created for**.
//!
//! # Safety Invariant
//!
//! The fields can only be set by [`RawCallable::new`] (which stores an `F`
//! and records `Manager::new::<F>()` and `invoker::<F, _, _>()` next to it)
//! and by [`RawCallable::try_clone`] (which copies the manager and invoker
//! of a value whose slot it has just cloned through that very manager). No
//! method replaces one field without the others.
//!
//! # Exactly-once destruction
//!
//! [`RawCallable`] is move-only and releases its slot only in its [`Drop`]
//! implementation. An empty wrapper is represented as
//! `Option<RawCallable<..>>::None`, so there is no "empty but still owning"
//! state in which a second release could happen.

use core::{any::TypeId, fmt};

use crate::{
    alloc::{AllocError, AllocStrategy},
    callable::{CallMode, Callable},
    invoker::{Invoker, invoker},
    manager::Manager,
    slot::{Placement, SlotStorage},
};

/// An owned callable with the argument tuple `Args` and the result type `R`,
/// whose concrete type has been erased.
///
/// The callable is stored inline or in a block obtained from the allocation
/// strategy `A`, according to [`Placement::of`]. All further operations go
/// through two `'static` function tables chosen at construction.
pub struct RawCallable<Args, R, A: AllocStrategy> {
    /// Storage for the callable
    ///
    /// # Safety
    ///
    /// The following safety invariants are guaranteed to be upheld as long as
    /// this struct exists:
    ///
    /// 1. The storage holds a live `F`, for the `F` that `manager` and
    ///    `invoker` were created for, stored with the strategy `A`.
    /// 2. If the placement is indirect, the block was obtained from `alloc`
    ///    (or the instance `alloc` was cloned from) and is owned exclusively
    ///    by this struct.
    /// 3. The storage is initialized for the entire lifetime of this object,
    ///    except during the execution of the `Drop` implementation.
    storage: SlotStorage,
    /// Lifetime operations for the stored callable
    manager: &'static Manager<A>,
    /// Call operation for the stored callable
    invoker: Invoker<Args, R>,
    /// The strategy that owns the indirect block, if any
    alloc: A,
}

impl<Args, R, A: AllocStrategy> RawCallable<Args, R, A> {
    /// Erases `target` into a new [`RawCallable`].
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] if `target` needs indirect storage and `alloc`
    /// cannot provide it. `target` is dropped in that case.
    #[inline]
    pub fn new<F>(target: F, alloc: A) -> Result<Self, AllocError>
    where
        F: Callable<Args> + Clone + 'static,
        F::Output: Into<R>,
    {
        let storage = SlotStorage::store::<F, A>(target, &alloc)?;

        Ok(Self {
            // SAFETY:
            // 1. We just stored an `F` with the strategy `A`, and the manager and
            //    invoker below are created for that same `F`.
            // 2. The block, if any, came from `alloc`, which we keep.
            // 3. The storage was just initialized.
            storage,
            manager: Manager::new::<F>(),
            invoker: invoker::<F, Args, R>(),
            alloc,
        })
    }

    /// Creates an independent deep copy of this callable.
    ///
    /// The copy uses the same placement. An indirect placement performs
    /// exactly one allocation, through a clone of this value's strategy.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] if the copy needs indirect storage and the
    /// strategy cannot provide it. `self` is unaffected in that case.
    #[inline]
    pub fn try_clone(&self) -> Result<Self, AllocError> {
        let alloc = self.alloc.clone();

        // SAFETY:
        // 1. `self.storage` holds a live callable of the type `self.manager` was
        //    created for (guaranteed by the invariants on this type).
        let storage = unsafe { self.manager.clone(&self.storage, &alloc) }?;

        Ok(Self {
            // SAFETY:
            // 1. The manager just stored a clone of the same type with strategy `A`.
            // 2. The block, if any, came from `alloc`, which we keep.
            // 3. The storage was just initialized.
            storage,
            manager: self.manager,
            invoker: self.invoker,
            alloc,
        })
    }

    /// Calls the stored callable through a shared reference.
    ///
    /// This dispatches to [`Callable::call`].
    #[inline]
    pub fn call(&self, args: Args) -> R {
        // SAFETY: The storage holds a value stored with `self.manager.placement()`
        // (guaranteed by the invariants on this type).
        let data = unsafe { self.storage.data(self.manager.placement()) };

        // SAFETY:
        // 1. `data` points to a live, aligned instance of the type the invoker was
        //    created for (guaranteed by the invariants on this type).
        // 2. The mode is `Shared`, so no write access is needed.
        unsafe { (self.invoker)(data, CallMode::Shared, args) }
    }

    /// Calls the stored callable through an exclusive reference.
    ///
    /// This dispatches to [`Callable::call_mut`].
    #[inline]
    pub fn call_mut(&mut self, args: Args) -> R {
        // SAFETY: The storage holds a value stored with `self.manager.placement()`
        // (guaranteed by the invariants on this type).
        let data = unsafe { self.storage.data_mut(self.manager.placement()) };

        // SAFETY:
        // 1. `data` points to a live, aligned instance of the type the invoker was
        //    created for (guaranteed by the invariants on this type).
        // 2. `data` was derived from `&mut self`, so it is valid for writes and
        //    unaliased for the duration of the call.
        unsafe { (self.invoker)(data, CallMode::Exclusive, args) }
    }

    /// Returns the [`TypeId`] of the stored callable.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.manager.type_id()
    }

    /// Returns the [`core::any::type_name`] of the stored callable.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.manager.type_name()
    }

    /// Returns where the stored callable lives.
    #[inline]
    pub fn placement(&self) -> Placement {
        self.manager.placement()
    }

    /// Returns `true` if the stored callable is of type `T`.
    #[inline]
    pub fn is<T: 'static>(&self) -> bool {
        self.type_id() == TypeId::of::<T>()
    }

    /// Returns a reference to the stored callable if it is of type `T`.
    #[inline]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        if !self.is::<T>() {
            return None;
        }

        // SAFETY: The storage holds a value stored with `self.manager.placement()`
        // (guaranteed by the invariants on this type).
        let data = unsafe { self.storage.data(self.manager.placement()) };

        // SAFETY: The stored callable is a live `T`, checked through its `TypeId`
        // above, and the borrow is tied to `&self`.
        Some(unsafe { data.cast::<T>().as_ref() })
    }

    /// Returns an exclusive reference to the stored callable if it is of type
    /// `T`.
    #[inline]
    pub fn downcast_mut<T: 'static>(&mut self) -> Option<&mut T> {
        if !self.is::<T>() {
            return None;
        }

        // SAFETY: The storage holds a value stored with `self.manager.placement()`
        // (guaranteed by the invariants on this type).
        let data = unsafe { self.storage.data_mut(self.manager.placement()) };

        // SAFETY: The stored callable is a live `T`, checked through its `TypeId`
        // above; the pointer was derived from `&mut self` and the borrow is tied
        // to it.
        Some(unsafe { data.cast::<T>().as_mut() })
    }

    /// Returns the allocation strategy owning this callable's storage.
    #[inline]
    pub fn allocator(&self) -> &A {
        &self.alloc
    }
}

impl<Args, R, A: AllocStrategy> Drop for RawCallable<Args, R, A> {
    #[inline]
    fn drop(&mut self) {
        // SAFETY:
        // 1. The storage holds a live callable of the type `self.manager` was
        //    created for (guaranteed by the invariants on this type).
        // 2. `self.alloc` is the strategy the callable was stored with.
        // 3. We are in the drop function, so the storage is never read again.
        unsafe {
            self.manager.destroy(&mut self.storage, &self.alloc);
        }
    }
}

impl<Args, R, A: AllocStrategy> fmt::Debug for RawCallable<Args, R, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawCallable")
            .field("type_name", &self.type_name())
            .field("placement", &self.placement())
            .finish_non_exhaustive()
    }
}
