use core::{any::TypeId, fmt};

use callbox_internals::{AllocError, AllocStrategy, CallMode, Callable, Global, Placement, RawCallable};

use crate::{
    error::EmptyFunctionError,
    markers::{SendSync, TargetMarkerFor},
    policy::{CallInfo, CallPolicy, NoPolicy, PolicyGuard},
    signature::Signature,
};

/// FIXME: Once rust-lang/rust#132922 gets resolved, we can make the `raw` field
/// an unsafe field and remove this module.
mod limit_field_access {
    use core::marker::PhantomData;

    use callbox_internals::{AllocStrategy, Global, RawCallable};

    use crate::{
        markers::{Local, SendSync},
        policy::NoPolicy,
        signature::Signature,
    };

    /// A cloneable, type-erased callable with the signature `S`.
    ///
    /// A [`Function`] holds at most one *target*: a closure, function item,
    /// function pointer or function object that can be called with the
    /// arguments of `S` and returns something convertible into its result.
    /// Code calling a [`Function`] depends only on the signature, never on
    /// the concrete type of the target.
    ///
    /// # Type Parameters
    ///
    /// - **Signature (`S`)**: A function pointer type such as
    ///   `fn(i32, i32) -> i32`, see [`Signature`]
    /// - **Thread safety (`T`)**: [`Local`] (default) or [`SendSync`], see
    ///   [`markers`](crate::markers)
    /// - **Policy (`P`)**: Hooks run around every call, see
    ///   [`CallPolicy`](crate::CallPolicy). Defaults to [`NoPolicy`]
    /// - **Allocation strategy (`A`)**: Where targets too large for the
    ///   inline buffer are stored, see [`AllocStrategy`]. Defaults to
    ///   [`Global`]
    ///
    /// # Storage
    ///
    /// Targets of at most [`INLINE_SIZE`](crate::INLINE_SIZE) bytes and
    /// pointer alignment are stored inline, everything else in a block
    /// obtained from the allocation strategy. Cloning a [`Function`] clones
    /// the target into a new, independent slot; a [`Function`] never shares
    /// its target with another.
    ///
    /// # Examples
    ///
    /// ```
    /// use callbox::Function;
    ///
    /// fn add(a: i32, b: i32) -> i32 {
    ///     a + b
    /// }
    ///
    /// let mut f: Function<fn(i32, i32) -> i32> = Function::new(add);
    /// assert_eq!(f.call((2, 3)), 5);
    ///
    /// let copy = f.clone();
    /// assert_eq!(copy.call((10, 20)), 30);
    ///
    /// let multiplier = 10;
    /// f.set(move |a: i32, b: i32| (a + b) * multiplier);
    /// assert_eq!(f.call((1, 3)), 40);
    /// assert_eq!(copy.call((2, 3)), 5);
    ///
    /// f.clear();
    /// assert!(f.is_empty());
    /// ```
    pub struct Function<
        S: Signature,
        ThreadSafety: 'static = Local,
        Policy: 'static = NoPolicy,
        Alloc: AllocStrategy = Global,
    > {
        /// # Safety
        ///
        /// The following safety invariants are guaranteed to be upheld as long
        /// as this struct exists:
        ///
        /// 1. If `T = SendSync`: The target is `Send + Sync`.
        raw: Option<RawCallable<S::Args, S::Output, Alloc>>,
        /// Strategy used for the current and every future target
        alloc: Alloc,
        _thread_safety: PhantomData<ThreadSafety>,
        _policy: PhantomData<fn() -> Policy>,
    }

    impl<S: Signature, T, P, A: AllocStrategy> Function<S, T, P, A> {
        /// Creates a new [`Function`] from its parts.
        ///
        /// # Safety
        ///
        /// The caller must ensure:
        ///
        /// 1. If `T = SendSync`: The target in `raw`, if any, is
        ///    `Send + Sync`.
        #[must_use]
        pub(crate) unsafe fn from_parts(
            raw: Option<RawCallable<S::Args, S::Output, A>>,
            alloc: A,
        ) -> Self {
            // SAFETY: We must uphold the safety invariants of the raw field:
            // 1. Guaranteed by the caller
            Self {
                raw,
                alloc,
                _thread_safety: PhantomData,
                _policy: PhantomData,
            }
        }

        /// Returns a reference to the erased target, if any.
        #[must_use]
        pub(crate) fn as_raw(&self) -> Option<&RawCallable<S::Args, S::Output, A>> {
            self.raw.as_ref()
        }

        /// Returns an exclusive reference to the erased target, if any.
        ///
        /// # Safety
        ///
        /// The caller must ensure:
        ///
        /// 1. If `T = SendSync`: The returned reference is not used to put
        ///    a target that is not `Send + Sync` into this [`Function`].
        #[must_use]
        pub(crate) unsafe fn as_raw_mut(
            &mut self,
        ) -> Option<&mut RawCallable<S::Args, S::Output, A>> {
            // SAFETY: The invariants of the raw field are upheld by the caller.
            self.raw.as_mut()
        }

        /// Removes the erased target, leaving this [`Function`] empty.
        pub(crate) fn take_raw(&mut self) -> Option<RawCallable<S::Args, S::Output, A>> {
            // SAFETY: An empty `Function` trivially upholds the invariants of the
            // raw field.
            self.raw.take()
        }

        /// Returns the allocation strategy of this [`Function`].
        #[must_use]
        pub fn allocator(&self) -> &A {
            &self.alloc
        }
    }

    // SAFETY: The `SendSync` marker indicates that the target is `Send + Sync`.
    // The strategy is checked by the bound, and the signature and policy are
    // only ever used as types. Therefore it is safe to implement `Send` for the
    // wrapper itself.
    unsafe impl<S: Signature, P, A: AllocStrategy + Send> Send for Function<S, SendSync, P, A> {}

    // SAFETY: The `SendSync` marker indicates that the target is `Send + Sync`.
    // The strategy is checked by the bound, and the signature and policy are
    // only ever used as types. Therefore it is safe to implement `Sync` for the
    // wrapper itself.
    unsafe impl<S: Signature, P, A: AllocStrategy + Sync> Sync for Function<S, SendSync, P, A> {}
}

pub use limit_field_access::Function;

/// A [`Function`] whose targets are `Send + Sync`, and which is therefore
/// `Send + Sync` itself.
pub type SendFunction<S, P = NoPolicy, A = Global> = Function<S, SendSync, P, A>;

impl<S: Signature, T, P, A: AllocStrategy> Function<S, T, P, A> {
    /// Creates an empty [`Function`].
    ///
    /// # Examples
    ///
    /// ```
    /// use callbox::Function;
    ///
    /// let f: Function<fn(u8) -> u8> = Function::empty();
    /// assert!(f.is_empty());
    /// ```
    #[must_use]
    pub fn empty() -> Self
    where
        A: Default,
    {
        Self::empty_in(A::default())
    }

    /// Creates an empty [`Function`] using the allocation strategy `alloc`
    /// for future targets.
    #[must_use]
    pub fn empty_in(alloc: A) -> Self {
        // SAFETY:
        // 1. There is no target.
        unsafe { Self::from_parts(None, alloc) }
    }

    /// Creates a [`Function`] holding `target`.
    ///
    /// If `target` reports itself as empty through
    /// [`Callable::is_empty_target`], such as an empty nested [`Function`],
    /// the result is empty.
    ///
    /// # Panics
    ///
    /// Aborts through [`handle_alloc_error`] if the target needs a separate
    /// allocation and the allocation strategy fails to provide it. Use
    /// [`try_new`](Self::try_new) to handle that case.
    ///
    /// [`handle_alloc_error`]: alloc::alloc::handle_alloc_error
    ///
    /// # Examples
    ///
    /// ```
    /// use callbox::Function;
    ///
    /// let offset = 7;
    /// let f: Function<fn(i32) -> i64> = Function::new(move |x: i32| x + offset);
    /// assert_eq!(f.call((1,)), 8_i64);
    /// ```
    #[track_caller]
    #[must_use]
    pub fn new<F>(target: F) -> Self
    where
        F: Callable<S::Args> + Clone + TargetMarkerFor<T>,
        F::Output: Into<S::Output>,
        A: Default,
    {
        Self::new_in(target, A::default())
    }

    /// Creates a [`Function`] holding `target`, stored with the allocation
    /// strategy `alloc`.
    ///
    /// # Panics
    ///
    /// Aborts through [`handle_alloc_error`] if the allocation strategy fails.
    ///
    /// [`handle_alloc_error`]: alloc::alloc::handle_alloc_error
    #[track_caller]
    #[must_use]
    pub fn new_in<F>(target: F, alloc: A) -> Self
    where
        F: Callable<S::Args> + Clone + TargetMarkerFor<T>,
        F::Output: Into<S::Output>,
    {
        Self::try_new_in(target, alloc).unwrap_or_else(|error| handle_alloc_error(error))
    }

    /// Creates a [`Function`] holding `target`, returning an error if the
    /// allocation strategy fails.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] if the target needs a separate allocation and
    /// the strategy cannot provide it. The target is dropped in that case.
    pub fn try_new<F>(target: F) -> Result<Self, AllocError>
    where
        F: Callable<S::Args> + Clone + TargetMarkerFor<T>,
        F::Output: Into<S::Output>,
        A: Default,
    {
        Self::try_new_in(target, A::default())
    }

    /// Creates a [`Function`] holding `target`, stored with the allocation
    /// strategy `alloc`, returning an error if the strategy fails.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] if the target needs a separate allocation and
    /// `alloc` cannot provide it. The target is dropped in that case.
    ///
    /// # Examples
    ///
    /// ```
    /// use callbox::{Function, Global, Placement};
    ///
    /// let table = [1_u64; 32];
    /// let f: Function<fn(usize) -> u64> =
    ///     Function::try_new_in(move |i: usize| table[i], Global).unwrap();
    /// assert_eq!(f.placement(), Some(Placement::Indirect));
    /// ```
    pub fn try_new_in<F>(target: F, alloc: A) -> Result<Self, AllocError>
    where
        F: Callable<S::Args> + Clone + TargetMarkerFor<T>,
        F::Output: Into<S::Output>,
    {
        let raw = if target.is_empty_target() {
            None
        } else {
            Some(RawCallable::new(target, alloc.clone())?)
        };

        // SAFETY:
        // 1. If `T = SendSync`: `F: TargetMarkerFor<SendSync>` implies
        //    `F: Send + Sync`.
        Ok(unsafe { Self::from_parts(raw, alloc) })
    }

    /// Creates a [`Function`] holding `target`, or an empty one for `None`.
    ///
    /// # Examples
    ///
    /// ```
    /// use callbox::Function;
    ///
    /// let missing: Option<fn(u8) -> u8> = None;
    /// let f: Function<fn(u8) -> u8> = Function::from_option(missing);
    /// assert!(f.is_empty());
    /// ```
    #[track_caller]
    #[must_use]
    pub fn from_option<F>(target: Option<F>) -> Self
    where
        F: Callable<S::Args> + Clone + TargetMarkerFor<T>,
        F::Output: Into<S::Output>,
        A: Default,
    {
        match target {
            Some(target) => Self::new(target),
            None => Self::empty(),
        }
    }

    /// Returns `true` if this [`Function`] has no target.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.as_raw().is_none()
    }

    /// Calls the target through a shared reference.
    ///
    /// The target sees a shared reference to itself. A target using
    /// interior mutability can still change its state here.
    ///
    /// # Panics
    ///
    /// Panics with the message ``called an empty `Function` `` if there is no
    /// target. Panics raised by the target propagate unchanged.
    #[inline]
    #[track_caller]
    pub fn call(&self, args: S::Args) -> S::Output
    where
        P: CallPolicy,
    {
        match self.try_call(args) {
            Ok(output) => output,
            Err(error) => panic!("{error}"),
        }
    }

    /// Calls the target through an exclusive reference.
    ///
    /// Function objects implementing [`Callable::call_mut`] may update their
    /// own state here.
    ///
    /// # Panics
    ///
    /// Panics with the message ``called an empty `Function` `` if there is no
    /// target. Panics raised by the target propagate unchanged.
    #[inline]
    #[track_caller]
    pub fn call_mut(&mut self, args: S::Args) -> S::Output
    where
        P: CallPolicy,
    {
        match self.try_call_mut(args) {
            Ok(output) => output,
            Err(error) => panic!("{error}"),
        }
    }

    /// Calls the target through a shared reference, or returns an error if
    /// there is none.
    ///
    /// # Errors
    ///
    /// Returns [`EmptyFunctionError`] if there is no target. The policy does
    /// not run in that case.
    ///
    /// # Examples
    ///
    /// ```
    /// use callbox::{Function, error::EmptyFunctionError};
    ///
    /// let mut f: Function<fn(i32) -> i32> = Function::empty();
    /// assert_eq!(f.try_call((1,)), Err(EmptyFunctionError));
    ///
    /// f.set(|x: i32| -x);
    /// assert_eq!(f.try_call((1,)), Ok(-1));
    /// ```
    #[inline]
    pub fn try_call(&self, args: S::Args) -> Result<S::Output, EmptyFunctionError>
    where
        P: CallPolicy,
    {
        let raw = self.as_raw().ok_or(EmptyFunctionError)?;
        let info = CallInfo::new::<S, _, _, _>(raw, CallMode::Shared);
        let guard = PolicyGuard::<P>::enter(&info);
        let output = raw.call(args);
        drop(guard);
        Ok(output)
    }

    /// Calls the target through an exclusive reference, or returns an error
    /// if there is none.
    ///
    /// # Errors
    ///
    /// Returns [`EmptyFunctionError`] if there is no target. The policy does
    /// not run in that case.
    #[inline]
    pub fn try_call_mut(&mut self, args: S::Args) -> Result<S::Output, EmptyFunctionError>
    where
        P: CallPolicy,
    {
        // SAFETY:
        // 1. The reference is only used to call the target in place.
        let raw = unsafe { self.as_raw_mut() }.ok_or(EmptyFunctionError)?;
        let info = CallInfo::new::<S, _, _, _>(&*raw, CallMode::Exclusive);
        let guard = PolicyGuard::<P>::enter(&info);
        let output = raw.call_mut(args);
        drop(guard);
        Ok(output)
    }

    /// Replaces the target with `target`.
    ///
    /// The new target is stored completely before the old one is dropped.
    ///
    /// # Panics
    ///
    /// Aborts through [`handle_alloc_error`] if the allocation strategy
    /// fails. Use [`try_set`](Self::try_set) to handle that case.
    ///
    /// [`handle_alloc_error`]: alloc::alloc::handle_alloc_error
    #[track_caller]
    pub fn set<F>(&mut self, target: F)
    where
        F: Callable<S::Args> + Clone + TargetMarkerFor<T>,
        F::Output: Into<S::Output>,
    {
        if let Err(error) = self.try_set(target) {
            handle_alloc_error(error);
        }
    }

    /// Replaces the target with `target`, returning an error if the
    /// allocation strategy fails.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] if the new target needs a separate allocation
    /// and the strategy cannot provide it. The current target is left
    /// untouched and the new one is dropped.
    pub fn try_set<F>(&mut self, target: F) -> Result<(), AllocError>
    where
        F: Callable<S::Args> + Clone + TargetMarkerFor<T>,
        F::Output: Into<S::Output>,
    {
        let staged = Self::try_new_in(target, self.allocator().clone())?;
        *self = staged;
        Ok(())
    }

    /// Replaces the target with `target`, or clears it for `None`.
    #[track_caller]
    pub fn set_option<F>(&mut self, target: Option<F>)
    where
        F: Callable<S::Args> + Clone + TargetMarkerFor<T>,
        F::Output: Into<S::Output>,
    {
        match target {
            Some(target) => self.set(target),
            None => self.clear(),
        }
    }

    /// Replaces the target with a clone of the target of `source`.
    ///
    /// The clone is made completely before the current target is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] if the clone needs a separate allocation and
    /// the strategy of `source` cannot provide it. The current target is
    /// left untouched.
    pub fn assign_from(&mut self, source: &Self) -> Result<(), AllocError> {
        let staged = source.try_clone()?;
        *self = staged;
        Ok(())
    }

    /// Drops the target, leaving this [`Function`] empty.
    #[inline]
    pub fn clear(&mut self) {
        drop(self.take_raw());
    }

    /// Moves the target out into a new [`Function`], leaving this one empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use callbox::Function;
    ///
    /// let mut f: Function<fn() -> &'static str> = Function::new(|| "moved");
    /// let g = f.take();
    /// assert!(f.is_empty());
    /// assert_eq!(g.call(()), "moved");
    /// ```
    #[must_use]
    pub fn take(&mut self) -> Self {
        let raw = self.take_raw();

        // SAFETY:
        // 1. If `T = SendSync`: The target came out of `self`, so it is
        //    `Send + Sync`.
        unsafe { Self::from_parts(raw, self.allocator().clone()) }
    }

    /// Exchanges the targets and allocation strategies of `self` and
    /// `other`, without cloning either.
    #[inline]
    pub fn swap(&mut self, other: &mut Self) {
        core::mem::swap(self, other);
    }

    /// Creates an independent deep copy of this [`Function`], returning an
    /// error if the allocation strategy fails.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] if the clone needs a separate allocation and
    /// the strategy cannot provide it.
    pub fn try_clone(&self) -> Result<Self, AllocError> {
        let raw = self.as_raw().map(RawCallable::try_clone).transpose()?;

        // SAFETY:
        // 1. If `T = SendSync`: The target is a clone of the target of `self`,
        //    so it has the same type, which is `Send + Sync`.
        Ok(unsafe { Self::from_parts(raw, self.allocator().clone()) })
    }

    /// Returns a reference to the target if it is of type `F`.
    ///
    /// # Examples
    ///
    /// ```
    /// use callbox::Function;
    ///
    /// fn double(x: u32) -> u32 {
    ///     x * 2
    /// }
    ///
    /// let f: Function<fn(u32) -> u32> = Function::new(double as fn(u32) -> u32);
    /// assert!(f.target::<fn(u32) -> u32>().is_some());
    /// assert!(f.target::<u32>().is_none());
    /// ```
    #[inline]
    #[must_use]
    pub fn target<F: 'static>(&self) -> Option<&F> {
        self.as_raw()?.downcast_ref::<F>()
    }

    /// Returns an exclusive reference to the target if it is of type `F`.
    #[inline]
    #[must_use]
    pub fn target_mut<F: 'static>(&mut self) -> Option<&mut F> {
        // SAFETY:
        // 1. The reference is only used to access the existing target in
        //    place; its type cannot change.
        let raw = unsafe { self.as_raw_mut() }?;
        raw.downcast_mut::<F>()
    }

    /// Returns `true` if the target is of type `F`.
    #[inline]
    #[must_use]
    pub fn contains<F: 'static>(&self) -> bool {
        self.as_raw().is_some_and(RawCallable::is::<F>)
    }

    /// Returns the [`TypeId`] of the target, if any.
    #[inline]
    #[must_use]
    pub fn target_type_id(&self) -> Option<TypeId> {
        self.as_raw().map(RawCallable::type_id)
    }

    /// Returns the [`core::any::type_name`] of the target, if any.
    #[inline]
    #[must_use]
    pub fn target_type_name(&self) -> Option<&'static str> {
        self.as_raw().map(RawCallable::type_name)
    }

    /// Returns where the target is stored, if there is one.
    #[inline]
    #[must_use]
    pub fn placement(&self) -> Option<Placement> {
        self.as_raw().map(RawCallable::placement)
    }

    /// The number of arguments in the signature.
    pub const ARITY: usize = S::ARITY;
}

/// Exchanges the targets of two [`Function`]s.
#[inline]
pub fn swap<S: Signature, T, P, A: AllocStrategy>(
    a: &mut Function<S, T, P, A>,
    b: &mut Function<S, T, P, A>,
) {
    a.swap(b);
}

/// Forwards an allocation failure to the global handler.
#[cold]
fn handle_alloc_error(error: AllocError) -> ! {
    alloc::alloc::handle_alloc_error(error.layout())
}

impl<S: Signature, T, P, A: AllocStrategy + Default> Default for Function<S, T, P, A> {
    #[inline]
    fn default() -> Self {
        Self::empty()
    }
}

impl<S: Signature, T, P, A: AllocStrategy> Clone for Function<S, T, P, A> {
    /// Deep-clones the target into a new slot.
    ///
    /// # Panics
    ///
    /// Aborts through [`handle_alloc_error`](alloc::alloc::handle_alloc_error)
    /// if the allocation strategy fails.
    #[track_caller]
    fn clone(&self) -> Self {
        self.try_clone().unwrap_or_else(|error| handle_alloc_error(error))
    }

    /// Replaces the target with a clone of the target of `source`, staging
    /// the clone before the current target is dropped.
    #[track_caller]
    fn clone_from(&mut self, source: &Self) {
        if let Err(error) = self.assign_from(source) {
            handle_alloc_error(error);
        }
    }
}

impl<S, T, P, A> Callable<S::Args> for Function<S, T, P, A>
where
    S: Signature,
    P: CallPolicy,
    A: AllocStrategy,
{
    type Output = S::Output;

    #[inline]
    #[track_caller]
    fn call(&self, args: S::Args) -> S::Output {
        Function::call(self, args)
    }

    #[inline]
    #[track_caller]
    fn call_mut(&mut self, args: S::Args) -> S::Output {
        Function::call_mut(self, args)
    }

    #[inline]
    fn is_empty_target(&self) -> bool {
        self.is_empty()
    }
}

impl<S: Signature, T, P, A: AllocStrategy> fmt::Debug for Function<S, T, P, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("signature", &core::any::type_name::<S>())
            .field("target", &self.target_type_name())
            .field("placement", &self.placement())
            .finish()
    }
}
