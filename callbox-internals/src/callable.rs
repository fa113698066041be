//! The [`Callable`] trait describing what can be erased into a slot.
//!
//! Arguments are passed as a single tuple, so that one definition of the
//! engine covers every arity. The trait is implemented for every [`Fn`]
//! closure, function item and function pointer taking up to twelve
//! arguments; function objects with a distinct mutable call implement it by
//! hand.

/// A value that can be invoked with the argument tuple `Args`.
///
/// # Shared and exclusive calls
///
/// A wrapper holding a callable exposes two entry points, and the
/// [`Invoker`] forwards each to the matching method here:
///
/// - A call through a shared reference to the wrapper uses
///   [`call`](Callable::call).
/// - A call through an exclusive reference uses
///   [`call_mut`](Callable::call_mut), which defaults to `call`.
///
/// For closures and plain functions the two are the same. Note that a shared
/// call can still change state the callable owns through interior
/// mutability ([`Cell`], [`RefCell`], atomics). This is intended: the shared
/// entry point only promises what `&self` promises.
///
/// [`Invoker`]: crate::invoker::Invoker
/// [`Cell`]: core::cell::Cell
/// [`RefCell`]: core::cell::RefCell
///
/// # Examples
///
/// ```
/// use callbox_internals::Callable;
///
/// struct Counter {
///     hits: u32,
/// }
///
/// impl Callable<(u32,)> for Counter {
///     type Output = u32;
///
///     fn call(&self, (step,): (u32,)) -> u32 {
///         self.hits + step
///     }
///
///     fn call_mut(&mut self, (step,): (u32,)) -> u32 {
///         self.hits += step;
///         self.hits
///     }
/// }
///
/// let mut counter = Counter { hits: 0 };
/// assert_eq!(counter.call((5,)), 5);
/// assert_eq!(counter.call_mut((5,)), 5);
/// assert_eq!(counter.call_mut((5,)), 10);
/// ```
pub trait Callable<Args> {
    /// The value returned by a call.
    type Output;

    /// Invokes the callable through a shared reference.
    fn call(&self, args: Args) -> Self::Output;

    /// Invokes the callable through an exclusive reference.
    ///
    /// The default implementation forwards to [`call`](Callable::call).
    #[inline]
    fn call_mut(&mut self, args: Args) -> Self::Output {
        self.call(args)
    }

    /// Whether this value represents "no target".
    ///
    /// Wrappers constructed from a value reporting `true` stay empty instead
    /// of storing it. The default implementation returns `false`.
    #[inline]
    fn is_empty_target(&self) -> bool {
        false
    }
}

/// Which wrapper entry point a call came through.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub enum CallMode {
    /// The call came through a shared reference and must only use
    /// [`Callable::call`].
    Shared,
    /// The call came through an exclusive reference and uses
    /// [`Callable::call_mut`].
    Exclusive,
}

/// Implements [`Callable`] for every [`Fn`] taking the listed arguments.
macro_rules! impl_callable_for_fn {
    ($($ty:ident $name:ident),*) => {
        impl<F, R, $($ty,)*> Callable<($($ty,)*)> for F
        where
            F: Fn($($ty),*) -> R,
        {
            type Output = R;

            #[inline]
            fn call(&self, ($($name,)*): ($($ty,)*)) -> R {
                (self)($($name),*)
            }
        }
    };
}

impl_callable_for_fn!();
impl_callable_for_fn!(A1 a1);
impl_callable_for_fn!(A1 a1, A2 a2);
impl_callable_for_fn!(A1 a1, A2 a2, A3 a3);
impl_callable_for_fn!(A1 a1, A2 a2, A3 a3, A4 a4);
impl_callable_for_fn!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5);
impl_callable_for_fn!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6);
impl_callable_for_fn!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7);
impl_callable_for_fn!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7, A8 a8);
impl_callable_for_fn!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7, A8 a8, A9 a9);
impl_callable_for_fn!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7, A8 a8, A9 a9, A10 a10);
impl_callable_for_fn!(
    A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7, A8 a8, A9 a9, A10 a10, A11 a11
);
impl_callable_for_fn!(
    A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7, A8 a8, A9 a9, A10 a10, A11 a11, A12 a12
);

#[cfg(test)]
mod tests {
    use core::cell::Cell;

    use super::*;

    fn add(a: i32, b: i32) -> i32 {
        a + b
    }

    fn call_shared<C: Callable<Args>, Args>(callable: &C, args: Args) -> C::Output {
        callable.call(args)
    }

    #[test]
    fn test_fn_item_and_pointer() {
        assert_eq!(call_shared(&add, (2, 3)), 5);

        let pointer: fn(i32, i32) -> i32 = add;
        assert_eq!(call_shared(&pointer, (10, 20)), 30);
        assert!(!Callable::<(i32, i32)>::is_empty_target(&pointer));
    }

    #[test]
    fn test_zero_and_many_arguments() {
        let zero = || 7_u8;
        assert_eq!(call_shared(&zero, ()), 7);

        let twelve = |a: u8, b: u8, c: u8, d: u8, e: u8, f: u8, g: u8, h: u8, i: u8, j: u8, k: u8, l: u8| {
            a + b + c + d + e + f + g + h + i + j + k + l
        };
        assert_eq!(call_shared(&twelve, (1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1)), 12);
    }

    #[test]
    fn test_closure_call_mut_defaults_to_call() {
        let hits = Cell::new(0);
        let mut bump = |by: u32| hits.set(hits.get() + by);

        Callable::call_mut(&mut bump, (2,));
        Callable::call(&bump, (3,));
        assert_eq!(hits.get(), 5);
    }

    #[test]
    fn test_custom_function_object() {
        struct Scale(i64);

        impl Callable<(i64,)> for Scale {
            type Output = i64;

            fn call(&self, (value,): (i64,)) -> i64 {
                value * self.0
            }

            fn call_mut(&mut self, (value,): (i64,)) -> i64 {
                self.0 += 1;
                value * self.0
            }
        }

        let mut scale = Scale(10);
        assert_eq!(scale.call((4,)), 40);
        assert_eq!(scale.call_mut((4,)), 44);
        assert_eq!(scale.call((4,)), 44);
    }
}
