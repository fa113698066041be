//! The [`Callable`] trait and adapters for it.
//!
//! [`Callable`] is implemented for every [`Fn`] closure, function item and
//! function pointer with up to twelve arguments. Implement it by hand for
//! function objects that need a distinct exclusive call, or that can
//! represent "no target".

pub use callbox_internals::{CallMode, Callable};

/// Adapts a callable into one returning `()` by dropping its result.
///
/// A wrapper with a result-less signature such as `fn(u32)` only accepts
/// targets returning something convertible into `()`. Wrap any other target
/// in [`Discard`] to store it anyway.
///
/// # Examples
///
/// ```
/// use callbox::{Discard, Function};
///
/// let f: Function<fn(u32)> = Function::new(Discard(|x: u32| x * 2));
/// f.call((21,));
/// ```
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Hash)]
pub struct Discard<F>(pub F);

impl<F, Args> Callable<Args> for Discard<F>
where
    F: Callable<Args>,
{
    type Output = ();

    #[inline]
    fn call(&self, args: Args) {
        self.0.call(args);
    }

    #[inline]
    fn call_mut(&mut self, args: Args) {
        self.0.call_mut(args);
    }

    #[inline]
    fn is_empty_target(&self) -> bool {
        self.0.is_empty_target()
    }
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;

    use super::*;

    #[test]
    fn test_discard_forwards_calls() {
        let hits = Cell::new(0_u32);
        let mut discard = Discard(|by: u32| {
            hits.set(hits.get() + by);
            hits.get()
        });

        let () = Callable::call(&discard, (2,));
        let () = Callable::call_mut(&mut discard, (3,));
        assert_eq!(hits.get(), 5);
        assert!(!Callable::<(u32,)>::is_empty_target(&discard));
    }
}
