//! Call signatures.
//!
//! A [`Function`](crate::Function) is parameterized by a function pointer
//! type such as `fn(i32, i32) -> i32`, which only serves as a compact way of
//! writing down the argument and result types. The [`Signature`] trait splits
//! such a type into the argument tuple passed to the engine and the declared
//! result type.

mod sealed {
    pub trait Sealed {}
}

/// A function pointer type used to describe what a wrapper can be called
/// with.
///
/// Implemented for `fn(A1, ..., An) -> R` with up to twelve arguments. The
/// result-less form is simply a signature with a unit result, such as
/// `fn(u32)`.
///
/// # Borrowed arguments
///
/// A signature such as `fn(&str) -> usize` is really the higher-ranked type
/// `for<'a> fn(&'a str) -> usize`, which is not covered. Name the lifetime
/// instead, e.g. `fn(&'static str) -> usize`, or pass owned values.
///
/// # Examples
///
/// ```
/// use callbox::Signature;
///
/// type Add = fn(i32, i32) -> i32;
///
/// assert_eq!(<Add as Signature>::ARITY, 2);
/// let args: <Add as Signature>::Args = (2, 3);
/// assert_eq!(args.0 + args.1, 5);
/// ```
pub trait Signature: sealed::Sealed {
    /// The arguments, as a tuple.
    type Args;
    /// The declared result type.
    type Output;
    /// The number of declared arguments.
    const ARITY: usize;
}

/// Implements [`Signature`] for a function pointer with the listed
/// argument types.
macro_rules! impl_signature {
    ($arity:literal; $($ty:ident),*) => {
        impl<R, $($ty,)*> sealed::Sealed for fn($($ty),*) -> R {}

        impl<R, $($ty,)*> Signature for fn($($ty),*) -> R {
            type Args = ($($ty,)*);
            type Output = R;
            const ARITY: usize = $arity;
        }
    };
}

impl_signature!(0;);
impl_signature!(1; A1);
impl_signature!(2; A1, A2);
impl_signature!(3; A1, A2, A3);
impl_signature!(4; A1, A2, A3, A4);
impl_signature!(5; A1, A2, A3, A4, A5);
impl_signature!(6; A1, A2, A3, A4, A5, A6);
impl_signature!(7; A1, A2, A3, A4, A5, A6, A7);
impl_signature!(8; A1, A2, A3, A4, A5, A6, A7, A8);
impl_signature!(9; A1, A2, A3, A4, A5, A6, A7, A8, A9);
impl_signature!(10; A1, A2, A3, A4, A5, A6, A7, A8, A9, A10);
impl_signature!(11; A1, A2, A3, A4, A5, A6, A7, A8, A9, A10, A11);
impl_signature!(12; A1, A2, A3, A4, A5, A6, A7, A8, A9, A10, A11, A12);

#[cfg(test)]
mod tests {
    use core::any::TypeId;

    use super::*;

    fn args_of<S: Signature>() -> TypeId
    where
        S::Args: 'static,
    {
        TypeId::of::<S::Args>()
    }

    #[test]
    fn test_arity() {
        assert_eq!(<fn() as Signature>::ARITY, 0);
        assert_eq!(<fn(u8) -> u8 as Signature>::ARITY, 1);
        assert_eq!(
            <fn(u8, u8, u8, u8, u8, u8, u8, u8, u8, u8, u8, u8) as Signature>::ARITY,
            12
        );
    }

    #[test]
    fn test_args_and_output() {
        assert_eq!(args_of::<fn()>(), TypeId::of::<()>());
        assert_eq!(args_of::<fn(u8) -> bool>(), TypeId::of::<(u8,)>());
        assert_eq!(args_of::<fn(u8, i64)>(), TypeId::of::<(u8, i64)>());

        static_assertions::assert_type_eq_all!(<fn(u8) -> bool as Signature>::Output, bool);
        static_assertions::assert_type_eq_all!(<fn(u8) as Signature>::Output, ());
    }
}
