//! Errors returned by the non-panicking operations of a
//! [`Function`](crate::Function).

pub use callbox_internals::AllocError;

/// Error returned when calling a [`Function`](crate::Function) that has no
/// target.
///
/// Returned by [`try_call`](crate::Function::try_call) and
/// [`try_call_mut`](crate::Function::try_call_mut). The panicking
/// [`call`](crate::Function::call) uses its [`Display`](core::fmt::Display)
/// output as the panic message.
///
/// # Examples
///
/// ```
/// use callbox::{Function, error::EmptyFunctionError};
///
/// let f: Function<fn() -> u8> = Function::empty();
/// assert_eq!(f.try_call(()), Err(EmptyFunctionError));
/// assert_eq!(EmptyFunctionError.to_string(), "called an empty `Function`");
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct EmptyFunctionError;

impl core::fmt::Debug for EmptyFunctionError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EmptyFunctionError").finish()
    }
}

impl core::fmt::Display for EmptyFunctionError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "called an empty `Function`")
    }
}

impl core::error::Error for EmptyFunctionError {}
