//! The type-erased call entry point.
//!
//! An [`Invoker`] is a plain function pointer, one per pair of callable type
//! and signature. It is the only piece of the engine that knows both the
//! argument tuple and the concrete callable type.

use core::ptr::NonNull;

use crate::callable::{CallMode, Callable};

/// Function pointer performing a call on an erased callable.
///
/// # Safety
///
/// An [`Invoker`] obtained from [`invoker::<F, Args, R>()`](invoker) may only
/// be called with:
///
/// 1. A pointer to a live, properly aligned `F`.
/// 2. If the mode is [`CallMode::Exclusive`], a pointer that is valid for
///    writes and not aliased for the duration of the call.
pub(crate) type Invoker<Args, R> = unsafe fn(NonNull<u8>, CallMode, Args) -> R;

/// Returns the [`Invoker`] for the callable type `F`, converting its output
/// into `R`.
#[inline]
pub(crate) fn invoker<F, Args, R>() -> Invoker<Args, R>
where
    F: Callable<Args>,
    F::Output: Into<R>,
{
    invoke::<F, Args, R>
}

/// Calls the `F` pointed to by `data`.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. `data` points to a live, properly aligned `F`.
/// 2. If `mode` is [`CallMode::Exclusive`], `data` is valid for writes and
///    no other reference to the `F` exists for the duration of the call.
unsafe fn invoke<F, Args, R>(data: NonNull<u8>, mode: CallMode, args: Args) -> R
where
    F: Callable<Args>,
    F::Output: Into<R>,
{
    let mut data = data.cast::<F>();
    match mode {
        CallMode::Shared => {
            // SAFETY:
            // 1. The pointer refers to a live, aligned `F` (guaranteed by the caller)
            let target: &F = unsafe { data.as_ref() };
            target.call(args).into()
        }
        CallMode::Exclusive => {
            // SAFETY:
            // 1. The pointer refers to a live, aligned `F` (guaranteed by the caller)
            // 2. Exclusive access is guaranteed by the caller
            let target: &mut F = unsafe { data.as_mut() };
            target.call_mut(args).into()
        }
    }
}
