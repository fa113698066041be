//! Marker types and traits for the thread-safety of a [`Function`].
//!
//! The thread-safety marker is the second type parameter of
//! [`Function<S, T, P, A>`](crate::Function):
//!
//! - [`Local`] (the default): The wrapper accepts any `'static` target,
//!   including ones holding `Rc` or `Cell`, and is neither `Send` nor `Sync`.
//! - [`SendSync`]: The wrapper only accepts targets that are `Send + Sync`,
//!   and in exchange is itself `Send` and `Sync`.
//!
//! The constraint is enforced at construction time through
//! [`TargetMarkerFor`]: it is impossible to put a target into a
//! `Function<_, SendSync>` that is not thread-safe.
//!
//! # Examples
//!
//! ```
//! use std::rc::Rc;
//!
//! use callbox::{Function, markers::SendSync};
//!
//! // Any target can go into a local wrapper
//! let greeting = Rc::new(String::from("hello"));
//! let local: Function<fn() -> usize> = Function::new(move || greeting.len());
//! assert_eq!(local.call(()), 5);
//!
//! // A thread-safe wrapper can move to another thread
//! let shared: Function<fn(u32) -> u32, SendSync> = Function::new(|x: u32| x * 2);
//! let handle = std::thread::spawn(move || shared.call((21,)));
//! assert_eq!(handle.join().unwrap(), 42);
//! ```
//!
//! [`Function`]: crate::Function

/// Marker type indicating that a [`Function`](crate::Function) only holds
/// targets that are `Send + Sync`.
///
/// A `Function<_, SendSync>` is `Send` and `Sync` whenever its allocation
/// strategy is.
///
/// # Examples
///
/// ```
/// use callbox::{Function, markers::SendSync};
///
/// fn assert_send_sync<T: Send + Sync>(_: &T) {}
///
/// let f: Function<fn() -> u8, SendSync> = Function::new(|| 1_u8);
/// assert_send_sync(&f);
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct SendSync;

/// Marker type indicating that a [`Function`](crate::Function) may hold
/// targets that are not thread-safe.
///
/// This is the default. Use it when a target captures `Rc<T>`, `Cell<T>`,
/// raw pointers or any other `!Send` or `!Sync` value.
///
/// # Examples
///
/// ```
/// use std::{cell::Cell, rc::Rc};
///
/// use callbox::{Function, markers::Local};
///
/// let hits = Rc::new(Cell::new(0));
/// let counter = hits.clone();
/// let f: Function<fn(), Local> = Function::new(move || counter.set(counter.get() + 1));
///
/// f.call(());
/// f.call(());
/// assert_eq!(hits.get(), 2);
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct Local;

/// Marker trait for targets that may be stored in a wrapper with the
/// thread-safety marker `T`.
///
/// # Implementations
///
/// - For `T = Local`: Implemented for all `Sized + 'static` types.
/// - For `T = SendSync`: Implemented only for `Sized + 'static` types that
///   are also `Send + Sync`.
///
/// This trait is used as a bound on every constructor and setter, so a
/// thread-safe wrapper cannot be given a thread-local target:
///
/// ```compile_fail
/// use std::rc::Rc;
///
/// use callbox::{Function, markers::SendSync};
///
/// let shared = Rc::new(5_u32);
/// let f: Function<fn() -> u32, SendSync> = Function::new(move || *shared);
/// ```
pub trait TargetMarkerFor<T>: Sized + 'static {}

impl<F: Sized + 'static> TargetMarkerFor<Local> for F {}

impl<F: Sized + 'static> TargetMarkerFor<SendSync> for F where F: Send + Sync {}
