#![cfg_attr(not(doc), no_std)]
#![deny(
    missing_docs,
    clippy::alloc_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::std_instead_of_core,
    clippy::missing_safety_doc,
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    clippy::as_ptr_cast_mut,
    clippy::ptr_as_ptr,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]
// Make docs.rs generate better docs
#![cfg_attr(docsrs, feature(doc_cfg))]

//! A cloneable, type-erased callable wrapper for Rust.
//!
//! ## Overview
//!
//! [`Function<S>`] holds any closure, function item, function pointer or
//! function object that can be called with the arguments of the signature
//! `S`, behind one uniform type. Code that stores or calls a [`Function`]
//! depends only on the signature, never on the concrete type of the target.
//!
//! Unlike `Box<dyn Fn(..)>`, a [`Function`] is a value type:
//!
//! - It can be **empty**, and tells you so through
//!   [`is_empty`](Function::is_empty) instead of needing an `Option`.
//! - It is **cloneable**: cloning deep-copies the target into an independent
//!   slot.
//! - Small targets are stored **inline**, without allocating. Larger ones
//!   go through a configurable [`AllocStrategy`].
//! - Every call can be wrapped in a [`CallPolicy`], a pair of hooks run
//!   before and after the target.
//!
//! ## Quick Example
//!
//! ```
//! use callbox::Function;
//!
//! fn add(a: i32, b: i32) -> i32 {
//!     a + b
//! }
//!
//! let mut f: Function<fn(i32, i32) -> i32> = Function::new(add);
//! assert_eq!(f.call((2, 3)), 5);
//!
//! let copy = f.clone();
//! assert_eq!(copy.call((10, 20)), 30);
//!
//! let multiplier = 10;
//! f.set(move |a: i32, b: i32| (a + b) * multiplier);
//! assert_eq!(f.call((1, 3)), 40);
//!
//! f.clear();
//! assert!(f.try_call((1, 3)).is_err());
//! ```
//!
//! Arguments are passed as a tuple: `f.call((2, 3))` for two arguments,
//! `f.call((x,))` for one and `f.call(())` for none.
//!
//! ## Type Parameters
//!
//! [`Function<S, T, P, A>`](Function) is generic over four parameters, but
//! only the first one usually needs to be spelled out:
//!
//! - **Signature (`S`)**: A function pointer type such as
//!   `fn(i32, i32) -> i32`. The result-less form is `fn(i32)`; use
//!   [`Discard`] to store a target whose result should be dropped.
//! - **Thread safety (`T`)**: [`markers::Local`] (default) accepts any
//!   target; [`markers::SendSync`] only accepts `Send + Sync` targets and
//!   makes the wrapper `Send + Sync`. [`SendFunction`] is a shorthand for
//!   the latter.
//! - **Policy (`P`)**: A [`CallPolicy`] run around every call. Defaults to
//!   [`NoPolicy`].
//! - **Allocation strategy (`A`)**: Where targets that do not fit the
//!   [`INLINE_SIZE`]-byte inline buffer are stored. Defaults to [`Global`].
//!
//! ## Empty wrappers
//!
//! Calling an empty [`Function`] is a bug in the caller, and
//! [`call`](Function::call) panics with ``called an empty `Function` ``. Use
//! [`try_call`](Function::try_call) to get an [`EmptyFunctionError`]
//! instead.
//!
//! A [`Function`] built from a target that itself represents "no target",
//! such as an empty nested [`Function`], is empty as well. See
//! [`Callable::is_empty_target`].
//!
//! ## Allocation failures
//!
//! Constructors, setters and [`Clone`] abort through
//! [`handle_alloc_error`](alloc::alloc::handle_alloc_error) when the
//! allocation strategy fails, like the standard collections do. Each has a
//! `try_` counterpart returning [`AllocError`]. An assignment always stores
//! the new target completely before dropping the old one, so a failed
//! assignment leaves the wrapper as it was.
//!
//! ## Ecosystem
//!
//! - **[`callbox-tracing`]** - A [`CallPolicy`] that instruments every call
//!   with a `tracing` span.
//!
//! For implementation details, see the [`callbox-internals`] crate.
//!
//! [`callbox-tracing`]: https://docs.rs/callbox-tracing
//! [`callbox-internals`]: callbox_internals
//! [`EmptyFunctionError`]: crate::error::EmptyFunctionError
//! [`AllocError`]: crate::error::AllocError

extern crate alloc;

pub mod callable;
pub mod error;
mod function;
pub mod markers;
pub mod policy;
pub mod prelude;
pub mod signature;

pub use callbox_internals::{
    AllocStrategy, Global, Placement,
    slot::{INLINE_ALIGN, INLINE_SIZE, INLINE_WORDS},
};

pub use self::{
    callable::{CallMode, Callable, Discard},
    function::{Function, SendFunction, swap},
    policy::{CallInfo, CallPolicy, NoPolicy},
    signature::Signature,
};
