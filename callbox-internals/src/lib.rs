#![no_std]
#![forbid(
    missing_docs,
    clippy::alloc_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::std_instead_of_core,
    clippy::missing_safety_doc,
    clippy::missing_docs_in_private_items,
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]
#![allow(rustdoc::private_intra_doc_links)]
//! Internal implementation crate for [`callbox`].
//!
//! # Overview
//!
//! This crate contains the low-level, type-erased storage and the unsafe
//! operations that power the [`callbox`] callable wrapper. It erases a
//! concrete callable type into a uniform owned value that can be invoked,
//! cloned and destroyed through function pointers only.
//!
//! **This crate is an implementation detail.** No semantic versioning
//! guarantees are provided. Users should depend on the [`callbox`] crate, not
//! this one.
//!
//! # Architecture
//!
//! - **[`slot`]**: The storage cell a callable is erased into
//!   - [`Placement`]: The static inline-vs-indirect decision for a type
//!   - [`SlotStorage`]: A word-sized-aligned union holding either the
//!     callable's bytes or a pointer to an owned heap block
//! - **[`manager`]**: The per-type [`Manager`] table implementing clone,
//!   destroy and type inspection on a [`SlotStorage`]
//! - **[`invoker`]**: The per-type, per-signature [`Invoker`] function
//!   pointer performing the actual call
//! - **[`raw`]**: [`RawCallable`], the owned erased value tying a slot to its
//!   manager and invoker
//! - **[`callable`]**: The [`Callable`] trait describing what can be stored
//! - **[`alloc`]**: The [`AllocStrategy`] configuration point for indirect
//!   storage
//!
//! # Safety Strategy
//!
//! Once a callable of type `F` has been written into a [`SlotStorage`], the
//! only thing that remembers `F` is the pair of `'static` function tables
//! chosen at that moment. The engine stays sound by making it impossible to
//! pair a slot with tables for a different type:
//!
//! - **Module-based encapsulation**: the fields of [`RawCallable`] and
//!   [`Manager`] are private to their modules, so the pairing invariant can
//!   be checked by reading a single file
//! - **Move-only ownership**: [`RawCallable`] has no `Copy` or unchecked
//!   clone, and releases its slot only in its `Drop` impl, so the destroy
//!   operation runs exactly once per stored value
//! - **Documented vtable contracts**: each table entry states precisely when
//!   it may be called
//!
//! [`callbox`]: https://docs.rs/callbox/latest/callbox/
//! [`Placement`]: slot::Placement
//! [`SlotStorage`]: slot::SlotStorage
//! [`Manager`]: manager::Manager
//! [`Invoker`]: invoker::Invoker
//! [`AllocStrategy`]: alloc::AllocStrategy

extern crate alloc as alloc_crate;

pub mod alloc;
pub mod callable;
mod invoker;
mod manager;
mod raw;
pub mod slot;

pub use self::{
    alloc::{AllocError, AllocStrategy, Global},
    callable::{CallMode, Callable},
    raw::RawCallable,
    slot::Placement,
};
