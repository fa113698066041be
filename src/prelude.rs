//! Commonly used items for convenient importing.
//!
//! # Usage
//!
//! ```rust
//! use callbox::prelude::*;
//!
//! fn apply(f: &Function<fn(u32) -> u32>, value: u32) -> u32 {
//!     f.call((value,))
//! }
//!
//! let double: Function<fn(u32) -> u32> = Function::new(|x: u32| x * 2);
//! assert_eq!(apply(&double, 21), 42);
//! ```
//!
//! # What's Included
//!
//! - **[`Function`]** and **[`SendFunction`]**: The wrapper types
//! - **[`Callable`]**: The trait implemented by everything a wrapper can hold
//! - **[`Discard`]**: Adapter dropping a target's result
//! - **[`CallPolicy`]** and **[`CallInfo`]**: Call hooks
//! - **[`markers`]**: Thread-safety markers

pub use crate::{
    CallInfo, CallPolicy, Callable, Discard, Function, SendFunction, markers,
};
