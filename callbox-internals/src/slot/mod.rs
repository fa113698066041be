//! Module containing the storage cell a callable is erased into.
//!
//! A slot is either a small inline buffer holding the callable's bytes
//! directly, or a pointer to a block owned by the slot. Which of the two is
//! used is decided once per callable type by [`Placement::of`], never per
//! value.

mod placement;
mod storage;

pub use self::placement::{INLINE_ALIGN, INLINE_SIZE, INLINE_WORDS, Placement};
pub(crate) use self::storage::SlotStorage;
