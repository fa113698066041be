//! Pre-call and post-call hooks.
//!
//! Every [`Function`](crate::Function) carries a call policy as a type
//! parameter. For each call, a fresh policy value is created with
//! [`Default`], its [`precall`](CallPolicy::precall) step runs, the target is
//! invoked, and then the same value's [`postcall`](CallPolicy::postcall) step
//! runs. The post-call step also runs while unwinding from a panicking
//! target.
//!
//! The default policy, [`NoPolicy`], does nothing and compiles away.
//!
//! # Examples
//!
//! ```
//! use std::cell::Cell;
//!
//! use callbox::{CallInfo, CallPolicy, Function, markers::Local};
//!
//! thread_local! {
//!     static CALLS: Cell<u32> = const { Cell::new(0) };
//! }
//!
//! #[derive(Default)]
//! struct CountCalls;
//!
//! impl CallPolicy for CountCalls {
//!     fn precall(&mut self, _info: &CallInfo) {
//!         CALLS.with(|calls| calls.set(calls.get() + 1));
//!     }
//! }
//!
//! let f: Function<fn(u8) -> u8, Local, CountCalls> = Function::new(|x: u8| x + 1);
//! f.call((1,));
//! f.call((2,));
//! assert_eq!(CALLS.with(Cell::get), 2);
//! ```

use core::any::TypeId;

use callbox_internals::{AllocStrategy, CallMode, Placement, RawCallable};

/// A pair of hooks run around every call of a
/// [`Function`](crate::Function).
///
/// Both methods default to doing nothing.
pub trait CallPolicy: Default {
    /// Runs before the target is invoked.
    #[inline]
    fn precall(&mut self, info: &CallInfo) {
        let _ = info;
    }

    /// Runs after the target returned or panicked.
    ///
    /// Use `std::thread::panicking()` to tell the two apart.
    #[inline]
    fn postcall(&mut self, info: &CallInfo) {
        let _ = info;
    }
}

/// The policy that does nothing. This is the default.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct NoPolicy;

impl CallPolicy for NoPolicy {}

/// What a [`CallPolicy`] gets to know about the call it surrounds.
#[derive(Copy, Clone, Debug)]
pub struct CallInfo {
    /// Type name of the target
    target_type_name: &'static str,
    /// Type id of the target
    target_type_id: TypeId,
    /// Entry point the call came through
    mode: CallMode,
    /// Where the target is stored
    placement: Placement,
    /// Type name of the wrapper's signature
    signature: &'static str,
}

impl CallInfo {
    /// Describes a call with `mode` on `raw`, for a wrapper with signature
    /// `S`.
    pub(crate) fn new<S, Args, R, A>(raw: &RawCallable<Args, R, A>, mode: CallMode) -> Self
    where
        A: AllocStrategy,
    {
        Self {
            target_type_name: raw.type_name(),
            target_type_id: raw.type_id(),
            mode,
            placement: raw.placement(),
            signature: core::any::type_name::<S>(),
        }
    }

    /// The [`core::any::type_name`] of the target.
    #[inline]
    pub fn target_type_name(&self) -> &'static str {
        self.target_type_name
    }

    /// The [`TypeId`] of the target.
    #[inline]
    pub fn target_type_id(&self) -> TypeId {
        self.target_type_id
    }

    /// Whether the call came through [`call`](crate::Function::call) or
    /// [`call_mut`](crate::Function::call_mut).
    #[inline]
    pub fn mode(&self) -> CallMode {
        self.mode
    }

    /// Where the target is stored.
    #[inline]
    pub fn placement(&self) -> Placement {
        self.placement
    }

    /// The [`core::any::type_name`] of the wrapper's signature, such as
    /// `fn(i32) -> i32`.
    #[inline]
    pub fn signature(&self) -> &'static str {
        self.signature
    }
}

/// Holds the policy value of one call and runs its post-call step on drop.
pub(crate) struct PolicyGuard<'a, P: CallPolicy> {
    policy: P,
    info: &'a CallInfo,
}

impl<'a, P: CallPolicy> PolicyGuard<'a, P> {
    /// Creates the policy value for a call and runs its pre-call step.
    #[inline]
    pub(crate) fn enter(info: &'a CallInfo) -> Self {
        let mut policy = P::default();
        policy.precall(info);
        Self { policy, info }
    }
}

impl<P: CallPolicy> Drop for PolicyGuard<'_, P> {
    #[inline]
    fn drop(&mut self) {
        self.policy.postcall(self.info);
    }
}

#[cfg(test)]
mod tests {
    use alloc::{rc::Rc, vec::Vec};
    use core::cell::RefCell;

    use super::*;
    use crate::Global;

    fn info_for_adder() -> CallInfo {
        let raw = RawCallable::<(i32, i32), i32, Global>::new(|a: i32, b: i32| a + b, Global)
            .unwrap();
        CallInfo::new::<fn(i32, i32) -> i32, _, _, _>(&raw, CallMode::Shared)
    }

    #[test]
    fn test_call_info() {
        let info = info_for_adder();
        assert_eq!(info.signature(), "fn(i32, i32) -> i32");
        assert_eq!(info.mode(), CallMode::Shared);
        assert_eq!(info.placement(), Placement::Inline);
        assert!(info.target_type_name().contains("closure"));
    }

    #[test]
    fn test_guard_runs_both_steps_on_one_value() {
        #[derive(Default)]
        struct Steps {
            seen: Rc<RefCell<Vec<&'static str>>>,
        }

        impl CallPolicy for Steps {
            fn precall(&mut self, _info: &CallInfo) {
                self.seen.borrow_mut().push("pre");
            }

            fn postcall(&mut self, _info: &CallInfo) {
                self.seen.borrow_mut().push("post");
            }
        }

        let info = info_for_adder();
        let guard = PolicyGuard::<Steps>::enter(&info);
        let seen = guard.policy.seen.clone();
        assert_eq!(*seen.borrow(), ["pre"]);

        drop(guard);
        assert_eq!(*seen.borrow(), ["pre", "post"]);
    }
}
