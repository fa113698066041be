//! Behavioral tests for the public `Function` wrapper.
//!
//! These use `std` threads, unwinding and thread-locals, which the `no_std`
//! library crate does not link in its unit tests.

use std::{
    alloc::Layout,
    cell::{Cell, RefCell},
    panic::{AssertUnwindSafe, catch_unwind},
    ptr::NonNull,
    rc::Rc,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use callbox::{
    AllocStrategy, CallInfo, CallPolicy, Callable, Discard, Function, Global, NoPolicy, Placement,
    SendFunction,
    error::{AllocError, EmptyFunctionError},
    markers::Local,
};

fn add(a: i32, b: i32) -> i32 {
    a + b
}

type Adder = Function<fn(i32, i32) -> i32>;

/// Increments a shared counter when dropped.
#[derive(Clone)]
struct DropCounter(Rc<Cell<usize>>);

impl Drop for DropCounter {
    fn drop(&mut self) {
        self.0.set(self.0.get() + 1);
    }
}

#[test]
fn test_add_scenario() {
    let mut f = Adder::new(add);
    assert_eq!(f.call((2, 3)), 5);

    let copy = f.clone();
    assert_eq!(copy.call((10, 20)), 30);
    assert_eq!(f.call((2, 3)), 5);

    let multiplier = 10;
    f.set(move |a: i32, b: i32| (a + b) * multiplier);
    assert_eq!(f.call((1, 3)), 40);
    assert_eq!(copy.call((1, 3)), 4);

    f.clear();
    assert!(f.is_empty());
    assert!(!copy.is_empty());
}

#[test]
#[should_panic(expected = "called an empty `Function`")]
fn test_call_after_clear_panics() {
    let mut f = Adder::new(add);
    f.clear();
    f.call((1, 2));
}

#[test]
#[should_panic(expected = "called an empty `Function`")]
fn test_call_mut_on_default_panics() {
    let mut f = Adder::default();
    f.call_mut((1, 2));
}

#[test]
fn test_try_call_on_empty_returns_error() {
    let f = Adder::empty();
    assert_eq!(f.try_call((1, 2)), Err(EmptyFunctionError));
}

#[test]
fn test_copy_independence() {
    let drops = Rc::new(Cell::new(0));
    let counter = DropCounter(drops.clone());
    let mut original: Function<fn() -> usize> = Function::new(move || counter.0.get());
    let copy = original.clone();

    original.clear();
    assert_eq!(drops.get(), 1);
    assert_eq!(copy.call(()), 1);

    drop(copy);
    assert_eq!(drops.get(), 2);
}

#[test]
fn test_large_target_dropped_once() {
    let drops = Rc::new(Cell::new(0));
    let counter = DropCounter(drops.clone());
    let table = [3_u64; 16];
    let mut f: Function<fn(usize) -> u64> = Function::new(move |i: usize| {
        let _keep = &counter;
        table[i]
    });
    assert_eq!(f.placement(), Some(Placement::Indirect));

    let copy = f.clone();
    let mut other: Function<fn(usize) -> u64> = Function::new(|i: usize| i as u64);
    other.swap(&mut f);
    assert_eq!(other.call((2,)), 3);
    assert_eq!(f.call((2,)), 2);
    assert_eq!(drops.get(), 0);

    other.set(|_: usize| 0_u64);
    assert_eq!(drops.get(), 1);

    drop(copy);
    assert_eq!(drops.get(), 2);
}

#[test]
fn test_swap_symmetry() {
    let mut a = Adder::new(add);
    let mut b = Adder::new(|x: i32, y: i32| x * y);

    a.swap(&mut b);
    b.swap(&mut a);
    assert_eq!(a.call((3, 4)), 7);
    assert_eq!(b.call((3, 4)), 12);

    let mut c = a.clone();
    callbox::swap(&mut a, &mut c);
    assert_eq!(a.call((3, 4)), 7);
    assert_eq!(c.call((3, 4)), 7);

    let mut empty = Adder::empty();
    a.swap(&mut empty);
    assert!(a.is_empty());
    assert_eq!(empty.call((1, 1)), 2);
}

#[test]
fn test_self_assignment_forms() {
    let drops = Rc::new(Cell::new(0));
    let counter = DropCounter(drops.clone());
    let mut f: Function<fn() -> u8> = Function::new(move || {
        let _keep = &counter;
        9_u8
    });

    f.set(f.clone());
    assert_eq!(f.call(()), 9);

    f.clone_from(&f.clone());
    assert_eq!(f.call(()), 9);

    let snapshot = f.clone();
    f.assign_from(&snapshot).unwrap();
    drop(snapshot);
    assert_eq!(f.call(()), 9);

    drop(f);
    assert_eq!(Rc::strong_count(&drops), 1);
}

#[test]
fn test_every_clone_dropped() {
    let drops = Rc::new(Cell::new(0));
    {
        let counter = DropCounter(drops.clone());
        let f: Function<fn()> = Function::new(move || {
            let _keep = &counter;
        });
        let clones: Vec<_> = (0..5).map(|_| f.clone()).collect();
        for clone in &clones {
            clone.call(());
        }
    }
    assert_eq!(drops.get(), 6);
}

#[test]
fn test_from_option_and_nested_empty() {
    let none: Option<fn(i32, i32) -> i32> = None;
    assert!(Adder::from_option(none).is_empty());
    assert!(!Adder::from_option(Some(add as fn(i32, i32) -> i32)).is_empty());

    let nested = Adder::new(Adder::empty());
    assert!(nested.is_empty());
}

#[test]
fn test_result_conversion_and_discard() {
    let widen: Function<fn(u8) -> u64> = Function::new(|x: u8| x);
    assert_eq!(widen.call((200,)), 200_u64);

    let seen = Rc::new(Cell::new(0));
    let sink = seen.clone();
    let f: Function<fn(u32)> = Function::new(Discard(move |x: u32| {
        sink.set(x);
        x * 2
    }));
    f.call((21,));
    assert_eq!(seen.get(), 21);
}

#[test]
fn test_const_call_with_interior_mutability() {
    let f: Function<fn() -> u32> = Function::new({
        let calls = Rc::new(Cell::new(0_u32));
        move || {
            calls.set(calls.get() + 1);
            calls.get()
        }
    });
    assert_eq!(f.call(()), 1);
    assert_eq!(f.call(()), 2);
}

#[test]
fn test_const_call_on_inline_cell() {
    let counter = Cell::new(0_u32);
    let f: Function<fn() -> u32> = Function::new(move || {
        counter.set(counter.get() + 1);
        counter.get()
    });
    assert_eq!(f.placement(), Some(Placement::Inline));

    assert_eq!(f.call(()), 1);
    assert_eq!(f.call(()), 2);

    let copy = f.clone();
    assert_eq!(copy.call(()), 3);
    assert_eq!(f.call(()), 3);
}

#[test]
fn test_send_function_across_threads() {
    let total = Arc::new(AtomicUsize::new(0));
    let sink = total.clone();
    let f: SendFunction<fn(usize)> = Function::new(move |x: usize| {
        sink.fetch_add(x, Ordering::SeqCst);
    });

    let handles: Vec<_> = (1..=4)
        .map(|i| {
            let f = f.clone();
            std::thread::spawn(move || f.call((i,)))
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(total.load(Ordering::SeqCst), 10);
}

thread_local! {
    static EVENTS: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

#[derive(Default)]
struct Recording {
    depth: usize,
}

impl CallPolicy for Recording {
    fn precall(&mut self, info: &CallInfo) {
        self.depth += 1;
        EVENTS.with(|events| {
            events
                .borrow_mut()
                .push(format!("pre {:?} {}", info.mode(), info.signature()))
        });
    }

    fn postcall(&mut self, info: &CallInfo) {
        let panicking = std::thread::panicking();
        EVENTS.with(|events| {
            events.borrow_mut().push(format!(
                "post {:?} depth={} panicking={panicking}",
                info.mode(),
                self.depth
            ))
        });
    }
}

fn take_events() -> Vec<String> {
    EVENTS.with(|events| std::mem::take(&mut *events.borrow_mut()))
}

#[test]
fn test_policy_runs_around_calls() {
    take_events();
    let mut f: Function<fn(i32) -> i32, Local, Recording> = Function::new(|x: i32| x + 1);

    assert_eq!(f.call((1,)), 2);
    assert_eq!(f.call_mut((2,)), 3);
    assert_eq!(
        take_events(),
        [
            "pre Shared fn(i32) -> i32",
            "post Shared depth=1 panicking=false",
            "pre Exclusive fn(i32) -> i32",
            "post Exclusive depth=1 panicking=false",
        ]
    );

    let empty: Function<fn(i32) -> i32, Local, Recording> = Function::empty();
    assert!(empty.try_call((1,)).is_err());
    assert!(take_events().is_empty());
}

#[test]
fn test_policy_postcall_runs_on_panic() {
    take_events();
    let f: Function<fn(bool) -> i32, Local, Recording> = Function::new(|fail: bool| {
        if fail {
            panic!("target failed");
        }
        1
    });

    let result = catch_unwind(AssertUnwindSafe(|| f.call((true,))));
    assert!(result.is_err());
    assert_eq!(
        take_events(),
        [
            "pre Shared fn(bool) -> i32",
            "post Shared depth=1 panicking=true",
        ]
    );
    assert_eq!(f.call((false,)), 1);
}

/// Refuses every allocation.
#[derive(Clone, Copy, Default, Debug)]
struct Failing;

impl AllocStrategy for Failing {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        Err(AllocError::new(layout))
    }

    unsafe fn deallocate(&self, _ptr: NonNull<u8>, _layout: Layout) {
        unreachable!("nothing is ever allocated");
    }
}

#[test]
fn test_failed_assignment_keeps_previous_target() {
    let mut f: Function<fn() -> u64, Local, NoPolicy, Failing> =
        Function::new(|| 1_u64);
    assert_eq!(f.placement(), Some(Placement::Inline));

    let big = [2_u64; 8];
    let error = f.try_set(move || big[0]).unwrap_err();
    assert_eq!(error.layout(), Layout::new::<[u64; 8]>());
    assert_eq!(f.call(()), 1);

    let fresh = Function::<fn() -> u64, Local, NoPolicy, Failing>::try_new(move || big[1]);
    assert!(fresh.is_err());
}

/// Counts live blocks, forwarding to [`Global`].
#[derive(Clone, Default)]
struct Counting {
    live: Rc<Cell<isize>>,
}

impl AllocStrategy for Counting {
    const ALLOW_INLINE: bool = false;

    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        self.live.set(self.live.get() + 1);
        Global.allocate(layout)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.live.set(self.live.get() - 1);
        // SAFETY: Blocks only come from `Global`, the rest is forwarded from
        // the caller.
        unsafe { Global.deallocate(ptr, layout) }
    }
}

#[test]
fn test_custom_strategy_balances() {
    let alloc = Counting::default();
    {
        let offset = 5;
        let mut f: Function<fn(i32) -> i32, Local, NoPolicy, Counting> =
            Function::new_in(move |x: i32| x + offset, alloc.clone());
        assert_eq!(f.placement(), Some(Placement::Indirect));
        assert_eq!(alloc.live.get(), 1);

        let g = f.clone();
        assert_eq!(alloc.live.get(), 2);

        // Zero-sized targets never allocate
        f.set(|x: i32| x - 1);
        assert_eq!(alloc.live.get(), 1);
        assert_eq!(f.call((1,)), 0);
        assert_eq!(g.call((1,)), 6);

        f.clear();
        assert_eq!(alloc.live.get(), 1);
        assert!(std::ptr::eq(
            Rc::as_ptr(&f.allocator().live),
            Rc::as_ptr(&alloc.live)
        ));
    }
    assert_eq!(alloc.live.get(), 0);
}

#[test]
fn test_function_object_with_exclusive_call() {
    #[derive(Clone, Default)]
    struct Counter(u32);

    impl Callable<()> for Counter {
        type Output = u32;

        fn call(&self, (): ()) -> u32 {
            self.0
        }

        fn call_mut(&mut self, (): ()) -> u32 {
            self.0 += 1;
            self.0
        }
    }

    let mut f: Function<fn() -> u32> = Function::new(Counter::default());
    assert_eq!(f.call_mut(()), 1);
    assert_eq!(f.call_mut(()), 2);
    assert_eq!(f.call(()), 2);

    let copy = f.clone();
    f.call_mut(());
    assert_eq!(copy.call(()), 2);
    assert_eq!(f.target::<Counter>().map(|c| c.0), Some(3));
}
