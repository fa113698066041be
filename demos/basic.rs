//! Basic introduction to callbox function wrappers.
//!
//! This example demonstrates the fundamental concepts:
//! 1. Storing functions and closures in a `Function`
//! 2. Copying, reassigning and clearing a wrapper
//! 3. Calling an empty wrapper without panicking
//! 4. Inspecting the stored target

use callbox::{Discard, Function, Placement, SendFunction};

fn add(a: i32, b: i32) -> i32 {
    a + b
}

/// A function object with state that changes on every exclusive call.
#[derive(Clone, Debug, Default)]
struct Accumulator {
    total: i64,
}

impl callbox::Callable<(i32,)> for Accumulator {
    type Output = i64;

    fn call(&self, (value,): (i32,)) -> i64 {
        self.total + i64::from(value)
    }

    fn call_mut(&mut self, (value,): (i32,)) -> i64 {
        self.total += i64::from(value);
        self.total
    }
}

fn main() {
    println!("=== Basic Function Wrappers ===\n");

    // Example 1: A plain function, copied into a second wrapper
    println!("Example 1: Copying a wrapper");
    let mut f: Function<fn(i32, i32) -> i32> = Function::new(add as fn(i32, i32) -> i32);
    let g = f.clone();
    println!("f(2, 3) = {}", f.call((2, 3)));
    println!("g(10, 20) = {}", g.call((10, 20)));
    println!();

    // Example 2: Reassigning to a closure leaves the copy untouched
    println!("Example 2: Reassigning to a closure");
    let multiplier = 10;
    f.set(move |a: i32, b: i32| (a + b) * multiplier);
    println!("f(1, 3) = {}", f.call((1, 3)));
    println!("g(1, 3) = {}", g.call((1, 3)));
    println!();

    // Example 3: An empty wrapper reports itself instead of being called
    println!("Example 3: Clearing a wrapper");
    f.clear();
    println!("f is empty: {}", f.is_empty());
    match f.try_call((1, 3)) {
        Ok(value) => println!("f(1, 3) = {value}"),
        Err(error) => println!("f(1, 3) failed: {error}"),
    }
    println!();

    // Example 4: Looking at what is stored, and where
    println!("Example 4: Inspecting the target");
    println!("{g:?}");
    println!("holds `add`: {}", g.contains::<fn(i32, i32) -> i32>());
    let table = [7_u64; 64];
    let lookup: Function<fn(usize) -> u64> = Function::new(move |i: usize| table[i]);
    assert_eq!(lookup.placement(), Some(Placement::Indirect));
    println!("lookup(3) = {} ({:?})", lookup.call((3,)), lookup.placement());
    println!();

    // Example 5: Function objects keep their own state
    println!("Example 5: A stateful function object");
    let mut acc: Function<fn(i32) -> i64> = Function::new(Accumulator::default());
    for value in [1, 2, 3] {
        println!("acc += {value} -> {}", acc.call_mut((value,)));
    }
    if let Some(inner) = acc.target::<Accumulator>() {
        println!("stored total: {}", inner.total);
    }
    println!();

    // Example 6: Dropping a result, and sharing across threads
    println!("Example 6: Discarding results on another thread");
    let log: SendFunction<fn(&'static str)> =
        Function::new(Discard(|line: &'static str| line.len()));
    let handle = std::thread::spawn(move || {
        log.call(("from a worker thread",));
        log.is_empty()
    });
    println!("worker saw an empty wrapper: {:?}", handle.join());
}
