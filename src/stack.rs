//! Stack growth for the recursive parser and evaluator.
//!
//! Deeply nested source (or deep user recursion below the call-depth limit)
//! would otherwise overflow the host stack before any limit could report it.

/// Grow the stack when less than this remains.
const RED_ZONE: usize = 100 * 1024;

/// Size of each new stack segment.
const STACK_PER_RECURSION: usize = 1024 * 1024;

#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}
