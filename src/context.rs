//! Execution context: mode flags consulted during graph construction.
//!
//! The engine keeps a small set of boolean flags (backprop recording,
//! train vs. eval) in thread-local storage. Flags are mutated only through
//! scoped overrides: [`using`] returns a guard that restores the previous
//! value when dropped, on every exit path including unwinding.

use std::cell::Cell;
use std::thread::LocalKey;

thread_local! {
    static ENABLE_BACKPROP: Cell<bool> = Cell::new(true);
    static TRAIN: Cell<bool> = Cell::new(true);
}

/// A named mode flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    /// Whether operations record provenance edges into the graph.
    EnableBackprop,
    /// Train vs. evaluation behavior, consulted by higher layers
    /// (e.g. dropout); not interpreted by the engine itself.
    Train,
}

impl Flag {
    fn store(self) -> &'static LocalKey<Cell<bool>> {
        match self {
            Flag::EnableBackprop => &ENABLE_BACKPROP,
            Flag::Train => &TRAIN,
        }
    }

    /// Current value of the flag on this thread.
    pub fn get(self) -> bool {
        self.store().with(Cell::get)
    }

    fn set(self, value: bool) {
        self.store().with(|cell| cell.set(value));
    }
}

/// Restores the overridden flag to its previous value on drop.
///
/// Scopes nest: each guard saves and restores independently.
#[must_use = "the override ends as soon as the guard is dropped"]
pub struct ContextGuard {
    flag: Flag,
    prev: bool,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        self.flag.set(self.prev);
    }
}

/// Override `flag` to `value` for the lifetime of the returned guard.
pub fn using(flag: Flag, value: bool) -> ContextGuard {
    let prev = flag.get();
    flag.set(value);
    ContextGuard { flag, prev }
}

/// Run operations without growing the computational graph.
pub fn no_grad() -> ContextGuard {
    using(Flag::EnableBackprop, false)
}

/// Switch to evaluation mode.
pub fn eval_mode() -> ContextGuard {
    using(Flag::Train, false)
}

/// Whether operations currently record graph edges.
pub fn backprop_enabled() -> bool {
    Flag::EnableBackprop.get()
}

/// Whether the engine is in training mode.
pub fn is_training() -> bool {
    Flag::Train.get()
}
