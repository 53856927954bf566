//! Lock helpers shared by the stateful modules.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the guard if a previous holder panicked.
///
/// None of the guarded state can be left half-written by a panic (every
/// critical section is a handful of field assignments), so the inner value
/// is still consistent and safe to keep using.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
