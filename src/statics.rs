//! A volatile cell for the host-function slots.
//!
//! The patch layer resolves the firmware's real text primitives while it
//! rewrites the call sites, then parks the addresses here for the hooks to
//! call through. That is the only global data in the crate: written once at
//! install time, read on every redirected call, always from the single
//! render thread.
//!
//! Accesses go through `read_volatile`/`write_volatile` so the compiler
//! neither caches a pre-install `None` nor splits the access; the stored
//! values are register-width (function pointers), which on this core makes a
//! volatile access a single load or store.

use core::cell::UnsafeCell;

/// A global cell holding a `Copy` value, readable and writable through a
/// shared reference.
#[repr(transparent)]
pub struct Static<T> {
  data: UnsafeCell<T>,
}

unsafe impl<T: Copy + Send> Sync for Static<T> {}

impl<T: Copy> Static<T> {
  /// Makes a new cell holding `val`.
  #[inline]
  #[must_use]
  pub const fn new(val: T) -> Self {
    Self { data: UnsafeCell::new(val) }
  }

  /// Reads the current value.
  #[inline]
  #[must_use]
  pub fn read(&self) -> T {
    unsafe { core::ptr::read_volatile(self.data.get()) }
  }

  /// Replaces the value.
  #[inline]
  pub fn write(&self, val: T) {
    unsafe { core::ptr::write_volatile(self.data.get(), val) }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  static CELL: Static<u32> = Static::new(7);

  #[test]
  fn read_write_round_trip() {
    assert_eq!(CELL.read(), 7);
    CELL.write(42);
    assert_eq!(CELL.read(), 42);
    CELL.write(7);
  }

  #[test]
  fn holds_function_pointers() {
    fn double(x: u32) -> u32 {
      x * 2
    }
    static SLOT: Static<Option<fn(u32) -> u32>> = Static::new(None);
    assert!(SLOT.read().is_none());
    SLOT.write(Some(double));
    assert_eq!(SLOT.read().map(|f| f(21)), Some(42));
  }
}
