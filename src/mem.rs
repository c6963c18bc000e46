//! Address-window checks for buffers the firmware hands us.
//!
//! The watch keeps its firmware in memory-mapped flash and its live data in
//! SRAM. A string pointer can refer to either: UI code passes heap and stack
//! buffers, but plenty of label text is a bare pointer into flash. Writing
//! through the latter is somewhere between a no-op and a bus fault, so every
//! in-place transformation is gated on [`is_mutable`].
//!
//! The window is deliberately generous at the bottom: it starts at the
//! core-coupled RAM, where notification popup strings live, and runs to the
//! end of ordinary SRAM. Anything outside is presumed read-only and left
//! alone.

/// Lowest address treated as writable (start of core-coupled RAM).
pub const SRAM_BASE: usize = 0x1000_0000;

/// Highest address treated as writable (last byte of SRAM).
pub const SRAM_EXTENT: usize = 0x2001_FFFF;

/// Byte offset from the captured caller stack pointer to the slot holding
/// the current line-end pointer during the host's line layout loop. When the
/// layout has no further text the value lives one slot higher.
pub const LINEEND_SP_OFF: usize = 0x18;

/// Byte offset from the captured caller stack pointer to the third argument
/// of the host's line render handler.
pub const RENDERHDLR_ARG3_SP_OFF: usize = 0x08;

/// Does `p` point into the SRAM window, i.e. may we write through it?
#[inline]
#[must_use]
pub fn is_mutable<T>(p: *const T) -> bool {
  let addr = p as usize;
  (SRAM_BASE..=SRAM_EXTENT).contains(&addr)
}

/// Length of the NUL-terminated string at `p`, not counting the NUL.
///
/// ## Safety
/// * `p` must point to a readable NUL-terminated byte sequence.
#[inline]
#[must_use]
pub unsafe fn cstr_len(p: *const u8) -> usize {
  let mut n = 0;
  while unsafe { p.add(n).read() } != 0 {
    n += 1;
  }
  n
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn flash_and_peripheral_addresses_are_not_mutable() {
    assert!(!is_mutable(0x0800_0000 as *const u8)); // microflash
    assert!(!is_mutable(0x4000_4800 as *const u8)); // peripheral space
    assert!(!is_mutable(core::ptr::null::<u8>()));
  }

  #[test]
  fn sram_window_is_mutable_inclusive() {
    assert!(is_mutable(SRAM_BASE as *const u8));
    assert!(is_mutable(0x2000_0400 as *const u8));
    assert!(is_mutable(SRAM_EXTENT as *const u8));
    assert!(!is_mutable((SRAM_EXTENT + 1) as *const u8));
  }

  #[test]
  fn cstr_len_counts_to_the_nul() {
    let bytes = b"salaam\0junk";
    assert_eq!(unsafe { cstr_len(bytes.as_ptr()) }, 6);
    let empty = b"\0";
    assert_eq!(unsafe { cstr_len(empty.as_ptr()) }, 0);
  }
}
