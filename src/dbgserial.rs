//! Lets you write to the watch's debug serial port.
//!
//! The port is the firmware's own UART: the bootloader configures it, the
//! firmware logs through it, and a developer cradle picks it up. We only
//! ever transmit, and only off the hot path (the hooks log when they decline
//! to transform something), so the interface is deliberately small:
//!
//! * First `use core::fmt::Write;` so the [`Write`](core::fmt::Write) trait
//!   is in scope.
//! * Try to make a logger with `DbgSerialLogger::try_new(message_level)`.
//! * Use the `write!`/`writeln!` macros to write into it.
//!
//! Each line goes out with a level tag (`[W] ...`), matching the format the
//! firmware's own log lines use. [`DbgSerialLogger::try_new`] fails when the
//! UART is disabled (production watches ship with it off), and on non-watch
//! builds logging is never available, so callers must tolerate `Err` —
//! which they get for free by just dropping the message.

use bitfrob::u32_get_bit;
use voladdress::{Safe, VolAddress};

/// UART status register; bit 7 is "transmit register empty".
pub const DBG_UART_STATUS: VolAddress<u32, Safe, ()> =
  unsafe { VolAddress::new(0x4000_4800) };

/// UART data register; writing the low byte transmits it.
pub const DBG_UART_DATA: VolAddress<u32, (), Safe> =
  unsafe { VolAddress::new(0x4000_4804) };

/// UART control register; bit 13 is the enable flag.
pub const DBG_UART_CONTROL: VolAddress<u32, Safe, ()> =
  unsafe { VolAddress::new(0x4000_480C) };

/// How long to spin waiting for the transmitter before giving the byte up.
/// The render thread must not wedge behind a stalled port.
const TX_SPIN_LIMIT: u32 = 10_000;

/// Severity tag for a log line.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum MessageLevel {
  Error,
  #[default]
  Warning,
  Info,
  Debug,
}

impl MessageLevel {
  const fn tag(self) -> u8 {
    match self {
      MessageLevel::Error => b'E',
      MessageLevel::Warning => b'W',
      MessageLevel::Info => b'I',
      MessageLevel::Debug => b'D',
    }
  }
}

/// Returns if the debug UART is up and logging is possible.
///
/// Always `false` off the watch (including under `cargo test`, where the
/// register addresses mean nothing).
#[inline]
pub fn dbgserial_available() -> bool {
  #[cfg(all(feature = "on_watch", not(test)))]
  {
    u32_get_bit(13, DBG_UART_CONTROL.read())
  }
  #[cfg(any(not(feature = "on_watch"), test))]
  {
    false
  }
}

/// A line-oriented logger over the debug UART.
///
/// Every line is prefixed with the level tag; dropping the logger closes an
/// unfinished line.
pub struct DbgSerialLogger {
  at_line_start: bool,
  pub message_level: MessageLevel,
}

impl DbgSerialLogger {
  /// Makes a logger, if the UART is enabled.
  pub fn try_new(message_level: MessageLevel) -> Result<Self, ()> {
    if dbgserial_available() {
      Ok(Self { at_line_start: true, message_level })
    } else {
      Err(())
    }
  }

  fn send(&self, byte: u8) {
    let mut spins = 0;
    while !u32_get_bit(7, DBG_UART_STATUS.read()) {
      spins += 1;
      if spins >= TX_SPIN_LIMIT {
        return;
      }
    }
    DBG_UART_DATA.write(byte as u32);
  }
}

impl Drop for DbgSerialLogger {
  fn drop(&mut self) {
    if !self.at_line_start {
      self.send(b'\n');
    }
  }
}

impl core::fmt::Write for DbgSerialLogger {
  fn write_str(&mut self, s: &str) -> core::fmt::Result {
    for b in s.bytes() {
      if self.at_line_start && b != b'\n' {
        for p in [b'[', self.message_level.tag(), b']', b' '] {
          self.send(p);
        }
        self.at_line_start = false;
      }
      self.send(b);
      if b == b'\n' {
        self.at_line_start = true;
      }
    }
    Ok(())
  }
}
