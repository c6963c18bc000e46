//! The redirected entry points for the firmware's text primitives.
//!
//! Each hook is a thin sandwich around the real primitive: transform the
//! caller's buffer, forward the call, put the bytes back. Nothing outside
//! the sandwiched call can ever observe a transformed buffer, so the rest of
//! the firmware (text caches, hash checks, reused layout state) keeps
//! working on the exact bytes it wrote.
//!
//! The raw hooks at the bottom take the firmware ABI as the patch layer
//! redirects it. The slice-level functions above them carry the actual
//! pre/post logic over `&mut [u8]` and are what the host-side tests drive.
//!
//! Guard policy throughout: when anything looks wrong — string in flash,
//! empty string, corrupt stack capture, missing passthru — skip our step and
//! let the host do whatever it was going to do. Degrading to stock rendering
//! is always acceptable; faulting in the render loop is not.

use crate::{
  host::{TextAlignment, DIAGNOSTIC_SENTINEL},
  ranges, shaper, utf8,
};

#[cfg(feature = "on_watch")]
use crate::{
  bidi,
  dbgserial::{DbgSerialLogger, MessageLevel},
  host::{
    FontHandle, GraphicsContext, Rect, Size, TextAttributes, HOST_DRAW,
    HOST_MEASURE, HOST_RENDER_LINE,
  },
  mem,
};
#[cfg(feature = "on_watch")]
use core::{ffi::c_void, fmt::Write};

/// Left alignment is a default, not a choice: if the text turns out to lead
/// with an RTL code point, the writer meant the other edge. Neutrals and
/// digits don't get a vote; the first opinionated code point decides.
#[must_use]
pub fn adjust_alignment(
  text: &[u8], alignment: TextAlignment,
) -> TextAlignment {
  if alignment != TextAlignment::LEFT {
    return alignment;
  }
  let mut pos = 0;
  while pos < text.len() {
    let cp = utf8::decode(text, &mut pos);
    if cp == 0 {
      break;
    }
    if ranges::is_neutral(cp) || ranges::is_weak_ltr(cp) {
      continue;
    }
    if ranges::is_rtl(cp) {
      return TextAlignment::RIGHT;
    }
    break;
  }
  alignment
}

/// The measure sandwich over a buffer already in hand as a slice: shape,
/// run `passthru`, unshape — unless the diagnostics sentinel asks to see
/// the shaped bytes, in which case they stay.
pub fn shaped_measure<R>(
  text: &mut [u8], overflow_mode: u32, passthru: impl FnOnce(&mut [u8]) -> R,
) -> R {
  let shaped = shaper::shape_text(text);
  let out = passthru(text);
  if shaped && overflow_mode != DIAGNOSTIC_SENTINEL {
    shaper::unshape_text(text);
  }
  out
}

/// The draw sandwich: shape, fix the alignment, run `passthru`, unshape.
pub fn shaped_draw<R>(
  text: &mut [u8], alignment: TextAlignment,
  passthru: impl FnOnce(&mut [u8], TextAlignment) -> R,
) -> R {
  let shaped = shaper::shape_text(text);
  let alignment = adjust_alignment(text, alignment);
  let out = passthru(text, alignment);
  if shaped {
    shaper::unshape_text(text);
  }
  out
}

/// Redirected target of the firmware's text measurement primitive.
///
/// ## Safety
/// * Only callable from patched firmware call sites: `text` must be a valid
///   NUL-terminated string pointer, and the slot conventions of the host ABI
///   must hold.
#[cfg(feature = "on_watch")]
#[cfg_attr(feature = "doc_cfg", doc(cfg(feature = "on_watch")))]
#[no_mangle]
pub unsafe extern "C" fn measure_text_hook(
  text: *mut u8, font: *const FontHandle, bx: Rect, overflow_mode: u32,
  alignment: TextAlignment, attrs: *mut TextAttributes,
) -> Size {
  let Some(host) = HOST_MEASURE.read() else {
    return Size::default();
  };
  let len = if mem::is_mutable(text) {
    unsafe { mem::cstr_len(text) }
  } else {
    0
  };
  let shaped = len > 0
    && shaper::shape_text(unsafe {
      core::slice::from_raw_parts_mut(text, len)
    });
  let out = unsafe { host(text, font, bx, overflow_mode, alignment, attrs) };
  if shaped && overflow_mode != DIAGNOSTIC_SENTINEL {
    shaper::unshape_text(unsafe {
      core::slice::from_raw_parts_mut(text, len)
    });
  }
  out
}

/// Redirected target of the firmware's text draw primitive.
///
/// ## Safety
/// * As [`measure_text_hook`].
#[cfg(feature = "on_watch")]
#[cfg_attr(feature = "doc_cfg", doc(cfg(feature = "on_watch")))]
#[no_mangle]
pub unsafe extern "C" fn draw_text_hook(
  ctx: *mut GraphicsContext, text: *mut u8, font: *const FontHandle,
  bx: Rect, overflow_mode: u32, alignment: TextAlignment,
  attrs: *mut TextAttributes,
) {
  let Some(host) = HOST_DRAW.read() else {
    return;
  };
  let len = if mem::is_mutable(text) {
    unsafe { mem::cstr_len(text) }
  } else {
    0
  };
  let mut alignment = alignment;
  let mut shaped = false;
  if len > 0 {
    let buf = unsafe { core::slice::from_raw_parts_mut(text, len) };
    shaped = shaper::shape_text(buf);
    alignment = adjust_alignment(buf, alignment);
  }
  unsafe { host(ctx, text, font, bx, overflow_mode, alignment, attrs) };
  if shaped {
    shaper::unshape_text(unsafe {
      core::slice::from_raw_parts_mut(text, len)
    });
  }
}

/// Redirected target of the host's per-line render dispatch.
///
/// The line to draw starts at `*layout`; where it ends only exists in the
/// caller's stack frame, at one of two slots off the captured stack pointer
/// depending on whether more text follows. Production units occasionally
/// hand us a junk stack capture, so it is range-checked before any slot is
/// read; on failure the line is rendered untransformed (and the event goes
/// to the debug serial, where a cradle will catch it).
///
/// ## Safety
/// * Only callable from the patched render-dispatch site, with `layout` and
///   `callsite_sp` captured exactly as that site's frame lays them out.
#[cfg(feature = "on_watch")]
#[cfg_attr(feature = "doc_cfg", doc(cfg(feature = "on_watch")))]
#[no_mangle]
pub unsafe extern "C" fn render_line_hook(
  ctx: *mut GraphicsContext, layout: *mut *mut u8, more_text: bool,
  callsite_sp: *mut u8,
) {
  let Some(host) = HOST_RENDER_LINE.read() else {
    return;
  };

  let sp_ok = mem::is_mutable(callsite_sp);
  if !sp_ok {
    if let Ok(mut log) = DbgSerialLogger::try_new(MessageLevel::Warning) {
      writeln!(
        log,
        "render_line: sp {:08X} outside sram, line left alone",
        callsite_sp as usize
      )
      .ok();
    }
  }

  let mut undo: Option<(*mut u8, usize)> = None;
  if sp_ok && mem::is_mutable(layout) {
    let line_start = unsafe { layout.read() };
    if mem::is_mutable(line_start) && unsafe { line_start.read() } != 0 {
      let off = if more_text {
        mem::LINEEND_SP_OFF
      } else {
        mem::LINEEND_SP_OFF + 4
      };
      let mut line_end =
        unsafe { (callsite_sp.add(off) as *const *mut u8).read() };
      if mem::is_mutable(line_end) && line_end > line_start {
        // The layout keeps padding spaces on the line; they'd reorder to
        // the middle of the text, so the span stops short of them.
        while line_end > line_start && unsafe { line_end.sub(1).read() } == b' '
        {
          line_end = unsafe { line_end.sub(1) };
        }
        let len = line_end as usize - line_start as usize;
        if len > 0 {
          let line = unsafe { core::slice::from_raw_parts_mut(line_start, len) };
          if bidi::reorder(line) {
            undo = Some((line_start, len));
          }
        }
      }
    }
  }

  let arg = if sp_ok {
    unsafe {
      (callsite_sp.add(mem::RENDERHDLR_ARG3_SP_OFF) as *const *mut c_void)
        .read()
    }
  } else {
    core::ptr::null_mut()
  };
  unsafe { host(ctx, layout, arg) };

  if let Some((p, len)) = undo {
    bidi::reorder(unsafe { core::slice::from_raw_parts_mut(p, len) });
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::host::Size;

  #[test]
  fn alignment_flips_left_for_rtl_text() {
    let t = "مرحبا".as_bytes();
    assert_eq!(adjust_alignment(t, TextAlignment::LEFT), TextAlignment::RIGHT);
  }

  #[test]
  fn alignment_skips_neutrals_and_digits() {
    let t = " 12(ب".as_bytes();
    assert_eq!(adjust_alignment(t, TextAlignment::LEFT), TextAlignment::RIGHT);
  }

  #[test]
  fn alignment_keeps_left_for_ltr_text() {
    let t = " hello ب".as_bytes();
    assert_eq!(adjust_alignment(t, TextAlignment::LEFT), TextAlignment::LEFT);
  }

  #[test]
  fn alignment_keeps_left_when_nothing_is_opinionated() {
    assert_eq!(
      adjust_alignment(b" .,:", TextAlignment::LEFT),
      TextAlignment::LEFT
    );
    assert_eq!(adjust_alignment(b"", TextAlignment::LEFT), TextAlignment::LEFT);
  }

  #[test]
  fn alignment_never_touches_non_left_settings() {
    let t = "مرحبا".as_bytes();
    assert_eq!(
      adjust_alignment(t, TextAlignment::CENTER),
      TextAlignment::CENTER
    );
    assert_eq!(
      adjust_alignment(t, TextAlignment::RIGHT),
      TextAlignment::RIGHT
    );
  }

  #[test]
  fn measure_sees_shaped_bytes_and_restores_them() {
    let s = "محمد";
    let mut buf = [0u8; 16];
    buf[..s.len()].copy_from_slice(s.as_bytes());
    let mut observed = [0u8; 16];
    shaped_measure(&mut buf[..s.len()], 0, |t| {
      observed[..t.len()].copy_from_slice(t);
      Size { w: t.len() as i16, h: 1 }
    });
    assert_ne!(&observed[..s.len()], s.as_bytes(), "host saw raw bytes");
    assert_eq!(&buf[..s.len()], s.as_bytes(), "buffer not restored");
  }

  #[test]
  fn measure_result_passes_through() {
    let mut buf = *b"plain";
    let size =
      shaped_measure(&mut buf, 0, |_| Size { w: 17, h: 3 });
    assert_eq!(size, Size { w: 17, h: 3 });
  }

  #[test]
  fn diagnostic_sentinel_leaves_the_buffer_shaped() {
    let s = "محمد";
    let mut buf = [0u8; 16];
    buf[..s.len()].copy_from_slice(s.as_bytes());
    shaped_measure(&mut buf[..s.len()], DIAGNOSTIC_SENTINEL, |_| ());
    assert_ne!(&buf[..s.len()], s.as_bytes(), "sentinel must keep shaping");
    shaper::unshape_text(&mut buf[..s.len()]);
    assert_eq!(&buf[..s.len()], s.as_bytes());
  }

  #[test]
  fn draw_adjusts_alignment_and_restores_the_buffer() {
    let s = "سلام";
    let mut buf = [0u8; 16];
    buf[..s.len()].copy_from_slice(s.as_bytes());
    let mut seen = TextAlignment::LEFT;
    shaped_draw(&mut buf[..s.len()], TextAlignment::LEFT, |_, a| seen = a);
    assert_eq!(seen, TextAlignment::RIGHT);
    assert_eq!(&buf[..s.len()], s.as_bytes());
  }

  #[test]
  fn draw_leaves_latin_alignment_alone() {
    let mut buf = *b"hello";
    let mut seen = TextAlignment::RIGHT;
    shaped_draw(&mut buf, TextAlignment::LEFT, |_, a| seen = a);
    assert_eq!(seen, TextAlignment::LEFT);
    assert_eq!(&buf, b"hello");
  }

  // An unregistered passthru slot must make the hook bail before it so much
  // as reads the text pointer: a half-installed patch degrades to nothing.
  #[cfg(feature = "on_watch")]
  #[test]
  fn hook_with_no_passthru_does_nothing() {
    let flash_string = 0x0800_1000 as *mut u8;
    let out = unsafe {
      measure_text_hook(
        flash_string,
        core::ptr::null(),
        Rect::default(),
        0,
        TextAlignment::LEFT,
        core::ptr::null_mut(),
      )
    };
    assert_eq!(out, Size::default());
  }
}
