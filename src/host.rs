//! Types and callbacks shared with the patched firmware.
//!
//! Everything here mirrors the host's own ABI: the geometry structs are
//! passed by value exactly as the firmware passes them, the opaque types
//! stand in for firmware objects we only ever move pointers of, and the
//! `HOST_*` slots hold the real text primitives the hooks forward to.
//!
//! The patch layer must fill the slots while it installs the call-site
//! redirects, before any of them can fire. A hook whose slot is still empty
//! does nothing — by the non-interference rule, an incompletely installed
//! patch must degrade to stock behavior, not crash.

use crate::statics::Static;
use core::ffi::c_void;

/// A width/height pair, as the host measures text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
#[allow(missing_docs)]
pub struct Size {
  pub w: i16,
  pub h: i16,
}

/// A screen position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
#[allow(missing_docs)]
pub struct Point {
  pub x: i16,
  pub y: i16,
}

/// The box text is laid out into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
#[allow(missing_docs)]
pub struct Rect {
  pub origin: Point,
  pub size: Size,
}

/// The host's horizontal text alignment setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct TextAlignment(pub u32);

impl TextAlignment {
  /// Flush left.
  pub const LEFT: Self = Self(0);
  /// Centered.
  pub const CENTER: Self = Self(1);
  /// Flush right.
  pub const RIGHT: Self = Self(2);
}

/// The overflow-mode value a host diagnostics app passes to observe shaped
/// bytes: when a measure call carries it, the buffer is left shaped on
/// return. An external contract; preserve it verbatim.
pub const DIAGNOSTIC_SENTINEL: u32 = 0xE5;

/// Firmware graphics context. Only ever handled by pointer.
#[repr(C)]
pub struct GraphicsContext {
  _opaque: [u8; 0],
}

/// Firmware font object. Only ever handled by pointer.
#[repr(C)]
pub struct FontHandle {
  _opaque: [u8; 0],
}

/// Firmware text-attribute object. Only ever handled by pointer.
#[repr(C)]
pub struct TextAttributes {
  _opaque: [u8; 0],
}

/// The firmware's real content-size primitive.
pub type MeasureFn = unsafe extern "C" fn(
  text: *mut u8,
  font: *const FontHandle,
  bx: Rect,
  overflow_mode: u32,
  alignment: TextAlignment,
  attrs: *mut TextAttributes,
) -> Size;

/// The firmware's real draw primitive.
pub type DrawFn = unsafe extern "C" fn(
  ctx: *mut GraphicsContext,
  text: *mut u8,
  font: *const FontHandle,
  bx: Rect,
  overflow_mode: u32,
  alignment: TextAlignment,
  attrs: *mut TextAttributes,
);

/// The firmware's real per-line render handler. The third argument is
/// whatever the caller had parked in its stack frame
/// ([`RENDERHDLR_ARG3_SP_OFF`](crate::mem::RENDERHDLR_ARG3_SP_OFF)).
pub type RenderLineFn = unsafe extern "C" fn(
  ctx: *mut GraphicsContext,
  layout: *mut *mut u8,
  arg: *mut c_void,
);

/// Where [`measure_text_hook`](crate::hooks::measure_text_hook) forwards to.
pub static HOST_MEASURE: Static<Option<MeasureFn>> = Static::new(None);

/// Where [`draw_text_hook`](crate::hooks::draw_text_hook) forwards to.
pub static HOST_DRAW: Static<Option<DrawFn>> = Static::new(None);

/// Where [`render_line_hook`](crate::hooks::render_line_hook) forwards to.
pub static HOST_RENDER_LINE: Static<Option<RenderLineFn>> = Static::new(None);

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn geometry_matches_the_host_abi() {
    assert_eq!(core::mem::size_of::<Size>(), 4);
    assert_eq!(core::mem::size_of::<Rect>(), 8);
    assert_eq!(core::mem::size_of::<TextAlignment>(), 4);
  }

  #[test]
  fn slots_start_empty() {
    assert!(HOST_MEASURE.read().is_none());
    assert!(HOST_DRAW.read().is_none());
    assert!(HOST_RENDER_LINE.read().is_none());
  }
}
