//! A module that just re-exports the important parts of the crate.

pub use crate::{
  bidi::{reorder, reverse_span},
  dbgserial::{dbgserial_available, DbgSerialLogger, MessageLevel},
  hooks::{adjust_alignment, shaped_draw, shaped_measure},
  host::*,
  mem::{is_mutable, SRAM_BASE, SRAM_EXTENT},
  ranges::{is_neutral, is_rtl, is_weak_ltr, is_zero_width, ZERO_WIDTH_CODEPT},
  shaper::{shape_text, unshape_text},
  statics::Static,
};

#[cfg(feature = "on_watch")]
pub use crate::hooks::{draw_text_hook, measure_text_hook, render_line_hook};
