//! Rewrites Arabic base letters into their contextual presentation forms.
//!
//! The host firmware's glyph lookup is a dumb code-point-to-bitmap table, so
//! joining behavior has to be decided *before* the text reaches it. This
//! module streams over a string once, rewriting each shapeable rune in place
//! with its isolated, initial, medial, or final glyph, and folding lam-alef
//! pairs into single ligature glyphs. Because every glyph the tables produce
//! is a 2-byte rune like its source, the buffer never changes length and the
//! host's layout math stays valid.
//!
//! [`unshape_text`] is the exact inverse; the entry wrappers run it after
//! the host primitive returns so nothing else in the firmware can observe
//! the rewritten bytes.

pub mod ligature;
pub mod lut;

use crate::{
  ranges::{is_zero_width, ZERO_WIDTH_CODEPT},
  utf8,
};
use lut::ShaperEntry;

/// Whether the next shapeable letter starts a run or continues one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
  Initial,
  Medial,
}

/// The last slot written as initial or medial. If the run ends without a
/// connecting successor, this slot has to be rewritten — isolated if it was
/// emitted as initial, final if as medial. A one-slot rewind instead of a
/// second pass.
struct LateFinalize {
  pos: usize,
  entry: &'static ShaperEntry,
  was: RunState,
}

#[inline]
fn finalize_pending(text: &mut [u8], pending: &mut Option<LateFinalize>) {
  if let Some(p) = pending.take() {
    let form = match p.was {
      RunState::Initial => p.entry.isolated,
      RunState::Medial => p.entry.final_form(),
    };
    utf8::encode_in_place(text, p.pos, form);
  }
}

/// Shapes `text` (the bytes of a NUL-terminated string, NUL excluded) in
/// place. Returns `true` if any rune was rewritten.
///
/// One forward pass with a one-rune lookahead. A letter can only be emitted
/// as final once its successor is known not to connect, which the lookahead
/// covers for ordinary letters; runs that end on a zero-width rune are
/// patched up through the late-finalize rewind instead.
pub fn shape_text(text: &mut [u8]) -> bool {
  if text.is_empty() {
    return false;
  }

  let mut state = RunState::Initial;
  let mut pending: Option<LateFinalize> = None;
  let mut did_shape = false;

  let mut cursor = 0;
  let mut next_pos = 0;
  let mut next_cp = utf8::decode(text, &mut cursor);
  let mut next_entry = lut::find_entry(next_cp);

  loop {
    let this_pos = next_pos;
    let this_cp = next_cp;
    let this_entry = next_entry;
    if cursor < text.len() {
      next_pos = cursor;
      next_cp = utf8::decode(text, &mut cursor);
      next_entry = lut::find_entry(next_cp);
    } else {
      next_pos = text.len();
      next_cp = 0;
      next_entry = None;
    }

    let folded =
      if next_cp != 0 { ligature::try_merge(this_cp, next_cp) } else { None };
    if let Some(repl) = folded {
      // Folded: the replacement takes over the successor's slot and gets
      // shaped on the next iteration (connecting to our predecessor through
      // the untouched run state); this rune becomes the invisible
      // placeholder that keeps the byte count.
      utf8::encode_in_place(text, this_pos, ZERO_WIDTH_CODEPT);
      next_cp = repl;
      next_entry = lut::find_entry(repl);
      did_shape = true;
    } else if is_zero_width(this_cp) {
      // Invisible runes are transparent to the run: the letters on either
      // side of a placeholder still connect.
    } else if let Some(entry) = this_entry {
      did_shape = true;
      let run_ends = (next_entry.is_none() && !is_zero_width(next_cp))
        || entry.has_no_medial();
      if run_ends {
        let form = match state {
          RunState::Initial => entry.isolated,
          RunState::Medial => entry.final_form(),
        };
        utf8::encode_in_place(text, this_pos, form);
        pending = None;
        state = RunState::Initial;
      } else {
        let form = match state {
          RunState::Initial => entry.initial(),
          RunState::Medial => entry.medial(),
        };
        utf8::encode_in_place(text, this_pos, form);
        pending = Some(LateFinalize { pos: this_pos, entry, was: state });
        state = RunState::Medial;
      }
    } else {
      // Not shapeable: the run is broken, so a dangling initial/medial
      // emission gets its rewind.
      finalize_pending(text, &mut pending);
      state = RunState::Initial;
    }

    if next_cp == 0 {
      break;
    }
  }
  // A trailing zero-width rune slips past the lookahead's end-of-run test.
  finalize_pending(text, &mut pending);

  did_shape
}

/// Undoes [`shape_text`] in place.
///
/// Every code point in the presentation window is rewritten with its base.
/// A ligature glyph expands back to its source pair: the pattern is written
/// backward from the glyph's slot, overwriting the zero-width placeholder in
/// the slot before it. The table only carries two-rune patterns.
pub fn unshape_text(text: &mut [u8]) {
  let mut pos = 0;
  let mut prev_pos: Option<usize> = None;
  while pos < text.len() {
    let rune_pos = pos;
    let cp = utf8::decode(text, &mut pos);
    if cp == 0 {
      break;
    }
    if let Some((entry, _)) = lut::find_form(cp) {
      match ligature::replacement_pattern(entry.base) {
        Some(&[p0, p1]) => {
          if let Some(placeholder_pos) = prev_pos {
            utf8::encode_in_place(text, placeholder_pos, p0);
            utf8::encode_in_place(text, rune_pos, p1);
          }
        }
        _ => utf8::encode_in_place(text, rune_pos, entry.base),
      }
    }
    prev_pos = Some(rune_pos);
  }
}
