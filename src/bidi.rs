//! Reorders right-to-left runs so the firmware's left-to-right glyph pump
//! draws them in visual order.
//!
//! The host renders one line at a time, walking the bytes forward. This
//! module reverses each RTL run of a line in place before the host sees it,
//! then gets called again afterward to undo itself: reversing a span twice
//! restores the original bytes, so the undo is the transform.
//!
//! The reversal itself is the two-pass trick: reverse the span byte-wise
//! (which puts the runes in the right order but turns every multibyte rune
//! inside out), then walk the span backward fixing each rune's bytes back
//! into transmission order. No scratch buffer, no length change.

use crate::{ranges, utf8};

/// Rune classes the span scanner distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Class {
  /// Strong right-to-left.
  Rtl,
  /// Digits: lay out LTR but don't end an RTL run.
  Weak,
  /// Takes the direction of its surroundings.
  Neutral,
  /// Control bytes; never drawn, treated as hard terminators.
  Ctl,
  /// Everything else: strong LTR.
  Ltr,
}

#[inline]
fn classify(cp: u16) -> Class {
  if ranges::is_rtl(cp) {
    Class::Rtl
  } else if ranges::is_weak_ltr(cp) {
    Class::Weak
  } else if ranges::is_neutral(cp) {
    Class::Neutral
  } else if cp < 0x20 {
    Class::Ctl
  } else {
    Class::Ltr
  }
}

/// Can a neutral stay inside the span when this follows it?
#[inline]
fn absorbs(successor: Class) -> bool {
  matches!(successor, Class::Rtl | Class::Weak | Class::Neutral | Class::Ctl)
}

/// The mirrored counterpart of a bracket glyph, if `cp` has one.
#[inline]
fn mirrored(cp: u16) -> Option<u8> {
  Some(match cp {
    0x28 => b')',
    0x29 => b'(',
    0x5B => b']',
    0x5D => b'[',
    0x7B => b'}',
    0x7D => b'{',
    0x3C => b'>',
    0x3E => b'<',
    _ => return None,
  })
}

/// Swaps every bracket in the slice with its mirror image.
///
/// Brackets are single ASCII bytes and UTF-8 trail bytes are always `0x80`
/// or above, so a plain byte walk cannot false-match inside a rune.
fn mirror_brackets(span: &mut [u8]) {
  let mut i = 0;
  while i < span.len() {
    if let Some(m) = mirrored(span[i] as u16) {
      span[i] = m;
    }
    i += 1;
  }
}

/// Reverses the runes of `span` in place.
///
/// Pass one is an unconditional byte reversal. Pass two walks backward over
/// the result: a lead byte now sits at the *end* of its rune, so its high
/// nibble says how many bytes to swap back into place.
pub fn reverse_span(span: &mut [u8]) {
  span.reverse();
  let mut i = span.len();
  while i > 0 {
    i -= 1;
    match span[i] >> 4 {
      0xF if i >= 3 => {
        span.swap(i - 3, i);
        span.swap(i - 2, i - 1);
        i -= 3;
      }
      0xE if i >= 2 => {
        span.swap(i - 2, i);
        i -= 2;
      }
      0xC | 0xD if i >= 1 => {
        span.swap(i - 1, i);
        i -= 1;
      }
      _ => {}
    }
  }
}

/// Reverses a closed span: the weak sub-span first (so its digits come back
/// out LTR after the outer reversal), then the run itself.
fn close_span(
  line: &mut [u8], start: usize, weak_start: Option<usize>, weak_end: usize,
  end: usize,
) -> bool {
  if let Some(ws) = weak_start {
    if ws < weak_end {
      reverse_span(&mut line[ws..weak_end]);
    }
  }
  if start < end {
    reverse_span(&mut line[start..end]);
    return true;
  }
  false
}

/// Reorders the RTL runs of one line, in place. Returns `true` iff any span
/// was reversed; callers undo the whole thing by calling this again.
///
/// One forward scan with a one-rune lookahead:
///
/// * an RTL rune opens a span (no point for a lone trailing one);
/// * a run of neutrals/digits at the very start of the line is remembered
///   and joins the span retroactively if the first strong rune is RTL;
/// * digits inside a span form a weak sub-span that is counter-reversed
///   when a strong rune closes it, so they still read LTR afterward;
/// * a neutral inside a span is absorbed (and bracket-mirrored) unless the
///   next rune is strong LTR, which ends the span before the neutral;
/// * strong LTR and control runes close the span at its *retained* end, the
///   position after its last RTL or digit rune, leaving absorbed neutrals
///   that turned out to be trailing where they were;
/// * the end of the line closes the span including absorbed trailing
///   neutrals, which is what moves run-final punctuation to the visual
///   left.
pub fn reorder(line: &mut [u8]) -> bool {
  let len = line.len();
  let mut transformed = false;

  let mut rtl_start: Option<usize> = None;
  let mut weak_start: Option<usize> = None;
  let mut span_end = 0;
  // The line-leading neutral/digit run, still waiting for a strong rune.
  let mut leading = true;
  let mut anchor: Option<usize> = None;
  let mut anchor_weak: Option<usize> = None;

  let mut pos = 0;
  while pos < len {
    let rune_pos = pos;
    let cp = utf8::decode(line, &mut pos);
    match classify(cp) {
      Class::Rtl => {
        if rtl_start.is_none() {
          if let Some(a) = anchor.take() {
            rtl_start = Some(a);
            weak_start = anchor_weak.take();
            mirror_brackets(&mut line[a..rune_pos]);
          } else if pos < len {
            rtl_start = Some(rune_pos);
          }
        }
        if rtl_start.is_some() {
          if let Some(ws) = weak_start.take() {
            if ws < rune_pos {
              reverse_span(&mut line[ws..rune_pos]);
            }
          }
          span_end = pos;
        }
        leading = false;
        anchor = None;
        anchor_weak = None;
      }
      Class::Weak => {
        if rtl_start.is_some() {
          if weak_start.is_none() {
            weak_start = Some(rune_pos);
          }
          span_end = pos;
        } else if leading {
          if anchor.is_none() {
            anchor = Some(rune_pos);
          }
          if anchor_weak.is_none() {
            anchor_weak = Some(rune_pos);
          }
        }
      }
      Class::Neutral => {
        if rtl_start.is_some() {
          let succ =
            if pos < len { classify(utf8::peek(line, pos)) } else { Class::Ctl };
          if absorbs(succ) {
            if let Some(m) = mirrored(cp) {
              line[rune_pos] = m;
            }
          } else {
            transformed |= close_span(
              line,
              rtl_start.take().unwrap_or(rune_pos),
              weak_start.take(),
              span_end,
              span_end,
            );
          }
        } else if leading {
          if anchor.is_none() {
            anchor = Some(rune_pos);
          }
        } else if mirrored(cp).is_some()
          && pos < len
          && classify(utf8::peek(line, pos)) == Class::Rtl
        {
          // A bracket hugging an RTL run from the left belongs to the run.
          rtl_start = Some(rune_pos);
          span_end = pos;
          line[rune_pos] = mirrored(cp).unwrap_or(line[rune_pos]);
        }
      }
      Class::Ltr | Class::Ctl => {
        if let Some(start) = rtl_start.take() {
          transformed |=
            close_span(line, start, weak_start.take(), span_end, span_end);
        }
        weak_start = None;
        leading = false;
        anchor = None;
        anchor_weak = None;
      }
    }
  }

  if let Some(start) = rtl_start {
    transformed |= close_span(line, start, weak_start, span_end, len);
  }

  transformed
}

#[cfg(test)]
mod tests {
  use super::*;

  fn apply(s: &str) -> ([u8; 64], usize, bool) {
    let mut buf = [0u8; 64];
    buf[..s.len()].copy_from_slice(s.as_bytes());
    let t = reorder(&mut buf[..s.len()]);
    (buf, s.len(), t)
  }

  #[track_caller]
  fn assert_reorders(input: &str, expected: &str) {
    let (buf, n, t) = apply(input);
    assert_eq!(
      core::str::from_utf8(&buf[..n]).unwrap(),
      expected,
      "forward"
    );
    assert!(t);
    // Applying again must restore the original line.
    let mut undo = buf;
    assert!(reorder(&mut undo[..n]));
    assert_eq!(&undo[..n], input.as_bytes(), "undo");
  }

  #[test]
  fn reverse_span_repairs_runes() {
    let mut b: [u8; 6] = "aب€".as_bytes().try_into().unwrap();
    reverse_span(&mut b);
    assert_eq!(core::str::from_utf8(&b).unwrap(), "€بa");
    reverse_span(&mut b);
    assert_eq!(core::str::from_utf8(&b).unwrap(), "aب€");
  }

  #[test]
  fn arabic_run_between_latin_reverses() {
    assert_reorders("A ب ج B", "A ج ب B");
  }

  #[test]
  fn digits_inside_a_run_stay_ltr() {
    assert_reorders("ا123ب", "ب123ا");
  }

  #[test]
  fn brackets_mirror_and_swap_ends() {
    // The logical '(' ends up rightmost as a ')' glyph and vice versa, so
    // the bytes come out identical while every glyph changed place.
    let (buf, n, t) = apply("(ا)");
    assert!(t);
    assert_eq!(&buf[..n], "(ا)".as_bytes());
    let mut undo = buf;
    assert!(reorder(&mut undo[..n]));
    assert_eq!(&undo[..n], "(ا)".as_bytes());
  }

  #[test]
  fn hebrew_reverses_too() {
    assert_reorders("שלום", "םולש");
  }

  #[test]
  fn pure_ltr_is_untouched() {
    let (buf, n, t) = apply("just some text 123");
    assert!(!t);
    assert_eq!(&buf[..n], b"just some text 123");
  }

  #[test]
  fn lone_trailing_rtl_rune_is_not_a_span() {
    let (buf, n, t) = apply("abc ا");
    assert!(!t);
    assert_eq!(&buf[..n], "abc ا".as_bytes());
  }

  #[test]
  fn trailing_punctuation_moves_to_the_visual_left() {
    assert_reorders("ب.", ".ب");
    assert_reorders("ب!!", "!!ب");
  }

  #[test]
  fn leading_neutrals_join_a_following_run() {
    assert_reorders(". ب", "ب .");
  }

  #[test]
  fn interior_bracket_pair_around_a_run() {
    let (buf, n, t) = apply("A (ا)");
    assert!(t);
    assert_eq!(&buf[..n], "A (ا)".as_bytes());
  }

  #[test]
  fn run_followed_by_latin_keeps_its_trailing_space() {
    assert_reorders("ب ج A", "ج ب A");
  }

  #[test]
  fn mixed_line_round_trips() {
    for s in ["A ب ج B", "ا123ب", "(ا)", "ب123", "קצר ارض", "ب, ج"] {
      let mut buf = [0u8; 64];
      buf[..s.len()].copy_from_slice(s.as_bytes());
      reorder(&mut buf[..s.len()]);
      reorder(&mut buf[..s.len()]);
      assert_eq!(&buf[..s.len()], s.as_bytes(), "{s} did not round-trip");
    }
  }

  #[test]
  fn byte_length_never_changes() {
    for s in ["A ب ج B", "ا123ب", "(ا)", "שלום"] {
      let mut buf = [0u8; 64];
      buf[..s.len()].copy_from_slice(s.as_bytes());
      reorder(&mut buf[..s.len()]);
      assert_eq!(&buf[s.len()..], &[0u8; 64][s.len()..], "{s} grew");
    }
  }
}
