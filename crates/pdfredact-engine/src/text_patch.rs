//! Patching of text-showing operators.
//!
//! Given the glyph placements a show-text operator produced and a predicate
//! saying which of them are redacted, the patcher emits one of three
//! outcomes: the operator unchanged, the operator dropped, or a single
//! resynthesized `TJ` whose numeric adjustments cancel the advance of every
//! removed glyph so the kept glyphs stay at their original positions.

use crate::error::EngineError;
use crate::ops::{require_f64, require_string, tj_elements};
use crate::show::ShowElement;
use lopdf::content::Operation;
use lopdf::{Object, StringFormat};
use pdfredact_core::GlyphPlacement;

/// Outcome of patching one show-text operator.
#[derive(Debug, Clone)]
pub enum TextPatch {
    /// No glyph matched a region; emit the original operator.
    Unchanged,
    /// Every glyph matched. Nothing is painted; `prelude` carries the
    /// state side effects (`T*`, `Tw`, `Tc`) the operator form implied, so
    /// dropping the paint does not shift later lines.
    Dropped { prelude: Vec<Operation> },
    /// Some glyphs matched: `ops` is the prelude plus one synthesized `TJ`.
    Replaced {
        ops: Vec<Operation>,
        /// True when a string run mixed code byte widths and the per-run
        /// byte-width derivation was approximate.
        approximate_widths: bool,
    },
}

/// Operators the patcher applies to.
pub fn is_show_text_operator(operator: &str) -> bool {
    matches!(operator, "Tj" | "'" | "\"" | "TJ")
}

/// Patch one show-text operator.
///
/// `glyphs` must be the placements produced while applying exactly this
/// operator, in show order. An operator that placed no glyphs (empty string,
/// pure-adjustment array) passes through unchanged.
pub fn patch_show_text(
    op: &Operation,
    glyphs: &[GlyphPlacement],
    is_redacted: &dyn Fn(&GlyphPlacement) -> bool,
) -> Result<TextPatch, EngineError> {
    if glyphs.is_empty() {
        return Ok(TextPatch::Unchanged);
    }

    let flags: Vec<bool> = glyphs.iter().map(is_redacted).collect();
    if !flags.iter().any(|&f| f) {
        return Ok(TextPatch::Unchanged);
    }

    let (elements, prelude) = decompose(op)?;

    if flags.iter().all(|&f| f) {
        return Ok(TextPatch::Dropped { prelude });
    }

    let mut builder = TjBuilder::default();
    let mut cursor = 0usize;
    for element in &elements {
        match element {
            ShowElement::Adjustment(adj) => builder.fold_adjustment(*adj),
            ShowElement::Text(bytes) => {
                let count = glyphs_in_element(&glyphs[cursor..], bytes.len());
                for (glyph, &redacted) in glyphs[cursor..cursor + count]
                    .iter()
                    .zip(&flags[cursor..cursor + count])
                {
                    if redacted {
                        builder.remove_glyph(glyph);
                    } else {
                        builder.keep_glyph(glyph);
                    }
                }
                cursor += count;
                // Runs never span operand strings: the byte-width derivation
                // is per original run.
                builder.flush_run();
            }
        }
    }

    let mut ops = prelude;
    ops.push(Operation::new("TJ", vec![Object::Array(builder.operands)]));
    Ok(TextPatch::Replaced {
        ops,
        approximate_widths: builder.approximate,
    })
}

/// Split an operator into its show elements and the state-effect prelude
/// that must survive any patch of that operator form.
fn decompose(op: &Operation) -> Result<(Vec<ShowElement>, Vec<Operation>), EngineError> {
    match op.operator.as_str() {
        "Tj" => Ok((vec![ShowElement::Text(require_string(op, 0)?)], Vec::new())),
        "'" => Ok((
            vec![ShowElement::Text(require_string(op, 0)?)],
            vec![Operation::new("T*", vec![])],
        )),
        "\"" => {
            require_f64(op, 0)?;
            require_f64(op, 1)?;
            let string = require_string(op, 2)?;
            let prelude = vec![
                Operation::new("Tw", vec![op.operands[0].clone()]),
                Operation::new("Tc", vec![op.operands[1].clone()]),
                Operation::new("T*", vec![]),
            ];
            Ok((vec![ShowElement::Text(string)], prelude))
        }
        "TJ" => Ok((tj_elements(op)?, Vec::new())),
        other => Err(EngineError::malformed(other, "not a show-text operator")),
    }
}

/// How many of the leading `glyphs` came from a string of `byte_len` bytes.
fn glyphs_in_element(glyphs: &[GlyphPlacement], byte_len: usize) -> usize {
    let mut consumed = 0usize;
    let mut count = 0usize;
    for glyph in glyphs {
        if consumed >= byte_len {
            break;
        }
        consumed += usize::from(glyph.byte_width);
        count += 1;
    }
    count
}

/// Assembles the alternating adjustment/string operand sequence.
#[derive(Default)]
struct TjBuilder {
    operands: Vec<Object>,
    /// Pending displacement in thousandths, flushed before each kept run.
    accumulator: f64,
    run: Vec<(u32, u8)>,
    approximate: bool,
}

impl TjBuilder {
    fn fold_adjustment(&mut self, adj: f64) {
        self.accumulator += adj;
    }

    fn remove_glyph(&mut self, glyph: &GlyphPlacement) {
        self.flush_run();
        self.accumulator -= glyph.advance_in_thousandths();
    }

    fn keep_glyph(&mut self, glyph: &GlyphPlacement) {
        self.run.push((glyph.code, glyph.byte_width));
    }

    fn flush_run(&mut self) {
        if self.run.is_empty() {
            return;
        }
        if self.accumulator != 0.0 {
            self.operands.push(Object::Real(self.accumulator as f32));
            self.accumulator = 0.0;
        }

        let total_bytes: usize = self.run.iter().map(|&(_, w)| usize::from(w)).sum();
        // Exact for fixed-width runs; an approximation when widths mix.
        let byte_width = (total_bytes / self.run.len()).max(1);
        if total_bytes % self.run.len() != 0 {
            self.approximate = true;
        }

        let mut bytes = Vec::with_capacity(total_bytes);
        for &(code, _) in &self.run {
            if byte_width >= 2 {
                bytes.push((code >> 8) as u8);
                bytes.push((code & 0xFF) as u8);
            } else {
                if code > 0xFF {
                    self.approximate = true;
                }
                bytes.push((code & 0xFF) as u8);
            }
        }
        self.operands
            .push(Object::String(bytes, StringFormat::Literal));
        self.run.clear();
    }
}
