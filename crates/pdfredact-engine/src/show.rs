//! Glyph placement for the text-showing operators (Tj, TJ, ', ").
//!
//! Walks string operands code by code, computing where each glyph lands on
//! the page and advancing the text matrix by the same displacement the
//! viewer would apply. Placements carry everything the patcher later needs
//! to cancel a removed glyph's advance.

use crate::text_state::TextState;
use pdfredact_core::{Ctm, GlyphPlacement, Point};

/// One element of a show-with-adjustments operand array. A plain string
/// operand is a single `Text` element.
#[derive(Debug, Clone, PartialEq)]
pub enum ShowElement {
    /// Raw string bytes; each 1 or 2 bytes form one character code
    /// depending on the active font.
    Text(Vec<u8>),
    /// Numeric adjustment in thousandths of text space. Positive moves
    /// left, negative moves right.
    Adjustment(f64),
}

/// Show a sequence of strings and adjustments, returning the glyph
/// placements in order. The text matrix advances exactly as it would during
/// rendering, so subsequent operators see the correct position.
pub fn show_elements(
    text_state: &mut TextState,
    ctm: &Ctm,
    page_height: f64,
    elements: &[ShowElement],
) -> Vec<GlyphPlacement> {
    let mut glyphs = Vec::new();

    for element in elements {
        match element {
            ShowElement::Text(bytes) => {
                show_bytes(text_state, ctm, page_height, bytes, &mut glyphs);
            }
            ShowElement::Adjustment(adj) => {
                // tx = -(adj / 1000) * Tfs * Th
                let tx = -(adj / 1000.0)
                    * text_state.font_size
                    * text_state.h_scaling_normalized();
                text_state.advance_text_position(tx);
            }
        }
    }

    glyphs
}

fn show_bytes(
    text_state: &mut TextState,
    ctm: &Ctm,
    page_height: f64,
    bytes: &[u8],
    out: &mut Vec<GlyphPlacement>,
) {
    for (code, byte_width) in decode_codes(bytes, text_state.font.byte_width()) {
        let font_size = text_state.font_size;
        let h_scaling = text_state.h_scaling_normalized();

        // Word spacing applies only to single-byte code 32.
        let word_spacing = if byte_width == 1 && code == 32 {
            text_state.word_spacing
        } else {
            0.0
        };

        let w0 = text_state.font.get_width(code);
        let advance =
            ((w0 / 1000.0) * font_size + text_state.char_spacing + word_spacing) * h_scaling;

        // Glyph origin: the rise-shifted text-space origin through Tm × CTM.
        let to_page = text_state.text_matrix().concat(ctm);
        let origin = to_page.transform_point(Point::new(0.0, text_state.rise));
        // Rendered extents assume an axis-aligned combined matrix; rotated
        // text is a documented inaccuracy, not an error.
        let width = advance * to_page.a;
        let height = (font_size * to_page.d).abs();

        out.push(GlyphPlacement {
            code,
            byte_width,
            x: origin.x,
            y: page_height - origin.y,
            width,
            height,
            page_height,
            h_scaling,
            advance,
            font_size,
        });

        text_state.advance_text_position(advance);
    }
}

/// Split string bytes into character codes at the font's code width.
/// A trailing odd byte in a two-byte font becomes a single-byte code.
fn decode_codes(bytes: &[u8], byte_width: u8) -> Vec<(u32, u8)> {
    if byte_width == 2 {
        let mut codes = Vec::with_capacity(bytes.len() / 2 + 1);
        let mut i = 0;
        while i < bytes.len() {
            if i + 1 < bytes.len() {
                codes.push(((u32::from(bytes[i]) << 8) | u32::from(bytes[i + 1]), 2));
                i += 2;
            } else {
                codes.push((u32::from(bytes[i]), 1));
                i += 1;
            }
        }
        codes
    } else {
        bytes.iter().map(|&b| (u32::from(b), 1)).collect()
    }
}
