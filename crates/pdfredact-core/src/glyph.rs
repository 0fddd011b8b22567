//! Transient glyph placement produced while a show-text operator is applied.

/// Where one glyph landed on the page, plus everything the text patcher
/// needs to cancel its advance if it gets redacted.
///
/// Positions are in page space with `y` measured from the *top* of the page
/// down to the baseline; `page_height` lets the matcher flip back into the
/// bottom-left-origin space regions are registered in.
///
/// A `GlyphPlacement` only lives for the duration of one operator: the
/// engine builds the full set for a show-text operator, hands it to the
/// rewrite policy, and discards it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphPlacement {
    /// Character code as read from the string operand.
    pub code: u32,
    /// How many bytes encoded this code in the original string (1 for simple
    /// fonts, 2 for the CID encodings handled here).
    pub byte_width: u8,
    /// Baseline-left x in page space.
    pub x: f64,
    /// Baseline y, measured from the top of the page.
    pub y: f64,
    /// Rendered advance width in page space.
    pub width: f64,
    /// Approximate rendered height in page space.
    pub height: f64,
    /// Height of the page the glyph was placed on.
    pub page_height: f64,
    /// Active horizontal scaling (Tz / 100) when the glyph was shown.
    pub h_scaling: f64,
    /// Displacement applied to the text matrix by this glyph, in unscaled
    /// text-space units (already includes character/word spacing and
    /// horizontal scaling).
    pub advance: f64,
    /// Font size (Tfs) active when the glyph was shown.
    pub font_size: f64,
}

impl GlyphPlacement {
    /// The `TJ` adjustment value whose displacement equals this glyph's
    /// advance, in the 1000-units-per-em convention. Subtracting this from a
    /// run's displacement accumulator keeps the glyphs after a removed one
    /// anchored at their original positions.
    pub fn advance_in_thousandths(&self) -> f64 {
        let divisor = self.font_size * self.h_scaling;
        if divisor == 0.0 {
            return 0.0;
        }
        self.advance * 1000.0 / divisor
    }
}
