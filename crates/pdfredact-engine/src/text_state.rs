//! Text state machine for the content stream walk.
//!
//! Tracks the PDF text state parameters (Tc, Tw, Tz, TL, Tf, Ts), the text
//! matrix and line matrix, and the positioning operators (BT/ET, Td, TD, Tm,
//! T*). The rewrite engine only needs the state that affects *where* glyphs
//! land; rendering-only parameters such as the text render mode pass through
//! the output stream without being tracked.

use crate::fonts::FontMetrics;
use pdfredact_core::Ctm;

/// Text state parameters set by text operators and consumed by glyph
/// placement. Part of the graphics state, so `q`/`Q` save and restore them
/// (matrices excluded; those belong to the enclosing BT/ET object).
#[derive(Debug, Clone, PartialEq)]
pub struct TextState {
    /// Character spacing (Tc): extra space after every glyph.
    pub char_spacing: f64,
    /// Word spacing (Tw): extra space after single-byte code 32.
    pub word_spacing: f64,
    /// Horizontal scaling (Tz), stored as the percentage value.
    pub h_scaling: f64,
    /// Text leading (TL): baseline-to-baseline distance for T* and '.
    pub leading: f64,
    /// Font resource name set by Tf.
    pub font_name: String,
    /// Font size set by Tf.
    pub font_size: f64,
    /// Text rise (Ts).
    pub rise: f64,
    /// Metrics of the active font, resolved when Tf is applied.
    pub font: FontMetrics,
    text_matrix: Ctm,
    line_matrix: Ctm,
}

/// The `q`-saved portion of [`TextState`].
#[derive(Debug, Clone, PartialEq)]
pub struct TextStateSnapshot {
    char_spacing: f64,
    word_spacing: f64,
    h_scaling: f64,
    leading: f64,
    font_name: String,
    font_size: f64,
    rise: f64,
    font: FontMetrics,
}

impl Default for TextState {
    fn default() -> Self {
        Self::new()
    }
}

impl TextState {
    pub fn new() -> Self {
        Self {
            char_spacing: 0.0,
            word_spacing: 0.0,
            h_scaling: 100.0,
            leading: 0.0,
            font_name: String::new(),
            font_size: 0.0,
            rise: 0.0,
            font: FontMetrics::default(),
            text_matrix: Ctm::identity(),
            line_matrix: Ctm::identity(),
        }
    }

    pub fn text_matrix(&self) -> &Ctm {
        &self.text_matrix
    }

    /// Horizontal scaling as a fraction (1.0 = 100%).
    pub fn h_scaling_normalized(&self) -> f64 {
        self.h_scaling / 100.0
    }

    /// `BT`: begin text object, resetting both matrices to identity.
    pub fn begin_text(&mut self) {
        self.text_matrix = Ctm::identity();
        self.line_matrix = Ctm::identity();
    }

    /// `ET`: end text object. The matrices become meaningless until the
    /// next BT; they are left in place rather than cleared.
    pub fn end_text(&mut self) {}

    /// `Tf`: set font name, size, and resolved metrics.
    pub fn set_font(&mut self, font_name: String, font_size: f64, font: FontMetrics) {
        self.font_name = font_name;
        self.font_size = font_size;
        self.font = font;
    }

    /// `Tm`: replace the text matrix and line matrix.
    pub fn set_text_matrix(&mut self, m: Ctm) {
        self.text_matrix = m;
        self.line_matrix = m;
    }

    /// `Td`: move to the start of the next line, offset from the current
    /// line start by `(tx, ty)`.
    pub fn move_text_position(&mut self, tx: f64, ty: f64) {
        self.line_matrix = Ctm::translation(tx, ty).concat(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    /// `TD`: set leading to `-ty`, then `Td`.
    pub fn move_text_position_and_set_leading(&mut self, tx: f64, ty: f64) {
        self.leading = -ty;
        self.move_text_position(tx, ty);
    }

    /// `T*`: move to the start of the next line using the current leading.
    pub fn move_to_next_line(&mut self) {
        let leading = self.leading;
        self.move_text_position(0.0, -leading);
    }

    /// Advance the text matrix horizontally after a glyph or a TJ
    /// adjustment. `tx` is in text-space units, already including font size
    /// and horizontal scaling.
    pub fn advance_text_position(&mut self, tx: f64) {
        self.text_matrix = Ctm::translation(tx, 0.0).concat(&self.text_matrix);
    }

    /// `q`: capture the graphics-state portion of the text state.
    pub fn save_snapshot(&self) -> TextStateSnapshot {
        TextStateSnapshot {
            char_spacing: self.char_spacing,
            word_spacing: self.word_spacing,
            h_scaling: self.h_scaling,
            leading: self.leading,
            font_name: self.font_name.clone(),
            font_size: self.font_size,
            rise: self.rise,
            font: self.font.clone(),
        }
    }

    /// `Q`: restore the graphics-state portion of the text state.
    pub fn restore_snapshot(&mut self, snapshot: TextStateSnapshot) {
        self.char_spacing = snapshot.char_spacing;
        self.word_spacing = snapshot.word_spacing;
        self.h_scaling = snapshot.h_scaling;
        self.leading = snapshot.leading;
        self.font_name = snapshot.font_name;
        self.font_size = snapshot.font_size;
        self.rise = snapshot.rise;
        self.font = snapshot.font;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn defaults_per_spec() {
        let ts = TextState::new();
        assert_approx(ts.char_spacing, 0.0);
        assert_approx(ts.word_spacing, 0.0);
        assert_approx(ts.h_scaling, 100.0);
        assert_approx(ts.h_scaling_normalized(), 1.0);
        assert_approx(ts.leading, 0.0);
        assert_eq!(*ts.text_matrix(), Ctm::identity());
    }

    #[test]
    fn begin_text_resets_matrices() {
        let mut ts = TextState::new();
        ts.set_text_matrix(Ctm::new(2.0, 0.0, 0.0, 2.0, 50.0, 60.0));
        ts.begin_text();
        assert_eq!(*ts.text_matrix(), Ctm::identity());
    }

    #[test]
    fn td_moves_from_line_start_not_text_position() {
        let mut ts = TextState::new();
        ts.begin_text();
        ts.move_text_position(10.0, 700.0);
        // Mid-line advance must not affect where the next Td lands.
        ts.advance_text_position(42.0);
        ts.move_text_position(0.0, -14.0);
        assert_approx(ts.text_matrix().e, 10.0);
        assert_approx(ts.text_matrix().f, 686.0);
    }

    #[test]
    fn td_sets_leading_then_moves() {
        let mut ts = TextState::new();
        ts.begin_text();
        ts.move_text_position_and_set_leading(5.0, -12.0);
        assert_approx(ts.leading, 12.0);
        assert_approx(ts.text_matrix().e, 5.0);
        assert_approx(ts.text_matrix().f, -12.0);
    }

    #[test]
    fn t_star_uses_current_leading() {
        let mut ts = TextState::new();
        ts.begin_text();
        ts.leading = 14.0;
        ts.move_text_position(72.0, 720.0);
        ts.move_to_next_line();
        assert_approx(ts.text_matrix().e, 72.0);
        assert_approx(ts.text_matrix().f, 706.0);
    }

    #[test]
    fn advance_respects_scaled_text_matrix() {
        let mut ts = TextState::new();
        ts.begin_text();
        ts.set_text_matrix(Ctm::new(2.0, 0.0, 0.0, 2.0, 100.0, 100.0));
        ts.advance_text_position(10.0);
        // 10 text-space units through a 2x matrix is 20 page units.
        assert_approx(ts.text_matrix().e, 120.0);
        assert_approx(ts.text_matrix().f, 100.0);
    }

    #[test]
    fn snapshot_round_trip_excludes_matrices() {
        let mut ts = TextState::new();
        ts.char_spacing = 1.5;
        ts.word_spacing = 2.5;
        ts.h_scaling = 80.0;
        ts.leading = 14.0;
        ts.font_name = "F1".to_string();
        ts.font_size = 12.0;

        let snap = ts.save_snapshot();

        ts.char_spacing = 0.0;
        ts.h_scaling = 100.0;
        ts.font_name = "F9".to_string();
        ts.set_text_matrix(Ctm::translation(99.0, 99.0));

        ts.restore_snapshot(snap);
        assert_approx(ts.char_spacing, 1.5);
        assert_approx(ts.word_spacing, 2.5);
        assert_approx(ts.h_scaling, 80.0);
        assert_eq!(ts.font_name, "F1");
        // Matrices are not part of the snapshot.
        assert_approx(ts.text_matrix().e, 99.0);
    }
}
