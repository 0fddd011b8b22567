//! Outcome report for a redaction run.

use crate::error::RedactWarning;

/// Counters and warnings describing what a redaction run changed.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RedactSummary {
    /// Pages whose content stream was walked.
    pub pages_processed: usize,
    /// Show-text operators dropped because every glyph was redacted.
    pub text_operators_dropped: usize,
    /// Show-text operators resynthesized with some glyphs removed.
    pub text_operators_patched: usize,
    /// Images re-encoded with a blanked sub-rectangle.
    pub images_patched: usize,
    /// Image draw operators dropped under the fully-covered-image policy.
    pub images_dropped: usize,
    /// Form XObjects whose content was rewritten.
    pub forms_rewritten: usize,
    /// Non-fatal accuracy warnings collected during the run.
    pub warnings: Vec<RedactWarning>,
}

impl RedactSummary {
    /// True if nothing in the document was altered.
    pub fn is_untouched(&self) -> bool {
        self.text_operators_dropped == 0
            && self.text_operators_patched == 0
            && self.images_patched == 0
            && self.images_dropped == 0
    }

    /// Fold another summary (typically from one page) into this one.
    pub fn merge(&mut self, other: RedactSummary) {
        self.pages_processed += other.pages_processed;
        self.text_operators_dropped += other.text_operators_dropped;
        self.text_operators_patched += other.text_operators_patched;
        self.images_patched += other.images_patched;
        self.images_dropped += other.images_dropped;
        self.forms_rewritten += other.forms_rewritten;
        self.warnings.extend(other.warnings);
    }
}
