//! Configuration for a redaction run.

/// Policy knobs for the rewrite engine.
///
/// The defaults match the common deployment: forms are descended into and
/// patched, fully covered images are blanked rather than dropped, and
/// rewritten streams are stored uncompressed (lopdf can compress the whole
/// document afterwards when asked).
#[derive(Debug, Clone, PartialEq)]
pub struct RedactOptions {
    /// Descend into Form XObjects and rewrite their content streams.
    ///
    /// When `false`, a form's draw operator passes through untouched and its
    /// interior is neither interpreted nor patched, so glyphs and images
    /// inside forms are invisible to region matching.
    pub descend_into_forms: bool,
    /// Drop the draw operator of an image whose placement rectangle lies
    /// entirely inside one region, instead of emitting an all-blanked
    /// replacement image.
    pub drop_fully_covered_images: bool,
    /// Maximum Form XObject nesting depth before the conversion aborts.
    pub max_recursion_depth: usize,
    /// Recompress all document streams after rewriting.
    pub compress_streams: bool,
}

impl Default for RedactOptions {
    fn default() -> Self {
        Self {
            descend_into_forms: true,
            drop_fully_covered_images: false,
            max_recursion_depth: 16,
            compress_streams: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let opts = RedactOptions::default();
        assert!(opts.descend_into_forms);
        assert!(!opts.drop_fully_covered_images);
        assert_eq!(opts.max_recursion_depth, 16);
        assert!(!opts.compress_streams);
    }
}
