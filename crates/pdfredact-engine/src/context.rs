//! Per-operator context handed to the rewrite policy.

use lopdf::ObjectId;
use pdfredact_core::{Ctm, GlyphPlacement, Rect};

/// An image XObject about to be drawn by a `Do` operator.
#[derive(Debug, Clone)]
pub struct ImageUse {
    /// Resource key the operator references.
    pub name: String,
    /// The image stream's object id.
    pub object_id: ObjectId,
    /// CTM at the moment of the draw.
    pub ctm: Ctm,
    /// Placement rectangle in page space, from the CTM's translation and
    /// scale components only.
    pub placement: Rect,
    /// False when the CTM carried rotation/shear the placement ignores.
    pub axis_aligned: bool,
}

/// Everything the side-effect application of one operator produced.
///
/// Constructed fresh for every operator and passed by reference into the
/// rewrite hook; nothing here survives past the operator, so there is no
/// reset-at-operator-start invariant to maintain.
#[derive(Debug, Clone, Default)]
pub struct OpContext {
    /// Glyphs placed by a show-text operator, in show order.
    pub glyphs: Vec<GlyphPlacement>,
    /// Image about to be drawn by a `Do` operator.
    pub image: Option<ImageUse>,
}

impl OpContext {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_glyphs(glyphs: Vec<GlyphPlacement>) -> Self {
        Self {
            glyphs,
            image: None,
        }
    }

    pub fn with_image(image: ImageUse) -> Self {
        Self {
            glyphs: Vec::new(),
            image: Some(image),
        }
    }
}
