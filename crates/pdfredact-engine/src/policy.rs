//! Rewrite policies: the strategy injected into the interception engine.
//!
//! The engine walks operators and applies their side effects; the policy
//! decides what each operator turns into on the way out. The default hook
//! implementations pass everything through, so a policy only overrides what
//! it cares about.

use crate::context::OpContext;
use crate::error::EngineError;
use crate::image_patch::patch_image;
use crate::stash::{ResourceOwner, ResourceStash};
use crate::text_patch::{TextPatch, is_show_text_operator, patch_show_text};
use lopdf::content::Operation;
use lopdf::{Dictionary, Document, Object};
use pdfredact_core::{
    RedactOptions, RedactSummary, RedactWarning, RedactWarningCode, RegionSet,
};

/// What a policy's rewrite hook may touch while deciding an operator's fate.
pub struct RewriteScope<'a> {
    /// The document being walked (immutable; mutations go through `stash`).
    pub doc: &'a Document,
    /// Resource dictionary in effect at the current nesting level.
    pub resources: &'a Dictionary,
    /// Where `resources` lives, for stashed registrations.
    pub owner: ResourceOwner,
    /// Output buffer for the current nesting level.
    pub out: &'a mut Vec<Operation>,
    /// Deferred document mutations.
    pub stash: &'a mut ResourceStash,
}

/// Per-deployment rewrite strategy.
///
/// `before_operator` fires with the not-yet-applied operator;
/// `rewrite` fires after side effects were applied and decides what lands
/// in the output buffer. `warn` receives the engine's non-fatal findings.
pub trait RewritePolicy {
    fn before_operator(&mut self, _op: &Operation) {}

    fn warn(&mut self, _warning: RedactWarning) {}

    fn rewrite(
        &mut self,
        op: &Operation,
        _ctx: &OpContext,
        scope: &mut RewriteScope<'_>,
    ) -> Result<(), EngineError> {
        scope.out.push(op.clone());
        Ok(())
    }
}

/// Identity policy: every operator passes through unchanged.
#[derive(Debug, Default)]
pub struct PassthroughPolicy;

impl RewritePolicy for PassthroughPolicy {}

/// The region-based redaction policy: show-text operators go through the
/// text patcher, image draws through the image patcher, everything else
/// passes through.
pub struct RegionPolicy<'a> {
    regions: &'a RegionSet,
    options: &'a RedactOptions,
    page: u32,
    summary: RedactSummary,
}

impl<'a> RegionPolicy<'a> {
    pub fn new(regions: &'a RegionSet, options: &'a RedactOptions, page: u32) -> Self {
        Self {
            regions,
            options,
            page,
            summary: RedactSummary::default(),
        }
    }

    /// Counters and warnings accumulated over the walk.
    pub fn into_summary(self) -> RedactSummary {
        self.summary
    }

    fn rewrite_show_text(
        &mut self,
        op: &Operation,
        ctx: &OpContext,
        scope: &mut RewriteScope<'_>,
    ) -> Result<(), EngineError> {
        let regions = self.regions;
        let page = self.page;
        let patch = patch_show_text(op, &ctx.glyphs, &|glyph| {
            regions.glyph_matches(page, glyph)
        })?;
        match patch {
            TextPatch::Unchanged => scope.out.push(op.clone()),
            TextPatch::Dropped { prelude } => {
                scope.out.extend(prelude);
                self.summary.text_operators_dropped += 1;
            }
            TextPatch::Replaced {
                ops,
                approximate_widths,
            } => {
                if approximate_widths {
                    self.warn(
                        RedactWarning::with_code(
                            RedactWarningCode::ByteWidthApproximation,
                            "mixed code byte widths in a patched string run",
                        )
                        .on_page(self.page),
                    );
                }
                scope.out.extend(ops);
                self.summary.text_operators_patched += 1;
            }
        }
        Ok(())
    }

    fn rewrite_image_draw(
        &mut self,
        op: &Operation,
        ctx: &OpContext,
        scope: &mut RewriteScope<'_>,
    ) -> Result<(), EngineError> {
        let image = match &ctx.image {
            Some(image) => image,
            None => {
                scope.out.push(op.clone());
                return Ok(());
            }
        };

        if !image.axis_aligned {
            self.warn(
                RedactWarning::with_code(
                    RedactWarningCode::ShearedImageTransform,
                    "image transform has rotation/shear; placement rectangle is approximate",
                )
                .on_page(self.page)
                .for_resource(image.name.clone()),
            );
        }

        if !self.regions.rect_intersects(self.page, &image.placement) {
            scope.out.push(op.clone());
            return Ok(());
        }

        if self.options.drop_fully_covered_images
            && self.regions.fully_covers(self.page, &image.placement)
        {
            self.summary.images_dropped += 1;
            return Ok(());
        }

        let hits = self.regions.intersections(self.page, &image.placement);
        let key = patch_image(
            scope.doc,
            scope.resources,
            image,
            &hits,
            scope.owner,
            scope.stash,
        )?;
        scope
            .out
            .push(Operation::new("Do", vec![Object::Name(key.into_bytes())]));
        self.summary.images_patched += 1;
        Ok(())
    }
}

impl RewritePolicy for RegionPolicy<'_> {
    fn warn(&mut self, warning: RedactWarning) {
        self.summary.warnings.push(warning);
    }

    fn rewrite(
        &mut self,
        op: &Operation,
        ctx: &OpContext,
        scope: &mut RewriteScope<'_>,
    ) -> Result<(), EngineError> {
        if is_show_text_operator(&op.operator) {
            self.rewrite_show_text(op, ctx, scope)
        } else if ctx.image.is_some() {
            self.rewrite_image_draw(op, ctx, scope)
        } else {
            scope.out.push(op.clone());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdfredact_core::{GlyphPlacement, Rect};

    fn scope_parts() -> (Document, Dictionary) {
        (Document::with_version("1.5"), Dictionary::new())
    }

    fn glyph(code: u8, x: f64) -> GlyphPlacement {
        GlyphPlacement {
            code: u32::from(code),
            byte_width: 1,
            x,
            y: 92.0, // baseline 700 from the bottom of a 792pt page
            width: 6.0,
            height: 10.0,
            page_height: 792.0,
            h_scaling: 1.0,
            advance: 6.0,
            font_size: 10.0,
        }
    }

    #[test]
    fn passthrough_policy_clones_operator() {
        let (doc, resources) = scope_parts();
        let mut out = Vec::new();
        let mut stash = ResourceStash::new();
        let mut scope = RewriteScope {
            doc: &doc,
            resources: &resources,
            owner: ResourceOwner::Page,
            out: &mut out,
            stash: &mut stash,
        };

        let op = Operation::new("re", vec![Object::Integer(0)]);
        PassthroughPolicy
            .rewrite(&op, &OpContext::empty(), &mut scope)
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].operator, "re");
    }

    #[test]
    fn region_policy_drops_fully_covered_text() {
        let mut regions = RegionSet::new();
        regions.add(1, Rect::new(0.0, 690.0, 300.0, 20.0));
        let options = RedactOptions::default();
        let mut policy = RegionPolicy::new(&regions, &options, 1);

        let (doc, resources) = scope_parts();
        let mut out = Vec::new();
        let mut stash = ResourceStash::new();
        let mut scope = RewriteScope {
            doc: &doc,
            resources: &resources,
            owner: ResourceOwner::Page,
            out: &mut out,
            stash: &mut stash,
        };

        let op = Operation::new(
            "Tj",
            vec![Object::String(b"AB".to_vec(), lopdf::StringFormat::Literal)],
        );
        let ctx = OpContext::with_glyphs(vec![glyph(b'A', 10.0), glyph(b'B', 16.0)]);
        policy.rewrite(&op, &ctx, &mut scope).unwrap();

        assert!(out.is_empty());
        let summary = policy.into_summary();
        assert_eq!(summary.text_operators_dropped, 1);
        assert_eq!(summary.text_operators_patched, 0);
    }

    #[test]
    fn region_policy_ignores_text_on_other_pages() {
        let mut regions = RegionSet::new();
        regions.add(2, Rect::new(0.0, 690.0, 300.0, 20.0));
        let options = RedactOptions::default();
        let mut policy = RegionPolicy::new(&regions, &options, 1);

        let (doc, resources) = scope_parts();
        let mut out = Vec::new();
        let mut stash = ResourceStash::new();
        let mut scope = RewriteScope {
            doc: &doc,
            resources: &resources,
            owner: ResourceOwner::Page,
            out: &mut out,
            stash: &mut stash,
        };

        let op = Operation::new(
            "Tj",
            vec![Object::String(b"AB".to_vec(), lopdf::StringFormat::Literal)],
        );
        let ctx = OpContext::with_glyphs(vec![glyph(b'A', 10.0), glyph(b'B', 16.0)]);
        policy.rewrite(&op, &ctx, &mut scope).unwrap();

        assert_eq!(out.len(), 1);
        assert!(policy.into_summary().is_untouched());
    }
}
