//! pdfredact: remove content inside rectangular regions from PDF pages.
//!
//! This is the public API facade. It re-exports types from pdfredact-core
//! and drives the pdfredact-engine content-stream rewriter page by page.
//!
//! # Architecture
//!
//! - **pdfredact-core**: geometry, regions, options, and reporting types
//! - **pdfredact-engine**: content-stream interception, text and image patching
//! - **pdfredact** (this crate): document-level orchestration
//!
//! ```no_run
//! use pdfredact::{Rect, Redactor};
//!
//! let mut redactor = Redactor::default();
//! redactor.add_region(1, Rect::new(72.0, 700.0, 200.0, 20.0));
//! let summary = redactor.redact_file("in.pdf", "out.pdf")?;
//! println!("patched {} text operators", summary.text_operators_patched);
//! # Ok::<(), pdfredact::RedactError>(())
//! ```

mod pages;
pub mod overlay;

use lopdf::Document;
use lopdf::content::Content;
use pdfredact_engine::{
    EngineError, GraphicsStack, RegionPolicy, TextState, rewrite_operations,
    stash::{ResourceOwner, ResourceStash},
};
use std::path::Path;

pub use pdfredact_core::{
    GlyphPlacement, Point, Rect, RedactError, RedactOptions, RedactSummary, RedactWarning,
    RedactWarningCode, Region, RegionSet,
};
pub use lopdf;
pub use pdfredact_core;
pub use pdfredact_engine;

/// Removes page content inside registered regions.
///
/// Regions are axis-aligned rectangles in page space (origin at the
/// bottom-left corner of the page, units in points) keyed by 1-based page
/// number. Glyphs whose baseline falls inside any region on their page are
/// removed with their horizontal space preserved; images overlapping a
/// region are replaced by copies with the overlapping pixels cleared.
#[derive(Debug, Clone, Default)]
pub struct Redactor {
    regions: RegionSet,
    options: RedactOptions,
}

impl Redactor {
    pub fn new(options: RedactOptions) -> Self {
        Self {
            regions: RegionSet::new(),
            options,
        }
    }

    /// Register a region on a 1-based page number.
    pub fn add_region(&mut self, page: u32, rect: Rect) {
        self.regions.add(page, rect);
    }

    pub fn regions(&self) -> &RegionSet {
        &self.regions
    }

    pub fn options(&self) -> &RedactOptions {
        &self.options
    }

    /// Redact an already-loaded document in place.
    ///
    /// Pages without regions are left untouched byte for byte. Any fatal
    /// error aborts the run; the document may then hold a mix of rewritten
    /// and original pages and should be discarded.
    pub fn redact_document(&self, doc: &mut Document) -> Result<RedactSummary, RedactError> {
        let mut summary = RedactSummary::default();
        if self.regions.is_empty() {
            return Ok(summary);
        }

        let pages = doc.get_pages();
        for (page_no, page_id) in pages {
            if !self.regions.has_regions_on(page_no) {
                continue;
            }
            let page_summary = self
                .redact_page(doc, page_no, page_id)
                .map_err(RedactError::from)?;
            summary.merge(page_summary);
            summary.pages_processed += 1;
        }

        if self.options.compress_streams {
            doc.compress();
        }
        Ok(summary)
    }

    /// Load, redact, and save in one call.
    pub fn redact_file(
        &self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
    ) -> Result<RedactSummary, RedactError> {
        let mut doc = Document::load(input.as_ref())
            .map_err(|e| RedactError::ParseError(format!("failed to load document: {e}")))?;
        let summary = self.redact_document(&mut doc)?;
        doc.save(output.as_ref())
            .map_err(|e| RedactError::IoError(format!("failed to save document: {e}")))?;
        Ok(summary)
    }

    fn redact_page(
        &self,
        doc: &mut Document,
        page_no: u32,
        page_id: lopdf::ObjectId,
    ) -> Result<RedactSummary, EngineError> {
        let page_height = pages::page_height(doc, page_id)?;
        let resources = pages::page_resources(doc, page_id)?;
        let content = pages::page_content_bytes(doc, page_id)?;
        let decoded = Content::decode(&content)?;

        let mut policy = RegionPolicy::new(&self.regions, &self.options, page_no);
        let mut gs = GraphicsStack::new();
        let mut ts = TextState::new();
        let mut stash = ResourceStash::new();

        let rewritten = rewrite_operations(
            doc,
            &decoded.operations,
            &resources,
            ResourceOwner::Page,
            page_height,
            &mut policy,
            &self.options,
            0,
            &mut gs,
            &mut ts,
            &mut stash,
        )?;

        let mut summary = policy.into_summary();
        summary.forms_rewritten = distinct_forms(&stash);

        let encoded = Content {
            operations: rewritten,
        }
        .encode()?;
        pages::install_page_content(doc, page_id, encoded)?;
        pages::apply_stash(doc, page_id, stash)?;
        Ok(summary)
    }
}

fn distinct_forms(stash: &ResourceStash) -> usize {
    let mut ids: Vec<_> = stash.forms().iter().map(|(id, _)| *id).collect();
    ids.sort_unstable();
    ids.dedup();
    ids.len()
}
