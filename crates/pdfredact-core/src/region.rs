//! Redaction zones and the geometric predicates that decide what they cover.

use crate::geometry::{Point, Rect};
use crate::glyph::GlyphPlacement;

/// One redaction zone: a rectangle on a specific page.
///
/// Page numbers are 1-based throughout the workspace. Rectangles are in page
/// space with the PDF bottom-left origin.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Region {
    pub page: u32,
    pub rect: Rect,
}

/// Registry of redaction zones plus the matching predicates, all scoped to a
/// page number. Regions are immutable once added.
#[derive(Debug, Clone, Default)]
pub struct RegionSet {
    regions: Vec<Region>,
}

impl RegionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one redaction zone. May be called any number of times per
    /// page; overlapping regions are fine.
    pub fn add(&mut self, page: u32, rect: Rect) {
        self.regions.push(Region { page, rect });
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }

    /// Regions registered for `page`, in insertion order.
    pub fn on_page(&self, page: u32) -> impl Iterator<Item = &Region> {
        self.regions.iter().filter(move |r| r.page == page)
    }

    pub fn has_regions_on(&self, page: u32) -> bool {
        self.on_page(page).next().is_some()
    }

    /// True if the glyph falls inside any region on `page`.
    ///
    /// Glyph y is measured from the top of the page while region rectangles
    /// use the bottom-left origin; this is the one place the flip happens.
    /// The test covers the baseline-left point and the baseline-right point
    /// so a glyph straddling a region edge is still caught.
    pub fn glyph_matches(&self, page: u32, glyph: &GlyphPlacement) -> bool {
        let y = glyph.page_height - glyph.y;
        let left = Point::new(glyph.x, y);
        let right = Point::new(glyph.x + glyph.width, y);
        self.on_page(page)
            .any(|r| r.rect.contains(left) || r.rect.contains(right))
    }

    /// True if any region on `page` overlaps `rect` with positive area.
    pub fn rect_intersects(&self, page: u32, rect: &Rect) -> bool {
        self.on_page(page).any(|r| r.rect.intersects(rect))
    }

    /// True if a single region on `page` contains `rect` entirely.
    pub fn fully_covers(&self, page: u32, rect: &Rect) -> bool {
        self.on_page(page).any(|r| r.rect.contains_rect(rect))
    }

    /// The positive-area intersections between `rect` and every region on
    /// `page`, in insertion order.
    pub fn intersections(&self, page: u32, rect: &Rect) -> Vec<Rect> {
        self.on_page(page)
            .filter_map(|r| r.rect.intersection(rect))
            .collect()
    }
}
