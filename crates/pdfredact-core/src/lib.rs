//! Backend-independent core types for pdfredact-rs.
//!
//! This crate holds the data model shared by the rewrite engine and the
//! public API: geometry primitives, the region registry and matcher, glyph
//! placements, run options, errors/warnings, and the run summary. It has no
//! PDF-library dependency; everything that touches a document lives in
//! `pdfredact-engine`.

pub mod error;
pub mod geometry;
pub mod glyph;
pub mod options;
pub mod region;
pub mod summary;

pub use error::{RedactError, RedactWarning, RedactWarningCode};
pub use geometry::{Ctm, Point, Rect};
pub use glyph::GlyphPlacement;
pub use options::RedactOptions;
pub use region::{Region, RegionSet};
pub use summary::RedactSummary;
