//! pdfredact-engine: content-stream interception and rewriting.
//!
//! This crate implements the operator walk over decoded content streams:
//! graphics/text state tracking, glyph placement, the rewrite policy seam,
//! and the text and image patchers. It depends on pdfredact-core for the
//! shared geometry and reporting types; the pdfredact facade crate drives
//! it page by page.

pub mod context;
pub mod error;
pub mod fonts;
pub mod graphics;
pub mod image_patch;
mod ops;
pub mod policy;
pub mod raster;
pub mod rewrite;
pub mod show;
pub mod stash;
pub mod text_patch;
pub mod text_state;

pub use context::{ImageUse, OpContext};
pub use error::EngineError;
pub use fonts::{FontMetrics, extract_font_metrics};
pub use graphics::GraphicsStack;
pub use policy::{PassthroughPolicy, RegionPolicy, RewritePolicy, RewriteScope};
pub use rewrite::rewrite_operations;
pub use show::{ShowElement, show_elements};
pub use stash::{NewImage, ResourceStash};
pub use text_patch::{TextPatch, is_show_text_operator, patch_show_text};
pub use text_state::{TextState, TextStateSnapshot};

pub use pdfredact_core;
