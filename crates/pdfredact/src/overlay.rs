//! Debug overlay: stroke region outlines onto the pages they apply to.
//!
//! Useful for verifying region coordinates before committing to a
//! destructive redaction run. The outline is appended after the existing
//! content so it draws on top.

use crate::pages;
use lopdf::Document;
use lopdf::content::{Content, Operation};
use pdfredact_core::{RedactError, RegionSet};

/// Append a red outline for every region onto its page.
pub fn outline_regions(doc: &mut Document, regions: &RegionSet) -> Result<(), RedactError> {
    let pages = doc.get_pages();
    for (page_no, page_id) in pages {
        if !regions.has_regions_on(page_no) {
            continue;
        }

        let mut content = pages::page_content_bytes(doc, page_id).map_err(RedactError::from)?;
        let mut ops = Vec::new();
        for region in regions.on_page(page_no) {
            let r = region.rect;
            ops.push(Operation::new("q", vec![]));
            ops.push(Operation::new(
                "RG",
                vec![1.into(), 0.into(), 0.into()],
            ));
            ops.push(Operation::new("w", vec![1.into()]));
            ops.push(Operation::new(
                "re",
                vec![
                    lopdf::Object::Real(r.x as f32),
                    lopdf::Object::Real(r.y as f32),
                    lopdf::Object::Real(r.width as f32),
                    lopdf::Object::Real(r.height as f32),
                ],
            ));
            ops.push(Operation::new("S", vec![]));
            ops.push(Operation::new("Q", vec![]));
        }
        let overlay = Content { operations: ops }
            .encode()
            .map_err(|e| RedactError::ParseError(e.to_string()))?;

        if !content.is_empty() {
            content.push(b'\n');
        }
        content.extend_from_slice(&overlay);
        pages::install_page_content(doc, page_id, content).map_err(RedactError::from)?;
    }
    Ok(())
}
