//! Patching of image XObjects that intersect a redaction region.
//!
//! The image's placement rectangle comes from the CTM's translation and
//! scale only (the unit square an image paints into). Intersecting regions
//! are mapped back into raster pixel coordinates, cleared on a private copy
//! of the decoded buffer, and the result is registered under a fresh
//! resource key — the original resource is never overwritten, since it may
//! be referenced from other draw sites.

use crate::context::ImageUse;
use crate::error::EngineError;
use crate::raster::{Raster, decode_image_stream, encode_raster};
use crate::stash::{ResourceOwner, ResourceStash};
use lopdf::{Dictionary, Document, Object};
use pdfredact_core::{Ctm, Rect};

/// Placement rectangle of an image drawn under `ctm`: translation plus the
/// axis scale factors. Rotation/shear components are ignored; callers warn
/// about that separately.
pub fn placement_rect(ctm: &Ctm) -> Rect {
    Rect::new(ctm.e, ctm.f, ctm.a, ctm.d).normalized()
}

/// Clear every intersecting region from the image and register the patched
/// copy with `owner`'s resource dictionary. Returns the new resource key the
/// rewritten draw operator must reference.
pub fn patch_image(
    doc: &Document,
    resources: &Dictionary,
    image: &ImageUse,
    intersections: &[Rect],
    owner: ResourceOwner,
    stash: &mut ResourceStash,
) -> Result<String, EngineError> {
    let stream = doc
        .get_object(image.object_id)
        .and_then(|obj| obj.as_stream())
        .map_err(|e| EngineError::Image(format!("cannot load image /{}: {e}", image.name)))?;

    let mut raster = decode_image_stream(stream)?;
    for hit in intersections {
        clear_page_rect(&mut raster, &image.placement, hit);
    }

    let patched = encode_raster(&raster, &stream.dict)?;
    let taken = |key: &str| xobject_key_taken(doc, resources, key);
    let key = stash.unique_image_key(&image.name, &taken);
    stash.add_image(key.clone(), patched, owner);
    Ok(key)
}

/// Map a page-space sub-rectangle of the placement into pixel ranges and
/// blank it. Raster rows run top-down while page y runs bottom-up, so the
/// vertical axis flips.
fn clear_page_rect(raster: &mut Raster, placement: &Rect, hit: &Rect) {
    if placement.width <= 0.0 || placement.height <= 0.0 {
        return;
    }
    let sx = raster.width() as f64 / placement.width;
    let sy = raster.height() as f64 / placement.height;

    let col_start = ((hit.x - placement.x) * sx).floor().max(0.0) as usize;
    let col_end = ((hit.right() - placement.x) * sx).ceil().max(0.0) as usize;
    let row_start = ((placement.top() - hit.top()) * sy).floor().max(0.0) as usize;
    let row_end = ((placement.top() - hit.y) * sy).ceil().max(0.0) as usize;

    raster.clear(col_start..col_end, row_start..row_end);
}

fn xobject_key_taken(doc: &Document, resources: &Dictionary, key: &str) -> bool {
    let Ok(xobjects) = resources.get(b"XObject") else {
        return false;
    };
    let xobjects = match xobjects {
        Object::Reference(id) => match doc.get_object(*id).and_then(|o| o.as_dict()) {
            Ok(dict) => dict,
            Err(_) => return false,
        },
        other => match other.as_dict() {
            Ok(dict) => dict,
            Err(_) => return false,
        },
    };
    xobjects.has(key.as_bytes())
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
    fn placement_from_translate_and_scale() {
        // 200x100 image box at (50, 300).
        let ctm = Ctm::new(200.0, 0.0, 0.0, 100.0, 50.0, 300.0);
        let rect = placement_rect(&ctm);
        assert_approx(rect.x, 50.0);
        assert_approx(rect.y, 300.0);
        assert_approx(rect.width, 200.0);
        assert_approx(rect.height, 100.0);
    }

    #[test]
    fn placement_normalizes_negative_scale() {
        let ctm = Ctm::new(-200.0, 0.0, 0.0, 100.0, 250.0, 300.0);
        let rect = placement_rect(&ctm);
        assert_approx(rect.x, 50.0);
        assert_approx(rect.width, 200.0);
    }

    #[test]
    fn clear_maps_page_rect_to_pixels_with_row_flip() {
        // 4x4 gray raster placed over a 40x40 page box at the origin.
        let mut raster = Raster::new(4, 4, 1, vec![0x10; 16]).unwrap();
        let placement = Rect::new(0.0, 0.0, 40.0, 40.0);
        // Bottom-left page quadrant = bottom-left pixels = raster rows 2..4.
        let hit = Rect::new(0.0, 0.0, 20.0, 20.0);

        clear_page_rect(&mut raster, &placement, &hit);

        assert_eq!(raster.pixel(0, 3), &[0xFF]);
        assert_eq!(raster.pixel(1, 2), &[0xFF]);
        // Top rows and right columns untouched.
        assert_eq!(raster.pixel(0, 0), &[0x10]);
        assert_eq!(raster.pixel(1, 1), &[0x10]);
        assert_eq!(raster.pixel(2, 2), &[0x10]);
        assert_eq!(raster.pixel(3, 3), &[0x10]);
    }

    #[test]
    fn clear_with_offset_placement() {
        // 2x2 raster over a 20x20 box at (100, 100); clear its top half.
        let mut raster = Raster::new(2, 2, 1, vec![0x10; 4]).unwrap();
        let placement = Rect::new(100.0, 100.0, 20.0, 20.0);
        let hit = Rect::new(100.0, 110.0, 20.0, 10.0);

        clear_page_rect(&mut raster, &placement, &hit);

        assert_eq!(raster.pixel(0, 0), &[0xFF]);
        assert_eq!(raster.pixel(1, 0), &[0xFF]);
        assert_eq!(raster.pixel(0, 1), &[0x10]);
        assert_eq!(raster.pixel(1, 1), &[0x10]);
    }

    #[test]
    fn degenerate_placement_clears_nothing() {
        let mut raster = Raster::new(2, 2, 1, vec![0x10; 4]).unwrap();
        clear_page_rect(
            &mut raster,
            &Rect::new(0.0, 0.0, 0.0, 0.0),
            &Rect::new(0.0, 0.0, 5.0, 5.0),
        );
        assert_eq!(raster.pixel(0, 0), &[0x10]);
        assert_eq!(raster.pixel(1, 1), &[0x10]);
    }
}
