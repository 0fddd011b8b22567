//! Page-level document plumbing: inherited attributes, content stream
//! collection, and the mutations applied after a page's walk.

use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use pdfredact_engine::EngineError;
use pdfredact_engine::stash::{ResourceOwner, ResourceStash};

/// Walk the /Parent chain looking for an attribute that pages may inherit
/// (/MediaBox, /Resources).
pub(crate) fn resolve_inherited<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Result<Option<&'a Object>, EngineError> {
    let mut current_id = page_id;
    loop {
        let dict = doc
            .get_object(current_id)
            .and_then(|o| o.as_dict())
            .map_err(|e| EngineError::Parse(format!("failed to get page dictionary: {e}")))?;

        if let Ok(value) = dict.get(key) {
            return Ok(Some(value));
        }

        match dict.get(b"Parent") {
            Ok(parent_obj) => {
                current_id = parent_obj
                    .as_reference()
                    .map_err(|e| EngineError::Parse(format!("invalid /Parent reference: {e}")))?;
            }
            Err(_) => return Ok(None),
        }
    }
}

/// Page height from the (possibly inherited) /MediaBox.
pub(crate) fn page_height(doc: &Document, page_id: ObjectId) -> Result<f64, EngineError> {
    let media_box = resolve_inherited(doc, page_id, b"MediaBox")?
        .ok_or_else(|| EngineError::Parse("MediaBox not found on page or ancestors".into()))?;
    let media_box = match media_box {
        Object::Reference(id) => doc.get_object(*id).map_err(|e| {
            EngineError::Parse(format!("failed to resolve /MediaBox reference: {e}"))
        })?,
        other => other,
    };
    let array = media_box
        .as_array()
        .map_err(|e| EngineError::Parse(format!("MediaBox is not an array: {e}")))?;
    if array.len() < 4 {
        return Err(EngineError::Parse("MediaBox has fewer than 4 entries".into()));
    }
    let y0 = number(&array[1])
        .ok_or_else(|| EngineError::Parse("MediaBox entry is not a number".into()))?;
    let y1 = number(&array[3])
        .ok_or_else(|| EngineError::Parse("MediaBox entry is not a number".into()))?;
    Ok((y1 - y0).abs())
}

/// The page's effective resource dictionary, resolved through inheritance
/// and cloned so the caller can walk the document while holding it.
pub(crate) fn page_resources(doc: &Document, page_id: ObjectId) -> Result<Dictionary, EngineError> {
    match resolve_inherited(doc, page_id, b"Resources")? {
        Some(Object::Reference(id)) => doc
            .get_object(*id)
            .and_then(|o| o.as_dict())
            .cloned()
            .map_err(|e| EngineError::Parse(format!("failed to resolve /Resources: {e}"))),
        Some(other) => other
            .as_dict()
            .cloned()
            .map_err(|e| EngineError::Parse(format!("/Resources is not a dictionary: {e}"))),
        None => Ok(Dictionary::new()),
    }
}

/// Collect a page's content stream bytes. Handles both a single stream
/// reference and an array of stream references; array parts are joined with
/// a space since operators may straddle part boundaries.
pub(crate) fn page_content_bytes(
    doc: &Document,
    page_id: ObjectId,
) -> Result<Vec<u8>, EngineError> {
    let page_dict = doc
        .get_object(page_id)
        .and_then(|o| o.as_dict())
        .map_err(|e| EngineError::Parse(format!("failed to get page dictionary: {e}")))?;
    let contents_obj = match page_dict.get(b"Contents") {
        Ok(obj) => obj,
        Err(_) => return Ok(Vec::new()),
    };

    match contents_obj {
        Object::Reference(id) => {
            let stream = doc
                .get_object(*id)
                .and_then(|o| o.as_stream())
                .map_err(|e| EngineError::Parse(format!("failed to resolve /Contents: {e}")))?;
            decode_content_stream(stream)
        }
        Object::Array(arr) => {
            let mut content = Vec::new();
            for item in arr {
                let id = item.as_reference().map_err(|e| {
                    EngineError::Parse(format!("/Contents array item is not a reference: {e}"))
                })?;
                let stream = doc
                    .get_object(id)
                    .and_then(|o| o.as_stream())
                    .map_err(|e| {
                        EngineError::Parse(format!("/Contents array item is not a stream: {e}"))
                    })?;
                let bytes = decode_content_stream(stream)?;
                if !content.is_empty() {
                    content.push(b' ');
                }
                content.extend_from_slice(&bytes);
            }
            Ok(content)
        }
        _ => Err(EngineError::Parse(
            "/Contents is not a reference or array".to_string(),
        )),
    }
}

fn decode_content_stream(stream: &Stream) -> Result<Vec<u8>, EngineError> {
    if stream.dict.get(b"Filter").is_ok() {
        stream
            .decompressed_content()
            .map_err(|e| EngineError::Parse(format!("failed to decompress content stream: {e}")))
    } else {
        Ok(stream.content.clone())
    }
}

fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(f) => Some(f64::from(*f)),
        _ => None,
    }
}

/// Replace the page's /Contents with a fresh uncompressed stream holding
/// `bytes`. The previous content streams stay in the document as garbage;
/// a save with compression prunes nothing, but they are unreferenced.
pub(crate) fn install_page_content(
    doc: &mut Document,
    page_id: ObjectId,
    bytes: Vec<u8>,
) -> Result<(), EngineError> {
    let stream_id = doc.add_object(Stream::new(dictionary! {}, bytes));
    let page_dict = doc
        .get_object_mut(page_id)
        .and_then(|o| o.as_dict_mut())
        .map_err(|e| EngineError::Parse(format!("failed to get page dictionary: {e}")))?;
    page_dict.set("Contents", Object::Reference(stream_id));
    Ok(())
}

/// Apply the stash collected during a page's walk: register patched images
/// under their owner's XObject resources and swap rewritten form contents.
pub(crate) fn apply_stash(
    doc: &mut Document,
    page_id: ObjectId,
    stash: ResourceStash,
) -> Result<(), EngineError> {
    if stash.is_empty() {
        return Ok(());
    }

    for image in stash.images() {
        let image_id = doc.add_object(image.stream.clone());
        match image.owner {
            ResourceOwner::Page => add_xobject_entry(doc, page_id, &image.key, image_id)?,
            ResourceOwner::Form(form_id) => {
                add_form_xobject_entry(doc, form_id, &image.key, image_id)?;
            }
        }
    }

    for (form_id, content) in stash.forms() {
        let stream = doc
            .get_object_mut(*form_id)
            .and_then(|o| o.as_stream_mut())
            .map_err(|e| EngineError::Parse(format!("failed to get form stream: {e}")))?;
        // The replacement bytes are plain; stale filter entries would make
        // viewers decompress garbage.
        stream.dict.remove(b"Filter");
        stream.dict.remove(b"DecodeParms");
        stream.set_content(content.clone());
    }

    Ok(())
}

/// Register `key → image_id` in the page's /XObject dictionary.
///
/// A page inheriting /Resources from an ancestor gets its own copy first so
/// the new entry cannot leak into sibling pages.
fn add_xobject_entry(
    doc: &mut Document,
    page_id: ObjectId,
    key: &str,
    image_id: ObjectId,
) -> Result<(), EngineError> {
    let own_resources = doc
        .get_object(page_id)
        .and_then(|o| o.as_dict())
        .map(|d| d.has(b"Resources"))
        .map_err(|e| EngineError::Parse(format!("failed to get page dictionary: {e}")))?;
    if !own_resources {
        let inherited = page_resources(doc, page_id)?;
        let page_dict = doc
            .get_object_mut(page_id)
            .and_then(|o| o.as_dict_mut())
            .map_err(|e| EngineError::Parse(format!("failed to get page dictionary: {e}")))?;
        page_dict.set("Resources", Object::Dictionary(inherited));
    }

    // /Resources and /XObject may each be direct or a reference.
    let resources_entry = doc
        .get_object(page_id)
        .and_then(|o| o.as_dict())
        .and_then(|d| d.get(b"Resources"))
        .map_err(|e| EngineError::Parse(format!("page has no /Resources: {e}")))?;
    let resources_id = match resources_entry {
        Object::Reference(id) => Some(*id),
        _ => None,
    };

    let xobject_entry = {
        let resources = resources_dict(doc, page_id, resources_id)?;
        resources.get(b"XObject").ok().cloned()
    };
    match xobject_entry {
        Some(Object::Reference(id)) => {
            let xobjects = doc
                .get_object_mut(id)
                .and_then(|o| o.as_dict_mut())
                .map_err(|e| EngineError::Parse(format!("failed to resolve /XObject: {e}")))?;
            xobjects.set(key.as_bytes(), Object::Reference(image_id));
        }
        Some(Object::Dictionary(mut xobjects)) => {
            xobjects.set(key.as_bytes(), Object::Reference(image_id));
            let resources = resources_dict_mut(doc, page_id, resources_id)?;
            resources.set("XObject", Object::Dictionary(xobjects));
        }
        Some(_) => {
            return Err(EngineError::Parse(
                "/XObject is not a dictionary or reference".to_string(),
            ));
        }
        None => {
            let mut xobjects = Dictionary::new();
            xobjects.set(key.as_bytes(), Object::Reference(image_id));
            let resources = resources_dict_mut(doc, page_id, resources_id)?;
            resources.set("XObject", Object::Dictionary(xobjects));
        }
    }
    Ok(())
}

/// Register `key → image_id` in the /XObject dictionary of a form's own
/// /Resources. The engine only hands out form ownership for forms carrying
/// their own /Resources entry.
fn add_form_xobject_entry(
    doc: &mut Document,
    form_id: ObjectId,
    key: &str,
    image_id: ObjectId,
) -> Result<(), EngineError> {
    let resources_entry = doc
        .get_object(form_id)
        .and_then(|o| o.as_stream())
        .map_err(|e| EngineError::Parse(format!("failed to get form stream: {e}")))?
        .dict
        .get(b"Resources")
        .map_err(|e| EngineError::Parse(format!("form has no /Resources: {e}")))?;
    let resources_id = match resources_entry {
        Object::Reference(id) => Some(*id),
        Object::Dictionary(_) => None,
        _ => {
            return Err(EngineError::Parse(
                "form /Resources is not a dictionary or reference".to_string(),
            ));
        }
    };

    let xobject_entry = form_resources_dict(doc, form_id, resources_id)?
        .get(b"XObject")
        .ok()
        .cloned();
    match xobject_entry {
        Some(Object::Reference(id)) => {
            let xobjects = doc
                .get_object_mut(id)
                .and_then(|o| o.as_dict_mut())
                .map_err(|e| EngineError::Parse(format!("failed to resolve /XObject: {e}")))?;
            xobjects.set(key.as_bytes(), Object::Reference(image_id));
        }
        Some(Object::Dictionary(mut xobjects)) => {
            xobjects.set(key.as_bytes(), Object::Reference(image_id));
            let resources = form_resources_dict_mut(doc, form_id, resources_id)?;
            resources.set("XObject", Object::Dictionary(xobjects));
        }
        Some(_) => {
            return Err(EngineError::Parse(
                "/XObject is not a dictionary or reference".to_string(),
            ));
        }
        None => {
            let mut xobjects = Dictionary::new();
            xobjects.set(key.as_bytes(), Object::Reference(image_id));
            let resources = form_resources_dict_mut(doc, form_id, resources_id)?;
            resources.set("XObject", Object::Dictionary(xobjects));
        }
    }
    Ok(())
}

fn resources_dict<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    resources_id: Option<ObjectId>,
) -> Result<&'a Dictionary, EngineError> {
    match resources_id {
        Some(id) => doc
            .get_object(id)
            .and_then(|o| o.as_dict())
            .map_err(|e| EngineError::Parse(format!("failed to resolve /Resources: {e}"))),
        None => doc
            .get_object(page_id)
            .and_then(|o| o.as_dict())
            .and_then(|d| d.get(b"Resources"))
            .and_then(|o| o.as_dict())
            .map_err(|e| EngineError::Parse(format!("/Resources is not a dictionary: {e}"))),
    }
}

fn resources_dict_mut<'a>(
    doc: &'a mut Document,
    page_id: ObjectId,
    resources_id: Option<ObjectId>,
) -> Result<&'a mut Dictionary, EngineError> {
    match resources_id {
        Some(id) => doc
            .get_object_mut(id)
            .and_then(|o| o.as_dict_mut())
            .map_err(|e| EngineError::Parse(format!("failed to resolve /Resources: {e}"))),
        None => doc
            .get_object_mut(page_id)
            .and_then(|o| o.as_dict_mut())
            .and_then(|d| d.get_mut(b"Resources"))
            .and_then(|o| o.as_dict_mut())
            .map_err(|e| EngineError::Parse(format!("/Resources is not a dictionary: {e}"))),
    }
}

fn form_resources_dict<'a>(
    doc: &'a Document,
    form_id: ObjectId,
    resources_id: Option<ObjectId>,
) -> Result<&'a Dictionary, EngineError> {
    match resources_id {
        Some(id) => doc
            .get_object(id)
            .and_then(|o| o.as_dict())
            .map_err(|e| EngineError::Parse(format!("failed to resolve /Resources: {e}"))),
        None => doc
            .get_object(form_id)
            .and_then(|o| o.as_stream())
            .and_then(|s| s.dict.get(b"Resources"))
            .and_then(|o| o.as_dict())
            .map_err(|e| EngineError::Parse(format!("/Resources is not a dictionary: {e}"))),
    }
}

fn form_resources_dict_mut<'a>(
    doc: &'a mut Document,
    form_id: ObjectId,
    resources_id: Option<ObjectId>,
) -> Result<&'a mut Dictionary, EngineError> {
    match resources_id {
        Some(id) => doc
            .get_object_mut(id)
            .and_then(|o| o.as_dict_mut())
            .map_err(|e| EngineError::Parse(format!("failed to resolve /Resources: {e}"))),
        None => doc
            .get_object_mut(form_id)
            .and_then(|o| o.as_stream_mut())
            .and_then(|s| s.dict.get_mut(b"Resources"))
            .and_then(|o| o.as_dict_mut())
            .map_err(|e| EngineError::Parse(format!("/Resources is not a dictionary: {e}"))),
    }
}
