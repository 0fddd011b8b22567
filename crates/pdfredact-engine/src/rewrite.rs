//! The content-stream interception engine.
//!
//! Walks a decoded operator list in order, applies each operator's side
//! effects to the graphics and text state, packages what the operator
//! produced into an [`OpContext`], and hands the operator to the policy to
//! decide what lands in the output buffer. Form XObjects are descended into
//! recursively with an explicit depth parameter; their rewritten content is
//! recorded in the stash for the caller to apply.

use crate::context::{ImageUse, OpContext};
use crate::error::EngineError;
use crate::fonts::{FontMetrics, extract_font_metrics};
use crate::graphics::GraphicsStack;
use crate::image_patch::placement_rect;
use crate::ops::{require_f64, require_matrix, require_name, require_string, tj_elements};
use crate::policy::{RewritePolicy, RewriteScope};
use crate::show::{ShowElement, show_elements};
use crate::stash::{ResourceOwner, ResourceStash};
use crate::text_state::TextState;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId};
use pdfredact_core::{RedactOptions, RedactWarning, RedactWarningCode};
use std::collections::HashMap;

/// Rewrite one nesting level of content-stream operations.
///
/// `depth` is 0 for page content and increments for every form descent;
/// exceeding `options.max_recursion_depth` is fatal. The caller owns the
/// graphics stack, text state, and stash so that a form sees the state of
/// its invocation site. `owner` names the dictionary `resources` lives in,
/// so stashed registrations land where the emitted operators resolve.
#[allow(clippy::too_many_arguments)]
pub fn rewrite_operations(
    doc: &Document,
    operations: &[Operation],
    resources: &Dictionary,
    owner: ResourceOwner,
    page_height: f64,
    policy: &mut dyn RewritePolicy,
    options: &RedactOptions,
    depth: usize,
    gs: &mut GraphicsStack,
    ts: &mut TextState,
    stash: &mut ResourceStash,
) -> Result<Vec<Operation>, EngineError> {
    if depth > options.max_recursion_depth {
        return Err(EngineError::RecursionLimit {
            limit: options.max_recursion_depth,
        });
    }

    #[cfg(feature = "tracing")]
    tracing::trace!(depth, operators = operations.len(), "rewriting stream");

    let mut out = Vec::with_capacity(operations.len());
    let mut font_cache: HashMap<String, FontMetrics> = HashMap::new();

    for op in operations {
        policy.before_operator(op);

        let ctx = match op.operator.as_str() {
            "q" => {
                gs.save(ts);
                OpContext::empty()
            }
            "Q" => {
                // Unbalanced Q is tolerated; the operator still passes
                // through so the output stays byte-faithful.
                gs.restore(ts);
                OpContext::empty()
            }
            "cm" => {
                gs.concat(require_matrix(op)?);
                OpContext::empty()
            }
            "BT" => {
                ts.begin_text();
                OpContext::empty()
            }
            "ET" => {
                ts.end_text();
                OpContext::empty()
            }
            "Tf" => {
                let name = require_name(op, 0)?;
                let size = require_f64(op, 1)?;
                let metrics = resolve_font(doc, resources, &name, &mut font_cache, policy);
                ts.set_font(name, size, metrics);
                OpContext::empty()
            }
            "Td" => {
                ts.move_text_position(require_f64(op, 0)?, require_f64(op, 1)?);
                OpContext::empty()
            }
            "TD" => {
                ts.move_text_position_and_set_leading(require_f64(op, 0)?, require_f64(op, 1)?);
                OpContext::empty()
            }
            "Tm" => {
                ts.set_text_matrix(require_matrix(op)?);
                OpContext::empty()
            }
            "T*" => {
                ts.move_to_next_line();
                OpContext::empty()
            }
            "Tc" => {
                ts.char_spacing = require_f64(op, 0)?;
                OpContext::empty()
            }
            "Tw" => {
                ts.word_spacing = require_f64(op, 0)?;
                OpContext::empty()
            }
            "Tz" => {
                ts.h_scaling = require_f64(op, 0)?;
                OpContext::empty()
            }
            "TL" => {
                ts.leading = require_f64(op, 0)?;
                OpContext::empty()
            }
            "Ts" => {
                ts.rise = require_f64(op, 0)?;
                OpContext::empty()
            }
            "Tj" => {
                let bytes = require_string(op, 0)?;
                let glyphs =
                    show_elements(ts, gs.ctm(), page_height, &[ShowElement::Text(bytes)]);
                OpContext::with_glyphs(glyphs)
            }
            "'" => {
                ts.move_to_next_line();
                let bytes = require_string(op, 0)?;
                let glyphs =
                    show_elements(ts, gs.ctm(), page_height, &[ShowElement::Text(bytes)]);
                OpContext::with_glyphs(glyphs)
            }
            "\"" => {
                ts.word_spacing = require_f64(op, 0)?;
                ts.char_spacing = require_f64(op, 1)?;
                ts.move_to_next_line();
                let bytes = require_string(op, 2)?;
                let glyphs =
                    show_elements(ts, gs.ctm(), page_height, &[ShowElement::Text(bytes)]);
                OpContext::with_glyphs(glyphs)
            }
            "TJ" => {
                let elements = tj_elements(op)?;
                let glyphs = show_elements(ts, gs.ctm(), page_height, &elements);
                OpContext::with_glyphs(glyphs)
            }
            "Do" => {
                let name = require_name(op, 0)?;
                let (object_id, stream) = lookup_xobject(doc, resources, &name)?;
                let subtype = stream
                    .dict
                    .get(b"Subtype")
                    .ok()
                    .and_then(|o| o.as_name().ok());
                match subtype {
                    Some(b"Image") => {
                        let ctm = *gs.ctm();
                        OpContext::with_image(ImageUse {
                            name,
                            object_id,
                            ctm,
                            placement: placement_rect(&ctm),
                            axis_aligned: ctm.is_axis_aligned(),
                        })
                    }
                    Some(b"Form") if options.descend_into_forms => {
                        descend_into_form(
                            doc,
                            object_id,
                            stream,
                            resources,
                            owner,
                            page_height,
                            policy,
                            options,
                            depth,
                            gs,
                            ts,
                            stash,
                        )?;
                        OpContext::empty()
                    }
                    _ => OpContext::empty(),
                }
            }
            _ => OpContext::empty(),
        };

        let mut scope = RewriteScope {
            doc,
            resources,
            owner,
            out: &mut out,
            stash,
        };
        policy.rewrite(op, &ctx, &mut scope)?;
    }

    Ok(out)
}

/// Rewrite a form XObject's content in the state of its invocation site and
/// stash the replacement bytes. The `Do` operator itself is handled by the
/// caller afterwards.
#[allow(clippy::too_many_arguments)]
fn descend_into_form(
    doc: &Document,
    form_id: ObjectId,
    form: &lopdf::Stream,
    parent_resources: &Dictionary,
    parent_owner: ResourceOwner,
    page_height: f64,
    policy: &mut dyn RewritePolicy,
    options: &RedactOptions,
    depth: usize,
    gs: &mut GraphicsStack,
    ts: &mut TextState,
    stash: &mut ResourceStash,
) -> Result<(), EngineError> {
    gs.save(ts);
    if let Ok(matrix_obj) = form.dict.get(b"Matrix") {
        if let Some(matrix) = matrix_from_array(matrix_obj) {
            gs.concat(matrix);
        }
    }

    // A form with its own /Resources owns the names its operators resolve;
    // one that falls back to the parent's resources stays in the parent's
    // namespace.
    let (form_resources, owner) = match form
        .dict
        .get(b"Resources")
        .ok()
        .and_then(|obj| resolve_dict(doc, obj))
    {
        Some(dict) => (dict, ResourceOwner::Form(form_id)),
        None => (parent_resources, parent_owner),
    };

    let content = form
        .decompressed_content()
        .unwrap_or_else(|_| form.content.clone());
    let decoded = Content::decode(&content)?;

    let rewritten = rewrite_operations(
        doc,
        &decoded.operations,
        form_resources,
        owner,
        page_height,
        policy,
        options,
        depth + 1,
        gs,
        ts,
        stash,
    );
    gs.restore(ts);

    let encoded = Content {
        operations: rewritten?,
    }
    .encode()?;
    stash.replace_form_content(form_id, encoded);
    Ok(())
}

/// Resolve a font resource to metrics, warning once per name when the font
/// is missing or carries no usable widths.
fn resolve_font(
    doc: &Document,
    resources: &Dictionary,
    name: &str,
    cache: &mut HashMap<String, FontMetrics>,
    policy: &mut dyn RewritePolicy,
) -> FontMetrics {
    if let Some(metrics) = cache.get(name) {
        return metrics.clone();
    }

    let font_dict = resources
        .get(b"Font")
        .ok()
        .and_then(|obj| resolve_dict(doc, obj))
        .and_then(|fonts| fonts.get(name.as_bytes()).ok())
        .and_then(|obj| resolve_dict(doc, obj));

    let metrics = match font_dict {
        Some(dict) => extract_font_metrics(doc, dict),
        None => FontMetrics::default_metrics(),
    };

    if !metrics.has_explicit_widths() {
        policy.warn(
            RedactWarning::with_code(
                RedactWarningCode::MissingFontMetrics,
                "no usable width data; glyph geometry uses default widths",
            )
            .for_resource(name.to_string()),
        );
    }

    cache.insert(name.to_string(), metrics.clone());
    metrics
}

/// Resolve an XObject resource name to its stream. An unresolvable XObject
/// is fatal: the draw cannot be classified, so the page cannot be safely
/// rewritten.
fn lookup_xobject<'a>(
    doc: &'a Document,
    resources: &'a Dictionary,
    name: &str,
) -> Result<(ObjectId, &'a lopdf::Stream), EngineError> {
    let xobjects = resources
        .get(b"XObject")
        .ok()
        .and_then(|obj| resolve_dict(doc, obj))
        .ok_or_else(|| {
            EngineError::Parse(format!("no XObject resources for /{name}"))
        })?;
    let entry = xobjects
        .get(name.as_bytes())
        .map_err(|_| EngineError::Parse(format!("XObject /{name} not in resources")))?;
    let id = match entry {
        Object::Reference(id) => *id,
        _ => {
            return Err(EngineError::Parse(format!(
                "XObject /{name} is not an indirect reference"
            )));
        }
    };
    let stream = doc
        .get_object(id)
        .and_then(|obj| obj.as_stream())
        .map_err(|_| EngineError::Parse(format!("XObject /{name} is not a stream")))?;
    Ok((id, stream))
}

fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok().and_then(|o| o.as_dict().ok()),
        other => other.as_dict().ok(),
    }
}

fn matrix_from_array(obj: &Object) -> Option<pdfredact_core::Ctm> {
    let array = obj.as_array().ok()?;
    if array.len() < 6 {
        return None;
    }
    let mut values = [0.0f64; 6];
    for (slot, element) in values.iter_mut().zip(array) {
        *slot = crate::ops::object_f64(element)?;
    }
    Some(pdfredact_core::Ctm::new(
        values[0], values[1], values[2], values[3], values[4], values[5],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::PassthroughPolicy;
    use lopdf::{StringFormat, dictionary};
    use pdfredact_core::GlyphPlacement;

    const PAGE_HEIGHT: f64 = 792.0;

    /// Policy that records the glyphs of every show-text operator it sees.
    #[derive(Default)]
    struct CapturePolicy {
        shows: Vec<Vec<GlyphPlacement>>,
        warnings: Vec<RedactWarning>,
    }

    impl RewritePolicy for CapturePolicy {
        fn warn(&mut self, warning: RedactWarning) {
            self.warnings.push(warning);
        }

        fn rewrite(
            &mut self,
            op: &Operation,
            ctx: &OpContext,
            scope: &mut RewriteScope<'_>,
        ) -> Result<(), EngineError> {
            if !ctx.glyphs.is_empty() {
                self.shows.push(ctx.glyphs.clone());
            }
            scope.out.push(op.clone());
            Ok(())
        }
    }

    fn helvetica_doc() -> (Document, Dictionary) {
        let mut doc = Document::with_version("1.5");
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "FirstChar" => 65i64,
            "LastChar" => 66i64,
            "Widths" => vec![Object::Integer(500), Object::Integer(700)],
        });
        let resources = dictionary! {
            "Font" => dictionary! { "F1" => Object::Reference(font_id) },
        };
        (doc, resources)
    }

    fn run(
        doc: &Document,
        resources: &Dictionary,
        policy: &mut dyn RewritePolicy,
        operations: Vec<Operation>,
    ) -> Result<Vec<Operation>, EngineError> {
        let mut gs = GraphicsStack::new();
        let mut ts = TextState::new();
        let mut stash = ResourceStash::new();
        rewrite_operations(
            doc,
            &operations,
            resources,
            ResourceOwner::Page,
            PAGE_HEIGHT,
            policy,
            &RedactOptions::default(),
            0,
            &mut gs,
            &mut ts,
            &mut stash,
        )
    }

    fn show(text: &[u8]) -> Operation {
        Operation::new(
            "Tj",
            vec![Object::String(text.to_vec(), StringFormat::Literal)],
        )
    }

    #[test]
    fn passthrough_preserves_operator_sequence() {
        let (doc, resources) = helvetica_doc();
        let ops = vec![
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(b"F1".to_vec()), Object::Integer(12)],
            ),
            Operation::new("Td", vec![Object::Integer(72), Object::Integer(700)]),
            show(b"AB"),
            Operation::new("ET", vec![]),
        ];
        let out = run(&doc, &resources, &mut PassthroughPolicy, ops.clone()).unwrap();
        assert_eq!(out.len(), ops.len());
        assert_eq!(out[3].operator, "Tj");
    }

    #[test]
    fn glyphs_reflect_font_widths_and_position() {
        let (doc, resources) = helvetica_doc();
        let mut policy = CapturePolicy::default();
        run(
            &doc,
            &resources,
            &mut policy,
            vec![
                Operation::new("BT", vec![]),
                Operation::new(
                    "Tf",
                    vec![Object::Name(b"F1".to_vec()), Object::Integer(10)],
                ),
                Operation::new("Td", vec![Object::Integer(100), Object::Integer(700)]),
                show(b"AB"),
            ],
        )
        .unwrap();

        assert_eq!(policy.shows.len(), 1);
        let glyphs = &policy.shows[0];
        assert_eq!(glyphs.len(), 2);
        assert!((glyphs[0].x - 100.0).abs() < 1e-9);
        // A is 500/1000 wide at 10pt.
        assert!((glyphs[1].x - 105.0).abs() < 1e-9);
        assert!((glyphs[0].y - (PAGE_HEIGHT - 700.0)).abs() < 1e-9);
        assert!(policy.warnings.is_empty());
    }

    #[test]
    fn q_restore_unwinds_cm() {
        let (doc, resources) = helvetica_doc();
        let mut policy = CapturePolicy::default();
        run(
            &doc,
            &resources,
            &mut policy,
            vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        Object::Integer(2),
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Integer(2),
                        Object::Integer(0),
                        Object::Integer(0),
                    ],
                ),
                Operation::new("Q", vec![]),
                Operation::new("BT", vec![]),
                Operation::new(
                    "Tf",
                    vec![Object::Name(b"F1".to_vec()), Object::Integer(10)],
                ),
                Operation::new("Td", vec![Object::Integer(50), Object::Integer(50)]),
                show(b"A"),
            ],
        )
        .unwrap();

        // The doubled matrix was popped before the show.
        assert!((policy.shows[0][0].x - 50.0).abs() < 1e-9);
    }

    #[test]
    fn unknown_font_warns_and_uses_defaults() {
        let doc = Document::with_version("1.5");
        let resources = Dictionary::new();
        let mut policy = CapturePolicy::default();
        run(
            &doc,
            &resources,
            &mut policy,
            vec![
                Operation::new("BT", vec![]),
                Operation::new(
                    "Tf",
                    vec![Object::Name(b"F9".to_vec()), Object::Integer(10)],
                ),
                show(b"A"),
            ],
        )
        .unwrap();

        assert_eq!(policy.warnings.len(), 1);
        assert_eq!(
            policy.warnings[0].code,
            RedactWarningCode::MissingFontMetrics
        );
        // Default 600/1000 width at 10pt.
        assert!((policy.shows[0][0].advance - 6.0).abs() < 1e-9);
    }

    #[test]
    fn malformed_cm_is_fatal() {
        let (doc, resources) = helvetica_doc();
        let err = run(
            &doc,
            &resources,
            &mut PassthroughPolicy,
            vec![Operation::new("cm", vec![Object::Integer(1)])],
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::MalformedOperator { .. }));
    }

    #[test]
    fn missing_xobject_is_fatal() {
        let (doc, resources) = helvetica_doc();
        let err = run(
            &doc,
            &resources,
            &mut PassthroughPolicy,
            vec![Operation::new("Do", vec![Object::Name(b"Im0".to_vec())])],
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Parse(_)));
    }

    #[test]
    fn recursion_limit_stops_self_referencing_forms() {
        let mut doc = Document::with_version("1.5");
        let form_content = b"/FormA Do".to_vec();
        let form_id = doc.new_object_id();
        let resources_dict = dictionary! {
            "XObject" => dictionary! { "FormA" => Object::Reference(form_id) },
        };
        let form = lopdf::Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "Resources" => resources_dict.clone(),
            },
            form_content,
        );
        doc.objects.insert(form_id, Object::Stream(form));

        let err = run(
            &doc,
            &resources_dict,
            &mut PassthroughPolicy,
            vec![Operation::new("Do", vec![Object::Name(b"FormA".to_vec())])],
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::RecursionLimit { .. }));
    }

    #[test]
    fn form_descent_rewrites_content_into_stash() {
        let mut doc = Document::with_version("1.5");
        let form_id = doc.add_object(lopdf::Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
            },
            b"BT /F1 10 Tf 5 5 Td (A) Tj ET".to_vec(),
        ));
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "FirstChar" => 65i64,
            "LastChar" => 65i64,
            "Widths" => vec![Object::Integer(500)],
        });
        let resources = dictionary! {
            "Font" => dictionary! { "F1" => Object::Reference(font_id) },
            "XObject" => dictionary! { "FormA" => Object::Reference(form_id) },
        };

        let mut gs = GraphicsStack::new();
        let mut ts = TextState::new();
        let mut stash = ResourceStash::new();
        let mut policy = CapturePolicy::default();
        let out = rewrite_operations(
            &doc,
            &[Operation::new("Do", vec![Object::Name(b"FormA".to_vec())])],
            &resources,
            ResourceOwner::Page,
            PAGE_HEIGHT,
            &mut policy,
            &RedactOptions::default(),
            0,
            &mut gs,
            &mut ts,
            &mut stash,
        )
        .unwrap();

        // The Do itself passes through; the form body was walked.
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].operator, "Do");
        assert_eq!(policy.shows.len(), 1);
        assert_eq!(stash.forms().len(), 1);
        assert_eq!(stash.forms()[0].0, form_id);
    }

    #[test]
    fn forms_skipped_when_descent_disabled() {
        let mut doc = Document::with_version("1.5");
        let form_id = doc.add_object(lopdf::Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
            },
            b"BT (A) Tj ET".to_vec(),
        ));
        let resources = dictionary! {
            "XObject" => dictionary! { "FormA" => Object::Reference(form_id) },
        };

        let mut gs = GraphicsStack::new();
        let mut ts = TextState::new();
        let mut stash = ResourceStash::new();
        let options = RedactOptions {
            descend_into_forms: false,
            ..RedactOptions::default()
        };
        let out = rewrite_operations(
            &doc,
            &[Operation::new("Do", vec![Object::Name(b"FormA".to_vec())])],
            &resources,
            ResourceOwner::Page,
            PAGE_HEIGHT,
            &mut PassthroughPolicy,
            &options,
            0,
            &mut gs,
            &mut ts,
            &mut stash,
        )
        .unwrap();

        assert_eq!(out.len(), 1);
        assert!(stash.is_empty());
    }
}
