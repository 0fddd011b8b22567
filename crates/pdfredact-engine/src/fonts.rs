//! Font metrics extraction from PDF font dictionaries.
//!
//! Glyph advance widths drive both glyph placement (where a glyph lands, so
//! the matcher can test it) and the patcher's displacement arithmetic (how
//! much space a removed glyph leaves behind). Simple fonts use /Widths +
//! /FirstChar; Type0 composite fonts use the descendant's /W + /DW and
//! two-byte codes.

use std::collections::HashMap;

/// Default character width when nothing else is known (600/1000 of text
/// space).
const DEFAULT_WIDTH: f64 = 600.0;

/// Default /DW for CID fonts per the PDF spec.
const DEFAULT_CID_WIDTH: f64 = 1000.0;

/// Glyph widths for one font, in glyph space units (1/1000 of text space).
#[derive(Debug, Clone, PartialEq)]
pub struct FontMetrics {
    widths: WidthTable,
    /// Bytes per character code in string operands: 1 for simple fonts,
    /// 2 for the Identity-encoded composite fonts handled here.
    byte_width: u8,
    /// False when the font dictionary carried no usable width information
    /// and everything falls back to the default width.
    explicit: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum WidthTable {
    /// /Widths array indexed from /FirstChar, /MissingWidth fallback.
    Simple {
        widths: Vec<f64>,
        first_char: u32,
        missing_width: f64,
    },
    /// CID /W entries with /DW fallback.
    Cid {
        widths: HashMap<u32, f64>,
        default_width: f64,
    },
}

impl Default for FontMetrics {
    fn default() -> Self {
        Self::default_metrics()
    }
}

impl FontMetrics {
    /// Metrics for when font information is unavailable: every code is
    /// `DEFAULT_WIDTH` wide, single-byte.
    pub fn default_metrics() -> Self {
        Self {
            widths: WidthTable::Simple {
                widths: Vec::new(),
                first_char: 0,
                missing_width: DEFAULT_WIDTH,
            },
            byte_width: 1,
            explicit: false,
        }
    }

    /// Width for a character code in glyph space (1/1000 of text space).
    pub fn get_width(&self, code: u32) -> f64 {
        match &self.widths {
            WidthTable::Simple {
                widths,
                first_char,
                missing_width,
            } => {
                if code >= *first_char {
                    let index = (code - first_char) as usize;
                    if index < widths.len() {
                        return widths[index];
                    }
                }
                *missing_width
            }
            WidthTable::Cid {
                widths,
                default_width,
            } => widths.get(&code).copied().unwrap_or(*default_width),
        }
    }

    /// Bytes per character code in this font's string operands.
    pub fn byte_width(&self) -> u8 {
        self.byte_width
    }

    /// True when the font dictionary provided real width data.
    pub fn has_explicit_widths(&self) -> bool {
        self.explicit
    }
}

/// Extract [`FontMetrics`] from a lopdf font dictionary.
///
/// Missing or unparseable fields degrade to defaults rather than failing;
/// the caller decides whether a default-metrics font warrants a warning.
pub fn extract_font_metrics(doc: &lopdf::Document, font_dict: &lopdf::Dictionary) -> FontMetrics {
    let subtype = font_dict
        .get(b"Subtype")
        .ok()
        .and_then(|o| o.as_name().ok());

    if subtype == Some(b"Type0") {
        return extract_cid_metrics(doc, font_dict);
    }

    let first_char = font_dict
        .get(b"FirstChar")
        .ok()
        .and_then(object_to_f64)
        .map(|v| v as u32)
        .unwrap_or(0);

    let widths: Vec<f64> = match font_dict.get(b"Widths") {
        Ok(obj) => match resolve_object(doc, obj).as_array() {
            Ok(arr) => arr
                .iter()
                .map(|o| object_to_f64(resolve_object(doc, o)).unwrap_or(0.0))
                .collect(),
            Err(_) => Vec::new(),
        },
        Err(_) => Vec::new(),
    };

    let missing_width = font_dict
        .get(b"FontDescriptor")
        .ok()
        .map(|o| resolve_object(doc, o))
        .and_then(|o| o.as_dict().ok())
        .and_then(|desc| desc.get(b"MissingWidth").ok().and_then(object_to_f64))
        .unwrap_or(DEFAULT_WIDTH);

    let explicit = !widths.is_empty();
    FontMetrics {
        widths: WidthTable::Simple {
            widths,
            first_char,
            missing_width,
        },
        byte_width: 1,
        explicit,
    }
}

/// Type0 composite font: widths come from the descendant CIDFont's /W and
/// /DW. Codes are treated as two-byte CIDs (Identity CMaps); other CMaps
/// still get sensible defaults.
fn extract_cid_metrics(doc: &lopdf::Document, font_dict: &lopdf::Dictionary) -> FontMetrics {
    let descendant = font_dict
        .get(b"DescendantFonts")
        .ok()
        .map(|o| resolve_object(doc, o))
        .and_then(|o| o.as_array().ok())
        .and_then(|arr| arr.first())
        .map(|o| resolve_object(doc, o))
        .and_then(|o| o.as_dict().ok());

    let Some(descendant) = descendant else {
        return FontMetrics {
            widths: WidthTable::Cid {
                widths: HashMap::new(),
                default_width: DEFAULT_CID_WIDTH,
            },
            byte_width: 2,
            explicit: false,
        };
    };

    let default_width = descendant
        .get(b"DW")
        .ok()
        .and_then(object_to_f64)
        .unwrap_or(DEFAULT_CID_WIDTH);

    let mut widths = HashMap::new();
    if let Ok(w_obj) = descendant.get(b"W") {
        if let Ok(arr) = resolve_object(doc, w_obj).as_array() {
            parse_w_array(doc, arr, &mut widths);
        }
    }

    let explicit = !widths.is_empty();
    FontMetrics {
        widths: WidthTable::Cid {
            widths,
            default_width,
        },
        byte_width: 2,
        explicit,
    }
}

/// /W array: alternating `c [w1 w2 ...]` and `c_first c_last w` groups.
fn parse_w_array(doc: &lopdf::Document, arr: &[lopdf::Object], out: &mut HashMap<u32, f64>) {
    let mut i = 0;
    while i < arr.len() {
        let Some(start) = object_to_f64(resolve_object(doc, &arr[i])).map(|v| v as u32) else {
            break;
        };
        i += 1;
        match arr.get(i).map(|o| resolve_object(doc, o)) {
            Some(lopdf::Object::Array(list)) => {
                for (offset, w) in list.iter().enumerate() {
                    if let Some(w) = object_to_f64(resolve_object(doc, w)) {
                        out.insert(start + offset as u32, w);
                    }
                }
                i += 1;
            }
            Some(obj) => {
                let Some(end) = object_to_f64(obj).map(|v| v as u32) else {
                    break;
                };
                let Some(w) = arr
                    .get(i + 1)
                    .and_then(|o| object_to_f64(resolve_object(doc, o)))
                else {
                    break;
                };
                for code in start..=end {
                    out.insert(code, w);
                }
                i += 2;
            }
            None => break,
        }
    }
}

/// Resolve an indirect reference to the actual object.
fn resolve_object<'a>(doc: &'a lopdf::Document, obj: &'a lopdf::Object) -> &'a lopdf::Object {
    match obj {
        lopdf::Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

fn object_to_f64(obj: &lopdf::Object) -> Option<f64> {
    match obj {
        lopdf::Object::Integer(i) => Some(*i as f64),
        lopdf::Object::Real(f) => Some(*f as f64),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{Document, Object, dictionary};

    #[test]
    fn default_metrics_single_byte_default_width() {
        let m = FontMetrics::default_metrics();
        assert_eq!(m.get_width(65), DEFAULT_WIDTH);
        assert_eq!(m.byte_width(), 1);
        assert!(!m.has_explicit_widths());
    }

    #[test]
    fn simple_widths_lookup() {
        let mut doc = Document::with_version("1.5");
        let widths_id = doc.add_object(Object::Array(vec![
            Object::Integer(278),
            Object::Integer(556),
            Object::Integer(722),
        ]));
        let font_dict = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "FirstChar" => 65i64,
            "LastChar" => 67i64,
            "Widths" => widths_id,
        };

        let m = extract_font_metrics(&doc, &font_dict);
        assert!(m.has_explicit_widths());
        assert_eq!(m.byte_width(), 1);
        assert_eq!(m.get_width(65), 278.0);
        assert_eq!(m.get_width(66), 556.0);
        assert_eq!(m.get_width(67), 722.0);
        // Out of range falls back to the default missing width.
        assert_eq!(m.get_width(68), DEFAULT_WIDTH);
    }

    #[test]
    fn missing_width_from_descriptor() {
        let mut doc = Document::with_version("1.5");
        let widths_id = doc.add_object(Object::Array(vec![Object::Integer(400)]));
        let desc_id = doc.add_object(Object::Dictionary(dictionary! {
            "Type" => "FontDescriptor",
            "FontName" => "Times-Roman",
            "MissingWidth" => Object::Integer(250),
        }));
        let font_dict = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "FirstChar" => 65i64,
            "LastChar" => 65i64,
            "Widths" => widths_id,
            "FontDescriptor" => desc_id,
        };

        let m = extract_font_metrics(&doc, &font_dict);
        assert_eq!(m.get_width(65), 400.0);
        assert_eq!(m.get_width(90), 250.0);
    }

    #[test]
    fn empty_font_dict_degrades_to_defaults() {
        let doc = Document::with_version("1.5");
        let m = extract_font_metrics(&doc, &dictionary! {});
        assert!(!m.has_explicit_widths());
        assert_eq!(m.get_width(65), DEFAULT_WIDTH);
    }

    #[test]
    fn type0_w_array_list_form() {
        let mut doc = Document::with_version("1.5");
        let descendant = doc.add_object(Object::Dictionary(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "DW" => Object::Integer(1000),
            "W" => Object::Array(vec![
                Object::Integer(10),
                Object::Array(vec![
                    Object::Integer(500),
                    Object::Integer(600),
                    Object::Integer(700),
                ]),
            ]),
        }));
        let font_dict = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => "Identity-Font",
            "Encoding" => "Identity-H",
            "DescendantFonts" => Object::Array(vec![Object::Reference(descendant)]),
        };

        let m = extract_font_metrics(&doc, &font_dict);
        assert_eq!(m.byte_width(), 2);
        assert!(m.has_explicit_widths());
        assert_eq!(m.get_width(10), 500.0);
        assert_eq!(m.get_width(11), 600.0);
        assert_eq!(m.get_width(12), 700.0);
        assert_eq!(m.get_width(13), 1000.0); // DW fallback
    }

    #[test]
    fn type0_w_array_range_form() {
        let mut doc = Document::with_version("1.5");
        let descendant = doc.add_object(Object::Dictionary(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "DW" => Object::Integer(800),
            "W" => Object::Array(vec![
                Object::Integer(100),
                Object::Integer(103),
                Object::Integer(450),
            ]),
        }));
        let font_dict = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "DescendantFonts" => Object::Array(vec![Object::Reference(descendant)]),
        };

        let m = extract_font_metrics(&doc, &font_dict);
        for code in 100..=103 {
            assert_eq!(m.get_width(code), 450.0);
        }
        assert_eq!(m.get_width(99), 800.0);
        assert_eq!(m.get_width(104), 800.0);
    }

    #[test]
    fn type0_without_descendant_defaults() {
        let doc = Document::with_version("1.5");
        let font_dict = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
        };
        let m = extract_font_metrics(&doc, &font_dict);
        assert_eq!(m.byte_width(), 2);
        assert!(!m.has_explicit_widths());
        assert_eq!(m.get_width(1), DEFAULT_CID_WIDTH);
    }
}
