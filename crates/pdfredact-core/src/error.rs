//! Error and warning types for pdfredact-rs.
//!
//! Provides [`RedactError`] for fatal conditions that abort the whole
//! document conversion and [`RedactWarning`] for known accuracy limitations
//! that are reported but never stop processing.

use std::fmt;

/// Fatal error for a redaction run.
///
/// There is no per-page or per-operator recovery: a partially rewritten
/// content stream cannot be resumed safely, so the first fatal condition
/// aborts the conversion of the whole document.
#[derive(Debug, Clone, PartialEq)]
pub enum RedactError {
    /// Error parsing PDF structure or a content stream.
    ParseError(String),
    /// I/O error reading or writing the document.
    IoError(String),
    /// Error resolving font metrics or encoding information.
    FontError(String),
    /// A content-stream operator was missing required operands or carried
    /// operands of the wrong type.
    MalformedOperator {
        /// Operator name as it appeared in the stream.
        operator: String,
        /// What was wrong with its operands.
        detail: String,
    },
    /// An image resource could not be decoded, patched, or re-encoded.
    ImageError(String),
    /// Form XObject nesting exceeded the configured recursion limit.
    RecursionLimitExceeded {
        /// The configured maximum nesting depth.
        limit: usize,
    },
    /// Any other error not covered by specific variants.
    Other(String),
}

impl fmt::Display for RedactError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RedactError::ParseError(msg) => write!(f, "parse error: {msg}"),
            RedactError::IoError(msg) => write!(f, "I/O error: {msg}"),
            RedactError::FontError(msg) => write!(f, "font error: {msg}"),
            RedactError::MalformedOperator { operator, detail } => {
                write!(f, "malformed operator '{operator}': {detail}")
            }
            RedactError::ImageError(msg) => write!(f, "image error: {msg}"),
            RedactError::RecursionLimitExceeded { limit } => {
                write!(f, "form nesting exceeded recursion limit {limit}")
            }
            RedactError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for RedactError {}

impl From<std::io::Error> for RedactError {
    fn from(err: std::io::Error) -> Self {
        RedactError::IoError(err.to_string())
    }
}

/// Machine-readable code categorizing a non-fatal redaction warning.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "type", content = "detail")
)]
pub enum RedactWarningCode {
    /// A shown font had no usable metrics; a default width was assumed, so
    /// glyph boundaries near region edges may be off.
    MissingFontMetrics,
    /// A patched string run mixed byte widths; the per-run byte-width
    /// approximation may split codes incorrectly.
    ByteWidthApproximation,
    /// An image was placed with a rotated or sheared transform; the
    /// placement rectangle ignores those components.
    ShearedImageTransform,
    /// Any other warning not covered by specific variants.
    Other(String),
}

impl RedactWarningCode {
    /// Returns the string tag for this warning code.
    pub fn as_str(&self) -> &str {
        match self {
            RedactWarningCode::MissingFontMetrics => "MISSING_FONT_METRICS",
            RedactWarningCode::ByteWidthApproximation => "BYTE_WIDTH_APPROXIMATION",
            RedactWarningCode::ShearedImageTransform => "SHEARED_IMAGE_TRANSFORM",
            RedactWarningCode::Other(_) => "OTHER",
        }
    }
}

impl fmt::Display for RedactWarningCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-fatal issue encountered while rewriting a document.
///
/// Warnings mark the documented accuracy limitations (approximate byte
/// widths for multi-byte encodings, ignored shear in image placement,
/// missing font metrics). They never abort processing.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RedactWarning {
    /// Machine-readable warning code.
    pub code: RedactWarningCode,
    /// Human-readable description.
    pub description: String,
    /// Page number where the warning occurred (1-based), if known.
    pub page: Option<u32>,
    /// Resource or font name associated with the warning, if any.
    pub resource: Option<String>,
}

impl RedactWarning {
    /// Create a warning with just a description.
    ///
    /// Uses [`RedactWarningCode::Other`] as the default code.
    pub fn new(description: impl Into<String>) -> Self {
        let desc = description.into();
        Self {
            code: RedactWarningCode::Other(desc.clone()),
            description: desc,
            page: None,
            resource: None,
        }
    }

    /// Create a warning with a specific code and description.
    pub fn with_code(code: RedactWarningCode, description: impl Into<String>) -> Self {
        Self {
            code,
            description: description.into(),
            page: None,
            resource: None,
        }
    }

    /// Set the page context, returning the modified warning.
    pub fn on_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Set the resource/font name context, returning the modified warning.
    pub fn for_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }
}

impl fmt::Display for RedactWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.description)?;
        if let Some(page) = self.page {
            write!(f, " (page {page})")?;
        }
        if let Some(resource) = &self.resource {
            write!(f, " [/{resource}]")?;
        }
        Ok(())
    }
}
