//! Engine error type wrapping lopdf, I/O, and core errors.

use pdfredact_core::RedactError;
use thiserror::Error;

/// Fatal error raised while rewriting a document.
///
/// Everything here aborts the whole conversion; a half-written content
/// stream cannot be resynchronized, so there is no per-operator recovery.
#[derive(Debug, Error)]
pub enum EngineError {
    /// PDF structure or content stream could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// I/O error reading or writing the document.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A content-stream operator was missing required operands or carried
    /// operands of the wrong type.
    #[error("malformed operator '{operator}': {detail}")]
    MalformedOperator { operator: String, detail: String },

    /// An image resource could not be decoded, patched, or re-encoded.
    #[error("image error: {0}")]
    Image(String),

    /// Form XObject nesting exceeded the configured recursion limit.
    #[error("form nesting exceeded recursion limit {limit}")]
    RecursionLimit { limit: usize },

    /// Error from the underlying lopdf document model.
    #[error("document error: {0}")]
    Document(#[from] lopdf::Error),

    /// Error from the core layer.
    #[error(transparent)]
    Core(#[from] RedactError),
}

impl EngineError {
    pub(crate) fn malformed(operator: &str, detail: impl Into<String>) -> Self {
        EngineError::MalformedOperator {
            operator: operator.to_string(),
            detail: detail.into(),
        }
    }
}

/// Lossy conversion for the public API surface, which only exposes
/// [`RedactError`].
impl From<EngineError> for RedactError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Parse(msg) => RedactError::ParseError(msg),
            EngineError::Io(e) => RedactError::IoError(e.to_string()),
            EngineError::MalformedOperator { operator, detail } => {
                RedactError::MalformedOperator { operator, detail }
            }
            EngineError::Image(msg) => RedactError::ImageError(msg),
            EngineError::RecursionLimit { limit } => RedactError::RecursionLimitExceeded { limit },
            EngineError::Document(e) => RedactError::ParseError(e.to_string()),
            EngineError::Core(e) => e,
        }
    }
}
