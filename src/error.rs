//! Structured error types for glyphpack.
//!
//! Every variant except `Parse` and `Io` is an invariant violation detected
//! while encoding. They abort the encode for one render size; nothing is
//! retried and no partial blob is produced.

use thiserror::Error;

/// The unified error type returned by all public glyphpack functions.
#[derive(Debug, Error)]
pub enum GlyphpackError {
    /// A JSON codepoint list, manifest or build plan failed to parse.
    #[error("Failed to parse {what}: {source}{}", hint_suffix(.hint))]
    Parse {
        what: String,
        source: serde_json::Error,
        hint: String,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// A source font could not be loaded or parsed.
    #[error("Font error: {0}")]
    Font(String),

    /// The source maps the wildcard codepoint to a real glyph.
    #[error("Wildcard codepoint U+25AF is used for glyph {glyph} in this font")]
    WildcardCollision { glyph: u16 },

    /// Glyph index 0 is reserved for the missing-glyph shape.
    #[error("Glyph index 0 is reused by non-wildcard codepoint U+{codepoint:04X}")]
    ReservedGlyphIndex { codepoint: u32 },

    #[error("Unsupported pixel mode: {0}")]
    UnsupportedPixelMode(u8),

    /// Merge inputs disagree on render height or legacy mode.
    #[error(
        "Cannot merge '{source_name}': height {found_height} legacy {found_legacy}, \
         expected height {height} legacy {legacy}"
    )]
    MergeMismatch {
        source_name: String,
        height: u16,
        legacy: bool,
        found_height: u16,
        found_legacy: bool,
    },

    #[error("Cannot encode an empty set of font sources")]
    EmptyMerge,

    /// The same codepoint was claimed by two merge sources under
    /// `DuplicatePolicy::Reject`.
    #[error("Codepoint U+{codepoint:04X} is claimed by both '{first}' and '{second}'")]
    DuplicateCodepoint {
        codepoint: u32,
        first: String,
        second: String,
    },

    #[error("Supplied filter argument was not a valid regular expression: {0}")]
    InvalidFilter(#[from] regex::Error),

    /// Only raised in strict mode; otherwise overflow is a logged warning.
    #[error("Offset table for bucket {bucket} holds {count} entries (max 128)")]
    BucketOverflow { bucket: u8, count: usize },

    /// A hash entry cannot address its bucket: more than 255 rows, or a
    /// start offset past the 16-bit offset field.
    #[error(
        "Offset table for bucket {bucket} cannot be addressed: {count} entries \
         at byte offset {offset} (limits 255 entries, offset 65535)"
    )]
    TableTooLarge {
        bucket: u8,
        count: usize,
        offset: usize,
    },

    /// A header field does not fit its on-disk width.
    #[error("Header field {field} is {value}, which exceeds the maximum of {max}")]
    HeaderFieldOutOfRange {
        field: &'static str,
        value: usize,
        max: usize,
    },

    #[error("Codepoint {0:#x} is outside the encodable range")]
    CodepointOutOfRange(u32),

    /// A blob handed to the reader is shorter than its own tables claim.
    #[error("Malformed font blob: {0}")]
    MalformedBlob(String),
}

pub type Result<T> = std::result::Result<T, GlyphpackError>;

fn hint_suffix(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {}", hint)
    }
}

impl GlyphpackError {
    /// Wrap a serde_json failure with a hint picked from its category.
    pub fn parse(what: impl Into<String>, e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but doesn't match the expected schema. Check field names and types.".to_string()
            }
            serde_json::error::Category::Eof => {
                "Unexpected end of input. Is the JSON truncated?".to_string()
            }
            serde_json::error::Category::Io => String::new(),
        };
        GlyphpackError::Parse {
            what: what.into(),
            source: e,
            hint,
        }
    }

    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        GlyphpackError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}
