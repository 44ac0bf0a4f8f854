//! # Bitmap Font Encoding
//!
//! Turns rasterized glyphs and codepoint assignments into the fixed-layout
//! blob the watch firmware reads directly from flash.
//!
//! ## Pipeline
//!
//! ```text
//! GlyphRasterSource (+ CodepointSubset)
//!       ↓
//!   [encoder]  — enumerate one source, pack glyphs into the arena
//!   [merge]    — same, across several sources sharing a render size
//!       ↓
//!   [table]    — bucket entries by `codepoint % 255`, emit hash + offset tables
//!       ↓
//!   [blob]     — header + tables + glyph records
//! ```
//!
//! ## Blob layout (little-endian)
//!
//! | field            | size                                    |
//! |------------------|-----------------------------------------|
//! | header           | 8 bytes                                 |
//! | hash table       | 255 × 4 bytes                           |
//! | offset tables    | Σ entries × (codepoint bytes + 4)       |
//! | glyph table      | 4-byte placeholder + packed records     |

pub mod blob;
pub mod encoder;
pub mod ft_raster;
pub mod glyph;
pub mod merge;
pub mod raster;
pub mod source;
pub mod subset;
pub mod table;

pub use blob::{FontBlob, FontEncoding};
pub use encoder::{EncodeReport, SingleFontEncoder};
pub use glyph::{pack_glyph, GlyphMetrics, PackOptions};
pub use merge::{DuplicatePolicy, FontMerger, MergeInput};
pub use ft_raster::FreeTypeSource;
pub use raster::{FontSource, FontdueSource, Rasterizer};
pub use source::{GlyphRasterSource, PixelMode, RasterGlyph};
pub use subset::{CodepointList, CodepointSubset};
pub use table::{CodepointWidth, FontTables};

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const MIN_CODEPOINT: u32 = 0x20;
pub const MAX_2_BYTES_CODEPOINT: u32 = 0xFFFF;
pub const MAX_EXTENDED_CODEPOINT: u32 = 0x10FFFF;

/// Blob format version written in the header.
pub const FONT_VERSION: u8 = 2;

/// "White vertical rectangle", always mapped to the missing-glyph shape.
pub const WILDCARD_CODEPOINT: u32 = 0x25AF;
/// Always admitted, regardless of the allow-list or filter.
pub const ELLIPSIS_CODEPOINT: u32 = 0x2026;

pub const HASH_TABLE_SIZE: usize = 255;
pub const OFFSET_TABLE_MAX_SIZE: usize = 128;
pub const MAX_GLYPHS: usize = 256;
pub const MAX_GLYPHS_EXTENDED: usize = HASH_TABLE_SIZE * OFFSET_TABLE_MAX_SIZE;

/// Size of a byte offset into the glyph table.
pub const OFFSET_SIZE_BYTES: usize = 4;

/// Render configuration shared by every source of one encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncoderSettings {
    /// Pixel height the sources are rendered at.
    pub height: u16,

    /// Added to every glyph's `bottom` offset.
    #[serde(default)]
    pub height_offset: i16,

    /// Extra horizontal advance in pixels, applied to every glyph.
    #[serde(default)]
    pub tracking_adjust: i32,

    /// Use the antialiased rasterizer output (thresholded) instead of the
    /// monochrome hinting target.
    #[serde(default)]
    pub legacy: bool,

    #[serde(default)]
    pub faux_bold: bool,

    /// Soft cap on codepoint assignments; see [`SingleFontEncoder`].
    #[serde(default = "default_max_glyphs")]
    pub max_glyphs: usize,

    /// Turn bucket overflow into an error instead of a warning.
    #[serde(default)]
    pub strict: bool,

    /// Backend used when font files are opened by path.
    #[serde(default)]
    pub rasterizer: Rasterizer,
}

fn default_max_glyphs() -> usize {
    MAX_GLYPHS
}

impl EncoderSettings {
    pub fn new(height: u16) -> Self {
        EncoderSettings {
            height,
            height_offset: 0,
            tracking_adjust: 0,
            legacy: false,
            faux_bold: false,
            max_glyphs: MAX_GLYPHS,
            strict: false,
            rasterizer: Rasterizer::FreeType,
        }
    }

    /// Reject settings the blob header cannot represent, before anything
    /// is rendered.
    pub fn validate(&self) -> Result<()> {
        if self.height > u8::MAX as u16 {
            return Err(blob::header_field(
                "max_height",
                self.height as usize,
                u8::MAX as usize,
            ));
        }
        Ok(())
    }

    pub(crate) fn pack_options(&self) -> PackOptions {
        PackOptions {
            max_height: self.height,
            height_offset: self.height_offset,
            tracking_adjust: self.tracking_adjust,
            faux_bold: self.faux_bold,
        }
    }
}

/// Bucket index for a codepoint.
pub fn bucket_of(codepoint: u32) -> usize {
    (codepoint % HASH_TABLE_SIZE as u32) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_is_codepoint_mod_255() {
        assert_eq!(bucket_of(0), 0);
        assert_eq!(bucket_of(0x41), 0x41);
        assert_eq!(bucket_of(255), 0);
        assert_eq!(bucket_of(WILDCARD_CODEPOINT), 0x25AF % 255);
        assert_eq!(bucket_of(0x1F600), 0x1F600 % 255);
    }

    #[test]
    fn test_extended_cap() {
        assert_eq!(MAX_GLYPHS_EXTENDED, 32640);
    }

    #[test]
    fn test_settings_defaults_from_json() {
        let s: EncoderSettings = serde_json::from_str(r#"{"height": 14}"#).unwrap();
        assert_eq!(s, EncoderSettings::new(14));
    }

    #[test]
    fn test_settings_height_must_fit_header() {
        assert!(EncoderSettings::new(255).validate().is_ok());
        assert!(matches!(
            EncoderSettings::new(300).validate(),
            Err(crate::GlyphpackError::HeaderFieldOutOfRange { value: 300, .. })
        ));
    }
}
