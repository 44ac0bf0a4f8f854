//! # glyphpack
//!
//! Compiles rasterized bitmap fonts into the compact, hash-indexed blob a
//! watch firmware reads straight from flash, plus the hardware-compatible
//! CRC32 used to validate packed resources.
//!
//! The device has no font renderer. Every glyph is pre-rendered at a fixed
//! pixel height, thresholded to 1 bit and stored with just enough metrics
//! to place it. Codepoints are found through a 255-bucket hash table.
//!
//! ## Architecture
//!
//! ```text
//! TTF/OTF + codepoint lists (JSON)
//!       ↓
//!   [font::raster]   — FontSource: cmap enumeration + FreeType/fontdue rendering
//!       ↓
//!   [font::encoder]  — one source → FontEncoding
//!   [font::merge]    — several sources, one height → FontEncoding
//!       ↓
//!   [font::blob]     — binary blob / C header
//!       ↓
//!   [pack]           — per-size blobs into a resource pack, crc32
//! ```

pub mod crc;
pub mod error;
pub mod font;
pub mod pack;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use error::{GlyphpackError, Result};
use font::{
    CodepointList, CodepointSubset, DuplicatePolicy, EncodeReport, EncoderSettings, FontEncoding,
    FontMerger, FontSource, MergeInput, SingleFontEncoder,
};

/// One source of a merge manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestSource {
    /// Path to the TTF/OTF file.
    pub font: PathBuf,
    /// Optional codepoint list JSON; all codepoints when absent.
    #[serde(default)]
    pub list: Option<PathBuf>,
    #[serde(default)]
    pub filter: Option<String>,
}

/// Describes a merged encoding. Relative paths resolve against the
/// manifest's directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeManifest {
    pub settings: EncoderSettings,
    pub sources: Vec<ManifestSource>,
    /// `"keep"`, `"firstWins"` or `"reject"`.
    #[serde(default)]
    pub duplicates: ManifestDuplicates,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ManifestDuplicates {
    #[default]
    Keep,
    FirstWins,
    Reject,
}

impl From<ManifestDuplicates> for DuplicatePolicy {
    fn from(d: ManifestDuplicates) -> Self {
        match d {
            ManifestDuplicates::Keep => DuplicatePolicy::Keep,
            ManifestDuplicates::FirstWins => DuplicatePolicy::FirstWins,
            ManifestDuplicates::Reject => DuplicatePolicy::Reject,
        }
    }
}

impl MergeManifest {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| GlyphpackError::parse("merge manifest", e))
    }
}

/// Build a subset from an optional codepoint list file and regex filter.
pub fn load_subset(list: Option<&Path>, filter: Option<&str>) -> Result<CodepointSubset> {
    let subset = match list {
        Some(path) => CodepointSubset::from_list(&CodepointList::load(path)?),
        None => CodepointSubset::all(),
    };
    match filter {
        Some(pattern) => subset.with_filter(pattern),
        None => Ok(subset),
    }
}

/// Encode a single font file.
pub fn encode_file(
    font: &Path,
    settings: EncoderSettings,
    subset: &CodepointSubset,
) -> Result<(FontEncoding, EncodeReport)> {
    let mut source = FontSource::open(font, settings.height, settings.rasterizer)?;
    SingleFontEncoder::new(settings).encode(&mut source, subset)
}

/// Load every source of `manifest` and merge them.
pub fn merge_manifest(
    manifest: &MergeManifest,
    base_dir: &Path,
) -> Result<(FontEncoding, EncodeReport)> {
    let settings = &manifest.settings;
    let mut inputs = manifest
        .sources
        .iter()
        .map(|entry| {
            let source =
                FontSource::open(base_dir.join(&entry.font), settings.height, settings.rasterizer)?;
            let list = entry.list.as_ref().map(|l| base_dir.join(l));
            let subset = load_subset(list.as_deref(), entry.filter.as_deref())?;
            Ok(MergeInput::new(source, subset, settings))
        })
        .collect::<Result<Vec<_>>>()?;

    FontMerger::new(settings.clone())
        .with_duplicate_policy(manifest.duplicates.into())
        .merge(&mut inputs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_from_json() {
        let manifest = MergeManifest::from_json(
            r#"{
                "settings": {"height": 14, "heightOffset": 4, "maxGlyphs": 32640},
                "sources": [
                    {"font": "latin.ttf", "list": "latin.json"},
                    {"font": "cjk.ttf", "filter": "[\\u4e00-\\u9fff]"}
                ],
                "duplicates": "firstWins"
            }"#,
        )
        .unwrap();
        assert_eq!(manifest.settings.height_offset, 4);
        assert_eq!(manifest.sources.len(), 2);
        assert_eq!(manifest.sources[1].list, None);
        assert_eq!(
            DuplicatePolicy::from(manifest.duplicates),
            DuplicatePolicy::FirstWins
        );
    }

    #[test]
    fn test_manifest_missing_sources() {
        let err = MergeManifest::from_json(r#"{"settings": {"height": 14}}"#).unwrap_err();
        assert!(err.to_string().contains("merge manifest"));
    }

    #[test]
    fn test_missing_font_file_is_io_error() {
        let err = encode_file(
            Path::new("/nonexistent/font.ttf"),
            EncoderSettings::new(14),
            &CodepointSubset::all(),
        )
        .unwrap_err();
        assert!(matches!(err, GlyphpackError::Io { .. }));
    }
}
