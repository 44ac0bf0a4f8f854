//! TrueType/OpenType render sources.
//!
//! Character enumeration always comes from the font's Unicode cmap
//! subtables via ttf-parser. Rasterization is FreeType by default
//! ([`FreeTypeSource`]), which honours the monochrome target, or fontdue
//! ([`FontdueSource`]), which only produces coverage maps: every glyph
//! comes back as [`PixelMode::Grey`] and gets thresholded by the packer.

use std::collections::BTreeMap;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use super::ft_raster::FreeTypeSource;
use super::source::{GlyphRasterSource, PixelMode, RasterGlyph};
use crate::error::{GlyphpackError, Result};

/// Face name and charmap, shared by every rasterizer backend.
pub(crate) struct FaceInfo {
    pub(crate) name: String,
    /// codepoint → glyph index, ascending.
    pub(crate) charmap: BTreeMap<u32, u16>,
}

impl FaceInfo {
    pub(crate) fn read(data: &[u8]) -> Result<Self> {
        let face = ttf_parser::Face::parse(data, 0)
            .map_err(|e| GlyphpackError::Font(format!("Failed to parse font: {:?}", e)))?;
        Ok(FaceInfo {
            name: face_name(&face),
            charmap: collect_charmap(&face),
        })
    }

    pub(crate) fn glyph_index(&self, codepoint: u32) -> Option<u16> {
        self.charmap.get(&codepoint).copied()
    }

    pub(crate) fn first_char(&self) -> (u32, u16) {
        self.charmap
            .iter()
            .next()
            .map(|(&cp, &gid)| (cp, gid))
            .unwrap_or((0, 0))
    }

    pub(crate) fn next_char(&self, codepoint: u32) -> (u32, u16) {
        self.charmap
            .range(codepoint.saturating_add(1)..)
            .next()
            .map(|(&cp, &gid)| (cp, gid))
            .unwrap_or((0, 0))
    }
}

/// `Family_Style`, falling back to the PostScript name.
fn face_name(face: &ttf_parser::Face<'_>) -> String {
    let find = |id: u16| {
        face.names()
            .into_iter()
            .filter(|n| n.name_id == id && n.is_unicode())
            .find_map(|n| n.to_string())
    };
    match (
        find(ttf_parser::name_id::FAMILY),
        find(ttf_parser::name_id::SUBFAMILY),
    ) {
        (Some(family), Some(style)) => format!("{}_{}", family, style),
        (Some(family), None) => family,
        _ => find(ttf_parser::name_id::POST_SCRIPT_NAME).unwrap_or_else(|| "font".to_string()),
    }
}

/// Union of all Unicode cmap subtables; the first subtable to map a
/// codepoint wins.
fn collect_charmap(face: &ttf_parser::Face<'_>) -> BTreeMap<u32, u16> {
    let mut charmap = BTreeMap::new();
    let Some(cmap) = face.tables().cmap else {
        return charmap;
    };
    for subtable in cmap.subtables {
        if !subtable.is_unicode() {
            continue;
        }
        let mut codepoints = Vec::new();
        subtable.codepoints(|cp| codepoints.push(cp));
        for cp in codepoints {
            if let Some(gid) = subtable.glyph_index(cp) {
                if gid.0 != 0 {
                    charmap.entry(cp).or_insert(gid.0);
                }
            }
        }
    }
    charmap
}

// ─── fontdue ────────────────────────────────────────────────────

pub struct FontdueSource {
    info: FaceInfo,
    font: fontdue::Font,
    height: u16,
}

impl FontdueSource {
    pub fn from_bytes(data: Vec<u8>, height: u16) -> Result<Self> {
        let info = FaceInfo::read(&data)?;
        let font = fontdue::Font::from_bytes(data, fontdue::FontSettings::default())
            .map_err(|e| GlyphpackError::Font(format!("Failed to load font: {}", e)))?;

        debug!(
            "loaded {} ({} mapped codepoints) at {}px with fontdue",
            info.name,
            info.charmap.len(),
            height
        );

        Ok(FontdueSource { info, font, height })
    }

    pub fn open(path: impl AsRef<Path>, height: u16) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| GlyphpackError::io(path, e))?;
        Self::from_bytes(data, height)
    }
}

impl GlyphRasterSource for FontdueSource {
    fn name(&self) -> &str {
        &self.info.name
    }

    fn pixel_size(&self) -> u16 {
        self.height
    }

    fn set_pixel_size(&mut self, height: u16) -> Result<()> {
        self.height = height;
        Ok(())
    }

    fn glyph_index(&self, codepoint: u32) -> Option<u16> {
        self.info.glyph_index(codepoint)
    }

    fn first_char(&self) -> (u32, u16) {
        self.info.first_char()
    }

    fn next_char(&self, codepoint: u32) -> (u32, u16) {
        self.info.next_char(codepoint)
    }

    /// Always antialiased; `mono` is not available from fontdue.
    fn load_glyph(&mut self, glyph_index: u16, _mono: bool) -> Result<RasterGlyph> {
        let (metrics, coverage) = self.font.rasterize_indexed(glyph_index, self.height as f32);
        Ok(RasterGlyph {
            mode: PixelMode::Grey,
            width: metrics.width,
            rows: metrics.height,
            pitch: metrics.width,
            buffer: coverage,
            left: metrics.xmin,
            top: metrics.ymin + metrics.height as i32,
            advance_26_6: (metrics.advance_width * 64.0).round() as i32,
        })
    }
}

// ─── Backend selection ──────────────────────────────────────────

/// Which rasterizer renders glyph bitmaps.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Rasterizer {
    /// FreeType: monochrome hinting target unless `legacy` is set.
    #[default]
    #[value(name = "freetype")]
    FreeType,
    /// fontdue: antialiased coverage only.
    Fontdue,
}

/// A font file opened with one of the [`Rasterizer`] backends.
pub enum FontSource {
    FreeType(FreeTypeSource),
    Fontdue(FontdueSource),
}

impl FontSource {
    pub fn from_bytes(data: Vec<u8>, height: u16, rasterizer: Rasterizer) -> Result<Self> {
        Ok(match rasterizer {
            Rasterizer::FreeType => FontSource::FreeType(FreeTypeSource::from_bytes(data, height)?),
            Rasterizer::Fontdue => FontSource::Fontdue(FontdueSource::from_bytes(data, height)?),
        })
    }

    pub fn open(path: impl AsRef<Path>, height: u16, rasterizer: Rasterizer) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| GlyphpackError::io(path, e))?;
        Self::from_bytes(data, height, rasterizer)
    }

    fn inner(&self) -> &dyn GlyphRasterSource {
        match self {
            FontSource::FreeType(s) => s,
            FontSource::Fontdue(s) => s,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn GlyphRasterSource {
        match self {
            FontSource::FreeType(s) => s,
            FontSource::Fontdue(s) => s,
        }
    }
}

impl GlyphRasterSource for FontSource {
    fn name(&self) -> &str {
        self.inner().name()
    }

    fn pixel_size(&self) -> u16 {
        self.inner().pixel_size()
    }

    fn set_pixel_size(&mut self, height: u16) -> Result<()> {
        self.inner_mut().set_pixel_size(height)
    }

    fn glyph_index(&self, codepoint: u32) -> Option<u16> {
        self.inner().glyph_index(codepoint)
    }

    fn first_char(&self) -> (u32, u16) {
        self.inner().first_char()
    }

    fn next_char(&self, codepoint: u32) -> (u32, u16) {
        self.inner().next_char(codepoint)
    }

    fn load_glyph(&mut self, glyph_index: u16, mono: bool) -> Result<RasterGlyph> {
        self.inner_mut().load_glyph(glyph_index, mono)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(pairs: &[(u32, u16)]) -> FaceInfo {
        FaceInfo {
            name: "test".to_string(),
            charmap: pairs.iter().copied().collect(),
        }
    }

    #[test]
    fn test_charmap_walk_ends_at_zero() {
        let info = info(&[(0x41, 3), (0x42, 4)]);
        assert_eq!(info.first_char(), (0x41, 3));
        assert_eq!(info.next_char(0x41), (0x42, 4));
        assert_eq!(info.next_char(0x42), (0, 0));
        assert_eq!(info.next_char(u32::MAX), (0, 0));
        assert_eq!(info.glyph_index(0x43), None);
    }

    #[test]
    fn test_empty_charmap() {
        assert_eq!(info(&[]).first_char(), (0, 0));
    }

    #[test]
    fn test_unparseable_font_is_font_error() {
        for rasterizer in [Rasterizer::FreeType, Rasterizer::Fontdue] {
            let err = FontSource::from_bytes(b"not a font".to_vec(), 14, rasterizer)
                .err()
                .unwrap();
            assert!(matches!(err, GlyphpackError::Font(_)));
        }
    }

    #[test]
    fn test_rasterizer_from_json() {
        let r: Rasterizer = serde_json::from_str(r#""fontdue""#).unwrap();
        assert_eq!(r, Rasterizer::Fontdue);
        let r: Rasterizer = serde_json::from_str(r#""freetype""#).unwrap();
        assert_eq!(r, Rasterizer::FreeType);
    }
}
