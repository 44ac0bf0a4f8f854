//! FreeType render source.
//!
//! The default rasterizer. With `mono` it renders through FreeType's
//! monochrome hinting target and hands back 1-bit rows; otherwise it
//! returns the antialiased coverage map for the packer to threshold.

use std::path::Path;

use freetype::face::LoadFlag;
use freetype::{Face, Library};
use log::debug;

use super::raster::FaceInfo;
use super::source::{GlyphRasterSource, PixelMode, RasterGlyph};
use crate::error::{GlyphpackError, Result};

pub struct FreeTypeSource {
    info: FaceInfo,
    face: Face,
    height: u16,
}

impl FreeTypeSource {
    pub fn from_bytes(data: Vec<u8>, height: u16) -> Result<Self> {
        let info = FaceInfo::read(&data)?;
        let library = Library::init().map_err(|e| ft_error("init FreeType", e))?;
        let face = library
            .new_memory_face(data, 0)
            .map_err(|e| ft_error("load font", e))?;

        let mut source = FreeTypeSource { info, face, height };
        source.set_pixel_size(height)?;
        debug!(
            "loaded {} ({} mapped codepoints) at {}px with FreeType",
            source.info.name,
            source.info.charmap.len(),
            height
        );
        Ok(source)
    }

    pub fn open(path: impl AsRef<Path>, height: u16) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| GlyphpackError::io(path, e))?;
        Self::from_bytes(data, height)
    }
}

fn ft_error(what: &str, e: freetype::Error) -> GlyphpackError {
    GlyphpackError::Font(format!("Failed to {}: {}", what, e))
}

/// Load flags for one glyph. `mono` selects the 1-bit hinting target.
pub(crate) fn load_flags(mono: bool) -> LoadFlag {
    if mono {
        LoadFlag::RENDER | LoadFlag::MONOCHROME | LoadFlag::TARGET_MONO
    } else {
        LoadFlag::RENDER
    }
}

fn pixel_mode(mode: freetype::bitmap::PixelMode) -> PixelMode {
    use freetype::bitmap::PixelMode as Ft;
    match mode {
        Ft::Mono => PixelMode::Mono,
        Ft::Gray => PixelMode::Grey,
        Ft::None => PixelMode::Other(0),
        Ft::Gray2 => PixelMode::Other(3),
        Ft::Gray4 => PixelMode::Other(4),
        Ft::Lcd => PixelMode::Other(5),
        Ft::LcdV => PixelMode::Other(6),
        Ft::Bgra => PixelMode::Other(7),
    }
}

impl GlyphRasterSource for FreeTypeSource {
    fn name(&self) -> &str {
        &self.info.name
    }

    fn pixel_size(&self) -> u16 {
        self.height
    }

    fn set_pixel_size(&mut self, height: u16) -> Result<()> {
        self.face
            .set_pixel_sizes(0, height as u32)
            .map_err(|e| ft_error("set pixel size", e))?;
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

    fn load_glyph(&mut self, glyph_index: u16, mono: bool) -> Result<RasterGlyph> {
        self.face
            .load_glyph(glyph_index as u32, load_flags(mono))
            .map_err(|e| ft_error(&format!("load glyph {}", glyph_index), e))?;

        let slot = self.face.glyph();
        let bitmap = slot.bitmap();
        let mode = bitmap
            .pixel_mode()
            .map(pixel_mode)
            .unwrap_or(PixelMode::Other(bitmap.raw().pixel_mode as u8));
        let width = bitmap.width().max(0) as usize;
        let rows = bitmap.rows().max(0) as usize;
        let pitch = bitmap.pitch().unsigned_abs() as usize;
        let buffer = if width == 0 || rows == 0 {
            Vec::new()
        } else {
            bitmap.buffer().to_vec()
        };

        Ok(RasterGlyph {
            mode,
            width,
            rows,
            pitch,
            buffer,
            left: slot.bitmap_left(),
            top: slot.bitmap_top(),
            advance_26_6: slot.advance().x as i32,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mono_target_differs_from_antialiased() {
        let mono = load_flags(true);
        let grey = load_flags(false);
        assert_ne!(mono.bits(), grey.bits());
        assert!(mono.contains(LoadFlag::RENDER | LoadFlag::MONOCHROME | LoadFlag::TARGET_MONO));
        assert!(grey.contains(LoadFlag::RENDER));
        assert!(!grey.contains(LoadFlag::MONOCHROME));
    }

    #[test]
    fn test_pixel_modes() {
        use freetype::bitmap::PixelMode as Ft;
        assert_eq!(pixel_mode(Ft::Mono), PixelMode::Mono);
        assert_eq!(pixel_mode(Ft::Gray), PixelMode::Grey);
        assert_eq!(pixel_mode(Ft::Bgra), PixelMode::Other(7));
    }

    /// Renders real glyphs when a system font is available.
    #[test]
    fn test_mono_and_antialiased_renders_differ() {
        let path = std::env::var("GLYPHPACK_TEST_FONT")
            .unwrap_or_else(|_| "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf".to_string());
        let Ok(mut source) = FreeTypeSource::open(&path, 14) else {
            return;
        };
        let opts = crate::font::EncoderSettings::new(14).pack_options();
        let mut differing = 0;
        for ch in 'a'..='z' {
            let Some(glyph) = source.glyph_index(ch as u32) else {
                continue;
            };
            let mono = source.load_glyph(glyph, true).unwrap();
            let grey = source.load_glyph(glyph, false).unwrap();
            assert_eq!(mono.mode, PixelMode::Mono);
            assert_eq!(grey.mode, PixelMode::Grey);
            let packed_mono = crate::font::pack_glyph(&mono, &opts).unwrap();
            let packed_grey = crate::font::pack_glyph(&grey, &opts).unwrap();
            if packed_mono != packed_grey {
                differing += 1;
            }
        }
        assert!(differing > 0);
    }

    #[test]
    fn test_rejects_garbage_font() {
        let err = FreeTypeSource::from_bytes(vec![0; 16], 14).err().unwrap();
        assert!(matches!(err, GlyphpackError::Font(_)));
    }
}
