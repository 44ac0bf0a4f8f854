//! The rasterizer seam.
//!
//! Encoders never touch font files directly. They walk a
//! [`GlyphRasterSource`] in its natural character order and ask it for one
//! bitmap at a time, the way a FreeType face is driven with
//! `get_first_char` / `get_next_char` / `load_glyph`.

use crate::error::Result;

/// Pixel layout of a [`RasterGlyph`] buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelMode {
    /// 1 bit per pixel, MSB first within each byte.
    Mono,
    /// 1 byte of coverage per pixel.
    Grey,
    /// Anything else the rasterizer can emit. Carries the raw mode id.
    Other(u8),
}

/// One rendered glyph as the rasterizer hands it over.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterGlyph {
    pub mode: PixelMode,
    /// Bitmap width in pixels.
    pub width: usize,
    pub rows: usize,
    /// Bytes per row in `buffer`.
    pub pitch: usize,
    pub buffer: Vec<u8>,
    /// Horizontal bearing from the pen position to the bitmap.
    pub left: i32,
    /// Distance from the baseline up to the top bitmap row.
    pub top: i32,
    /// Horizontal advance in 26.6 fixed point.
    pub advance_26_6: i32,
}

impl RasterGlyph {
    pub fn row(&self, y: usize) -> &[u8] {
        let start = y * self.pitch;
        let end = (start + self.pitch).min(self.buffer.len());
        self.buffer.get(start..end).unwrap_or(&[])
    }
}

/// A font face rendered at a fixed pixel size.
///
/// Character enumeration yields `(codepoint, glyph_index)` pairs in the
/// face's charmap order and ends with `(0, 0)`. A non-zero codepoint paired
/// with glyph 0 is a broken mapping, which the encoders reject.
pub trait GlyphRasterSource {
    /// Human readable name, used in logs and error messages.
    fn name(&self) -> &str;

    /// Glyph index for a codepoint, or `None` if the face has no mapping.
    fn glyph_index(&self, codepoint: u32) -> Option<u16>;

    /// Pixel height glyphs are currently rendered at.
    fn pixel_size(&self) -> u16;

    /// Render subsequent glyphs at another pixel height.
    fn set_pixel_size(&mut self, height: u16) -> Result<()>;

    fn first_char(&self) -> (u32, u16);

    fn next_char(&self, codepoint: u32) -> (u32, u16);

    /// Render a glyph. `mono` requests the 1-bit hinting target; sources
    /// that cannot honour it may return [`PixelMode::Grey`].
    fn load_glyph(&mut self, glyph_index: u16, mono: bool) -> Result<RasterGlyph>;

    /// Iterate the charmap from `first_char` until the terminating `(0, 0)`.
    fn chars(&self) -> CharIter<'_, Self>
    where
        Self: Sized,
    {
        CharIter {
            source: self,
            next: Some(self.first_char()),
        }
    }
}

/// Iterator returned by [`GlyphRasterSource::chars`].
pub struct CharIter<'a, S: GlyphRasterSource> {
    source: &'a S,
    next: Option<(u32, u16)>,
}

impl<S: GlyphRasterSource> Iterator for CharIter<'_, S> {
    type Item = (u32, u16);

    fn next(&mut self) -> Option<Self::Item> {
        let (codepoint, glyph) = self.next.take()?;
        if codepoint == 0 && glyph == 0 {
            return None;
        }
        self.next = Some(self.source.next_char(codepoint));
        Some((codepoint, glyph))
    }
}
