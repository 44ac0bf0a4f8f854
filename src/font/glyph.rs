//! # Glyph Record Packing
//!
//! A glyph record is a 5-byte header followed by the bitmap as 1-bit
//! pixels, row-major, grouped into little-endian `u32` words where bit *i*
//! of a word is pixel *i* of its group. The last word is zero-padded.
//!
//! ```text
//! width:u8 | height:u8 | left:i8 | bottom:i8 | advance:i8 | words...
//! ```
//!
//! Header fields are narrowed with plain `as` casts. A `bottom` outside
//! `-128..=127` wraps; existing blobs were produced that way.

use super::source::{PixelMode, RasterGlyph};
use crate::error::{GlyphpackError, Result};

pub const GLYPH_HEADER_SIZE: usize = 5;

/// Per-encoding knobs that affect every glyph record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PackOptions {
    pub max_height: u16,
    pub height_offset: i16,
    pub tracking_adjust: i32,
    pub faux_bold: bool,
}

/// Decoded glyph header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlyphMetrics {
    pub width: u8,
    pub height: u8,
    pub left: i8,
    pub bottom: i8,
    pub advance: i8,
}

impl GlyphMetrics {
    pub fn read(data: &[u8]) -> Option<Self> {
        let h = data.get(..GLYPH_HEADER_SIZE)?;
        Some(GlyphMetrics {
            width: h[0],
            height: h[1],
            left: h[2] as i8,
            bottom: h[3] as i8,
            advance: h[4] as i8,
        })
    }

    /// Record length including the header.
    pub fn record_len(&self) -> usize {
        let bits = self.width as usize * self.height as usize;
        GLYPH_HEADER_SIZE + bits.div_ceil(32) * 4
    }
}

/// Pack one rendered glyph into its record bytes.
pub fn pack_glyph(glyph: &RasterGlyph, opts: &PackOptions) -> Result<Vec<u8>> {
    let rows = match glyph.mode {
        PixelMode::Mono => mono_rows(glyph),
        PixelMode::Grey => threshold_rows(glyph),
        PixelMode::Other(mode) => return Err(GlyphpackError::UnsupportedPixelMode(mode)),
    };

    let mut width = glyph.width;
    let rows = if opts.faux_bold {
        width += 1;
        let extra_byte = glyph.width % 8 == 0;
        rows.iter().map(|row| embolden_row(row, extra_byte)).collect()
    } else {
        rows
    };

    let mut bits = Vec::with_capacity(width * glyph.rows);
    for row in &rows {
        for x in 0..width {
            bits.push(row.get(x / 8).is_some_and(|b| b & (0x80 >> (x % 8)) != 0));
        }
    }

    let advance = glyph.advance_26_6 as f64 / 64.0 + opts.tracking_adjust as f64;
    let bottom = opts.max_height as i32 - glyph.top + opts.height_offset as i32;

    let mut out = Vec::with_capacity(GLYPH_HEADER_SIZE + bits.len().div_ceil(32) * 4);
    out.push(width as u8);
    out.push(glyph.rows as u8);
    out.push(glyph.left as i8 as u8);
    out.push(bottom as i8 as u8);
    out.push(advance as i32 as i8 as u8);
    for word in pack_words(&bits) {
        out.extend_from_slice(&word.to_le_bytes());
    }
    Ok(out)
}

fn mono_rows(glyph: &RasterGlyph) -> Vec<Vec<u8>> {
    (0..glyph.rows).map(|y| glyph.row(y).to_vec()).collect()
}

/// Coverage > 127 becomes a set bit, repacked MSB-first like a mono bitmap.
fn threshold_rows(glyph: &RasterGlyph) -> Vec<Vec<u8>> {
    (0..glyph.rows)
        .map(|y| {
            let coverage = glyph.row(y);
            let mut row = vec![0u8; glyph.width.div_ceil(8)];
            for (x, &value) in coverage.iter().take(glyph.width).enumerate() {
                if value > 127 {
                    row[x / 8] |= 0x80 >> (x % 8);
                }
            }
            row
        })
        .collect()
}

/// Smear every set pixel one column to the right, carrying across byte
/// boundaries. `extra_byte` appends a column byte for the bleed-over bit
/// when the source width fills its last byte exactly.
fn embolden_row(row: &[u8], extra_byte: bool) -> Vec<u8> {
    let mut out = Vec::with_capacity(row.len() + 1);
    let mut carry = 0u8;
    for &byte in row {
        out.push(byte | (byte >> 1) | carry);
        carry = (byte & 1) << 7;
    }
    if extra_byte {
        out.push(carry);
    }
    out
}

fn pack_words(bits: &[bool]) -> Vec<u32> {
    bits.chunks(32)
        .map(|group| {
            group
                .iter()
                .enumerate()
                .fold(0u32, |w, (i, &bit)| w | ((bit as u32) << i))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> PackOptions {
        PackOptions {
            max_height: 14,
            height_offset: 0,
            tracking_adjust: 0,
            faux_bold: false,
        }
    }

    fn mono(width: usize, rows: &[&[u8]]) -> RasterGlyph {
        let pitch = rows.first().map_or(0, |r| r.len());
        RasterGlyph {
            mode: PixelMode::Mono,
            width,
            rows: rows.len(),
            pitch,
            buffer: rows.concat(),
            left: 1,
            top: 10,
            advance_26_6: 7 * 64,
        }
    }

    #[test]
    fn test_header_fields() {
        let glyph = mono(3, &[&[0b1010_0000], &[0b0100_0000]]);
        let data = pack_glyph(&glyph, &opts()).unwrap();
        let m = GlyphMetrics::read(&data).unwrap();
        assert_eq!(
            m,
            GlyphMetrics {
                width: 3,
                height: 2,
                left: 1,
                bottom: 4,
                advance: 7
            }
        );
        assert_eq!(data.len(), m.record_len());
    }

    #[test]
    fn test_bits_are_row_major_lsb_first() {
        // Row 0: X.X, row 1: .X.
        let glyph = mono(3, &[&[0b1010_0000], &[0b0100_0000]]);
        let data = pack_glyph(&glyph, &opts()).unwrap();
        assert_eq!(data.len(), GLYPH_HEADER_SIZE + 4);
        let word = u32::from_le_bytes(data[5..9].try_into().unwrap());
        assert_eq!(word, 0b010_101);
    }

    #[test]
    fn test_grey_threshold() {
        let glyph = RasterGlyph {
            mode: PixelMode::Grey,
            width: 4,
            rows: 1,
            pitch: 4,
            buffer: vec![0, 127, 128, 255],
            left: 0,
            top: 0,
            advance_26_6: 0,
        };
        let data = pack_glyph(&glyph, &opts()).unwrap();
        assert_eq!(data[5], 0b1100);
    }

    #[test]
    fn test_multiple_words_zero_padded() {
        // 40 pixels, all on: one full word + 8 bits.
        let glyph = mono(8, &[&[0xFFu8][..]; 5]);
        let data = pack_glyph(&glyph, &opts()).unwrap();
        assert_eq!(data.len(), GLYPH_HEADER_SIZE + 8);
        assert_eq!(&data[5..9], &[0xFF; 4]);
        assert_eq!(&data[9..13], &[0xFF, 0, 0, 0]);
    }

    #[test]
    fn test_faux_bold_carries_across_bytes() {
        // 9 px wide: bit 7 of byte 0 set must bleed into column 8.
        let glyph = mono(9, &[&[0b0000_0001, 0b0000_0000]]);
        let data = pack_glyph(
            &glyph,
            &PackOptions {
                faux_bold: true,
                ..opts()
            },
        )
        .unwrap();
        assert_eq!(data[0], 10);
        let word = u32::from_le_bytes(data[5..9].try_into().unwrap());
        assert_eq!(word, (1 << 7) | (1 << 8));
    }

    #[test]
    fn test_faux_bold_extra_column_on_byte_boundary() {
        let glyph = mono(8, &[&[0b0000_0001]]);
        let data = pack_glyph(
            &glyph,
            &PackOptions {
                faux_bold: true,
                ..opts()
            },
        )
        .unwrap();
        assert_eq!(data[0], 9);
        let word = u32::from_le_bytes(data[5..9].try_into().unwrap());
        assert_eq!(word, (1 << 7) | (1 << 8));
    }

    #[test]
    fn test_advance_with_tracking_truncates() {
        let mut glyph = mono(1, &[&[0x80]]);
        glyph.advance_26_6 = 6 * 64 + 40;
        let data = pack_glyph(
            &glyph,
            &PackOptions {
                tracking_adjust: -1,
                ..opts()
            },
        )
        .unwrap();
        assert_eq!(data[4] as i8, 5);
    }

    #[test]
    fn test_bottom_wraps() {
        let mut glyph = mono(1, &[&[0x80]]);
        glyph.top = -200;
        let data = pack_glyph(&glyph, &opts()).unwrap();
        assert_eq!(data[3] as i8, (14 + 200) as i8);
    }

    #[test]
    fn test_unsupported_mode() {
        let mut glyph = mono(1, &[&[0x80]]);
        glyph.mode = PixelMode::Other(5);
        assert!(matches!(
            pack_glyph(&glyph, &opts()),
            Err(GlyphpackError::UnsupportedPixelMode(5))
        ));
    }
}
