//! # Font Blob Serialization
//!
//! [`FontEncoding`] is the finished, in-memory encoding of one render size.
//! It serializes to the binary blob (or a C header embedding it), and
//! [`FontBlob`] reads a blob back the way the firmware does.
//!
//! ```text
//! header (8 bytes):
//!   version:u8 | max_height:u8 | num_glyphs:u16 |
//!   wildcard_codepoint:u16 | table_size:u8 | codepoint_bytes:u8
//! ```

use std::fmt::Write as _;

use super::glyph::{GlyphMetrics, GLYPH_HEADER_SIZE};
use super::table::{CodepointWidth, FontTables};
use super::{FONT_VERSION, HASH_TABLE_SIZE, WILDCARD_CODEPOINT};
use crate::error::{GlyphpackError, Result};

pub const HEADER_SIZE: usize = 8;

/// One render size, fully encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct FontEncoding {
    pub height: u16,
    pub height_offset: i16,
    pub legacy: bool,
    pub faux_bold: bool,
    /// Codepoint assignments, written to the header as `num_glyphs`.
    pub num_glyphs: usize,
    /// `(codepoint, glyph offset)`, codepoint-ascending.
    pub entries: Vec<(u32, u32)>,
    pub tables: FontTables,
    /// Glyph records in insertion order; `glyphs[0]` is the zero
    /// placeholder and `glyphs[1]` the wildcard glyph.
    pub glyphs: Vec<Vec<u8>>,
}

impl FontEncoding {
    pub fn codepoint_width(&self) -> CodepointWidth {
        self.tables.width
    }

    fn header(&self) -> Result<[u8; HEADER_SIZE]> {
        let max_height = u8::try_from(self.height).map_err(|_| {
            header_field("max_height", self.height as usize, u8::MAX as usize)
        })?;
        let num_glyphs = u16::try_from(self.num_glyphs)
            .map_err(|_| header_field("num_glyphs", self.num_glyphs, u16::MAX as usize))?
            .to_le_bytes();
        let wildcard = (WILDCARD_CODEPOINT as u16).to_le_bytes();
        Ok([
            FONT_VERSION,
            max_height,
            num_glyphs[0],
            num_glyphs[1],
            wildcard[0],
            wildcard[1],
            HASH_TABLE_SIZE as u8,
            self.tables.width.bytes() as u8,
        ])
    }

    pub fn byte_len(&self) -> usize {
        HEADER_SIZE
            + self.tables.hash_table.len()
            + self.tables.offset_tables.len()
            + self.glyphs.iter().map(Vec::len).sum::<usize>()
    }

    /// Serialize the blob. Fails if `height` or `num_glyphs` do not fit
    /// their header fields.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.byte_len());
        out.extend_from_slice(&self.header()?);
        out.extend_from_slice(&self.tables.hash_table);
        out.extend_from_slice(&self.tables.offset_tables);
        for glyph in &self.glyphs {
            out.extend_from_slice(glyph);
        }
        Ok(out)
    }

    /// The blob as a C header declaring `static const uint8_t name[]`.
    pub fn to_c_header(&self, name: &str) -> Result<String> {
        let bytes = self.to_bytes()?;
        let mut out = String::new();
        out.push_str("#pragma once\n\n");
        out.push_str("#include <stdint.h>\n\n");
        let _ = write!(out, "static const uint8_t {}[] = {{\n\t", c_identifier(name));
        for (index, byte) in bytes.iter().enumerate() {
            if index != 0 && index % 16 == 0 {
                let _ = write!(out, "/* bytes {} - {} */\n\t", index - 16, index);
            }
            let _ = write!(out, "0x{:02x}, ", byte);
        }
        out.push_str("\n};\n");
        Ok(out)
    }
}

/// Replace anything that cannot appear in a C identifier with `_`.
fn c_identifier(name: &str) -> String {
    let mut ident: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    ident
}

/// Decoded blob header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlobHeader {
    pub version: u8,
    pub max_height: u8,
    pub num_glyphs: u16,
    pub wildcard_codepoint: u16,
    pub table_size: u8,
    pub codepoint_width: CodepointWidth,
}

/// Read-only view over an encoded blob.
pub struct FontBlob<'a> {
    data: &'a [u8],
    pub header: BlobHeader,
    offset_tables_start: usize,
    glyph_table_start: usize,
}

impl<'a> FontBlob<'a> {
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        let h = data
            .get(..HEADER_SIZE)
            .ok_or_else(|| malformed("shorter than header"))?;
        let codepoint_width = CodepointWidth::from_bytes(h[7])
            .ok_or_else(|| malformed(format!("codepoint width {}", h[7])))?;
        let header = BlobHeader {
            version: h[0],
            max_height: h[1],
            num_glyphs: u16::from_le_bytes([h[2], h[3]]),
            wildcard_codepoint: u16::from_le_bytes([h[4], h[5]]),
            table_size: h[6],
            codepoint_width,
        };
        if header.table_size == 0 {
            return Err(malformed("empty hash table"));
        }

        let offset_tables_start = HEADER_SIZE + header.table_size as usize * 4;
        if data.len() < offset_tables_start {
            return Err(malformed("truncated hash table"));
        }

        let mut blob = FontBlob {
            data,
            header,
            offset_tables_start,
            glyph_table_start: offset_tables_start,
        };
        let rows: usize = (0..header.table_size as usize)
            .map(|b| blob.hash_entry(b).1 as usize)
            .sum();
        blob.glyph_table_start += rows * codepoint_width.entry_size();
        if data.len() < blob.glyph_table_start {
            return Err(malformed("truncated offset tables"));
        }
        Ok(blob)
    }

    /// `(bucket, count, offset)` for one hash-table slot.
    pub fn hash_entry(&self, bucket: usize) -> (u8, u8, u16) {
        let e = &self.data[HEADER_SIZE + bucket * 4..HEADER_SIZE + bucket * 4 + 4];
        (e[0], e[1], u16::from_le_bytes([e[2], e[3]]))
    }

    /// Rows of one bucket in stored order.
    pub fn bucket(&self, bucket: usize) -> Vec<(u32, u32)> {
        let (_, count, offset) = self.hash_entry(bucket);
        let width = self.header.codepoint_width;
        let start = self.offset_tables_start + offset as usize;
        (0..count as usize)
            .filter_map(|i| {
                let row = self
                    .data
                    .get(start + i * width.entry_size()..start + (i + 1) * width.entry_size())?;
                let (cp, off) = row.split_at(width.bytes());
                let codepoint = match width {
                    CodepointWidth::Two => u16::from_le_bytes([cp[0], cp[1]]) as u32,
                    CodepointWidth::Four => u32::from_le_bytes([cp[0], cp[1], cp[2], cp[3]]),
                };
                Some((codepoint, u32::from_le_bytes([off[0], off[1], off[2], off[3]])))
            })
            .collect()
    }

    /// Every row across all buckets, bucket order.
    pub fn entries(&self) -> Vec<(u32, u32)> {
        (0..self.header.table_size as usize)
            .flat_map(|b| self.bucket(b))
            .collect()
    }

    /// Glyph offset for `codepoint`, scanning its bucket like the firmware.
    pub fn lookup(&self, codepoint: u32) -> Option<u32> {
        let bucket = (codepoint % self.header.table_size as u32) as usize;
        self.bucket(bucket)
            .into_iter()
            .find(|&(cp, _)| cp == codepoint)
            .map(|(_, offset)| offset)
    }

    /// Header and bitmap bytes of the glyph stored at `offset`.
    pub fn glyph_at(&self, offset: u32) -> Option<(GlyphMetrics, &'a [u8])> {
        let start = self.glyph_table_start + offset as usize;
        let record = self.data.get(start..)?;
        let metrics = GlyphMetrics::read(record)?;
        let bitmap = record.get(GLYPH_HEADER_SIZE..metrics.record_len())?;
        Some((metrics, bitmap))
    }

    pub fn glyph(&self, codepoint: u32) -> Option<(GlyphMetrics, &'a [u8])> {
        self.glyph_at(self.lookup(codepoint)?)
    }

    /// Size of the glyph table including the placeholder.
    pub fn glyph_table_len(&self) -> usize {
        self.data.len() - self.glyph_table_start
    }
}

pub(crate) fn header_field(field: &'static str, value: usize, max: usize) -> GlyphpackError {
    GlyphpackError::HeaderFieldOutOfRange { field, value, max }
}

fn malformed(msg: impl Into<String>) -> GlyphpackError {
    GlyphpackError::MalformedBlob(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_encoding() -> FontEncoding {
        let glyph = vec![1, 1, 0, 0, 2, 1, 0, 0, 0];
        let entries = vec![(0x41, 4), (WILDCARD_CODEPOINT, 4)];
        let tables = FontTables::build(&entries, CodepointWidth::Two, false).unwrap();
        FontEncoding {
            height: 14,
            height_offset: 0,
            legacy: false,
            faux_bold: false,
            num_glyphs: 2,
            entries,
            tables,
            glyphs: vec![vec![0; 4], glyph],
        }
    }

    #[test]
    fn test_header_layout() {
        let bytes = tiny_encoding().to_bytes().unwrap();
        assert_eq!(&bytes[..8], &[2, 14, 2, 0, 0xAF, 0x25, 255, 2]);
        assert_eq!(bytes.len(), 8 + 255 * 4 + 2 * 6 + 4 + 9);
    }

    #[test]
    fn test_parse_back() {
        let bytes = tiny_encoding().to_bytes().unwrap();
        let blob = FontBlob::parse(&bytes).unwrap();
        assert_eq!(blob.header.num_glyphs, 2);
        assert_eq!(blob.lookup(0x41), Some(4));
        assert_eq!(blob.lookup(0x42), None);
        let (metrics, bits) = blob.glyph(0x41).unwrap();
        assert_eq!(metrics.width, 1);
        assert_eq!(metrics.advance, 2);
        assert_eq!(bits, &[1, 0, 0, 0]);
        assert_eq!(blob.glyph_table_len(), 13);
    }

    #[test]
    fn test_parse_rejects_truncated() {
        let bytes = tiny_encoding().to_bytes().unwrap();
        assert!(FontBlob::parse(&bytes[..5]).is_err());
        assert!(FontBlob::parse(&bytes[..8 + 255 * 4 + 3]).is_err());
    }

    #[test]
    fn test_c_header() {
        let header = tiny_encoding()
            .to_c_header("Noto Sans-Regular")
            .unwrap();
        assert!(header.starts_with("#pragma once\n\n#include <stdint.h>\n\n"));
        assert!(header.contains("static const uint8_t Noto_Sans_Regular[] = {\n\t0x02, 0x0e, "));
        assert!(header.contains("/* bytes 0 - 16 */\n\t"));
        assert!(header.ends_with("\n};\n"));
    }

    #[test]
    fn test_header_fields_out_of_range() {
        let tall = FontEncoding {
            height: 300,
            ..tiny_encoding()
        };
        let err = tall.to_bytes().unwrap_err();
        assert!(matches!(
            err,
            GlyphpackError::HeaderFieldOutOfRange {
                field: "max_height",
                value: 300,
                max: 255
            }
        ));

        let crowded = FontEncoding {
            num_glyphs: 65536,
            ..tiny_encoding()
        };
        assert!(matches!(
            crowded.to_bytes().unwrap_err(),
            GlyphpackError::HeaderFieldOutOfRange {
                field: "num_glyphs",
                ..
            }
        ));

        let edge = FontEncoding {
            height: 255,
            num_glyphs: 65535,
            ..tiny_encoding()
        };
        assert_eq!(&edge.to_bytes().unwrap()[1..4], &[255, 0xFF, 0xFF]);
    }
}
