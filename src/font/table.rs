//! # Hash and Offset Tables
//!
//! Lookup on the device is `bucket = codepoint % 255`, one 4-byte hash entry
//! per bucket pointing into the concatenated offset tables, then a linear
//! scan of that bucket's `(codepoint, glyph offset)` rows. Rows inside a
//! bucket are codepoint-ascending because entries are sorted before they
//! are bucketed.
//!
//! ```text
//! hash entry:   bucket:u8 | count:u8 | offset:u16
//! offset entry: codepoint:u16|u32 | glyph_offset:u32
//! ```

use log::warn;

use super::{bucket_of, HASH_TABLE_SIZE, MAX_2_BYTES_CODEPOINT, OFFSET_SIZE_BYTES, OFFSET_TABLE_MAX_SIZE};
use crate::error::{GlyphpackError, Result};

/// Width of the codepoint field in every offset-table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodepointWidth {
    Two,
    Four,
}

impl CodepointWidth {
    /// The narrowest width that can hold every codepoint in `entries`.
    pub fn for_entries(entries: &[(u32, u32)]) -> Self {
        if entries.iter().any(|&(cp, _)| cp > MAX_2_BYTES_CODEPOINT) {
            CodepointWidth::Four
        } else {
            CodepointWidth::Two
        }
    }

    pub fn bytes(self) -> usize {
        match self {
            CodepointWidth::Two => 2,
            CodepointWidth::Four => 4,
        }
    }

    pub fn from_bytes(bytes: u8) -> Option<Self> {
        match bytes {
            2 => Some(CodepointWidth::Two),
            4 => Some(CodepointWidth::Four),
            _ => None,
        }
    }

    /// Size of one offset-table row.
    pub fn entry_size(self) -> usize {
        self.bytes() + OFFSET_SIZE_BYTES
    }
}

/// Serialized hash table plus offset tables for one encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct FontTables {
    pub width: CodepointWidth,
    /// `HASH_TABLE_SIZE` entries of 4 bytes each.
    pub hash_table: Vec<u8>,
    /// Offset tables concatenated in bucket order.
    pub offset_tables: Vec<u8>,
    pub bucket_sizes: [usize; HASH_TABLE_SIZE],
    /// Buckets holding more than `OFFSET_TABLE_MAX_SIZE` rows.
    pub overflows: Vec<(u8, usize)>,
}

impl FontTables {
    /// Build the tables from `(codepoint, glyph_offset)` entries.
    ///
    /// `entries` are sorted here (stable, by codepoint) so bucket order never
    /// depends on the caller. The width must already cover every codepoint;
    /// passing `Two` with a codepoint above `0xFFFF` is an error.
    ///
    /// Bucket overflow is logged and recorded in `overflows`; with `strict`
    /// it becomes [`GlyphpackError::BucketOverflow`]. A bucket the 4-byte
    /// hash entry cannot address is always [`GlyphpackError::TableTooLarge`].
    pub fn build(entries: &[(u32, u32)], width: CodepointWidth, strict: bool) -> Result<Self> {
        let mut sorted = entries.to_vec();
        sorted.sort_by_key(|&(cp, _)| cp);

        let mut buckets: Vec<Vec<u8>> = vec![Vec::new(); HASH_TABLE_SIZE];
        let mut bucket_sizes = [0usize; HASH_TABLE_SIZE];

        for &(codepoint, offset) in &sorted {
            let bucket = bucket_of(codepoint);
            let row = &mut buckets[bucket];
            match width {
                CodepointWidth::Two => {
                    let cp = u16::try_from(codepoint)
                        .map_err(|_| GlyphpackError::CodepointOutOfRange(codepoint))?;
                    row.extend_from_slice(&cp.to_le_bytes());
                }
                CodepointWidth::Four => row.extend_from_slice(&codepoint.to_le_bytes()),
            }
            row.extend_from_slice(&offset.to_le_bytes());
            bucket_sizes[bucket] += 1;
        }

        let mut overflows = Vec::new();
        for (bucket, &count) in bucket_sizes.iter().enumerate() {
            if count > OFFSET_TABLE_MAX_SIZE {
                if strict {
                    return Err(GlyphpackError::BucketOverflow {
                        bucket: bucket as u8,
                        count,
                    });
                }
                warn!(
                    "offset table for bucket {} holds {} entries (max {})",
                    bucket, count, OFFSET_TABLE_MAX_SIZE
                );
                overflows.push((bucket as u8, count));
            }
        }

        let mut hash_table = Vec::with_capacity(HASH_TABLE_SIZE * 4);
        let mut acc = 0usize;
        for (bucket, &count) in bucket_sizes.iter().enumerate() {
            let too_large = || GlyphpackError::TableTooLarge {
                bucket: bucket as u8,
                count,
                offset: acc,
            };
            let narrow_count = u8::try_from(count).map_err(|_| too_large())?;
            let narrow_offset = u16::try_from(acc).map_err(|_| too_large())?;
            hash_table.push(bucket as u8);
            hash_table.push(narrow_count);
            hash_table.extend_from_slice(&narrow_offset.to_le_bytes());
            acc += count * width.entry_size();
        }

        Ok(FontTables {
            width,
            hash_table,
            offset_tables: buckets.concat(),
            bucket_sizes,
            overflows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash_entry(tables: &FontTables, bucket: usize) -> (u8, u8, u16) {
        let e = &tables.hash_table[bucket * 4..bucket * 4 + 4];
        (e[0], e[1], u16::from_le_bytes([e[2], e[3]]))
    }

    #[test]
    fn test_empty_buckets_still_emitted() {
        let tables = FontTables::build(&[], CodepointWidth::Two, false).unwrap();
        assert_eq!(tables.hash_table.len(), HASH_TABLE_SIZE * 4);
        assert!(tables.offset_tables.is_empty());
        for b in 0..HASH_TABLE_SIZE {
            assert_eq!(hash_entry(&tables, b), (b as u8, 0, 0));
        }
    }

    #[test]
    fn test_cumulative_offsets() {
        let entries = [(0x41, 4), (0x42, 20), (0x41 + 255, 4)];
        let tables = FontTables::build(&entries, CodepointWidth::Two, false).unwrap();
        assert_eq!(hash_entry(&tables, 0x41), (0x41, 2, 0));
        assert_eq!(hash_entry(&tables, 0x42), (0x42, 1, 12));
        assert_eq!(hash_entry(&tables, 0x43), (0x43, 0, 18));
        assert_eq!(tables.offset_tables.len(), 18);
    }

    #[test]
    fn test_bucket_rows_sorted_ascending() {
        let entries = [(0x41 + 510, 3), (0x41, 1), (0x41 + 255, 2)];
        let tables = FontTables::build(&entries, CodepointWidth::Four, false).unwrap();
        let rows: Vec<u32> = tables
            .offset_tables
            .chunks(8)
            .map(|r| u32::from_le_bytes(r[..4].try_into().unwrap()))
            .collect();
        assert_eq!(rows, vec![0x41, 0x41 + 255, 0x41 + 510]);
    }

    #[test]
    fn test_width_selection() {
        assert_eq!(CodepointWidth::for_entries(&[(0xFFFF, 0)]), CodepointWidth::Two);
        assert_eq!(
            CodepointWidth::for_entries(&[(0x41, 0), (0x10000, 0)]),
            CodepointWidth::Four
        );
    }

    #[test]
    fn test_narrow_width_rejects_wide_codepoint() {
        let err = FontTables::build(&[(0x1F600, 4)], CodepointWidth::Two, false).unwrap_err();
        assert!(matches!(err, GlyphpackError::CodepointOutOfRange(0x1F600)));
    }

    #[test]
    fn test_overflow_warns_or_fails() {
        let entries: Vec<(u32, u32)> = (0..129u32).map(|i| (7 + i * 255, 4)).collect();
        let tables = FontTables::build(&entries, CodepointWidth::Four, false).unwrap();
        assert_eq!(tables.overflows, vec![(7, 129)]);
        assert_eq!(hash_entry(&tables, 7).1, 129);

        let err = FontTables::build(&entries, CodepointWidth::Four, true).unwrap_err();
        assert!(matches!(err, GlyphpackError::BucketOverflow { bucket: 7, count: 129 }));
    }

    #[test]
    fn test_bucket_count_limit() {
        let rows = |n: u32| -> Vec<(u32, u32)> { (0..n).map(|i| (7 + i * 255, 4)).collect() };

        let tables = FontTables::build(&rows(255), CodepointWidth::Four, false).unwrap();
        assert_eq!(hash_entry(&tables, 7).1, 255);

        let err = FontTables::build(&rows(256), CodepointWidth::Four, false).unwrap_err();
        assert!(matches!(
            err,
            GlyphpackError::TableTooLarge {
                bucket: 7,
                count: 256,
                ..
            }
        ));
    }

    #[test]
    fn test_bucket_offset_limit() {
        // 8 bytes per row, spread evenly: later buckets start past 0xFFFF.
        let entries: Vec<(u32, u32)> = (0..8400u32).map(|i| (0x20000 + i, 4)).collect();
        let err = FontTables::build(&entries, CodepointWidth::Four, false).unwrap_err();
        match err {
            GlyphpackError::TableTooLarge { count, offset, .. } => {
                assert!(count <= 255);
                assert!(offset > u16::MAX as usize);
            }
            other => panic!("unexpected error: {other}"),
        }

        // 64000 bytes of rows still fit.
        let fits: Vec<(u32, u32)> = (0..8000u32).map(|i| (0x20000 + i, 4)).collect();
        let tables = FontTables::build(&fits, CodepointWidth::Four, false).unwrap();
        assert_eq!(tables.offset_tables.len(), 64000);
    }
}
