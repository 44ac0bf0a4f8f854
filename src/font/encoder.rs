//! # Single Font Encoder
//!
//! Encoding runs in three passes so nothing depends on mutation order:
//!
//! 1. walk the source's charmap and collect the admitted
//!    `(codepoint, glyph index)` candidates (pure, no packing),
//! 2. render and pack each distinct glyph once into the [`GlyphArena`],
//! 3. pick the codepoint width from the complete entry list and build the
//!    tables.
//!
//! The assignment cap is checked *before* each candidate, so an encoding
//! can end up with `max_glyphs + 1` assignments. Firmware built against
//! existing blobs expects that count, so it is kept.

use std::collections::HashMap;

use log::{debug, info, trace};

use super::blob::FontEncoding;
use super::glyph::pack_glyph;
use super::source::GlyphRasterSource;
use super::subset::CodepointSubset;
use super::table::{CodepointWidth, FontTables};
use super::{EncoderSettings, WILDCARD_CODEPOINT};
use crate::error::{GlyphpackError, Result};

/// Identifies one source within an encoder run. Glyph reuse never crosses
/// source boundaries.
pub type SourceId = usize;

/// Owned storage for packed glyph records.
///
/// Slot 0 is the 4-byte zero placeholder; records are appended in first
/// insertion order and looked up by `(source, glyph index)`.
#[derive(Debug)]
pub struct GlyphArena {
    records: Vec<Vec<u8>>,
    offsets: Vec<u32>,
    slots: HashMap<(SourceId, u16), usize>,
    next_offset: u32,
}

impl Default for GlyphArena {
    fn default() -> Self {
        Self::new()
    }
}

impl GlyphArena {
    pub fn new() -> Self {
        GlyphArena {
            records: vec![vec![0u8; 4]],
            offsets: vec![0],
            slots: HashMap::new(),
            next_offset: 4,
        }
    }

    /// Byte offset of the glyph's record, packing it with `pack` on first
    /// use.
    pub fn intern<F>(&mut self, source: SourceId, glyph: u16, pack: F) -> Result<u32>
    where
        F: FnOnce() -> Result<Vec<u8>>,
    {
        if let Some(&slot) = self.slots.get(&(source, glyph)) {
            return Ok(self.offsets[slot]);
        }
        let record = pack()?;
        let offset = self.next_offset;
        self.next_offset += record.len() as u32;
        self.slots.insert((source, glyph), self.records.len());
        self.offsets.push(offset);
        self.records.push(record);
        Ok(offset)
    }

    /// Number of packed glyph records, not counting the placeholder.
    pub fn glyph_count(&self) -> usize {
        self.records.len() - 1
    }

    pub fn into_records(self) -> Vec<Vec<u8>> {
        self.records
    }
}

/// Summary of one finished encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeReport {
    /// Codepoint assignments, including the wildcard.
    pub assignments: usize,
    /// Distinct glyph records, including the wildcard glyph.
    pub glyph_records: usize,
    pub codepoint_width: CodepointWidth,
    /// `(bucket, entry count)` for buckets over the 128-row limit.
    pub overflows: Vec<(u8, usize)>,
    pub blob_size: usize,
}

/// State shared by single-source encoding and merging.
pub(crate) struct EncodingBuilder {
    settings: EncoderSettings,
    arena: GlyphArena,
    entries: Vec<(u32, u32)>,
    assignments: usize,
}

impl EncodingBuilder {
    pub(crate) fn new(settings: EncoderSettings) -> Self {
        EncodingBuilder {
            settings,
            arena: GlyphArena::new(),
            entries: Vec::new(),
            assignments: 0,
        }
    }

    pub(crate) fn settings(&self) -> &EncoderSettings {
        &self.settings
    }

    /// Map the wildcard codepoint to `source`'s missing-glyph shape.
    pub(crate) fn seed_wildcard<S: GlyphRasterSource>(
        &mut self,
        id: SourceId,
        source: &mut S,
    ) -> Result<()> {
        self.pack_all(id, source, &[(WILDCARD_CODEPOINT, 0)])
    }

    /// Pass 1: the codepoints `source` contributes under `subset`.
    ///
    /// `claim` gets the final say on each otherwise admitted codepoint.
    pub(crate) fn collect<S, F>(
        &self,
        source: &S,
        subset: &CodepointSubset,
        mut claim: F,
    ) -> Result<Vec<(u32, u16)>>
    where
        S: GlyphRasterSource,
        F: FnMut(u32) -> Result<bool>,
    {
        let mut running = self.assignments;
        let mut candidates = Vec::new();

        for (codepoint, glyph) in source.chars() {
            if running > self.settings.max_glyphs {
                debug!(
                    "{}: glyph cap {} reached at U+{:04X}",
                    source.name(),
                    self.settings.max_glyphs,
                    codepoint
                );
                break;
            }
            if codepoint == WILDCARD_CODEPOINT {
                return Err(GlyphpackError::WildcardCollision { glyph });
            }
            if glyph == 0 {
                return Err(GlyphpackError::ReservedGlyphIndex { codepoint });
            }
            if !subset.contains(codepoint) || !claim(codepoint)? {
                continue;
            }
            trace!("{}: U+{:04X} -> glyph {}", source.name(), codepoint, glyph);
            candidates.push((codepoint, glyph));
            running += 1;
        }

        Ok(candidates)
    }

    /// Pass 2: render, pack and record each candidate.
    pub(crate) fn pack_all<S: GlyphRasterSource>(
        &mut self,
        id: SourceId,
        source: &mut S,
        candidates: &[(u32, u16)],
    ) -> Result<()> {
        let opts = self.settings.pack_options();
        let mono = !self.settings.legacy;
        for &(codepoint, glyph) in candidates {
            let offset = self.arena.intern(id, glyph, || {
                let raster = source.load_glyph(glyph, mono)?;
                pack_glyph(&raster, &opts)
            })?;
            self.entries.push((codepoint, offset));
            self.assignments += 1;
        }
        Ok(())
    }

    /// Pass 3: fix the codepoint width and build the tables.
    pub(crate) fn finish(self) -> Result<(FontEncoding, EncodeReport)> {
        let width = CodepointWidth::for_entries(&self.entries);
        let tables = FontTables::build(&self.entries, width, self.settings.strict)?;
        let glyph_records = self.arena.glyph_count();

        let mut entries = self.entries;
        entries.sort_by_key(|&(cp, _)| cp);

        let encoding = FontEncoding {
            height: self.settings.height,
            height_offset: self.settings.height_offset,
            legacy: self.settings.legacy,
            faux_bold: self.settings.faux_bold,
            num_glyphs: self.assignments,
            entries,
            tables,
            glyphs: self.arena.into_records(),
        };

        let report = EncodeReport {
            assignments: encoding.num_glyphs,
            glyph_records,
            codepoint_width: width,
            overflows: encoding.tables.overflows.clone(),
            blob_size: encoding.byte_len(),
        };

        info!(
            "encoded {}px font: {} codepoints, {} glyphs, {}-byte codepoints, {} bytes",
            encoding.height,
            report.assignments,
            report.glyph_records,
            width.bytes(),
            report.blob_size
        );

        Ok((encoding, report))
    }
}

/// Encodes one render source into one [`FontEncoding`].
pub struct SingleFontEncoder {
    settings: EncoderSettings,
}

impl SingleFontEncoder {
    pub fn new(settings: EncoderSettings) -> Self {
        SingleFontEncoder { settings }
    }

    pub fn encode<S: GlyphRasterSource>(
        &self,
        source: &mut S,
        subset: &CodepointSubset,
    ) -> Result<(FontEncoding, EncodeReport)> {
        self.settings.validate()?;
        let mut builder = EncodingBuilder::new(self.settings.clone());
        builder.seed_wildcard(0, source)?;
        let candidates = builder.collect(source, subset, |_| Ok(true))?;
        builder.pack_all(0, source, &candidates)?;
        builder.finish()
    }
}
