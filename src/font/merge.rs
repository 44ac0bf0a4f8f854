//! # Font Merging
//!
//! Several sources (one per script bucket: Latin, Cyrillic, CJK, ...)
//! rendered at the same height collapse into one encoding, so the firmware
//! loads a single table per size.
//!
//! - The wildcard glyph comes from the first source's glyph index 0.
//! - Sources are processed in the order given; each admits only its own
//!   subset.
//! - Glyph records are shared only within a source. Glyph 5 of two
//!   different sources is two records, even if the pixels match.
//! - The assignment cap applies to the merged total.

use std::collections::HashMap;

use log::{debug, warn};

use super::blob::FontEncoding;
use super::encoder::{EncodeReport, EncodingBuilder};
use super::source::GlyphRasterSource;
use super::subset::CodepointSubset;
use super::EncoderSettings;
use crate::error::{GlyphpackError, Result};

/// What to do when two sources claim the same codepoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Emit both rows. Rows keep source order within a bucket, so a linear
    /// scan on the device finds the earlier source's glyph.
    #[default]
    Keep,
    /// The earliest source keeps the codepoint, later claims are dropped.
    FirstWins,
    /// Fail the merge.
    Reject,
}

/// One merge input: a render source plus the codepoints it contributes.
///
/// The render height is read from the source itself; `legacy` records the
/// render target the input was prepared for.
pub struct MergeInput<S> {
    pub source: S,
    pub subset: CodepointSubset,
    pub legacy: bool,
}

impl<S> MergeInput<S> {
    pub fn new(source: S, subset: CodepointSubset, settings: &EncoderSettings) -> Self {
        MergeInput {
            source,
            subset,
            legacy: settings.legacy,
        }
    }
}

pub struct FontMerger {
    settings: EncoderSettings,
    duplicates: DuplicatePolicy,
}

impl FontMerger {
    pub fn new(settings: EncoderSettings) -> Self {
        FontMerger {
            settings,
            duplicates: DuplicatePolicy::default(),
        }
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicates = policy;
        self
    }

    pub fn merge<S: GlyphRasterSource>(
        &self,
        inputs: &mut [MergeInput<S>],
    ) -> Result<(FontEncoding, EncodeReport)> {
        if inputs.is_empty() {
            return Err(GlyphpackError::EmptyMerge);
        }
        self.settings.validate()?;
        for input in inputs.iter() {
            let found_height = input.source.pixel_size();
            if found_height != self.settings.height || input.legacy != self.settings.legacy {
                return Err(GlyphpackError::MergeMismatch {
                    source_name: input.source.name().to_string(),
                    height: self.settings.height,
                    legacy: self.settings.legacy,
                    found_height,
                    found_legacy: input.legacy,
                });
            }
        }

        let mut builder = EncodingBuilder::new(self.settings.clone());
        builder.seed_wildcard(0, &mut inputs[0].source)?;

        // codepoint → index of the first source that claimed it
        let mut claimed: HashMap<u32, usize> = HashMap::new();

        let names: Vec<String> = inputs
            .iter()
            .map(|input| input.source.name().to_string())
            .collect();

        for (id, input) in inputs.iter_mut().enumerate() {
            let candidates = builder.collect(&input.source, &input.subset, |codepoint| {
                match claimed.get(&codepoint) {
                    None => {
                        claimed.insert(codepoint, id);
                        Ok(true)
                    }
                    Some(&first) => self.on_duplicate(codepoint, &names[first], &names[id]),
                }
            })?;
            debug!(
                "{}: {} codepoints admitted",
                input.source.name(),
                candidates.len()
            );
            builder.pack_all(id, &mut input.source, &candidates)?;
        }

        debug!(
            "merged {} sources at {}px",
            inputs.len(),
            builder.settings().height
        );
        builder.finish()
    }

    fn on_duplicate(&self, codepoint: u32, first: &str, second: &str) -> Result<bool> {
        match self.duplicates {
            DuplicatePolicy::Keep => {
                warn!(
                    "U+{:04X} claimed by both '{}' and '{}'; keeping both rows",
                    codepoint, first, second
                );
                Ok(true)
            }
            DuplicatePolicy::FirstWins => {
                debug!(
                    "U+{:04X} already provided by '{}', skipping in '{}'",
                    codepoint, first, second
                );
                Ok(false)
            }
            DuplicatePolicy::Reject => Err(GlyphpackError::DuplicateCodepoint {
                codepoint,
                first: first.to_string(),
                second: second.to_string(),
            }),
        }
    }
}
