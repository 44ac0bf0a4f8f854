//! # Codepoint Subsets
//!
//! Decides which of a source's mapped codepoints make it into an encoding:
//! an allow-list (from a codepoint list JSON, or every codepoint in
//! `[0x20, 0x10FFFF)` by default), optionally narrowed by a regular
//! expression over the decoded character. The wildcard and ellipsis
//! codepoints always pass.

use std::collections::BTreeSet;
use std::path::Path;

use log::warn;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{ELLIPSIS_CODEPOINT, MAX_EXTENDED_CODEPOINT, MIN_CODEPOINT, WILDCARD_CODEPOINT};
use crate::error::{GlyphpackError, Result};

/// Codepoint list as written by the codepoint collection step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodepointList {
    #[serde(default)]
    pub font: String,
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub chars: String,
    pub codepoints: Vec<u32>,
}

impl CodepointList {
    pub fn from_json(json: &str) -> Result<Self> {
        let list: CodepointList =
            serde_json::from_str(json).map_err(|e| GlyphpackError::parse("codepoint list", e))?;
        if list.count != 0 && list.count != list.codepoints.len() {
            warn!(
                "codepoint list for '{}' says count {} but holds {} codepoints",
                list.font,
                list.count,
                list.codepoints.len()
            );
        }
        Ok(list)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| GlyphpackError::io(path, e))?;
        Self::from_json(&json)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CodepointSubset {
    /// `None` admits the full default range.
    allow: Option<BTreeSet<u32>>,
    filter: Option<Regex>,
}

impl CodepointSubset {
    /// Every codepoint in `[MIN_CODEPOINT, MAX_EXTENDED_CODEPOINT)`.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn from_codepoints(codepoints: impl IntoIterator<Item = u32>) -> Self {
        CodepointSubset {
            allow: Some(codepoints.into_iter().collect()),
            filter: None,
        }
    }

    pub fn from_list(list: &CodepointList) -> Self {
        Self::from_codepoints(list.codepoints.iter().copied())
    }

    /// Narrow by a regular expression that must match at the start of the
    /// character. `".*"` clears the filter.
    pub fn with_filter(mut self, pattern: &str) -> Result<Self> {
        self.filter = if pattern == ".*" {
            None
        } else {
            Some(Regex::new(&format!("^(?:{})", pattern))?)
        };
        Ok(self)
    }

    pub fn contains(&self, codepoint: u32) -> bool {
        if codepoint == WILDCARD_CODEPOINT || codepoint == ELLIPSIS_CODEPOINT {
            return true;
        }
        if let Some(filter) = &self.filter {
            let Some(ch) = char::from_u32(codepoint) else {
                return false;
            };
            let mut buf = [0u8; 4];
            if !filter.is_match(ch.encode_utf8(&mut buf)) {
                return false;
            }
        }
        match &self.allow {
            Some(allow) => allow.contains(&codepoint),
            None => (MIN_CODEPOINT..MAX_EXTENDED_CODEPOINT).contains(&codepoint),
        }
    }
}
