//! # Resource Pack Orchestration
//!
//! A language pack ships one font blob per render size, each added to a
//! resource container in a fixed slot order. The container format belongs
//! to the firmware tooling; here it is only the [`ResourcePack`] contract.

use std::io::Write;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::crc::crc32;
use crate::error::{GlyphpackError, Result};
use crate::font::{
    CodepointSubset, EncodeReport, EncoderSettings, GlyphRasterSource, SingleFontEncoder,
};

/// Destination for encoded resources. Call order is slot order.
pub trait ResourcePack {
    fn add_resource(&mut self, data: Vec<u8>);

    fn serialize(&self, out: &mut dyn Write) -> std::io::Result<()>;
}

/// One render size of a build plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderSize {
    /// Resource name, e.g. `"003"`.
    pub name: String,
    pub height: u16,
    #[serde(default)]
    pub height_offset: i16,
}

/// Ordered render sizes for a pack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildPlan {
    pub sizes: Vec<RenderSize>,
}

impl BuildPlan {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| GlyphpackError::parse("build plan", e))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| GlyphpackError::io(path, e))?;
        Self::from_json(&json)
    }

    /// The sizes the stock language pack is built with: 12, 14, 17 and 20px,
    /// each used for two font slots.
    pub fn language_pack() -> Self {
        let sizes = [(12, 2), (12, 2), (14, 4), (14, 4), (17, 7), (17, 7), (20, 8), (20, 8)];
        BuildPlan {
            sizes: sizes
                .iter()
                .enumerate()
                .map(|(i, &(height, height_offset))| RenderSize {
                    name: format!("{:03}", i + 1),
                    height,
                    height_offset,
                })
                .collect(),
        }
    }
}

/// Report for one encoded size.
#[derive(Debug, Clone, PartialEq)]
pub struct PackedResource {
    pub name: String,
    pub crc: u32,
    pub report: EncodeReport,
}

/// Encode every size in `plan` from one source and add the blobs to `pack`.
///
/// `base` supplies everything except height and height offset. The source
/// is re-sized before each encode. A failure aborts the plan; resources
/// already added stay in `pack`.
pub fn build_plan<S, P>(
    plan: &BuildPlan,
    source: &mut S,
    subset: &CodepointSubset,
    base: &EncoderSettings,
    pack: &mut P,
) -> Result<Vec<PackedResource>>
where
    S: GlyphRasterSource,
    P: ResourcePack,
{
    let mut packed = Vec::with_capacity(plan.sizes.len());
    for size in &plan.sizes {
        let settings = EncoderSettings {
            height: size.height,
            height_offset: size.height_offset,
            ..base.clone()
        };
        source.set_pixel_size(size.height)?;
        let (encoding, report) = SingleFontEncoder::new(settings).encode(source, subset)?;
        let bytes = encoding.to_bytes()?;
        let crc = crc32(&bytes);
        info!(
            "resource {}: {}px, {} bytes, crc 0x{:08x}",
            size.name,
            size.height,
            bytes.len(),
            crc
        );
        pack.add_resource(bytes);
        packed.push(PackedResource {
            name: size.name.clone(),
            crc,
            report,
        });
    }
    Ok(packed)
}
