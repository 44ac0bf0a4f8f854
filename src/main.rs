//! # glyphpack CLI
//!
//! Usage:
//!   glyphpack pfo 14 Font.ttf out.pfo --list latin.json --extended
//!   glyphpack pfo 14 Font.ttf out.pfo --legacy --rasterizer fontdue
//!   glyphpack header 14 Font.ttf out.h
//!   glyphpack merge manifest.json out.pfo
//!   glyphpack plan Font.ttf build/ --plan sizes.json --list combined.json
//!   glyphpack crc out.pfo
//!   glyphpack inspect out.pfo

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use log::info;

use glyphpack::crc::crc32;
use glyphpack::font::{
    EncoderSettings, FontBlob, FontSource, Rasterizer, MAX_GLYPHS, MAX_GLYPHS_EXTENDED,
};
use glyphpack::pack::{build_plan, BuildPlan, ResourcePack};
use glyphpack::{GlyphpackError, MergeManifest, Result};

#[derive(clap::Parser, Debug)]
#[command(about = "Generate watch-usable bitmap fonts from ttf files")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Make a .pfo (binary font) file
    Pfo {
        /// Height at which to render the font
        height: u16,
        /// The ttf to process
        input_ttf: PathBuf,
        /// The pfo output file
        output_pfo: PathBuf,
        /// Store more than 256 glyphs
        #[arg(long)]
        extended: bool,
        /// Tracking adjustment of the font's horizontal advance
        #[arg(long, allow_hyphen_values = true)]
        tracking: Option<i32>,
        /// Regex to match the characters that should be included in the output
        #[arg(long)]
        filter: Option<String>,
        /// JSON list of codepoints to include
        #[arg(long)]
        list: Option<PathBuf>,
        /// Use the antialiased rasterizer to preserve font dimensions
        #[arg(long)]
        legacy: bool,
        /// Generate a faux bold font
        #[arg(long)]
        fauxbold: bool,
        #[arg(long, allow_hyphen_values = true)]
        heightoffset: Option<i16>,
        /// Fail instead of warning when a hash bucket overflows
        #[arg(long)]
        strict: bool,
        #[arg(long, value_enum, default_value_t)]
        rasterizer: Rasterizer,
    },
    /// Make a .h file embedding the font as a byte array
    Header {
        height: u16,
        input_ttf: PathBuf,
        output_header: PathBuf,
        #[arg(long)]
        filter: Option<String>,
        #[arg(long, value_enum, default_value_t)]
        rasterizer: Rasterizer,
    },
    /// Merge several fonts into one .pfo as described by a JSON manifest
    Merge {
        manifest: PathBuf,
        output_pfo: PathBuf,
    },
    /// Render one font at every size of a build plan, one file per size
    Plan {
        input_ttf: PathBuf,
        output_dir: PathBuf,
        /// Build plan JSON; defaults to the language pack sizes
        #[arg(long)]
        plan: Option<PathBuf>,
        #[arg(long)]
        list: Option<PathBuf>,
        #[arg(long)]
        filter: Option<String>,
        #[arg(long, value_enum, default_value_t)]
        rasterizer: Rasterizer,
    },
    /// Print the hardware CRC32 of a file
    Crc { file: PathBuf },
    /// Print header fields and bucket statistics of a .pfo
    Inspect { pfo: PathBuf },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(e) = run(args.command) {
        eprintln!("✗ {}", e);
        std::process::exit(1);
    }
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Pfo {
            height,
            input_ttf,
            output_pfo,
            extended,
            tracking,
            filter,
            list,
            legacy,
            fauxbold,
            heightoffset,
            strict,
            rasterizer,
        } => {
            let settings = EncoderSettings {
                height_offset: heightoffset.unwrap_or(0),
                tracking_adjust: tracking.unwrap_or(0),
                legacy,
                faux_bold: fauxbold,
                max_glyphs: if extended { MAX_GLYPHS_EXTENDED } else { MAX_GLYPHS },
                strict,
                rasterizer,
                ..EncoderSettings::new(height)
            };
            let subset = glyphpack::load_subset(list.as_deref(), filter.as_deref())?;
            let (encoding, _) = glyphpack::encode_file(&input_ttf, settings, &subset)?;
            write(&output_pfo, &encoding.to_bytes()?)
        }
        Command::Header {
            height,
            input_ttf,
            output_header,
            filter,
            rasterizer,
        } => {
            let subset = glyphpack::load_subset(None, filter.as_deref())?;
            let settings = EncoderSettings {
                rasterizer,
                ..EncoderSettings::new(height)
            };
            let (encoding, _) = glyphpack::encode_file(&input_ttf, settings, &subset)?;
            let name = input_ttf
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "font".to_string());
            write(&output_header, encoding.to_c_header(&name)?.as_bytes())
        }
        Command::Merge {
            manifest,
            output_pfo,
        } => {
            let json = fs::read_to_string(&manifest).map_err(|e| GlyphpackError::io(&manifest, e))?;
            let parsed = MergeManifest::from_json(&json)?;
            let base_dir = manifest.parent().unwrap_or_else(|| Path::new("."));
            let (encoding, report) = glyphpack::merge_manifest(&parsed, base_dir)?;
            for (bucket, count) in &report.overflows {
                eprintln!("warning: bucket {} holds {} entries", bucket, count);
            }
            write(&output_pfo, &encoding.to_bytes()?)
        }
        Command::Plan {
            input_ttf,
            output_dir,
            plan,
            list,
            filter,
            rasterizer,
        } => {
            let plan = match plan {
                Some(path) => BuildPlan::load(path)?,
                None => BuildPlan::language_pack(),
            };
            let first_height = plan.sizes.first().map_or(14, |s| s.height);
            let mut source = FontSource::open(&input_ttf, first_height, rasterizer)?;
            let subset = glyphpack::load_subset(list.as_deref(), filter.as_deref())?;
            let base = EncoderSettings {
                max_glyphs: MAX_GLYPHS_EXTENDED,
                rasterizer,
                ..EncoderSettings::new(first_height)
            };
            let mut files = ResourceFiles::default();
            let packed = build_plan(&plan, &mut source, &subset, &base, &mut files)?;
            fs::create_dir_all(&output_dir).map_err(|e| GlyphpackError::io(&output_dir, e))?;
            for (resource, data) in packed.iter().zip(&files.resources) {
                write(&output_dir.join(&resource.name), data)?;
            }
            Ok(())
        }
        Command::Crc { file } => {
            let data = fs::read(&file).map_err(|e| GlyphpackError::io(&file, e))?;
            let crc = crc32(&data);
            println!("{} or 0x{:x}", crc, crc);
            Ok(())
        }
        Command::Inspect { pfo } => {
            let data = fs::read(&pfo).map_err(|e| GlyphpackError::io(&pfo, e))?;
            let blob = FontBlob::parse(&data)?;
            let h = &blob.header;
            println!("version:         {}", h.version);
            println!("max height:      {}", h.max_height);
            println!("glyphs:          {}", h.num_glyphs);
            println!("wildcard:        U+{:04X}", h.wildcard_codepoint);
            println!("table size:      {}", h.table_size);
            println!("codepoint bytes: {}", h.codepoint_width.bytes());

            let counts: Vec<usize> = (0..h.table_size as usize)
                .map(|b| blob.hash_entry(b).1 as usize)
                .collect();
            let used = counts.iter().filter(|&&c| c > 0).count();
            let max = counts.iter().copied().max().unwrap_or(0);
            println!("buckets used:    {} (largest {})", used, max);
            println!("glyph table:     {} bytes", blob.glyph_table_len());
            println!("crc32:           0x{:08x}", crc32(&data));
            Ok(())
        }
    }
}

/// Resources collected in slot order, written out as loose files.
#[derive(Default)]
struct ResourceFiles {
    resources: Vec<Vec<u8>>,
}

impl ResourcePack for ResourceFiles {
    fn add_resource(&mut self, data: Vec<u8>) {
        self.resources.push(data);
    }

    fn serialize(&self, out: &mut dyn std::io::Write) -> std::io::Result<()> {
        for resource in &self.resources {
            out.write_all(resource)?;
        }
        Ok(())
    }
}

fn write(path: &Path, data: &[u8]) -> Result<()> {
    fs::write(path, data).map_err(|e| GlyphpackError::io(path, e))?;
    info!("✓ Written {} bytes to {}", data.len(), path.display());
    Ok(())
}
