//! Font loading, cell metrics, and glyph fallback.
//!
//! The primary font is mandatory and defines the cell geometry; fallback
//! fonts only contribute glyphs. A codepoint is rasterised from the first
//! font in the chain that actually contains it, so a mostly-Latin primary
//! face can be backed by script-specific Noto faces for everything else.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use fontdue::{Font, FontSettings, Metrics};

pub const MIN_FONT_SIZE: f32 = 6.0;
pub const MAX_FONT_SIZE: f32 = 72.0;
pub const DEFAULT_FONT_SIZE: f32 = 16.0;

const MAX_FONTS: usize = 4;

/// Script-coverage fonts probed after the primary; every miss is soft.
const FALLBACK_FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/noto/NotoSansArabic-Regular.ttf",
    "/usr/share/fonts/noto/NotoSansHebrew-Regular.ttf",
    "/usr/share/fonts/noto/NotoSansThai-Regular.ttf",
];

/// Fixed cell geometry, computed once from the primary font.
#[derive(Debug, Clone, Copy)]
pub struct CellMetrics {
    /// Distance from the cell top to the glyph baseline, in pixels.
    pub baseline: i32,
    pub char_width: usize,
    pub char_height: usize,
}

#[derive(Debug)]
pub struct FontSet {
    fonts: Vec<Font>,
    px: f32,
    metrics: CellMetrics,
}

impl FontSet {
    /// Load the primary font plus whatever fallbacks exist, and derive the
    /// cell metrics. Only the primary font is allowed to fail the load.
    pub fn load(primary: &Path, extra: &[PathBuf], px: f32) -> Result<Self> {
        let mut fonts = vec![load_font(primary, px)?];

        let probes = FALLBACK_FONT_PATHS
            .iter()
            .copied()
            .map(PathBuf::from)
            .chain(extra.iter().cloned());
        for path in probes {
            if fonts.len() == MAX_FONTS {
                tracing::debug!("fallback chain full, skipping {}", path.display());
                break;
            }
            match load_font(&path, px) {
                Ok(font) => {
                    tracing::info!("loaded fallback font {}", path.display());
                    fonts.push(font);
                }
                Err(err) => tracing::warn!("skipping fallback font: {err:#}"),
            }
        }

        let metrics = cell_metrics(&fonts[0], px)?;
        Ok(Self { fonts, px, metrics })
    }

    pub fn metrics(&self) -> CellMetrics {
        self.metrics
    }

    /// Rasterise a codepoint into an 8-bit coverage bitmap at the configured
    /// pixel size. Falls back across the chain; a codepoint no font covers
    /// renders as the primary font's missing glyph.
    pub fn rasterize(&self, codepoint: char) -> (Metrics, Vec<u8>) {
        self.font_for(codepoint).rasterize(codepoint, self.px)
    }

    fn font_for(&self, codepoint: char) -> &Font {
        self.fonts
            .iter()
            .find(|f| f.lookup_glyph_index(codepoint) != 0)
            .unwrap_or(&self.fonts[0])
    }
}

fn load_font(path: &Path, px: f32) -> Result<Font> {
    let data = std::fs::read(path)
        .with_context(|| format!("failed to read font {}", path.display()))?;
    Font::from_bytes(
        data,
        FontSettings {
            scale: px,
            ..FontSettings::default()
        },
    )
    .map_err(|err| anyhow!("failed to parse font {}: {err}", path.display()))
}

/// Cell geometry: line height plus 2px of breathing room vertically, and the
/// widest printable-ASCII advance plus 1px of spacing horizontally.
fn cell_metrics(primary: &Font, px: f32) -> Result<CellMetrics> {
    let line = primary
        .horizontal_line_metrics(px)
        .ok_or_else(|| anyhow!("primary font has no horizontal line metrics"))?;

    // descent is negative, so this is the full ascender-to-descender span.
    let char_height = (line.ascent - line.descent).round() as usize + 2;

    let mut max_advance = 0.0f32;
    for c in ' '..='~' {
        max_advance = max_advance.max(primary.metrics(c, px).advance_width);
    }
    let char_width = max_advance.round() as usize + 1;

    Ok(CellMetrics {
        baseline: line.ascent.round() as i32,
        char_width,
        char_height,
    })
}

/// Resolve the CLI font size: absent or `0` selects the default, anything
/// outside the supported range is a startup error.
pub fn resolve_font_size(arg: Option<f32>) -> Result<f32> {
    match arg {
        None => Ok(DEFAULT_FONT_SIZE),
        Some(s) if s == 0.0 => Ok(DEFAULT_FONT_SIZE),
        Some(s) if (MIN_FONT_SIZE..=MAX_FONT_SIZE).contains(&s) => Ok(s),
        Some(s) => Err(anyhow!(
            "font size must be between {MIN_FONT_SIZE} and {MAX_FONT_SIZE} (got {s})"
        )),
    }
}
