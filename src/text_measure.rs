//! Text width measurement for label fitting and glyph coverage for raster text.

use crate::error::{LollipopError, Result};
use fontdue::{Font, FontSettings};
use std::{cell::RefCell, collections::HashMap, path::Path};
use tracing::{debug, warn};

const COMMON_FONT_PATHS: &[&str] = &[
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:/Windows/Fonts/arial.ttf",
    "/usr/share/fonts/truetype/msttcorefonts/arial.ttf",
    "/usr/share/fonts/truetype/msttcorefonts/Arial.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
];

/// Coverage bitmap of one glyph, positioned relative to the pen start and baseline.
#[derive(Clone, Debug)]
pub struct GlyphBitmap {
    pub left: i32,
    /// Offset of the bitmap's top row from the baseline (negative is above).
    pub top: i32,
    pub width: usize,
    pub height: usize,
    pub coverage: Vec<u8>,
}

pub trait TextMeasurer {
    /// Rendered width of `text` in pixels at `size_px`.
    fn measure(&self, text: &str, size_px: f64) -> f64;

    fn font_family(&self) -> Option<&str> {
        None
    }

    /// Glyph bitmaps for raster output. Measurers without glyph data return nothing.
    fn glyphs(&self, _text: &str, _size_px: f64) -> Vec<GlyphBitmap> {
        vec![]
    }

    /// Height of a capital letter, used to centre text vertically.
    fn cap_height(&self, size_px: f64) -> f64 {
        size_px * 0.7
    }
}

/// Conservative estimate used when no font file is available.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeuristicMeasurer;

impl TextMeasurer for HeuristicMeasurer {
    fn measure(&self, text: &str, size_px: f64) -> f64 {
        text.chars().count() as f64 * (size_px - 2.0)
    }
}

pub struct FontMeasurer {
    family: String,
    font: Font,
    widths: RefCell<HashMap<(String, u64), f64>>,
}

impl std::fmt::Debug for FontMeasurer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontMeasurer")
            .field("family", &self.family)
            .finish()
    }
}

impl FontMeasurer {
    pub fn from_bytes(family: &str, bytes: Vec<u8>) -> Result<Self> {
        let font = Font::from_bytes(bytes, FontSettings::default())
            .map_err(|e| LollipopError::FontUnavailable(format!("{family}: {e}")))?;
        Ok(Self {
            family: family.to_string(),
            font,
            widths: RefCell::new(HashMap::new()),
        })
    }

    /// Loads a TrueType file; the family name is taken from the file stem.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            LollipopError::FontUnavailable(format!("could not read '{}': {e}", path.display()))
        })?;
        let family = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "sans-serif".to_string());
        Self::from_bytes(&family, bytes)
    }

    fn advance_width(&self, text: &str, size: f32) -> f32 {
        let mut width = 0.0;
        let mut previous: Option<char> = None;
        for c in text.chars() {
            if let Some(left) = previous {
                width += self.font.horizontal_kern(left, c, size).unwrap_or(0.0);
            }
            width += self.font.metrics(c, size).advance_width;
            previous = Some(c);
        }
        width
    }
}

impl TextMeasurer for FontMeasurer {
    fn measure(&self, text: &str, size_px: f64) -> f64 {
        let key = (text.to_string(), size_px.to_bits());
        if let Some(width) = self.widths.borrow().get(&key) {
            return *width;
        }
        let width = f64::from(self.advance_width(text, size_px as f32)).floor();
        self.widths.borrow_mut().insert(key, width);
        width
    }

    fn font_family(&self) -> Option<&str> {
        Some(&self.family)
    }

    fn glyphs(&self, text: &str, size_px: f64) -> Vec<GlyphBitmap> {
        let size = size_px as f32;
        let mut pen = 0.0f32;
        let mut previous: Option<char> = None;
        let mut ret = Vec::with_capacity(text.len());
        for c in text.chars() {
            if let Some(left) = previous {
                pen += self.font.horizontal_kern(left, c, size).unwrap_or(0.0);
            }
            let (metrics, coverage) = self.font.rasterize(c, size);
            ret.push(GlyphBitmap {
                left: (pen + metrics.xmin as f32).round() as i32,
                top: -(metrics.ymin + metrics.height as i32),
                width: metrics.width,
                height: metrics.height,
                coverage,
            });
            pen += metrics.advance_width;
            previous = Some(c);
        }
        ret
    }

    fn cap_height(&self, size_px: f64) -> f64 {
        self.font.metrics('M', size_px as f32).height as f64
    }
}

/// Uses the font at `path` when given (failure is an error), otherwise searches
/// common system locations and falls back to the heuristic estimate.
pub fn load_measurer(path: Option<&Path>) -> Result<Box<dyn TextMeasurer>> {
    match path {
        Some(path) => Ok(Box::new(FontMeasurer::from_file(path)?)),
        None => Ok(load_default_measurer()),
    }
}

pub fn load_default_measurer() -> Box<dyn TextMeasurer> {
    for candidate in COMMON_FONT_PATHS {
        let path = Path::new(candidate);
        if !path.exists() {
            continue;
        }
        match FontMeasurer::from_file(path) {
            Ok(measurer) => {
                debug!(font = %candidate, "using system font for text metrics");
                return Box::new(measurer);
            }
            Err(e) => debug!(font = %candidate, error = %e, "skipping unusable font"),
        }
    }
    let err = LollipopError::FontUnavailable("no Arial-compatible TrueType font found".to_string());
    warn!("{err}; label widths are estimated, pass a .ttf font for accurate sizing");
    Box::new(HeuristicMeasurer)
}
