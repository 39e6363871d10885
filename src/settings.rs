use crate::error::{LollipopError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const BASE_DPI: f64 = 72.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainLabelStyle {
    Off,
    Fit,
    #[default]
    #[serde(alias = "truncated")]
    Truncate,
}

impl DomainLabelStyle {
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "off" => Some(Self::Off),
            "fit" => Some(Self::Fit),
            "truncate" | "truncated" => Some(Self::Truncate),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Fit => "fit",
            Self::Truncate => "truncate",
        }
    }
}

/// Everything that controls one render. Pixel constants are in output pixels at `dpi`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub show_labels: bool,
    pub show_legend: bool,
    pub hide_disordered: bool,
    pub hide_motifs: bool,
    pub hide_axis: bool,
    /// No patterns in the output; disordered regions become a flat translucent fill.
    pub solid_fill_only: bool,
    pub domain_label_style: DomainLabelStyle,

    pub synonymous_color: String,
    pub mutation_color: String,

    pub lollipop_radius: f64,
    pub lollipop_height: f64,
    pub backbone_height: f64,
    pub motif_height: f64,
    pub domain_height: f64,
    pub padding: f64,
    pub axis_padding: f64,
    pub axis_height: f64,
    pub text_padding: f64,

    pub domain_font_size: f64,
    pub axis_font_size: f64,
    pub mutation_font_size: f64,
    pub legend_row_height: f64,
    /// Minimum distance between axis labels, in pixels.
    pub axis_label_spacing: f64,
    pub label_min_box_width: f64,
    pub truncate_min_width: f64,
    pub min_auto_width: f64,

    /// Canvas width; 0 picks a width that fits the domain labels.
    pub graphic_width: f64,
    pub dpi: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            show_labels: false,
            show_legend: false,
            hide_disordered: false,
            hide_motifs: false,
            hide_axis: false,
            solid_fill_only: false,
            domain_label_style: DomainLabelStyle::Truncate,

            synonymous_color: "#0000ff".to_string(),
            mutation_color: "#ff0000".to_string(),

            lollipop_radius: 4.0,
            lollipop_height: 28.0,
            backbone_height: 14.0,
            motif_height: 18.0,
            domain_height: 24.0,
            padding: 15.0,
            axis_padding: 10.0,
            axis_height: 15.0,
            text_padding: 5.0,

            domain_font_size: 12.0,
            axis_font_size: 10.0,
            mutation_font_size: 10.0,
            legend_row_height: 14.0,
            axis_label_spacing: 20.0,
            label_min_box_width: 10.0,
            truncate_min_width: 40.0,
            min_auto_width: 400.0,

            graphic_width: 0.0,
            dpi: BASE_DPI,
        }
    }
}

impl Settings {
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            LollipopError::Config(format!("could not read settings '{}': {e}", path.display()))
        })?;
        serde_json::from_str(&text).map_err(|e| {
            LollipopError::Config(format!("could not parse settings '{}': {e}", path.display()))
        })
    }

    pub fn dpi_scale(&self) -> f64 {
        self.dpi / BASE_DPI
    }

    /// A copy with every pixel constant rescaled from `self.dpi` to `dpi`. The
    /// receiver is left untouched, so calling this twice never scales twice.
    pub fn for_dpi(&self, dpi: f64) -> Result<Self> {
        if !(dpi.is_finite() && dpi > 0.0) {
            return Err(LollipopError::Config(format!("DPI must be positive, got {dpi}")));
        }
        let factor = dpi / self.dpi;
        let mut ret = self.clone();
        for value in [
            &mut ret.lollipop_radius,
            &mut ret.lollipop_height,
            &mut ret.backbone_height,
            &mut ret.motif_height,
            &mut ret.domain_height,
            &mut ret.padding,
            &mut ret.axis_padding,
            &mut ret.axis_height,
            &mut ret.text_padding,
            &mut ret.domain_font_size,
            &mut ret.axis_font_size,
            &mut ret.mutation_font_size,
            &mut ret.legend_row_height,
            &mut ret.axis_label_spacing,
            &mut ret.label_min_box_width,
            &mut ret.truncate_min_width,
            &mut ret.min_auto_width,
            &mut ret.graphic_width,
        ] {
            *value *= factor;
        }
        ret.dpi = dpi;
        Ok(ret)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.dpi.is_finite() && self.dpi > 0.0) {
            return Err(LollipopError::Config(format!("DPI must be positive, got {}", self.dpi)));
        }
        if self.graphic_width < 0.0 {
            return Err(LollipopError::Config(format!(
                "width must not be negative, got {}",
                self.graphic_width
            )));
        }
        if self.graphic_width > 0.0 && self.graphic_width <= 2.0 * self.padding {
            return Err(LollipopError::Config(format!(
                "width {} leaves no room inside the padding",
                self.graphic_width
            )));
        }
        for color in [&self.synonymous_color, &self.mutation_color] {
            if crate::colors::Rgb::parse(color).is_none() {
                return Err(LollipopError::Config(format!("invalid colour '{color}'")));
            }
        }
        Ok(())
    }
}
