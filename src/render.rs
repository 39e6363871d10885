//! Output format selection and the one-call render pipeline.

use crate::{
    error::Result,
    layout::Layout,
    protein_features::FeatureSet,
    render_png::write_png,
    render_svg::write_svg,
    settings::Settings,
    text_measure::TextMeasurer,
};
use serde::{Deserialize, Serialize};
use std::{borrow::Cow, io::Write, path::Path};
use tracing::debug;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Svg,
    Png,
}

impl OutputFormat {
    /// `.png` (any case) selects raster output, everything else SVG.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        match path.as_ref().extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("png") => Self::Png,
            _ => Self::Svg,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Svg => "svg",
            Self::Png => "png",
        }
    }

    /// Settings the layout is computed with. Raster output gets a copy scaled to
    /// `dpi`; vector output is resolution independent.
    pub fn resolve_settings(self, settings: &Settings, dpi: f64) -> Result<Cow<'_, Settings>> {
        match self {
            Self::Svg => Ok(Cow::Borrowed(settings)),
            Self::Png => Ok(Cow::Owned(settings.for_dpi(dpi)?)),
        }
    }

    pub fn write(
        self,
        out: &mut dyn Write,
        layout: &Layout,
        features: &FeatureSet,
        settings: &Settings,
        measurer: &dyn TextMeasurer,
    ) -> Result<()> {
        match self {
            Self::Svg => write_svg(out, layout, features, settings, measurer),
            Self::Png => write_png(out, layout, features, settings, measurer),
        }
    }
}

/// Parses `changelist`, lays out the diagram and writes it to `out`. Input errors
/// are reported before a single byte is written.
pub fn draw<S: AsRef<str>>(
    out: &mut dyn Write,
    format: OutputFormat,
    dpi: f64,
    features: &FeatureSet,
    changelist: &[S],
    settings: &Settings,
    measurer: &dyn TextMeasurer,
) -> Result<()> {
    let settings = format.resolve_settings(settings, dpi)?;
    let layout = Layout::build(features, changelist, &settings, measurer)?;
    debug!(
        format = format.extension(),
        width = layout.canvas_width,
        height = layout.canvas_height,
        ticks = layout.ticks.len(),
        "drawing diagram"
    );
    format.write(out, &layout, features, &settings, measurer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::LollipopError, protein_features::Feature, text_measure::HeuristicMeasurer};

    fn features() -> FeatureSet {
        let mut set = FeatureSet::new(393);
        set.regions
            .push(Feature::new(95, 288, "#2dcf00", "P53", "pfama"));
        set
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(OutputFormat::from_path("out.png"), OutputFormat::Png);
        assert_eq!(OutputFormat::from_path("OUT.PNG"), OutputFormat::Png);
        assert_eq!(OutputFormat::from_path("out.svg"), OutputFormat::Svg);
        assert_eq!(OutputFormat::from_path("out"), OutputFormat::Svg);
        assert_eq!(OutputFormat::from_path("out.pdf"), OutputFormat::Svg);
    }

    #[test]
    fn raster_settings_are_a_scaled_copy() {
        let settings = Settings::default();
        let resolved = OutputFormat::Png.resolve_settings(&settings, 144.0).unwrap();
        assert_eq!(resolved.lollipop_radius, 8.0);
        assert_eq!(settings.lollipop_radius, 4.0);
        let svg = OutputFormat::Svg.resolve_settings(&settings, 144.0).unwrap();
        assert!(matches!(svg, Cow::Borrowed(_)));
    }

    #[test]
    fn repeated_raster_draws_do_not_compound_scaling() {
        let settings = Settings::default();
        let mut first = Vec::new();
        let mut second = Vec::new();
        for out in [&mut first, &mut second] {
            draw(
                out,
                OutputFormat::Png,
                300.0,
                &features(),
                &["R273C"],
                &settings,
                &HeuristicMeasurer,
            )
            .unwrap();
        }
        assert_eq!(first, second);
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn parse_errors_write_nothing() {
        let mut out = Vec::new();
        let err = draw(
            &mut out,
            OutputFormat::Svg,
            72.0,
            &features(),
            &["R273C", "nonsense"],
            &Settings::default(),
            &HeuristicMeasurer,
        )
        .unwrap_err();
        assert!(matches!(err, LollipopError::Parse { .. }));
        assert!(out.is_empty());
    }

    #[test]
    fn data_errors_write_nothing() {
        let mut out = Vec::new();
        let err = draw(
            &mut out,
            OutputFormat::Png,
            72.0,
            &FeatureSet::new(0),
            &["R273C"],
            &Settings::default(),
            &HeuristicMeasurer,
        )
        .unwrap_err();
        assert!(matches!(err, LollipopError::Data(_)));
        assert!(out.is_empty());
    }
}
