//! Vector output: a self-contained SVG document drawn from a computed [`Layout`].

use crate::{
    colors::{AXIS_GREY, BACKBONE_GREY, blend_with_white},
    error::Result,
    layout::{Layout, is_visible_motif},
    protein_features::FeatureSet,
    settings::Settings,
    text_measure::TextMeasurer,
};
use std::io::Write;
use svg::Document;
use svg::node::element::{
    Anchor, Circle, Definitions, Filter, FilterEffectBlend, FilterEffectComponentTransfer,
    FilterEffectFunctionA, FilterEffectGaussianBlur, FilterEffectOffset, Group, Line, Path,
    Pattern, Rectangle, Text,
};

const XML_DECLARATION: &str = "<?xml version='1.0'?>\n";
const XLINK_NS: &str = "http://www.w3.org/1999/xlink";
const SHADOW_FILTER: &str = "url(#ds)";
const DISORDER_HATCH: &str = "url(#disordered-hatch)";

fn definitions() -> Definitions {
    let shadow = Filter::new()
        .set("id", "ds")
        .set("x", 0)
        .set("y", 0)
        .add(
            FilterEffectOffset::new()
                .set("in", "SourceAlpha")
                .set("dx", 2)
                .set("dy", 2),
        )
        .add(
            FilterEffectComponentTransfer::new().add(
                FilterEffectFunctionA::new()
                    .set("type", "linear")
                    .set("slope", 0.2),
            ),
        )
        .add(
            FilterEffectGaussianBlur::new()
                .set("result", "blurOut")
                .set("stdDeviation", 1),
        )
        .add(
            FilterEffectBlend::new()
                .set("in", "SourceGraphic")
                .set("in2", "blurOut")
                .set("mode", "normal"),
        );
    let hatch = Pattern::new()
        .set("id", "disordered-hatch")
        .set("patternUnits", "userSpaceOnUse")
        .set("width", 4)
        .set("height", 4)
        .add(
            Path::new()
                .set("d", "M-1,1 l2,-2 M0,4 l4,-4 M3,5 l2,-2")
                .set("stroke", "#000000")
                .set("opacity", 0.3),
        );
    Definitions::new().add(shadow).add(hatch)
}

struct SvgPainter<'a> {
    layout: &'a Layout,
    features: &'a FeatureSet,
    settings: &'a Settings,
    font_family: String,
}

impl SvgPainter<'_> {
    fn text_style(&self, size: f64, fill: &str) -> String {
        format!("font-size:{size}px;font-family:{};fill:{fill};", self.font_family)
    }

    fn disorder_rect(&self, rect: Rectangle) -> Rectangle {
        if self.settings.solid_fill_only {
            rect.set("fill", "#000000").set("opacity", 0.15)
        } else {
            rect.set("fill", DISORDER_HATCH)
        }
    }

    fn lollipops(&self, mut doc: Document) -> Document {
        let s = self.settings;
        for pop in self.layout.lollipops() {
            doc = doc.add(
                Line::new()
                    .set("x1", pop.x)
                    .set("x2", pop.x)
                    .set("y1", pop.y)
                    .set("y2", self.layout.stem_bottom)
                    .set("stroke", BACKBONE_GREY.to_hex())
                    .set("stroke-width", 2),
            );
            doc = doc.add(
                Anchor::new().set("xlink:title", pop.display_label()).add(
                    Circle::new()
                        .set("cx", pop.x)
                        .set("cy", pop.y)
                        .set("r", pop.radius)
                        .set("fill", pop.color.as_str()),
                ),
            );
            if s.show_labels {
                doc = doc.add(
                    Group::new()
                        .set("transform", format!("translate({},{}) rotate(-30)", pop.x, pop.y))
                        .add(
                            Text::new(pop.display_label())
                                .set("style", self.text_style(s.mutation_font_size, "#555"))
                                .set("text-anchor", "middle")
                                .set("x", 0)
                                .set("y", pop.radius * -1.5),
                        ),
                );
            }
        }
        doc
    }

    fn backbone(&self, doc: Document) -> Document {
        let s = self.settings;
        let f = self.features;
        doc.add(
            Anchor::new()
                .set(
                    "xlink:title",
                    format!("{}, {} ({}aa)", f.identifier(), f.description(), f.length),
                )
                .add(
                    Rectangle::new()
                        .set("fill", BACKBONE_GREY.to_hex())
                        .set("x", s.padding)
                        .set("y", self.layout.track_y + (s.domain_height - s.backbone_height) / 2.0)
                        .set("width", self.layout.canvas_width - s.padding * 2.0)
                        .set("height", s.backbone_height),
                ),
        )
    }

    fn motifs(&self, mut doc: Document) -> Document {
        let s = self.settings;
        let track_y = self.layout.track_y;
        for motif in self.features.motifs.iter().filter(|m| is_visible_motif(m, s)) {
            let (x, width) = self.layout.span_of(motif);
            let rect = if motif.is_disorder() {
                self.disorder_rect(
                    Rectangle::new()
                        .set("x", x)
                        .set("y", track_y + (s.domain_height - s.backbone_height) / 2.0)
                        .set("width", width)
                        .set("height", s.backbone_height),
                )
            } else {
                Rectangle::new()
                    .set("fill", blend_with_white(&motif.color))
                    .set("x", x)
                    .set("y", track_y + (s.domain_height - s.motif_height) / 2.0)
                    .set("width", width)
                    .set("height", s.motif_height)
                    .set("filter", SHADOW_FILTER)
            };
            doc = doc.add(Anchor::new().set("xlink:title", motif.kind.as_str()).add(rect));
        }
        doc
    }

    fn regions(&self, mut doc: Document) -> Document {
        let s = self.settings;
        for (region, label) in self.features.regions.iter().zip(&self.layout.domain_labels) {
            if region.is_point() {
                continue;
            }
            let (x, width) = self.layout.span_of(region);
            let mut anchor = Anchor::new().set("xlink:title", region.description()).add(
                Rectangle::new()
                    .set("fill", region.color.as_str())
                    .set("x", 0)
                    .set("y", 0)
                    .set("width", width)
                    .set("height", s.domain_height)
                    .set("filter", SHADOW_FILTER),
            );
            if let Some(link) = region.link.as_deref().filter(|l| !l.is_empty()) {
                anchor = anchor.set("xlink:href", link);
            }
            if width > s.label_min_box_width && !label.is_empty() {
                anchor = anchor.add(
                    Text::new(label.as_str())
                        .set("style", self.text_style(s.domain_font_size, "#ffffff"))
                        .set("text-anchor", "middle")
                        .set("x", width / 2.0)
                        .set("y", 4.0 + s.domain_height / 2.0),
                );
            }
            doc = doc.add(
                Group::new()
                    .set("transform", format!("translate({x},{})", self.layout.track_y))
                    .add(anchor),
            );
        }
        doc
    }

    fn axis(&self, doc: Document) -> Document {
        let s = self.settings;
        let layout = self.layout;
        let y = layout.axis_y;
        let tick_bottom = y + s.axis_height / 3.0;
        let grey = AXIS_GREY.to_hex();
        let mut group = Group::new()
            .set("class", "axis")
            .add(
                Line::new()
                    .set("x1", s.padding)
                    .set("x2", layout.canvas_width - s.padding)
                    .set("y1", y)
                    .set("y2", y)
                    .set("stroke", grey.as_str()),
            )
            .add(
                Line::new()
                    .set("x1", s.padding)
                    .set("x2", s.padding)
                    .set("y1", y)
                    .set("y2", tick_bottom)
                    .set("stroke", grey.as_str()),
            );
        for tick in layout.axis_ticks(layout.axis_spacing(s)) {
            group = group
                .add(
                    Line::new()
                        .set("x1", tick.x)
                        .set("x2", tick.x)
                        .set("y1", y)
                        .set("y2", tick_bottom)
                        .set("stroke", grey.as_str()),
                )
                .add(
                    Text::new(tick.position.to_string())
                        .set("style", self.text_style(s.axis_font_size, "#000000"))
                        .set("text-anchor", "middle")
                        .set("x", tick.x)
                        .set("y", y + s.axis_height),
                );
        }
        doc.add(group)
    }

    fn legend(&self, mut doc: Document) -> Document {
        let s = self.settings;
        let Some(entries) = &self.layout.legend else {
            return doc;
        };
        let mut y = self.layout.legend_y;
        for entry in entries {
            y += s.legend_row_height;
            let swatch = Rectangle::new()
                .set("x", 4)
                .set("y", y)
                .set("width", 12)
                .set("height", 12)
                .set("filter", SHADOW_FILTER);
            let swatch = if entry.is_disorder {
                self.disorder_rect(swatch)
            } else {
                swatch.set("fill", entry.color.as_str())
            };
            doc = doc.add(swatch).add(
                Text::new(entry.label.as_str())
                    .set("style", self.text_style(s.domain_font_size, "#000000"))
                    .set("text-anchor", "start")
                    .set("x", 20)
                    .set("y", y + 12.0),
            );
        }
        doc
    }

    fn document(&self) -> Document {
        let mut doc = Document::new()
            .set("xmlns:xlink", XLINK_NS)
            .set("width", self.layout.canvas_width)
            .set("height", self.layout.canvas_height)
            .add(definitions());
        doc = self.lollipops(doc);
        doc = self.backbone(doc);
        doc = self.motifs(doc);
        doc = self.regions(doc);
        if !self.settings.hide_axis {
            doc = self.axis(doc);
        }
        self.legend(doc)
    }
}

/// The complete SVG text, starting with an XML declaration.
pub fn render_svg(
    layout: &Layout,
    features: &FeatureSet,
    settings: &Settings,
    measurer: &dyn TextMeasurer,
) -> String {
    let painter = SvgPainter {
        layout,
        features,
        settings,
        font_family: measurer.font_family().unwrap_or("sans-serif").to_string(),
    };
    format!("{XML_DECLARATION}{}\n", painter.document())
}

pub fn write_svg(
    out: &mut dyn Write,
    layout: &Layout,
    features: &FeatureSet,
    settings: &Settings,
    measurer: &dyn TextMeasurer,
) -> Result<()> {
    let text = render_svg(layout, features, settings, measurer);
    out.write_all(text.as_bytes())?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        protein_features::Feature, settings::DomainLabelStyle, text_measure::HeuristicMeasurer,
    };

    fn features() -> FeatureSet {
        let mut set = FeatureSet::new(393);
        set.metadata.identifier = "P53_HUMAN".to_string();
        set.metadata.description = "Cellular tumor antigen p53".to_string();
        set.motifs.push(Feature::new(1, 60, "#ff9c00", "", "disorder"));
        set.motifs
            .push(Feature::new(320, 355, "#9cff00", "", "coiled_coil"));
        set.regions.push(
            Feature::new(95, 288, "#2dcf00", "P53", "pfama")
                .with_description("P53 DNA-binding domain")
                .with_link("http://pfam-legacy.xfam.org/family/PF00870"),
        );
        set
    }

    fn render(settings: &Settings, changes: &[&str]) -> String {
        let set = features();
        let layout = Layout::build(&set, changes, settings, &HeuristicMeasurer).unwrap();
        render_svg(&layout, &set, settings, &HeuristicMeasurer)
    }

    #[test]
    fn document_is_framed_and_sized() {
        let settings = Settings {
            graphic_width: 423.0,
            ..Default::default()
        };
        let svg = render(&settings, &["R273C"]);
        assert!(svg.starts_with("<?xml version='1.0'?>\n<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert!(svg.contains(r#"width="423""#));
        assert!(svg.contains(r#"id="disordered-hatch""#));
        assert!(svg.contains(r#"id="ds""#));
        assert!(svg.contains(XLINK_NS));
    }

    #[test]
    fn lollipop_uses_mutation_colour_and_title() {
        let svg = render(&Settings::default(), &["R273C", "R273C", "T125"]);
        assert!(svg.contains(r#"xlink:title="R273C (2)""#));
        assert!(svg.contains(r##"fill="#ff0000""##));
        assert!(svg.contains(r##"fill="#0000ff""##));
        assert!(svg.contains("P53_HUMAN, Cellular tumor antigen p53 (393aa)"));
    }

    #[test]
    fn labels_are_optional() {
        let svg = render(&Settings::default(), &["R273C@3"]);
        assert!(!svg.contains("rotate(-30)"));
        assert_eq!(svg.matches("R273C (3)").count(), 1);
        let settings = Settings {
            show_labels: true,
            ..Default::default()
        };
        let svg = render(&settings, &["R273C@3"]);
        assert!(svg.contains("rotate(-30)"));
        assert_eq!(svg.matches("R273C (3)").count(), 2);
    }

    #[test]
    fn hide_axis_removes_axis_group() {
        let svg = render(&Settings::default(), &["R273C"]);
        assert!(svg.contains(r#"class="axis""#));
        let settings = Settings {
            hide_axis: true,
            ..Default::default()
        };
        let svg = render(&settings, &["R273C"]);
        assert!(!svg.contains(r#"class="axis""#));
    }

    #[test]
    fn label_style_off_emits_no_domain_text() {
        let settings = Settings {
            domain_label_style: DomainLabelStyle::Off,
            graphic_width: 3000.0,
            hide_axis: true,
            ..Default::default()
        };
        let svg = render(&settings, &[]);
        assert!(!svg.contains("<text"));
        assert!(svg.contains(r#"xlink:href="http://pfam-legacy.xfam.org/family/PF00870""#));
    }

    #[test]
    fn solid_fill_replaces_hatch() {
        let svg = render(&Settings::default(), &[]);
        assert!(svg.contains(r#"fill="url(#disordered-hatch)""#));
        let settings = Settings {
            solid_fill_only: true,
            ..Default::default()
        };
        let svg = render(&settings, &[]);
        assert!(!svg.contains(r#"fill="url(#disordered-hatch)""#));
        assert!(svg.contains(r#"opacity="0.15""#));
    }

    #[test]
    fn hidden_disorder_is_not_drawn() {
        let settings = Settings {
            hide_disordered: true,
            ..Default::default()
        };
        let svg = render(&settings, &[]);
        assert!(!svg.contains(r#"xlink:title="disorder""#));
        assert!(svg.contains(r#"xlink:title="coiled_coil""#));
    }

    #[test]
    fn legend_rows_follow_the_axis() {
        let settings = Settings {
            show_legend: true,
            ..Default::default()
        };
        let svg = render(&settings, &["R273C"]);
        assert!(svg.contains("Disordered region"));
        assert!(svg.contains("Coiled-coil motif"));
    }

    #[test]
    fn output_is_deterministic() {
        let settings = Settings {
            show_legend: true,
            show_labels: true,
            ..Default::default()
        };
        let changes = ["R273C", "R175H#00ff00@4", "G245S", "R248Q", "R248W"];
        assert_eq!(render(&settings, &changes), render(&settings, &changes));
    }

    #[test]
    fn write_svg_reports_sink_errors() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("disk full"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }
        let set = features();
        let settings = Settings::default();
        let layout = Layout::build(&set, &["R273C"], &settings, &HeuristicMeasurer).unwrap();
        let err = write_svg(&mut Broken, &layout, &set, &settings, &HeuristicMeasurer).unwrap_err();
        assert!(matches!(err, crate::LollipopError::Render(_)));
    }
}
