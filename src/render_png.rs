//! Raster output. Geometry comes from the same [`Layout`] as the SVG renderer; the
//! settings passed here are expected to be scaled to the target DPI already.

use crate::{
    colors::{AXIS_GREY, BACKBONE_GREY, WHITE, blend_with_white, rgba_from_hex},
    error::Result,
    layout::{Layout, is_visible_motif},
    protein_features::FeatureSet,
    settings::Settings,
    text_measure::TextMeasurer,
};
use image::{ImageFormat, Rgba, RgbaImage};
use std::io::{Cursor, Write};

const DISORDER_FILL: Rgba<u8> = Rgba([0, 0, 0, 38]);
const TEXT_BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const MUTATION_LABEL: Rgba<u8> = Rgba([0x55, 0x55, 0x55, 255]);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Anchor {
    Start,
    Middle,
}

struct Canvas {
    img: RgbaImage,
}

impl Canvas {
    fn new(width: f64, height: f64) -> Self {
        let width = (width.round() as u32).max(1);
        let height = (height.round() as u32).max(1);
        Self {
            img: RgbaImage::from_pixel(width, height, WHITE.opaque()),
        }
    }

    /// Source-over compositing onto the opaque canvas.
    fn blend(&mut self, x: i64, y: i64, color: Rgba<u8>) {
        if x < 0 || y < 0 || x >= i64::from(self.img.width()) || y >= i64::from(self.img.height()) {
            return;
        }
        let alpha = u32::from(color[3]);
        let dst = self.img.get_pixel_mut(x as u32, y as u32);
        for c in 0..3 {
            let mixed = (u32::from(color[c]) * alpha + u32::from(dst[c]) * (255 - alpha) + 127) / 255;
            dst[c] = mixed as u8;
        }
        dst[3] = 255;
    }

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: Rgba<u8>) {
        let (x0, x1) = (x.round() as i64, (x + width).round() as i64);
        let (y0, y1) = (y.round() as i64, (y + height).round() as i64);
        for py in y0..y1 {
            for px in x0..x1 {
                self.blend(px, py, color);
            }
        }
    }

    /// A rectangle over a soft drop shadow that fades out over `offset` pixels.
    fn shadow_rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: Rgba<u8>, offset: f64) {
        let steps = offset.round().max(1.0) as u32;
        let shade = Rgba([0, 0, 0, (1 + 75 / steps) as u8]);
        for i in (1..=steps).rev() {
            let d = f64::from(i);
            self.fill_rect(x + d, y + d, width, height, shade);
        }
        self.fill_rect(x, y, width, height, color);
    }

    fn hline(&mut self, x0: f64, x1: f64, y: f64, thickness: f64, color: Rgba<u8>) {
        self.fill_rect(x0, y - thickness / 2.0, x1 - x0, thickness.max(1.0), color);
    }

    fn vline(&mut self, x: f64, y0: f64, y1: f64, thickness: f64, color: Rgba<u8>) {
        let (top, bottom) = if y0 <= y1 { (y0, y1) } else { (y1, y0) };
        self.fill_rect(x - thickness / 2.0, top, thickness.max(1.0), bottom - top, color);
    }

    /// Filled circle using midpoint scanlines.
    fn fill_circle(&mut self, cx: f64, cy: f64, radius: f64, color: Rgba<u8>) {
        let (cx, cy) = (cx.round() as i64, cy.round() as i64);
        let r = radius.round() as i64;
        let mut x = r;
        let mut y = 0;
        let mut err = 1 - r;
        let mut spans: Vec<(i64, i64)> = vec![];
        while x >= y {
            spans.push((y, x));
            spans.push((x, y));
            y += 1;
            if err < 0 {
                err += 2 * y + 1;
            } else {
                x -= 1;
                err += 2 * (y - x) + 1;
            }
        }
        // widest half-span per row offset, so rows are filled exactly once
        let mut half_width = vec![-1i64; (r.max(0) + 1) as usize];
        for (dy, dx) in spans {
            let slot = &mut half_width[dy as usize];
            *slot = (*slot).max(dx);
        }
        for (dy, &dx) in half_width.iter().enumerate() {
            if dx < 0 {
                continue;
            }
            let dy = dy as i64;
            let rows = if dy == 0 { vec![cy] } else { vec![cy - dy, cy + dy] };
            for row in rows {
                for px in cx - dx..=cx + dx {
                    self.blend(px, row, color);
                }
            }
        }
    }

    /// Draws `text` with its baseline at `baseline`. Without glyph data nothing is drawn.
    fn text(
        &mut self,
        measurer: &dyn TextMeasurer,
        text: &str,
        size: f64,
        x: f64,
        baseline: f64,
        anchor: Anchor,
        color: Rgba<u8>,
    ) {
        let start = match anchor {
            Anchor::Start => x,
            Anchor::Middle => x - measurer.measure(text, size) / 2.0,
        };
        let (pen_x, pen_y) = (start.round() as i64, baseline.round() as i64);
        for glyph in measurer.glyphs(text, size) {
            for row in 0..glyph.height {
                for col in 0..glyph.width {
                    let coverage = glyph.coverage[row * glyph.width + col];
                    if coverage == 0 {
                        continue;
                    }
                    let alpha = (u32::from(coverage) * u32::from(color[3]) / 255) as u8;
                    self.blend(
                        pen_x + i64::from(glyph.left) + col as i64,
                        pen_y + i64::from(glyph.top) + row as i64,
                        Rgba([color[0], color[1], color[2], alpha]),
                    );
                }
            }
        }
    }
}

struct PngPainter<'a> {
    layout: &'a Layout,
    features: &'a FeatureSet,
    settings: &'a Settings,
    measurer: &'a dyn TextMeasurer,
    /// One point in output pixels.
    pt: f64,
}

impl PngPainter<'_> {
    fn shadow_offset(&self) -> f64 {
        2.0 * self.pt
    }

    fn lollipops(&self, canvas: &mut Canvas) {
        let s = self.settings;
        let stem = BACKBONE_GREY.opaque();
        for pop in self.layout.lollipops() {
            canvas.vline(pop.x, pop.y, self.layout.stem_bottom, 2.0 * self.pt, stem);
            canvas.fill_circle(pop.x, pop.y, pop.radius, rgba_from_hex(&pop.color));
            if s.show_labels {
                canvas.text(
                    self.measurer,
                    &pop.display_label(),
                    s.mutation_font_size,
                    pop.x,
                    pop.y - pop.radius * 1.5,
                    Anchor::Middle,
                    MUTATION_LABEL,
                );
            }
        }
    }

    fn backbone(&self, canvas: &mut Canvas) {
        let s = self.settings;
        canvas.fill_rect(
            s.padding,
            self.layout.track_y + (s.domain_height - s.backbone_height) / 2.0,
            self.layout.canvas_width - s.padding * 2.0,
            s.backbone_height,
            BACKBONE_GREY.opaque(),
        );
    }

    fn motifs(&self, canvas: &mut Canvas) {
        let s = self.settings;
        let track_y = self.layout.track_y;
        for motif in self.features.motifs.iter().filter(|m| is_visible_motif(m, s)) {
            let (x, width) = self.layout.span_of(motif);
            if motif.is_disorder() {
                let y = track_y + (s.domain_height - s.backbone_height) / 2.0;
                canvas.fill_rect(x, y, width, s.backbone_height, DISORDER_FILL);
            } else {
                let y = track_y + (s.domain_height - s.motif_height) / 2.0;
                let color = rgba_from_hex(&blend_with_white(&motif.color));
                canvas.shadow_rect(x, y, width, s.motif_height, color, self.shadow_offset());
            }
        }
    }

    fn regions(&self, canvas: &mut Canvas) {
        let s = self.settings;
        let track_y = self.layout.track_y;
        let baseline = track_y + (s.domain_height + self.measurer.cap_height(s.domain_font_size)) / 2.0;
        for (region, label) in self.features.regions.iter().zip(&self.layout.domain_labels) {
            if region.is_point() {
                continue;
            }
            let (x, width) = self.layout.span_of(region);
            let color = rgba_from_hex(&region.color);
            canvas.shadow_rect(x, track_y, width, s.domain_height, color, self.shadow_offset());
            if width > s.label_min_box_width && !label.is_empty() {
                canvas.text(
                    self.measurer,
                    label,
                    s.domain_font_size,
                    x + width / 2.0,
                    baseline,
                    Anchor::Middle,
                    WHITE.opaque(),
                );
            }
        }
    }

    fn axis(&self, canvas: &mut Canvas) {
        let s = self.settings;
        let layout = self.layout;
        let y = layout.axis_y;
        let grey = AXIS_GREY.opaque();
        let tick_bottom = y + s.axis_height / 3.0;
        canvas.hline(s.padding, layout.canvas_width - s.padding, y, self.pt, grey);
        canvas.vline(s.padding, y, tick_bottom, self.pt, grey);
        for tick in layout.axis_ticks(layout.axis_spacing(s)) {
            canvas.vline(tick.x, y, tick_bottom, self.pt, grey);
            canvas.text(
                self.measurer,
                &tick.position.to_string(),
                s.axis_font_size,
                tick.x,
                y + s.axis_height,
                Anchor::Middle,
                TEXT_BLACK,
            );
        }
    }

    fn legend(&self, canvas: &mut Canvas) {
        let s = self.settings;
        let Some(entries) = &self.layout.legend else {
            return;
        };
        let swatch = 12.0 * self.pt;
        let mut y = self.layout.legend_y;
        for entry in entries {
            y += s.legend_row_height;
            let x = 4.0 * self.pt;
            if entry.is_disorder {
                canvas.fill_rect(x, y, swatch, swatch, DISORDER_FILL);
            } else {
                let color = rgba_from_hex(&entry.color);
                canvas.shadow_rect(x, y, swatch, swatch, color, self.shadow_offset());
            }
            canvas.text(
                self.measurer,
                &entry.label,
                s.domain_font_size,
                20.0 * self.pt,
                y + swatch,
                Anchor::Start,
                TEXT_BLACK,
            );
        }
    }
}

pub fn render_png(
    layout: &Layout,
    features: &FeatureSet,
    settings: &Settings,
    measurer: &dyn TextMeasurer,
) -> RgbaImage {
    let painter = PngPainter {
        layout,
        features,
        settings,
        measurer,
        pt: settings.dpi_scale(),
    };
    let mut canvas = Canvas::new(layout.canvas_width, layout.canvas_height);
    painter.lollipops(&mut canvas);
    painter.backbone(&mut canvas);
    painter.motifs(&mut canvas);
    painter.regions(&mut canvas);
    if !settings.hide_axis {
        painter.axis(&mut canvas);
    }
    painter.legend(&mut canvas);
    canvas.img
}

/// Encodes the whole image before anything reaches `out`.
pub fn write_png(
    out: &mut dyn Write,
    layout: &Layout,
    features: &FeatureSet,
    settings: &Settings,
    measurer: &dyn TextMeasurer,
) -> Result<()> {
    let img = render_png(layout, features, settings, measurer);
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    out.write_all(&bytes)?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        protein_features::Feature,
        text_measure::{GlyphBitmap, HeuristicMeasurer},
    };

    /// Every text is 10px wide and consists of one 2x2 glyph, one pixel right of the
    /// pen and three above the baseline, with one half-covered pixel.
    struct SquareGlyph;

    impl TextMeasurer for SquareGlyph {
        fn measure(&self, _text: &str, _size_px: f64) -> f64 {
            10.0
        }

        fn glyphs(&self, _text: &str, _size_px: f64) -> Vec<GlyphBitmap> {
            vec![GlyphBitmap {
                left: 1,
                top: -3,
                width: 2,
                height: 2,
                coverage: vec![255, 128, 0, 255],
            }]
        }
    }

    fn features() -> FeatureSet {
        let mut set = FeatureSet::new(400);
        set.regions
            .push(Feature::new(100, 200, "#2dcf00", "Kinase", "pfama"));
        set
    }

    fn draw(settings: &Settings, changes: &[&str]) -> (Layout, RgbaImage) {
        let set = features();
        let layout = Layout::build(&set, changes, settings, &HeuristicMeasurer).unwrap();
        let img = render_png(&layout, &set, settings, &HeuristicMeasurer);
        (layout, img)
    }

    fn wide() -> Settings {
        Settings {
            graphic_width: 430.0,
            ..Default::default()
        }
    }

    #[test]
    fn image_matches_canvas_size() {
        let (layout, img) = draw(&wide(), &["R273C"]);
        assert_eq!(img.width(), 430);
        assert_eq!(img.height(), layout.canvas_height.round() as u32);
        assert_eq!(*img.get_pixel(0, 0), WHITE.opaque());
    }

    #[test]
    fn backbone_domain_and_lollipop_colours() {
        let (layout, img) = draw(&wide(), &["R273C"]);
        let mid_y = (layout.track_y + 12.0) as u32;
        // backbone left of the domain
        assert_eq!(*img.get_pixel(50, mid_y), BACKBONE_GREY.opaque());
        // domain body; the heuristic measurer draws no glyphs
        assert_eq!(*img.get_pixel(160, mid_y), Rgba([0x2d, 0xcf, 0x00, 255]));
        let pop = layout.lollipops().next().unwrap();
        assert_eq!(
            *img.get_pixel(pop.x.round() as u32, pop.y.round() as u32),
            Rgba([255, 0, 0, 255])
        );
    }

    #[test]
    fn regions_cast_a_shadow() {
        let (layout, img) = draw(&wide(), &[]);
        let below = (layout.track_y + 24.0 + 1.0) as u32;
        let shadowed = img.get_pixel(160, below);
        assert!(shadowed[0] < 255);
        assert_eq!(shadowed[0], shadowed[1]);
    }

    #[test]
    fn higher_dpi_scales_the_image() {
        let base = wide();
        let (_, small) = draw(&base, &["R273C"]);
        let (_, large) = draw(&base.for_dpi(144.0).unwrap(), &["R273C"]);
        assert_eq!(large.width(), small.width() * 2);
        assert_eq!(large.height(), small.height() * 2);
    }

    #[test]
    fn filled_circle_is_symmetric() {
        let mut canvas = Canvas::new(21.0, 21.0);
        canvas.fill_circle(10.0, 10.0, 5.0, TEXT_BLACK);
        let black = |x, y| *canvas.img.get_pixel(x, y) == TEXT_BLACK;
        assert!(black(10, 10));
        assert!(black(15, 10) && black(5, 10) && black(10, 5) && black(10, 15));
        assert!(!black(16, 10) && !black(4, 10));
        assert!(!black(15, 15) && !black(5, 5));
    }

    #[test]
    fn translucent_fill_blends_over_white() {
        let mut canvas = Canvas::new(4.0, 4.0);
        canvas.fill_rect(0.0, 0.0, 2.0, 2.0, DISORDER_FILL);
        let px = canvas.img.get_pixel(1, 1);
        assert_eq!(px[0], 217);
        assert_eq!(px[3], 255);
        assert_eq!(*canvas.img.get_pixel(3, 3), WHITE.opaque());
    }

    #[test]
    fn glyphs_land_relative_to_pen_and_baseline() {
        let mut canvas = Canvas::new(20.0, 20.0);
        canvas.text(&SquareGlyph, "x", 10.0, 5.0, 10.0, Anchor::Start, TEXT_BLACK);
        let px = |x, y| *canvas.img.get_pixel(x, y);
        assert_eq!(px(6, 7), TEXT_BLACK);
        assert_eq!(px(7, 8), TEXT_BLACK);
        assert_eq!(px(6, 8), WHITE.opaque());
        assert_eq!(px(5, 7), WHITE.opaque());
        assert_eq!(px(6, 6), WHITE.opaque());
    }

    #[test]
    fn middle_anchor_centres_on_measured_width() {
        let mut canvas = Canvas::new(20.0, 20.0);
        // 10px wide text centred on x=12 starts at x=7
        canvas.text(&SquareGlyph, "x", 10.0, 12.0, 10.0, Anchor::Middle, TEXT_BLACK);
        let px = |x, y| *canvas.img.get_pixel(x, y);
        assert_eq!(px(8, 7), TEXT_BLACK);
        assert_eq!(px(9, 8), TEXT_BLACK);
        assert_eq!(px(6, 7), WHITE.opaque());
    }

    #[test]
    fn partial_coverage_blends_towards_text_colour() {
        let mut canvas = Canvas::new(20.0, 20.0);
        let red = Rgba([255, 0, 0, 255]);
        canvas.text(&SquareGlyph, "x", 10.0, 5.0, 10.0, Anchor::Start, red);
        assert_eq!(*canvas.img.get_pixel(6, 7), red);
        let half = *canvas.img.get_pixel(7, 7);
        assert_eq!(half, Rgba([255, 127, 127, 255]));
    }

    #[test]
    fn domain_labels_are_drawn_in_white() {
        let set = features();
        let settings = wide();
        let layout = Layout::build(&set, &[] as &[&str], &settings, &SquareGlyph).unwrap();
        assert_eq!(layout.domain_labels, vec!["Kinase".to_string()]);
        let img = render_png(&layout, &set, &settings, &SquareGlyph);
        // label centred on x=165 starts at 160; baseline at 15 + (24 + 8.4) / 2
        assert_eq!(*img.get_pixel(161, 28), WHITE.opaque());
        assert_eq!(*img.get_pixel(150, 28), Rgba([0x2d, 0xcf, 0x00, 255]));
    }

    #[test]
    fn write_png_emits_a_png_stream() {
        let set = features();
        let settings = wide();
        let layout = Layout::build(&set, &["R273C"], &settings, &HeuristicMeasurer).unwrap();
        let mut out = Vec::new();
        write_png(&mut out, &layout, &set, &settings, &HeuristicMeasurer).unwrap();
        assert_eq!(&out[..8], b"\x89PNG\r\n\x1a\n");
    }
}
