//! Turns a feature set and merged mutations into final diagram geometry: canvas size,
//! lollipop stacking, domain labels and the merged, sorted tick sequence used for
//! the position axis.

use crate::{
    MOTIF_NAMES,
    colors::blend_with_white,
    error::Result,
    label_fit::LabelFitter,
    mutation::{Mutation, parse_changelist},
    protein_features::{Feature, FeatureSet, PFAMB_MOTIF},
    settings::Settings,
    text_measure::TextMeasurer,
};
use std::cmp::Ordering;
use tracing::debug;

pub const PRIORITY_START: i64 = 0;
pub const PRIORITY_MOTIF: i64 = 1;
pub const PRIORITY_REGION: i64 = 5;
pub const PRIORITY_LOLLIPOP: i64 = 10;
pub const PRIORITY_END: i64 = 99;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Tick {
    pub position: i64,
    pub priority: i64,
    pub count: u32,
    pub color: String,
    pub is_lollipop: bool,
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

impl Tick {
    fn boundary(position: i64, priority: i64, x: f64) -> Self {
        Self {
            position,
            priority,
            x,
            ..Default::default()
        }
    }

    /// Label text including the merged count, e.g. `R273C (3)`.
    pub fn display_label(&self) -> String {
        if self.count > 1 {
            format!("{} ({})", self.label, self.count)
        } else {
            self.label.clone()
        }
    }
}

/// Position ascending, higher priority first on equal positions.
pub fn tick_order(a: &Tick, b: &Tick) -> Ordering {
    a.position
        .cmp(&b.position)
        .then_with(|| b.priority.cmp(&a.priority))
}

/// First tick at or after `i` (and no further than `max_dist` positions away) with a
/// strictly higher priority than tick `i`; `i` itself if there is none.
pub fn next_better(ticks: &[Tick], i: usize, max_dist: i64) -> usize {
    for (j, tick) in ticks.iter().enumerate().skip(i) {
        if tick.position - ticks[i].position > max_dist {
            return i;
        }
        if tick.priority > ticks[i].priority {
            return j;
        }
    }
    i
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LegendEntry {
    pub label: String,
    pub color: String,
    pub is_disorder: bool,
}

#[derive(Clone, Debug)]
pub struct Layout {
    pub ticks: Vec<Tick>,
    /// One entry per region, in region order; empty when no label is shown.
    pub domain_labels: Vec<String>,
    pub canvas_width: f64,
    pub canvas_height: f64,
    pub content_start_y: f64,
    pub legend: Option<Vec<LegendEntry>>,

    pub sequence_length: i64,
    pub scale: f64,
    pub padding: f64,
    /// Y of the lollipop stems' lower end.
    pub stem_bottom: f64,
    /// Top of the domain row; the backbone and motifs are centred in it.
    pub track_y: f64,
    pub axis_y: f64,
    pub legend_y: f64,
}

pub fn is_visible_motif(motif: &Feature, settings: &Settings) -> bool {
    !settings.hide_motifs
        && motif.kind != PFAMB_MOTIF
        && !(motif.is_disorder() && settings.hide_disordered)
        && !motif.is_point()
}

/// Narrowest canvas (at least `min_auto_width`) in which every region's short text fits.
pub fn auto_width(features: &FeatureSet, settings: &Settings, measurer: &dyn TextMeasurer) -> f64 {
    let length = features.length as f64;
    let width = features
        .regions
        .iter()
        .filter(|r| !r.is_point())
        .map(|r| {
            let aa_part = r.span() as f64 / length;
            let min_text_width = measurer.measure(&r.text, settings.domain_font_size)
                + settings.text_padding * 2.0
                + 1.0;
            min_text_width / aa_part
        })
        .fold(settings.min_auto_width, f64::max);
    width + settings.padding * 2.0
}

fn add_legend_entry(legend: &mut Vec<LegendEntry>, key: &str, color: String) {
    if key.is_empty() {
        return;
    }
    let label = MOTIF_NAMES.get(key).copied().unwrap_or(key).to_string();
    let is_disorder = key == crate::protein_features::DISORDER_MOTIF;
    match legend.iter_mut().find(|e| e.label == label) {
        Some(entry) => entry.color = color,
        None => legend.push(LegendEntry {
            label,
            color,
            is_disorder,
        }),
    }
}

impl Layout {
    /// Parses `changelist` and lays out the diagram.
    pub fn build<S: AsRef<str>>(
        features: &FeatureSet,
        changelist: &[S],
        settings: &Settings,
        measurer: &dyn TextMeasurer,
    ) -> Result<Self> {
        features.validate()?;
        let mutations = parse_changelist(
            changelist,
            features.length,
            &settings.synonymous_color,
            &settings.mutation_color,
        )?;
        Self::compute_validated(features, &mutations, settings, measurer)
    }

    pub fn compute(
        features: &FeatureSet,
        mutations: &[Mutation],
        settings: &Settings,
        measurer: &dyn TextMeasurer,
    ) -> Result<Self> {
        features.validate()?;
        Self::compute_validated(features, mutations, settings, measurer)
    }

    fn compute_validated(
        features: &FeatureSet,
        mutations: &[Mutation],
        settings: &Settings,
        measurer: &dyn TextMeasurer,
    ) -> Result<Self> {
        settings.validate()?;

        let canvas_width = if settings.graphic_width > 0.0 {
            settings.graphic_width
        } else {
            auto_width(features, settings, measurer)
        };
        let scale = (canvas_width - settings.padding * 2.0) / features.length as f64;
        let pop_space = ((settings.lollipop_radius + 2.0) / scale).floor() as i64;
        debug!(canvas_width, scale, pop_space, "resolved diagram scale");

        let mut start_y = settings.padding;
        let mut canvas_height = settings.domain_height + settings.padding * 2.0;
        if settings.show_labels {
            start_y += settings.padding;
            canvas_height += settings.padding;
        }

        let mut pops = mutations.to_vec();
        pops.sort_by(|a, b| {
            a.position
                .cmp(&b.position)
                .then_with(|| b.priority.cmp(&a.priority))
        });
        let stagger: Vec<f64> = pops
            .iter()
            .enumerate()
            .map(|(i, pop)| {
                pops[i + 1..]
                    .iter()
                    .take_while(|next| next.position - pop.position <= pop_space)
                    .map(|next| 0.5 + next.radius(settings.lollipop_radius) * 3.0)
                    .sum()
            })
            .collect();

        let lollipop_base = settings.lollipop_radius + settings.lollipop_height;
        if !pops.is_empty() {
            let max_staggered = lollipop_base + stagger.iter().copied().fold(0.0, f64::max);
            canvas_height += max_staggered;
            start_y += max_staggered - lollipop_base;
        }
        if !settings.hide_axis {
            canvas_height += settings.axis_padding + settings.axis_height;
        }

        let pop_top = start_y + settings.lollipop_radius;
        let stem_bottom = pop_top + settings.lollipop_height;
        let track_y = if pops.is_empty() {
            start_y
        } else {
            stem_bottom - (settings.domain_height - settings.backbone_height) / 2.0
        };
        let x_for = |position: i64| settings.padding + position as f64 * scale;

        let mut ticks = vec![
            Tick::boundary(0, PRIORITY_START, x_for(0)),
            Tick::boundary(features.length, PRIORITY_END, x_for(features.length)),
        ];
        ticks.extend(pops.iter().zip(&stagger).map(|(pop, offset)| Tick {
            position: pop.position,
            priority: PRIORITY_LOLLIPOP,
            count: pop.count,
            color: pop.color.clone(),
            is_lollipop: true,
            label: pop.label.clone(),
            x: x_for(pop.position),
            y: pop_top - offset,
            radius: pop.radius(settings.lollipop_radius),
        }));

        let mut legend = settings.show_legend.then(Vec::new);

        for motif in features.motifs.iter().filter(|m| is_visible_motif(m, settings)) {
            if !motif.is_disorder() {
                ticks.push(Tick::boundary(motif.start, PRIORITY_MOTIF, x_for(motif.start)));
                ticks.push(Tick::boundary(motif.end, PRIORITY_MOTIF, x_for(motif.end)));
            }
            if let Some(legend) = legend.as_mut() {
                add_legend_entry(legend, &motif.kind, blend_with_white(&motif.color));
            }
        }

        let fitter = LabelFitter {
            style: settings.domain_label_style,
            font_size: settings.domain_font_size,
            text_padding: settings.text_padding,
            truncate_min_width: settings.truncate_min_width,
            measurer,
        };
        let mut domain_labels = Vec::with_capacity(features.regions.len());
        for region in &features.regions {
            if region.is_point() {
                domain_labels.push(String::new());
                continue;
            }
            ticks.push(Tick::boundary(region.start, PRIORITY_REGION, x_for(region.start)));
            ticks.push(Tick::boundary(region.end, PRIORITY_REGION, x_for(region.end)));

            let box_width = region.span() as f64 * scale;
            let label = if box_width > settings.label_min_box_width {
                fitter.fit(box_width, region.description(), &region.text)
            } else {
                String::new()
            };
            if let Some(legend) = legend.as_mut() {
                if label != region.description() {
                    add_legend_entry(legend, region.description(), region.color.clone());
                }
            }
            domain_labels.push(label);
        }

        if let Some(legend) = &legend {
            canvas_height += (1 + legend.len()) as f64 * settings.legend_row_height;
        }

        ticks.sort_by(tick_order);

        let axis_y = track_y + settings.domain_height + settings.axis_padding;
        let legend_y = if settings.hide_axis {
            track_y + settings.domain_height
        } else {
            axis_y + settings.axis_height
        };

        Ok(Self {
            ticks,
            domain_labels,
            canvas_width,
            canvas_height,
            content_start_y: start_y,
            legend,
            sequence_length: features.length,
            scale,
            padding: settings.padding,
            stem_bottom,
            track_y,
            axis_y,
            legend_y,
        })
    }

    pub fn x_for(&self, position: i64) -> f64 {
        self.padding + position as f64 * self.scale
    }

    /// Left edge and width of a feature.
    pub fn span_of(&self, feature: &Feature) -> (f64, f64) {
        let x = self.x_for(feature.start);
        (x, self.x_for(feature.end) - x)
    }

    pub fn lollipops(&self) -> impl Iterator<Item = &Tick> {
        self.ticks.iter().filter(|t| t.is_lollipop)
    }

    /// Minimum distance between axis labels, in sequence positions.
    pub fn axis_spacing(&self, settings: &Settings) -> i64 {
        (settings.axis_label_spacing / self.scale).round() as i64
    }

    /// Thins the tick sequence for axis labelling: a tick is dropped when it is too
    /// close to the last drawn one, or when a higher priority tick follows within
    /// `aa_space` positions.
    pub fn axis_ticks(&self, aa_space: i64) -> Vec<&Tick> {
        let mut ret = vec![];
        let mut last_drawn: Option<i64> = None;
        for (i, tick) in self.ticks.iter().enumerate() {
            if let Some(last) = last_drawn {
                if tick.position - last < aa_space.max(1) {
                    continue;
                }
            }
            if next_better(&self.ticks, i, aa_space) != i {
                continue;
            }
            last_drawn = Some(tick.position);
            ret.push(tick);
        }
        ret
    }
}
