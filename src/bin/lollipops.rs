use anyhow::{Context, Result, bail};
use clap::Parser;
use lollipops::{
    DomainLabelStyle, FeatureSet, OutputFormat, Settings, draw, settings::BASE_DPI,
    text_measure::load_measurer,
};
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Draws a lollipop diagram of protein changes over a protein's domain structure.
///
/// Changes look like `R273C`, `T125@5` (5 occurrences) or `R248Q#00ff00` (custom
/// colour). A `.png` output file selects raster output, anything else SVG.
#[derive(Parser, Debug)]
#[command(name = "lollipops", version, about)]
struct Cli {
    /// Pfam-style graphic JSON describing the protein's length, motifs and regions
    #[arg(short = 'F', long = "features", value_name = "FILE")]
    features: PathBuf,

    /// JSON file overriding default settings; flags are applied on top
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Output file
    #[arg(short, long, value_name = "FILE", default_value = "lollipop.svg")]
    output: PathBuf,

    /// Diagram width in pixels (0 fits the domain labels)
    #[arg(short, long)]
    width: Option<f64>,

    /// Resolution for PNG output
    #[arg(long, default_value_t = BASE_DPI)]
    dpi: f64,

    /// TrueType font used for text measurement and PNG text
    #[arg(short = 'f', long, value_name = "FILE")]
    font: Option<PathBuf>,

    /// Draw a legend of domain and motif colours
    #[arg(long)]
    legend: bool,

    /// Draw the change label above each lollipop
    #[arg(long)]
    labels: bool,

    #[arg(long)]
    show_disordered: bool,

    #[arg(long)]
    show_motifs: bool,

    #[arg(long)]
    hide_axis: bool,

    /// Flat fills only, no hatch patterns
    #[arg(long)]
    no_patterns: bool,

    /// Domain label style: off, fit or truncate
    #[arg(long, value_name = "STYLE")]
    domain_labels: Option<String>,

    /// Colour of synonymous changes
    #[arg(long, value_name = "COLOR")]
    syn_color: Option<String>,

    /// Colour of non-synonymous changes
    #[arg(long, value_name = "COLOR")]
    mut_color: Option<String>,

    /// Protein changes to draw
    changes: Vec<String>,
}

impl Cli {
    fn settings(&self) -> Result<Settings> {
        let mut settings = match &self.settings {
            Some(path) => Settings::load_from_path(path)?,
            None => Settings {
                hide_disordered: true,
                hide_motifs: true,
                ..Default::default()
            },
        };
        settings.show_legend |= self.legend;
        settings.show_labels |= self.labels;
        settings.hide_axis |= self.hide_axis;
        settings.solid_fill_only |= self.no_patterns;
        if self.show_disordered {
            settings.hide_disordered = false;
        }
        if self.show_motifs {
            settings.hide_motifs = false;
        }
        if let Some(width) = self.width {
            settings.graphic_width = width;
        }
        if let Some(style) = &self.domain_labels {
            settings.domain_label_style = match DomainLabelStyle::parse(style) {
                Some(style) => style,
                None => bail!("unknown domain label style '{style}' (expected off, fit or truncate)"),
            };
        }
        if let Some(color) = &self.syn_color {
            settings.synonymous_color = color.clone();
        }
        if let Some(color) = &self.mut_color {
            settings.mutation_color = color.clone();
        }
        settings.validate()?;
        Ok(settings)
    }
}

fn run(cli: &Cli) -> Result<()> {
    let settings = cli.settings()?;
    let features = FeatureSet::from_json_file(&cli.features)?;
    let measurer = load_measurer(cli.font.as_deref())?;
    let format = OutputFormat::from_path(&cli.output);

    // render fully before creating the output file so input errors leave nothing behind
    let mut bytes = Vec::new();
    draw(
        &mut bytes,
        format,
        cli.dpi,
        &features,
        cli.changes.as_slice(),
        &settings,
        measurer.as_ref(),
    )?;

    let file = File::create(&cli.output)
        .with_context(|| format!("could not create '{}'", cli.output.display()))?;
    let mut out = BufWriter::new(file);
    out.write_all(&bytes)
        .and_then(|_| out.flush())
        .with_context(|| format!("could not write '{}'", cli.output.display()))?;
    info!(
        output = %cli.output.display(),
        format = format.extension(),
        changes = cli.changes.len(),
        "diagram written"
    );
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("lollipops: {e:#}");
        std::process::exit(1);
    }
}
