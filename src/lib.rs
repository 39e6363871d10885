use lazy_static::lazy_static;
use std::collections::HashMap;

pub mod colors;
pub mod error;
pub mod label_fit;
pub mod layout;
pub mod mutation;
pub mod protein_features;
pub mod render;
pub mod render_png;
pub mod render_svg;
pub mod settings;
pub mod text_measure;

pub use error::{LollipopError, Result};
pub use layout::Layout;
pub use protein_features::{Feature, FeatureSet};
pub use render::{OutputFormat, draw};
pub use settings::{DomainLabelStyle, Settings};
pub use text_measure::{HeuristicMeasurer, TextMeasurer};

lazy_static! {
    // Human-readable motif names for the legend, after the Pfam help pages
    pub static ref MOTIF_NAMES: HashMap<&'static str, &'static str> = HashMap::from([
        ("disorder", "Disordered region"),
        ("low_complexity", "Low complexity region"),
        ("sig_p", "Signal peptide region"),
        ("coiled_coil", "Coiled-coil motif"),
        ("transmembrane", "Transmembrane region"),
    ]);
}
