//! Normalized protein annotation: sequence length plus ordered motif and region features.

use crate::{
    colors::Rgb,
    error::{LollipopError, Result},
};
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, PickFirst, serde_as};
use std::path::Path;

pub const PFAM_LEGACY_URL: &str = "http://pfam-legacy.xfam.org";
pub const DISORDER_MOTIF: &str = "disorder";
pub const PFAMB_MOTIF: &str = "pfamb";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureMetadata {
    pub description: String,
    pub identifier: String,
}

#[serde_as]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Feature {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub start: i64,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub end: i64,
    #[serde(rename = "colour")]
    pub color: String,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "href", skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    pub metadata: FeatureMetadata,
}

impl Feature {
    pub fn new(start: i64, end: i64, color: &str, text: &str, kind: &str) -> Self {
        Self {
            start,
            end,
            color: color.to_string(),
            text: text.to_string(),
            kind: kind.to_string(),
            link: None,
            metadata: FeatureMetadata::default(),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.metadata.description = description.to_string();
        self
    }

    pub fn with_link(mut self, link: &str) -> Self {
        self.link = Some(link.to_string());
        self
    }

    pub fn description(&self) -> &str {
        &self.metadata.description
    }

    pub fn identifier(&self) -> &str {
        &self.metadata.identifier
    }

    /// Zero-width features are kept in the model but never laid out.
    pub fn is_point(&self) -> bool {
        self.start == self.end
    }

    pub fn span(&self) -> i64 {
        self.end - self.start
    }

    pub fn is_disorder(&self) -> bool {
        self.kind == DISORDER_MOTIF
    }

    fn validate(&self, what: &str, index: usize, length: i64) -> Result<()> {
        if self.start > self.end {
            return Err(LollipopError::Data(format!(
                "{what} #{index} '{}' starts at {} after its end {}",
                self.text, self.start, self.end
            )));
        }
        if self.start < 0 {
            return Err(LollipopError::Data(format!(
                "{what} #{index} '{}' has negative start {}",
                self.text, self.start
            )));
        }
        if self.end > length {
            return Err(LollipopError::Data(format!(
                "{what} #{index} '{}' ends at {} beyond the sequence length {length}",
                self.text, self.end
            )));
        }
        if Rgb::parse(&self.color).is_none() {
            return Err(LollipopError::Data(format!(
                "{what} #{index} '{}' has invalid colour '{}'",
                self.text, self.color
            )));
        }
        Ok(())
    }

    fn absolutize_link(&mut self) {
        if let Some(link) = self.link.as_mut() {
            if !link.is_empty() && !link.contains("://") {
                *link = format!("{PFAM_LEGACY_URL}{link}");
            }
        }
    }
}

#[serde_as]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureSet {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub length: i64,
    pub metadata: FeatureMetadata,
    pub motifs: Vec<Feature>,
    pub regions: Vec<Feature>,
}

impl FeatureSet {
    pub fn new(length: i64) -> Self {
        Self {
            length,
            ..Default::default()
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let mut ret: FeatureSet = serde_json::from_str(text)
            .map_err(|e| LollipopError::Data(format!("could not parse feature JSON: {e}")))?;
        ret.motifs.iter_mut().for_each(Feature::absolutize_link);
        ret.regions.iter_mut().for_each(Feature::absolutize_link);
        Ok(ret)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            LollipopError::Data(format!("could not read feature file '{}': {e}", path.display()))
        })?;
        Self::from_json_str(&text)
    }

    pub fn description(&self) -> &str {
        &self.metadata.description
    }

    pub fn identifier(&self) -> &str {
        &self.metadata.identifier
    }

    pub fn validate(&self) -> Result<()> {
        if self.length <= 0 {
            return Err(LollipopError::Data(format!(
                "sequence length must be positive, got {}",
                self.length
            )));
        }
        for (index, motif) in self.motifs.iter().enumerate() {
            motif.validate("motif", index, self.length)?;
        }
        for (index, region) in self.regions.iter().enumerate() {
            region.validate("region", index, self.length)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const TP53_LIKE: &str = r##"{
        "length": "393",
        "metadata": {"identifier": "P53_HUMAN", "description": "Cellular tumor antigen p53"},
        "motifs": [
            {"colour": "#ff9c00", "text": "", "type": "disorder", "start": 1, "end": 60},
            {"colour": "#9cff00", "text": "", "type": "coiled_coil", "start": "320", "end": "355"}
        ],
        "regions": [
            {"colour": "#2dcf00", "text": "P53", "type": "pfama", "start": 95, "end": 288,
             "href": "/family/PF00870", "metadata": {"description": "P53 DNA-binding domain", "identifier": "P53"}},
            {"colour": "#ff5353", "text": "P53_tetramer", "type": "pfama", "start": 318, "end": 358,
             "href": "https://www.ebi.ac.uk/interpro/entry/pfam/PF07710"}
        ]
    }"##;

    #[test]
    fn parses_graphic_json_with_string_numbers() {
        let set = FeatureSet::from_json_str(TP53_LIKE).unwrap();
        assert_eq!(set.length, 393);
        assert_eq!(set.identifier(), "P53_HUMAN");
        assert_eq!(set.motifs.len(), 2);
        assert_eq!(set.motifs[1].start, 320);
        assert!(set.motifs[0].is_disorder());
        assert_eq!(set.regions[0].description(), "P53 DNA-binding domain");
        assert!(set.validate().is_ok());
    }

    #[test]
    fn relative_links_point_to_pfam() {
        let set = FeatureSet::from_json_str(TP53_LIKE).unwrap();
        assert_eq!(
            set.regions[0].link.as_deref(),
            Some("http://pfam-legacy.xfam.org/family/PF00870")
        );
        assert_eq!(
            set.regions[1].link.as_deref(),
            Some("https://www.ebi.ac.uk/interpro/entry/pfam/PF07710")
        );
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(TP53_LIKE.as_bytes()).unwrap();
        let set = FeatureSet::from_json_file(file.path()).unwrap();
        assert_eq!(set.regions.len(), 2);
        assert!(FeatureSet::from_json_file("/nonexistent/features.json").is_err());
    }

    #[test]
    fn rejects_non_positive_length() {
        let set = FeatureSet::new(0);
        assert!(matches!(set.validate(), Err(LollipopError::Data(_))));
        let set = FeatureSet::new(-5);
        assert!(set.validate().is_err());
    }

    #[test]
    fn rejects_inverted_features() {
        let mut set = FeatureSet::new(100);
        set.regions.push(Feature::new(50, 40, "#ff0000", "Backwards", "pfama"));
        let err = set.validate().unwrap_err();
        assert!(err.to_string().contains("Backwards"));
    }

    #[test]
    fn rejects_features_past_the_sequence_end() {
        let mut set = FeatureSet::new(100);
        set.regions.push(Feature::new(90, 100, "#ff0000", "Tail", "pfama"));
        assert!(set.validate().is_ok());
        set.motifs.push(Feature::new(95, 120, "#00ff00", "", "coiled_coil"));
        let err = set.validate().unwrap_err();
        assert!(matches!(err, LollipopError::Data(_)));
        assert!(err.to_string().contains("beyond the sequence length 100"));
    }

    #[test]
    fn point_features_are_flagged() {
        let feature = Feature::new(12, 12, "#ff0000", "site", "motif");
        assert!(feature.is_point());
        assert_eq!(feature.span(), 0);
    }
}
