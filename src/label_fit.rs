//! Picks the text shown inside a domain block of a given pixel width.

use crate::{settings::DomainLabelStyle, text_measure::TextMeasurer};

const ELLIPSIS: &str = "..";

/// Pixel budget and text metrics for one fitting decision.
#[derive(Clone, Copy)]
pub struct LabelFitter<'a> {
    pub style: DomainLabelStyle,
    pub font_size: f64,
    pub text_padding: f64,
    pub truncate_min_width: f64,
    pub measurer: &'a dyn TextMeasurer,
}

/// Unicode general category P, restricted to ASCII; symbols such as `+` or `|` are not
/// word separators.
fn is_label_punctuation(c: char) -> bool {
    c.is_ascii_punctuation() && !matches!(c, '$' | '+' | '<' | '=' | '>' | '^' | '`' | '|' | '~')
}

impl LabelFitter<'_> {
    fn fits(&self, candidate: &str, width: f64) -> bool {
        self.measurer.measure(candidate, self.font_size) < width - self.text_padding
    }

    /// Full description if it fits, then the short text, then (truncate mode only)
    /// a shortened form of the short text. Empty when nothing is shown.
    pub fn fit(&self, width: f64, description: &str, text: &str) -> String {
        if self.style == DomainLabelStyle::Off {
            return String::new();
        }
        if description.chars().count() > 1 && self.fits(description, width) {
            return description.to_string();
        }
        if self.fits(text, width) {
            return text.to_string();
        }
        if self.style != DomainLabelStyle::Truncate {
            return String::new();
        }
        if let Some(label) = self.fit_word(width, text) {
            return label;
        }
        if width > self.truncate_min_width {
            return self.fit_prefix(width, text);
        }
        String::new()
    }

    /// The last word is usually the most informative one ("P53_tetramer" -> "..tetramer"),
    /// so words are tried from the end.
    fn fit_word(&self, width: f64, text: &str) -> Option<String> {
        if !text.chars().any(is_label_punctuation) {
            return None;
        }
        let words: Vec<&str> = text
            .split(is_label_punctuation)
            .filter(|w| !w.is_empty())
            .collect();
        let mut suffix = "";
        for (i, word) in words.iter().enumerate().rev() {
            let prefix = if i == 0 { "" } else { ELLIPSIS };
            let candidate = format!("{prefix}{word}{suffix}");
            if self.fits(&candidate, width) {
                return Some(candidate);
            }
            suffix = ELLIPSIS;
        }
        None
    }

    /// Trims characters off the end until the text plus ellipsis fits; yields the
    /// shortest attempt when nothing fits.
    fn fit_prefix(&self, width: f64, text: &str) -> String {
        let chars: Vec<char> = text.chars().collect();
        let mut ret = text.to_string();
        for keep in (1..chars.len().saturating_sub(1)).rev() {
            let head: String = chars[..keep].iter().collect();
            ret = format!("{}{ELLIPSIS}", head.trim_matches(is_label_punctuation));
            if self.fits(&ret, width) {
                break;
            }
        }
        ret
    }
}
