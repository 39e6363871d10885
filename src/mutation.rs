//! Parsing of user supplied protein change tokens such as `R273C`, `T125@5` or
//! `R248Q#00ff00@131` into merged lollipop markers.

use crate::{
    colors::Rgb,
    error::{LollipopError, Result},
};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

lazy_static! {
    static ref CHANGE_POSITION: Regex =
        Regex::new(r"(?P<from>[A-Za-z]*)(?P<pos>[0-9]+)(?P<to>[A-Za-z]+|=)?").unwrap();
    static ref DIGIT_RUN: Regex = Regex::new(r"[0-9]+").unwrap();
}

/// One parsed changelist entry, before merging.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MutationToken {
    pub position: i64,
    pub count: u32,
    pub color_override: Option<String>,
    pub is_synonymous: bool,
    pub raw_label: String,
}

impl MutationToken {
    pub fn parse(token: &str) -> Result<Self> {
        let mut change = token.trim();

        let mut count = 1;
        if let Some((head, tail)) = change.split_once('@') {
            let digits: String = tail.chars().take_while(char::is_ascii_digit).collect();
            count = digits
                .parse::<u32>()
                .map_err(|_| LollipopError::parse(token, "count after '@' is not a number"))?;
            if count == 0 {
                return Err(LollipopError::parse(token, "count must be at least 1"));
            }
            change = head;
        }

        let mut color_override = None;
        if let Some((head, tail)) = change.split_once('#') {
            let color = Rgb::parse(tail)
                .ok_or_else(|| LollipopError::parse(token, format!("invalid colour '#{tail}'")))?;
            color_override = Some(color.to_hex().to_ascii_lowercase());
            change = head;
        }

        match DIGIT_RUN.find_iter(change).count() {
            0 => return Err(LollipopError::parse(token, "no codon position found")),
            1 => {}
            _ => return Err(LollipopError::parse(token, "more than one codon position")),
        }
        let caps = CHANGE_POSITION
            .captures(change)
            .ok_or_else(|| LollipopError::parse(token, "no codon position found"))?;
        let position = caps["pos"]
            .parse::<i64>()
            .map_err(|_| LollipopError::parse(token, "codon position out of range"))?;
        if position < 1 {
            return Err(LollipopError::parse(token, "codon position must be at least 1"));
        }

        let from = caps.name("from").map_or("", |m| m.as_str());
        let to = caps.name("to").map_or("", |m| m.as_str());
        let is_synonymous = to.is_empty() || to == "=" || to == from;

        Ok(Self {
            position,
            count,
            color_override,
            is_synonymous,
            raw_label: change.to_string(),
        })
    }

    /// Marker colour: explicit override, otherwise the (non-)synonymous default.
    pub fn resolved_color(&self, synonymous_color: &str, mutation_color: &str) -> String {
        match &self.color_override {
            Some(color) => color.clone(),
            None if self.is_synonymous => synonymous_color.to_ascii_lowercase(),
            None => mutation_color.to_ascii_lowercase(),
        }
    }
}

/// A merged lollipop: every token with the same change text and colour.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mutation {
    pub position: i64,
    pub count: u32,
    pub color: String,
    pub label: String,
    /// `-index` of the first token that produced this marker.
    pub priority: i64,
}

impl Mutation {
    /// Marker radius grows with `sqrt(ln(2 + count))`, so the area is logarithmic in count.
    pub fn radius(&self, base_radius: f64) -> f64 {
        marker_radius(self.count, base_radius)
    }
}

pub fn marker_radius(count: u32, base_radius: f64) -> f64 {
    if count <= 1 {
        return base_radius;
    }
    ((2.0 + f64::from(count)).ln() * base_radius * base_radius).sqrt()
}

/// Parses a changelist and merges duplicates. Empty entries are skipped, any
/// malformed token aborts. Positions beyond `sequence_length` are rejected.
pub fn parse_changelist<S: AsRef<str>>(
    changelist: &[S],
    sequence_length: i64,
    synonymous_color: &str,
    mutation_color: &str,
) -> Result<Vec<Mutation>> {
    let mut ret: Vec<Mutation> = vec![];
    let mut seen: HashMap<(String, String), usize> = HashMap::new();
    for (index, token) in changelist.iter().enumerate() {
        let token = token.as_ref();
        if token.trim().is_empty() {
            continue;
        }
        let parsed = MutationToken::parse(token)?;
        if parsed.position > sequence_length {
            return Err(LollipopError::parse(
                token,
                format!("codon {} is beyond the protein length {sequence_length}", parsed.position),
            ));
        }
        let color = parsed.resolved_color(synonymous_color, mutation_color);
        let key = (parsed.raw_label.clone(), color.clone());
        match seen.get(&key) {
            Some(&idx) => {
                let merged = &mut ret[idx];
                merged.count = merged
                    .count
                    .checked_add(parsed.count)
                    .ok_or_else(|| LollipopError::parse(token, "count overflow"))?;
            }
            None => {
                seen.insert(key, ret.len());
                ret.push(Mutation {
                    position: parsed.position,
                    count: parsed.count,
                    color,
                    label: parsed.raw_label,
                    priority: -(index as i64),
                });
            }
        }
    }
    Ok(ret)
}
