//! Core types for the HLV pipeline
//!
//! Option labels and evidence records flow through stages 4 and 5;
//! frames carry the per-item distributions, scores and ranks that the
//! metrics engine compares.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Canonical identifier of a multiple-choice answer slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OptionLabel {
    A,
    B,
    C,
    D,
    E,
}

impl OptionLabel {
    pub const ALL: [OptionLabel; 5] = [
        OptionLabel::A,
        OptionLabel::B,
        OptionLabel::C,
        OptionLabel::D,
        OptionLabel::E,
    ];

    pub fn as_char(self) -> char {
        match self {
            OptionLabel::A => 'A',
            OptionLabel::B => 'B',
            OptionLabel::C => 'C',
            OptionLabel::D => 'D',
            OptionLabel::E => 'E',
        }
    }

    /// Position in the alphabet (A = 0)
    pub fn index(self) -> usize {
        self as usize
    }

    /// Case-insensitive parse of a single letter
    pub fn from_char(c: char) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|label| label.as_char() == c.to_ascii_uppercase())
    }
}

impl fmt::Display for OptionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl FromStr for OptionLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::from_char(c).ok_or_else(|| s.to_string()),
            _ => Err(s.to_string()),
        }
    }
}

/// Whether a sentence argues for or against an option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Support,
    Oppose,
}

impl Sentiment {
    pub const BOTH: [Sentiment; 2] = [Sentiment::Support, Sentiment::Oppose];

    pub fn as_str(self) -> &'static str {
        match self {
            Sentiment::Support => "support",
            Sentiment::Oppose => "oppose",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supporting and opposing sentences for one option
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    #[serde(default)]
    pub support: Vec<String>,
    #[serde(default)]
    pub oppose: Vec<String>,
}

impl Evidence {
    pub fn sentences(&self, sentiment: Sentiment) -> &[String] {
        match sentiment {
            Sentiment::Support => &self.support,
            Sentiment::Oppose => &self.oppose,
        }
    }

    pub fn sentences_mut(&mut self, sentiment: Sentiment) -> &mut Vec<String> {
        match sentiment {
            Sentiment::Support => &mut self.support,
            Sentiment::Oppose => &mut self.oppose,
        }
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        for sentiment in Sentiment::BOTH {
            let sentences = self
                .sentences(sentiment)
                .iter()
                .cloned()
                .map(Value::String)
                .collect();
            map.insert(sentiment.as_str().to_string(), Value::Array(sentences));
        }
        Value::Object(map)
    }
}

/// Per-item evidence keyed by canonical label, at most one entry per label
pub type EvidenceRecord = BTreeMap<OptionLabel, Evidence>;

/// Literal answer text per label for the current item
pub type OptionTexts = BTreeMap<OptionLabel, String>;

/// Render an evidence record as a JSON object in label order
pub fn evidence_record_to_value(record: &EvidenceRecord) -> Value {
    Value::Object(
        record
            .iter()
            .map(|(label, evidence)| (label.to_string(), evidence.to_value()))
            .collect(),
    )
}

/// Discourse segmentation of one source item
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscourseRecord {
    #[serde(default)]
    pub segments: Vec<String>,
    #[serde(default)]
    pub connectives: Vec<String>,
}

impl DiscourseRecord {
    /// Lenient extraction: non-string entries and missing fields are ignored
    pub fn from_value(value: &Value) -> Self {
        let strings = |field: &str| -> Vec<String> {
            value
                .get(field)
                .and_then(Value::as_array)
                .map(|arr| {
                    arr.iter()
                        .filter_map(|v| v.as_str().map(String::from))
                        .collect()
                })
                .unwrap_or_default()
        };

        Self {
            segments: strings("segments"),
            connectives: strings("connectives"),
        }
    }

    /// Union of segments and connectives
    pub fn units(&self) -> DiscourseUnits {
        DiscourseUnits::from_spans(self.segments.iter().chain(self.connectives.iter()))
    }
}

/// Unique spans used as fuzzy-match candidates. Segments come first, then
/// connectives; the first occurrence of a duplicate keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscourseUnits(Vec<String>);

impl DiscourseUnits {
    pub fn from_spans<'a, I>(spans: I) -> Self
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut seen = HashSet::new();
        let mut units = Vec::new();
        for span in spans {
            if seen.insert(span.as_str()) {
                units.push(span.clone());
            }
        }
        Self(units)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, span: &str) -> bool {
        self.0.iter().any(|u| u == span)
    }
}

/// A comparable column of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Column {
    Distribution,
    Score,
    Rank,
}

impl Column {
    pub fn as_str(self) -> &'static str {
        match self {
            Column::Distribution => "distribution",
            Column::Score => "score",
            Column::Rank => "rank",
        }
    }
}

/// One item's values, one entry per option label
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distribution: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<Vec<f64>>,
}

impl FrameRow {
    pub fn get(&self, column: Column) -> Option<&[f64]> {
        match column {
            Column::Distribution => self.distribution.as_deref(),
            Column::Score => self.score.as_deref(),
            Column::Rank => self.rank.as_deref(),
        }
    }
}

/// Row-aligned collection of per-item values.
///
/// Row `i` of a model frame and row `i` of the gold frame describe the same
/// item; frames are never re-sorted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    rows: Vec<FrameRow>,
}

impl Frame {
    pub fn new(rows: Vec<FrameRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[FrameRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// A column is present when the frame is non-empty and every row has it
    pub fn has(&self, column: Column) -> bool {
        !self.rows.is_empty() && self.rows.iter().all(|r| r.get(column).is_some())
    }

    /// Borrow a present column row by row
    pub fn column(&self, column: Column) -> Option<Vec<&[f64]>> {
        if !self.has(column) {
            return None;
        }
        self.rows.iter().map(|r| r.get(column)).collect()
    }
}
