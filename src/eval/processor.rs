//! Raw records → frames
//!
//! Gold records carry crowd votes (`votes_distribution`) and per-option human
//! ratings (`answerA_ratings`, ...). Judge records carry `logits`, a `score`
//! list and a `full` ranking string. Both are reduced to one vector per
//! label in task label order.

use crate::config::TaskSpec;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::types::{Frame, FrameRow, OptionLabel};
use serde_json::Value;

/// Human rating scale used by the gold annotations
const RATING_SCALE: &[(&str, f64)] = &[
    ("5 - Very Likely", 5.0),
    ("4 - Likely", 4.0),
    ("3 - Plausible", 3.0),
    ("2 - Technically Possible", 2.0),
    ("1 - Impossible", 1.0),
];

/// Score assigned when a judge score string does not start with a digit
const DEFAULT_SCORE: f64 = 1.0;

/// Rewrite a Python literal (single quotes, `True`/`False`/`None`) as JSON
pub fn python_literal_to_json(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                out.push('"');
                while let Some(sc) = chars.next() {
                    match sc {
                        '\\' => match chars.next() {
                            Some('\'') => out.push('\''),
                            Some(next) => {
                                out.push('\\');
                                out.push(next);
                            }
                            None => out.push('\\'),
                        },
                        '\'' => break,
                        '"' => out.push_str("\\\""),
                        _ => out.push(sc),
                    }
                }
                out.push('"');
            }
            '"' => {
                out.push('"');
                while let Some(sc) = chars.next() {
                    out.push(sc);
                    match sc {
                        '\\' => {
                            if let Some(next) = chars.next() {
                                out.push(next);
                            }
                        }
                        '"' => break,
                        _ => {}
                    }
                }
            }
            c if c.is_ascii_alphabetic() => {
                let mut word = String::from(c);
                while let Some(&next) = chars.peek() {
                    if !next.is_ascii_alphanumeric() && next != '_' {
                        break;
                    }
                    word.push(next);
                    chars.next();
                }
                match word.as_str() {
                    "None" => out.push_str("null"),
                    "True" => out.push_str("true"),
                    "False" => out.push_str("false"),
                    _ => out.push_str(&word),
                }
            }
            _ => out.push(c),
        }
    }

    out
}

/// Parse a vote mapping given either as an object or as a JSON / Python literal string
fn parse_votes(value: &Value) -> Option<serde_json::Map<String, Value>> {
    match value {
        Value::Object(map) => Some(map.clone()),
        Value::String(text) => serde_json::from_str::<Value>(text)
            .or_else(|_| serde_json::from_str::<Value>(&python_literal_to_json(text)))
            .ok()
            .and_then(|v| match v {
                Value::Object(map) => Some(map),
                _ => None,
            }),
        _ => None,
    }
}

/// Divide by the total, or all zeros when the total is zero
fn normalize(values: Vec<f64>) -> Vec<f64> {
    let total: f64 = values.iter().sum();
    if total > 0.0 {
        values.into_iter().map(|v| v / total).collect()
    } else {
        vec![0.0; values.len()]
    }
}

/// Builds frames for one task
#[derive(Debug, Clone, Copy)]
pub struct DataProcessor<'t> {
    task: &'t TaskSpec,
}

impl<'t> DataProcessor<'t> {
    pub fn new(task: &'t TaskSpec) -> Self {
        Self { task }
    }

    fn labels(&self) -> &'static [OptionLabel] {
        self.task.labels
    }

    /// Crowd votes keyed by answer text → distribution over labels
    pub fn votes_to_distribution(
        &self,
        votes: &Value,
        item: &Value,
        diagnostics: &mut Diagnostics,
    ) -> Vec<f64> {
        let Some(votes) = parse_votes(votes) else {
            diagnostics.push(Diagnostic::UnparseableVotes);
            return vec![0.0; self.labels().len()];
        };

        let counts = self
            .labels()
            .iter()
            .map(|&label| {
                let text = item
                    .get(TaskSpec::answer_field(label))
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                votes.get(text).and_then(Value::as_f64).unwrap_or(0.0)
            })
            .collect();
        normalize(counts)
    }

    /// Mean human rating per label, 0 for labels without ratings
    pub fn ratings_to_scores(&self, item: &Value, diagnostics: &mut Diagnostics) -> Vec<f64> {
        self.labels()
            .iter()
            .map(|&label| {
                let field = format!("{}_ratings", TaskSpec::answer_field(label));
                let Some(ratings) = item.get(&field).and_then(Value::as_array) else {
                    return 0.0;
                };

                let mut values = Vec::new();
                for entry in ratings {
                    let rating = entry.get("rating").and_then(Value::as_str).unwrap_or_default();
                    match RATING_SCALE.iter().find(|(name, _)| *name == rating) {
                        Some((_, value)) => values.push(*value),
                        None => diagnostics.push(Diagnostic::UnknownRating {
                            label,
                            rating: rating.to_string(),
                        }),
                    }
                }
                if values.is_empty() {
                    0.0
                } else {
                    values.iter().sum::<f64>() / values.len() as f64
                }
            })
            .collect()
    }

    /// Absolute logits normalized to sum to one
    pub fn logits_to_distribution(logits: &[Value]) -> Vec<f64> {
        normalize(
            logits
                .iter()
                .map(|v| v.as_f64().unwrap_or(0.0).abs())
                .collect(),
        )
    }

    /// Leading digit of each score, or the default when there is none
    pub fn parse_scores(scores: &[Value]) -> Vec<f64> {
        scores
            .iter()
            .map(|score| {
                let text = match score {
                    Value::String(s) => s.trim().to_string(),
                    other => other.to_string(),
                };
                text.chars()
                    .next()
                    .and_then(|c| c.to_digit(10))
                    .map_or(DEFAULT_SCORE, f64::from)
            })
            .collect()
    }

    /// Ranking string such as `"B > C > A"` → per-label scores.
    ///
    /// The first ranked label scores `n`, the next `n - 1`, and so on;
    /// labels that never appear score 1.
    pub fn ranking_to_scores(&self, ranking: &str) -> Vec<f64> {
        let labels = self.labels();
        let n = labels.len();
        let mut scores = vec![1.0; n];

        let mut seen: Vec<OptionLabel> = Vec::new();
        for c in ranking.chars() {
            let Some(label) = OptionLabel::from_char(c) else {
                continue;
            };
            if !labels.contains(&label) || seen.contains(&label) {
                continue;
            }
            seen.push(label);
        }

        for (position, label) in seen.iter().enumerate() {
            if let Some(slot) = labels.iter().position(|l| l == label) {
                scores[slot] = (n - position) as f64;
            }
        }
        scores
    }

    pub fn gold_frame(&self, items: &[Value], diagnostics: &mut Diagnostics) -> Frame {
        let score_field = self
            .labels()
            .first()
            .map(|&l| format!("{}_ratings", TaskSpec::answer_field(l)));

        let rows = items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let mut local = Diagnostics::scoped(i);
                let row = FrameRow {
                    distribution: item
                        .get("votes_distribution")
                        .map(|votes| self.votes_to_distribution(votes, item, &mut local)),
                    score: score_field
                        .as_deref()
                        .filter(|field| item.get(field).is_some())
                        .map(|_| self.ratings_to_scores(item, &mut local)),
                    rank: None,
                };
                diagnostics.extend(local);
                row
            })
            .collect();

        Frame::new(rows)
    }

    pub fn judge_frame(&self, items: &[Value]) -> Frame {
        let rows = items
            .iter()
            .map(|item| FrameRow {
                distribution: item
                    .get("logits")
                    .and_then(Value::as_array)
                    .map(|logits| Self::logits_to_distribution(logits)),
                score: item
                    .get("score")
                    .and_then(Value::as_array)
                    .map(|scores| Self::parse_scores(scores)),
                rank: item
                    .get("full")
                    .and_then(Value::as_str)
                    .map(|ranking| self.ranking_to_scores(ranking)),
            })
            .collect();

        Frame::new(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TaskRegistry;
    use crate::diagnostics::DiagnosticKind;
    use crate::types::Column;
    use serde_json::json;

    fn with_processor<T>(task: &str, f: impl FnOnce(DataProcessor<'_>) -> T) -> T {
        let registry = TaskRegistry::builtin();
        f(DataProcessor::new(registry.lookup(task).unwrap()))
    }

    #[test]
    fn test_python_literal_conversion() {
        assert_eq!(
            python_literal_to_json("{'a': 1, 'it\\'s': True, 'n': None}"),
            r#"{"a": 1, "it's": true, "n": null}"#
        );
        assert_eq!(python_literal_to_json(r#"{'say "hi"': 2}"#), r#"{"say \"hi\"": 2}"#);
        // Words inside strings are left alone
        assert_eq!(python_literal_to_json("{'None of these': 3}"), r#"{"None of these": 3}"#);
        assert_eq!(python_literal_to_json("{'café': 1}"), r#"{"café": 1}"#);
    }

    #[test]
    fn test_votes_to_distribution() {
        with_processor("siqa", |p| {
            let item = json!({"answerA": "go home", "answerB": "stay", "answerC": "leave"});
            let mut diagnostics = Diagnostics::new();

            let dist = p.votes_to_distribution(&json!("{'go home': 3, 'leave': 1}"), &item, &mut diagnostics);
            assert_eq!(dist, vec![0.75, 0.0, 0.25]);

            let dist = p.votes_to_distribution(&json!({"stay": 2}), &item, &mut diagnostics);
            assert_eq!(dist, vec![0.0, 1.0, 0.0]);

            let dist = p.votes_to_distribution(&json!("{'other': 5}"), &item, &mut diagnostics);
            assert_eq!(dist, vec![0.0; 3]);
            assert!(diagnostics.is_empty());

            let dist = p.votes_to_distribution(&json!("not a dict"), &item, &mut diagnostics);
            assert_eq!(dist, vec![0.0; 3]);
            assert_eq!(diagnostics.count(DiagnosticKind::UnparseableVotes), 1);
        });
    }

    #[test]
    fn test_ratings_to_scores() {
        with_processor("siqa", |p| {
            let item = json!({
                "answerA_ratings": [{"rating": "5 - Very Likely"}, {"rating": "3 - Plausible"}],
                "answerB_ratings": [{"rating": "1 - Impossible"}, {"rating": "6 - Certain"}],
            });
            let mut diagnostics = Diagnostics::new();
            assert_eq!(p.ratings_to_scores(&item, &mut diagnostics), vec![4.0, 1.0, 0.0]);
            assert_eq!(diagnostics.count(DiagnosticKind::UnknownRating), 1);
        });
    }

    #[test]
    fn test_logits_to_distribution() {
        let dist = DataProcessor::logits_to_distribution(&[json!(-1.0), json!(3), json!(0)]);
        assert_eq!(dist, vec![0.25, 0.75, 0.0]);
        assert_eq!(DataProcessor::logits_to_distribution(&[json!(0), json!(0)]), vec![0.0, 0.0]);
    }

    #[test]
    fn test_parse_scores() {
        let scores = DataProcessor::parse_scores(&[
            json!("4 - Likely"),
            json!(" 2"),
            json!(5),
            json!("Very likely"),
            json!(""),
        ]);
        assert_eq!(scores, vec![4.0, 2.0, 5.0, 1.0, 1.0]);
    }

    #[test]
    fn test_ranking_to_scores() {
        with_processor("siqa", |p| {
            assert_eq!(p.ranking_to_scores("B > C > A"), vec![1.0, 3.0, 2.0]);
            assert_eq!(p.ranking_to_scores("c, c, a"), vec![2.0, 1.0, 3.0]);
            assert_eq!(p.ranking_to_scores("E D"), vec![1.0, 1.0, 1.0]);
        });
        with_processor("cqa", |p| {
            assert_eq!(p.ranking_to_scores("E D"), vec![1.0, 1.0, 1.0, 4.0, 5.0]);
        });
    }

    #[test]
    fn test_frames_carry_present_columns() {
        with_processor("siqa", |p| {
            let judge = p.judge_frame(&[
                json!({"logits": [1, 1, 2], "full": "A B C"}),
                json!({"logits": [0, 1, 0], "full": "C"}),
            ]);
            assert!(judge.has(Column::Distribution));
            assert!(judge.has(Column::Rank));
            assert!(!judge.has(Column::Score));

            let mut diagnostics = Diagnostics::new();
            let gold = p.gold_frame(
                &[json!({"answerA": "x", "votes_distribution": "{'x': 1}",
                         "answerA_ratings": [{"rating": "4 - Likely"}]})],
                &mut diagnostics,
            );
            assert_eq!(gold.rows()[0].distribution, Some(vec![1.0, 0.0, 0.0]));
            assert_eq!(gold.rows()[0].score, Some(vec![4.0, 0.0, 0.0]));
        });
    }
}
