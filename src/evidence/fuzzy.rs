//! Approximate sentence matching
//!
//! Ratcliff/Obershelp similarity: find the longest common block, recurse on
//! both sides of it, and score `2·M / (|a| + |b|)` where `M` is the total
//! matched length. Characters are Unicode scalar values.

use std::collections::HashMap;

/// A candidate must score strictly above this to count as a match
pub const MATCH_THRESHOLD: f64 = 0.6;

/// Candidates at least this long ignore "popular" characters when seeding blocks
const POPULAR_MIN_LEN: usize = 200;

/// Longest-matching-block decomposition of `a` against `b`
struct BlockMatcher<'a> {
    a: &'a [char],
    b: &'a [char],
    /// Positions of each character in `b`, ascending
    b2j: HashMap<char, Vec<usize>>,
}

impl<'a> BlockMatcher<'a> {
    fn new(a: &'a [char], b: &'a [char]) -> Self {
        let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, &c) in b.iter().enumerate() {
            b2j.entry(c).or_default().push(j);
        }

        if b.len() >= POPULAR_MIN_LEN {
            let limit = b.len() / 100 + 1;
            b2j.retain(|_, positions| positions.len() <= limit);
        }

        Self { a, b, b2j }
    }

    /// Longest block `a[i..i+k] == b[j..j+k]` inside the given window.
    /// Earliest `i`, then earliest `j`, on ties.
    fn longest_match(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> (usize, usize, usize) {
        let (mut best_i, mut best_j, mut best_len) = (alo, blo, 0);

        // j2len[j] = length of the match ending at a[i-1], b[j]
        let mut j2len: HashMap<usize, usize> = HashMap::new();
        for i in alo..ahi {
            let mut next: HashMap<usize, usize> = HashMap::new();
            if let Some(positions) = self.b2j.get(&self.a[i]) {
                for &j in positions {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = j
                        .checked_sub(1)
                        .and_then(|prev| j2len.get(&prev))
                        .copied()
                        .unwrap_or(0)
                        + 1;
                    next.insert(j, k);
                    if k > best_len {
                        best_i = i + 1 - k;
                        best_j = j + 1 - k;
                        best_len = k;
                    }
                }
            }
            j2len = next;
        }

        // Popular characters never seed a block but may still extend one
        while best_i > alo && best_j > blo && self.a[best_i - 1] == self.b[best_j - 1] {
            best_i -= 1;
            best_j -= 1;
            best_len += 1;
        }
        while best_i + best_len < ahi
            && best_j + best_len < bhi
            && self.a[best_i + best_len] == self.b[best_j + best_len]
        {
            best_len += 1;
        }

        (best_i, best_j, best_len)
    }

    /// Total length of all matching blocks
    fn matched_len(&self) -> usize {
        let mut total = 0;
        let mut pending = vec![(0, self.a.len(), 0, self.b.len())];

        while let Some((alo, ahi, blo, bhi)) = pending.pop() {
            let (i, j, k) = self.longest_match(alo, ahi, blo, bhi);
            if k == 0 {
                continue;
            }
            total += k;
            if alo < i && blo < j {
                pending.push((alo, i, blo, j));
            }
            if i + k < ahi && j + k < bhi {
                pending.push((i + k, ahi, j + k, bhi));
            }
        }

        total
    }
}

/// Similarity of `a` to `b` in [0, 1]; two empty strings are identical
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matched = BlockMatcher::new(&a, &b).matched_len();
    2.0 * matched as f64 / total as f64
}

/// Candidate most similar to `query`, if its ratio exceeds [`MATCH_THRESHOLD`].
///
/// The first candidate reaching the maximum wins ties.
pub fn best_match<'c>(query: &str, candidates: &'c [String]) -> Option<&'c str> {
    if query.is_empty() || candidates.is_empty() {
        return None;
    }

    let mut best: Option<(&'c str, f64)> = None;
    for candidate in candidates {
        let ratio = similarity_ratio(query, candidate);
        let best_ratio = best.map(|(_, r)| r).unwrap_or(0.0);
        if ratio > best_ratio && ratio > MATCH_THRESHOLD {
            best = Some((candidate.as_str(), ratio));
        }
    }

    best.map(|(candidate, _)| candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_prefix_sentence_matches() {
        let candidates = strings(&["the cat sat on the mat", "a dog ran"]);
        assert_eq!(best_match("the cat sat", &candidates), Some("the cat sat on the mat"));
    }

    #[test]
    fn test_below_threshold_is_none() {
        assert_eq!(best_match("xyz", &strings(&["abc"])), None);
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(best_match("", &strings(&["abc"])), None);
        assert_eq!(best_match("abc", &[]), None);
    }

    #[test]
    fn test_known_ratios() {
        assert_eq!(similarity_ratio("abcd", "bcde"), 0.75);
        assert_eq!(similarity_ratio("", ""), 1.0);
        assert_eq!(similarity_ratio("abc", ""), 0.0);
        // "ab" first, then "cd" to its right
        assert!((similarity_ratio("abxcd", "abcd") - 8.0 / 9.0).abs() < 1e-12);
    }

    #[test]
    fn test_first_candidate_wins_ties() {
        let candidates = strings(&["abcdX", "abcdY", "abcd"]);
        // abcdX and abcdY tie; exact match is strictly better
        assert_eq!(best_match("abcd", &candidates), Some("abcd"));
        assert_eq!(best_match("abcdZ", &candidates[..2]), Some("abcdX"));
    }

    #[test]
    fn test_exact_match_is_stable() {
        let candidates = strings(&["Because it rained.", "The ground was wet."]);
        for c in &candidates {
            assert_eq!(best_match(c, &candidates), Some(c.as_str()));
        }
    }

    #[test]
    fn test_unicode_is_per_character() {
        assert_eq!(similarity_ratio("naïve", "naïve"), 1.0);
        assert!((similarity_ratio("café", "cafe") - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_long_candidates_ignore_popular_seeds() {
        // 'a' appears more than len/100 + 1 times, so it cannot seed a block;
        // only the zero-length probe at the window start may still extend
        let long = "a".repeat(250);
        assert_eq!(similarity_ratio("xa", &long), 0.0);
        assert!((similarity_ratio("a", &long) - 2.0 / 251.0).abs() < 1e-12);
        assert!((similarity_ratio("b", &format!("{}b", long)) - 2.0 / 252.0).abs() < 1e-12);
    }
}
