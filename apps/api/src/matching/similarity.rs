//! String similarity scorers used by fuzzy keyword and skill matching.
//!
//! `Similarity` is the seam: `EditRatio` is the precise scorer (indel-normalized edit
//! ratio), `CharJaccard` the basic one (character-set overlap). Both report on a 0–100 scale
//! rounded to two decimals, so threshold comparisons behave the same for either.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::matching::round2;

/// A 0–100 similarity scorer between two tokens.
pub trait Similarity: Send + Sync {
    /// Short label surfaced in results so callers can detect degraded precision.
    fn name(&self) -> &'static str;

    fn score(&self, a: &str, b: &str) -> f64;
}

/// Indel edit ratio: `2 × lcs / (|a| + |b|) × 100`, where only insertions and deletions
/// count as edits. `postgres` vs `postgresql` scores 88.89.
#[derive(Debug, Clone, Copy, Default)]
pub struct EditRatio;

impl Similarity for EditRatio {
    fn name(&self) -> &'static str {
        "ratio"
    }

    fn score(&self, a: &str, b: &str) -> f64 {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        let total = a.len() + b.len();
        if total == 0 {
            return 100.0;
        }
        round2(2.0 * lcs_len(&a, &b) as f64 / total as f64 * 100.0)
    }
}

/// Length of the longest common subsequence, one DP row at a time.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut row = vec![0usize; b.len() + 1];
    for &ca in a {
        let mut diag = 0;
        for (j, &cb) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if ca == cb { diag + 1 } else { above.max(row[j]) };
            diag = above;
        }
    }
    row[b.len()]
}

/// Character-set Jaccard similarity. Crude; ignores order and repetition.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharJaccard;

impl Similarity for CharJaccard {
    fn name(&self) -> &'static str {
        "jaccard"
    }

    fn score(&self, a: &str, b: &str) -> f64 {
        if a == b {
            return 100.0;
        }
        let left: HashSet<char> = a.to_lowercase().chars().collect();
        let right: HashSet<char> = b.to_lowercase().chars().collect();
        let union = left.union(&right).count();
        if union == 0 {
            return 0.0;
        }
        let intersection = left.intersection(&right).count();
        round2(intersection as f64 / union as f64 * 100.0)
    }
}

/// Which scorer an engine is built with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FuzzyBackend {
    #[default]
    #[serde(alias = "levenshtein")]
    Ratio,
    Jaccard,
}

impl FuzzyBackend {
    pub fn scorer(self) -> Box<dyn Similarity> {
        match self {
            FuzzyBackend::Ratio => Box::new(EditRatio),
            FuzzyBackend::Jaccard => Box::new(CharJaccard),
        }
    }
}

impl std::str::FromStr for FuzzyBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ratio" | "levenshtein" | "edit" => Ok(FuzzyBackend::Ratio),
            "jaccard" | "basic" => Ok(FuzzyBackend::Jaccard),
            other => Err(format!("unknown fuzzy backend '{other}'")),
        }
    }
}

/// Best-scoring candidate for `query`, accepted only when it reaches `threshold`.
///
/// Ties keep the first candidate that reached the best score, so results follow the
/// iteration order of `candidates`.
pub fn best_match<'a, I>(
    scorer: &dyn Similarity,
    query: &str,
    candidates: I,
    threshold: f64,
) -> Option<(&'a str, f64)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(&'a str, f64)> = None;

    for candidate in candidates {
        let score = scorer.score(query, candidate);
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((candidate, score));
        }
    }

    best.filter(|(_, score)| *score >= threshold)
}
