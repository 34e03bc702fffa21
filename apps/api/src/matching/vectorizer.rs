//! TF-IDF vectorizer over word 1–3-grams with a capped vocabulary.
//!
//! Analyzer: strip accents (NFD, combining marks dropped) → lowercase →
//! `\b\w\w+\b` tokens → English stop words removed → contiguous n-grams.
//! Weights: raw term count × smoothed idf `ln((1 + n) / (1 + df)) + 1`, L2-normalized.
//!
//! The fitted `Vocabulary` can be shared through a `VocabularyCache`: the first fit wins
//! and every later caller transforms against it.

use std::collections::{HashMap, HashSet};
use std::sync::{LazyLock, OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use tracing::debug;

/// English stop words dropped by the analyzer before n-gram expansion.
const ANALYZER_STOP_WORDS: &[&str] = &[
    "a", "about", "above", "across", "after", "afterwards", "again", "against", "all", "almost",
    "alone", "along", "already", "also", "although", "always", "am", "among", "amongst",
    "amoungst", "amount", "an", "and", "another", "any", "anyhow", "anyone", "anything",
    "anyway", "anywhere", "are", "around", "as", "at", "back", "be", "became", "because",
    "become", "becomes", "becoming", "been", "before", "beforehand", "behind", "being", "below",
    "beside", "besides", "between", "beyond", "bill", "both", "bottom", "but", "by", "call",
    "can", "cannot", "cant", "co", "con", "could", "couldnt", "cry", "de", "describe", "detail",
    "do", "done", "down", "due", "during", "each", "eg", "eight", "either", "eleven", "else",
    "elsewhere", "empty", "enough", "etc", "even", "ever", "every", "everyone", "everything",
    "everywhere", "except", "few", "fifteen", "fifty", "fill", "find", "fire", "first", "five",
    "for", "former", "formerly", "forty", "found", "four", "from", "front", "full", "further",
    "get", "give", "go", "had", "has", "hasnt", "have", "he", "hence", "her", "here",
    "hereafter", "hereby", "herein", "hereupon", "hers", "herself", "him", "himself", "his",
    "how", "however", "hundred", "i", "ie", "if", "in", "inc", "indeed", "interest", "into",
    "is", "it", "its", "itself", "keep", "last", "latter", "latterly", "least", "less", "ltd",
    "made", "many", "may", "me", "meanwhile", "might", "mill", "mine", "more", "moreover",
    "most", "mostly", "move", "much", "must", "my", "myself", "name", "namely", "neither",
    "never", "nevertheless", "next", "nine", "no", "nobody", "none", "noone", "nor", "not",
    "nothing", "now", "nowhere", "of", "off", "often", "on", "once", "one", "only", "onto",
    "or", "other", "others", "otherwise", "our", "ours", "ourselves", "out", "over", "own",
    "part", "per", "perhaps", "please", "put", "rather", "re", "same", "see", "seem", "seemed",
    "seeming", "seems", "serious", "several", "she", "should", "show", "side", "since",
    "sincere", "six", "sixty", "so", "some", "somehow", "someone", "something", "sometime",
    "sometimes", "somewhere", "still", "such", "system", "take", "ten", "than", "that", "the",
    "their", "them", "themselves", "then", "thence", "there", "thereafter", "thereby",
    "therefore", "therein", "thereupon", "these", "they", "thick", "thin", "third", "this",
    "those", "though", "three", "through", "throughout", "thru", "thus", "to", "together",
    "too", "top", "toward", "towards", "twelve", "twenty", "two", "un", "under", "until", "up",
    "upon", "us", "very", "via", "was", "we", "well", "were", "what", "whatever", "when",
    "whence", "whenever", "where", "whereafter", "whereas", "whereby", "wherein", "whereupon",
    "wherever", "whether", "which", "while", "whither", "who", "whoever", "whole", "whom",
    "whose", "why", "will", "with", "within", "without", "would", "yet", "you", "your", "yours",
    "yourself", "yourselves",
];

static TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w\w+\b").unwrap());

static STOP_WORDS: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| ANALYZER_STOP_WORDS.iter().copied().collect());

#[derive(Debug, Error, PartialEq)]
pub enum VectorizerError {
    #[error("empty vocabulary: documents contain only stop words or no tokens")]
    EmptyVocabulary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorizerParams {
    pub ngram_min: usize,
    pub ngram_max: usize,
    pub max_features: usize,
}

impl Default for VectorizerParams {
    fn default() -> Self {
        Self {
            ngram_min: 1,
            ngram_max: 3,
            max_features: 5000,
        }
    }
}

/// Whether the vocabulary is fit once and shared, or refit for every comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VocabularyPolicy {
    #[default]
    FitOnce,
    PerCall,
}

impl std::str::FromStr for VocabularyPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fit_once" | "cached" => Ok(VocabularyPolicy::FitOnce),
            "per_call" => Ok(VocabularyPolicy::PerCall),
            other => Err(format!("unknown vocabulary policy '{other}'")),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Sparse vectors
// ────────────────────────────────────────────────────────────────────────────

/// Sparse vector as `(dimension, value)` pairs sorted by dimension.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    entries: Vec<(usize, f64)>,
}

impl SparseVector {
    pub fn from_dense(values: &[f64]) -> Self {
        Self {
            entries: values
                .iter()
                .enumerate()
                .filter(|(_, v)| **v != 0.0)
                .map(|(i, v)| (i, *v))
                .collect(),
        }
    }

    fn from_unsorted(mut entries: Vec<(usize, f64)>) -> Self {
        entries.sort_by_key(|(i, _)| *i);
        Self { entries }
    }

    pub fn norm(&self) -> f64 {
        self.entries.iter().map(|(_, v)| v * v).sum::<f64>().sqrt()
    }

    pub fn is_zero(&self) -> bool {
        self.norm() == 0.0
    }

    pub fn dot(&self, other: &SparseVector) -> f64 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0;
        while i < self.entries.len() && j < other.entries.len() {
            let (a_idx, a_val) = self.entries[i];
            let (b_idx, b_val) = other.entries[j];
            match a_idx.cmp(&b_idx) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += a_val * b_val;
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }

    fn normalized(mut self) -> Self {
        let norm = self.norm();
        if norm > 0.0 {
            for (_, v) in &mut self.entries {
                *v /= norm;
            }
        }
        self
    }
}

/// Cosine similarity; 0.0 when either vector has zero norm.
pub fn cosine_similarity(a: &SparseVector, b: &SparseVector) -> f64 {
    let denom = a.norm() * b.norm();
    if denom == 0.0 {
        return 0.0;
    }
    a.dot(b) / denom
}

// ────────────────────────────────────────────────────────────────────────────
// Analyzer
// ────────────────────────────────────────────────────────────────────────────

fn strip_accents(text: &str) -> String {
    text.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Text → stop-word-filtered n-gram terms, in document order.
pub fn analyze(text: &str, params: &VectorizerParams) -> Vec<String> {
    let folded = strip_accents(text).to_lowercase();
    let words: Vec<&str> = TOKEN
        .find_iter(&folded)
        .map(|m| m.as_str())
        .filter(|w| !STOP_WORDS.contains(w))
        .collect();

    let mut terms = Vec::new();
    for n in params.ngram_min.max(1)..=params.ngram_max {
        if n == 1 {
            terms.extend(words.iter().map(|w| w.to_string()));
        } else {
            terms.extend(words.windows(n).map(|w| w.join(" ")));
        }
    }
    terms
}

// ────────────────────────────────────────────────────────────────────────────
// Vocabulary
// ────────────────────────────────────────────────────────────────────────────

/// A fitted term index with inverse document frequencies.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    index: HashMap<String, usize>,
    idf: Vec<f64>,
    params: VectorizerParams,
}

impl Vocabulary {
    /// Learns the vocabulary from `documents`, keeping the `max_features` most frequent
    /// terms (ties broken alphabetically). Dimensions are assigned in alphabetical order.
    pub fn fit(documents: &[&str], params: &VectorizerParams) -> Result<Self, VectorizerError> {
        let mut document_frequency: HashMap<String, usize> = HashMap::new();
        let mut corpus_frequency: HashMap<String, usize> = HashMap::new();

        for doc in documents {
            let terms = analyze(doc, params);
            let mut seen = HashSet::new();
            for term in terms {
                *corpus_frequency.entry(term.clone()).or_insert(0) += 1;
                if seen.insert(term.clone()) {
                    *document_frequency.entry(term).or_insert(0) += 1;
                }
            }
        }

        if corpus_frequency.is_empty() {
            return Err(VectorizerError::EmptyVocabulary);
        }

        let mut ranked: Vec<(String, usize)> = corpus_frequency.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(params.max_features);

        let mut kept: Vec<String> = ranked.into_iter().map(|(term, _)| term).collect();
        kept.sort();

        let n_docs = documents.len() as f64;
        let idf = kept
            .iter()
            .map(|term| {
                let df = document_frequency.get(term).copied().unwrap_or(0) as f64;
                ((1.0 + n_docs) / (1.0 + df)).ln() + 1.0
            })
            .collect();
        let index = kept.into_iter().enumerate().map(|(i, t)| (t, i)).collect();

        Ok(Self {
            index,
            idf,
            params: params.clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// L2-normalized TF-IDF vector. Out-of-vocabulary terms are ignored, so text sharing
    /// nothing with the fitted vocabulary maps to the zero vector.
    pub fn transform(&self, text: &str) -> SparseVector {
        let mut counts: HashMap<usize, f64> = HashMap::new();
        for term in analyze(text, &self.params) {
            if let Some(&dim) = self.index.get(&term) {
                *counts.entry(dim).or_insert(0.0) += 1.0;
            }
        }

        let weighted = counts
            .into_iter()
            .map(|(dim, tf)| (dim, tf * self.idf[dim]))
            .collect();
        SparseVector::from_unsorted(weighted).normalized()
    }
}

/// Initialize-once holder for a shared fitted vocabulary.
#[derive(Debug, Default)]
pub struct VocabularyCache {
    slot: OnceLock<Vocabulary>,
}

impl VocabularyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached vocabulary, fitting it on `documents` if none exists yet.
    /// When two callers race, both fit but only the first stored vocabulary is used.
    pub fn get_or_fit(
        &self,
        documents: &[&str],
        params: &VectorizerParams,
    ) -> Result<&Vocabulary, VectorizerError> {
        if let Some(vocabulary) = self.slot.get() {
            return Ok(vocabulary);
        }
        let fitted = Vocabulary::fit(documents, params)?;
        debug!(terms = fitted.len(), "tfidf vocabulary fitted");
        Ok(self.slot.get_or_init(|| fitted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> VectorizerParams {
        VectorizerParams::default()
    }

    #[test]
    fn test_analyze_builds_ngrams_without_stop_words() {
        let terms = analyze("The Rust compiler is fast", &params());
        assert_eq!(
            terms,
            vec![
                "rust",
                "compiler",
                "fast",
                "rust compiler",
                "compiler fast",
                "rust compiler fast"
            ]
        );
    }

    #[test]
    fn test_analyze_strips_accents_and_short_tokens() {
        let terms = analyze("Café résumé a b", &VectorizerParams { ngram_max: 1, ..params() });
        assert_eq!(terms, vec!["cafe", "resume"]);
    }

    #[test]
    fn test_analyzer_stop_words_differ_from_tokenizer() {
        let terms = analyze(
            "we go build a system with experience",
            &VectorizerParams { ngram_max: 1, ..params() },
        );
        assert_eq!(terms, vec!["build", "experience"]);
        assert_eq!(ANALYZER_STOP_WORDS.len(), 318);
    }

    #[test]
    fn test_fit_rejects_empty_vocabulary() {
        let err = Vocabulary::fit(&["the and of", "a"], &params()).unwrap_err();
        assert_eq!(err, VectorizerError::EmptyVocabulary);
    }

    #[test]
    fn test_fit_caps_vocabulary_by_frequency() {
        let p = VectorizerParams {
            ngram_min: 1,
            ngram_max: 1,
            max_features: 2,
        };
        let vocab = Vocabulary::fit(&["rust rust rust java java python"], &p).unwrap();
        assert_eq!(vocab.len(), 2);
        assert!(vocab.index.contains_key("rust"));
        assert!(vocab.index.contains_key("java"));
        assert!(!vocab.index.contains_key("python"));
    }

    #[test]
    fn test_transform_is_unit_length() {
        let vocab = Vocabulary::fit(&["rust systems", "python data"], &params()).unwrap();
        let v = vocab.transform("rust systems");
        assert!((v.norm() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_transform_out_of_vocabulary_is_zero() {
        let vocab = Vocabulary::fit(&["rust systems", "python data"], &params()).unwrap();
        assert!(vocab.transform("gardening cooking").is_zero());
    }

    #[test]
    fn test_identical_documents_have_cosine_one() {
        let text = "distributed systems engineer building rust services";
        let vocab = Vocabulary::fit(&[text, text], &params()).unwrap();
        let sim = cosine_similarity(&vocab.transform(text), &vocab.transform(text));
        assert!((sim - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_disjoint_documents_have_cosine_zero() {
        let a = "rust systems programming";
        let b = "watercolor painting classes";
        let vocab = Vocabulary::fit(&[a, b], &params()).unwrap();
        assert_eq!(cosine_similarity(&vocab.transform(a), &vocab.transform(b)), 0.0);
    }

    #[test]
    fn test_shared_terms_get_lower_idf() {
        let vocab = Vocabulary::fit(&["rust shared", "python shared"], &params()).unwrap();
        let shared = vocab.idf[vocab.index["shared"]];
        let unique = vocab.idf[vocab.index["rust"]];
        assert!(shared < unique);
        assert!((shared - 1.0).abs() < 1e-12, "term in every doc has idf 1");
    }

    #[test]
    fn test_sparse_dot_and_cosine() {
        let a = SparseVector::from_dense(&[1.0, 0.0, 2.0]);
        let b = SparseVector::from_dense(&[0.0, 3.0, 4.0]);
        assert_eq!(a.entries.len(), 2);
        assert_eq!(a.dot(&b), 8.0);
        assert_eq!(cosine_similarity(&a, &SparseVector::default()), 0.0);
    }

    #[test]
    fn test_cache_keeps_first_fit() {
        let cache = VocabularyCache::new();
        assert!(cache.slot.get().is_none());
        let first = cache.get_or_fit(&["rust systems"], &params()).unwrap().len();
        let second = cache
            .get_or_fit(&["completely different words here"], &params())
            .unwrap();
        assert_eq!(second.len(), first);
        assert!(second.index.contains_key("rust"));
        assert!(!second.index.contains_key("different"));
    }

    #[test]
    fn test_cache_concurrent_first_fits_share_one_vocabulary() {
        let cache = VocabularyCache::new();
        let corpora = [
            "rust systems",
            "python data pipelines",
            "kubernetes clusters",
            "react frontend",
        ];

        let fitted: Vec<&Vocabulary> = std::thread::scope(|scope| {
            let handles: Vec<_> = corpora
                .iter()
                .map(|text| {
                    let cache = &cache;
                    scope.spawn(move || cache.get_or_fit(&[*text], &params()).unwrap())
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let stored = cache.slot.get().unwrap();
        assert!(fitted.iter().all(|v| std::ptr::eq(*v, stored)));
    }

    #[test]
    fn test_cache_does_not_store_failed_fit() {
        let cache = VocabularyCache::new();
        assert!(cache.get_or_fit(&["the of"], &params()).is_err());
        assert!(cache.slot.get().is_none());
        assert!(cache.get_or_fit(&["rust"], &params()).is_ok());
    }

    #[test]
    fn test_vocabulary_policy_parsing() {
        assert_eq!("fit_once".parse::<VocabularyPolicy>(), Ok(VocabularyPolicy::FitOnce));
        assert_eq!("PER_CALL".parse::<VocabularyPolicy>(), Ok(VocabularyPolicy::PerCall));
        assert!("sometimes".parse::<VocabularyPolicy>().is_err());
    }
}
