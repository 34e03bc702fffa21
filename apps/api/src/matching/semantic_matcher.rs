//! Semantic matcher — vector-space similarity between résumé and job description.
//!
//! `overall` is the cosine of the two full texts. Each text is also cut into loose
//! sections (sentences containing section keywords); every JD section is paired with
//! its best résumé section. The semantic score blends both:
//!
//!   semantic_score = (0.7 × overall + 0.3 × mean(best section scores)) × 100
//!
//! Vectorization degrades gracefully: TF-IDF failure → word-count proxy → word-set
//! Jaccard. The model that actually produced the overall score is reported.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::matching::round2;
use crate::matching::vectorizer::{
    cosine_similarity, SparseVector, VectorizerError, VectorizerParams, Vocabulary,
    VocabularyCache, VocabularyPolicy,
};

const OVERALL_WEIGHT: f64 = 0.7;
const SECTION_WEIGHT: f64 = 0.3;
const SECTION_PREVIEW_CHARS: usize = 200;
const CONFIDENCE_MIN_LENGTH: f64 = 100.0;

/// Pseudo-section covering the whole text. Always present.
pub const GENERAL_SECTION: &str = "general";

const SECTION_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "experience",
        &["experience", "work history", "employment", "professional experience"],
    ),
    ("skills", &["skills", "technical skills", "competencies", "technologies"]),
    ("education", &["education", "academic", "qualifications", "degree"]),
    (
        "responsibilities",
        &["responsibilities", "duties", "requirements", "required"],
    ),
    (
        "projects",
        &["projects", "portfolio", "achievements", "accomplishments"],
    ),
];

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

/// Which vectorizer produced a similarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SemanticModel {
    #[serde(rename = "TF-IDF")]
    TfIdf,
    Basic,
    Jaccard,
}

impl std::fmt::Display for SemanticModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            SemanticModel::TfIdf => "TF-IDF",
            SemanticModel::Basic => "Basic",
            SemanticModel::Jaccard => "Jaccard",
        };
        f.write_str(label)
    }
}

/// Configured primary vectorizer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticBackend {
    #[default]
    Tfidf,
    Basic,
}

impl std::str::FromStr for SemanticBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tfidf" | "tf-idf" => Ok(SemanticBackend::Tfidf),
            "basic" | "count" => Ok(SemanticBackend::Basic),
            other => Err(format!("unknown semantic backend '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// Best résumé counterpart for one JD section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionSimilarity {
    pub jd_section: String,
    pub best_match_section: Option<String>,
    /// 0–100.
    pub similarity_score: f64,
    pub jd_section_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticMatchResult {
    pub overall_similarity: f64,
    pub section_similarities: Vec<SectionSimilarity>,
    pub average_section_similarity: f64,
    pub semantic_score: f64,
    pub model_used: SemanticModel,
    pub confidence: Confidence,
}

/// A similarity in [0, 1] plus the model that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredSimilarity {
    pub value: f64,
    pub model: SemanticModel,
}

// ────────────────────────────────────────────────────────────────────────────
// Encoders
// ────────────────────────────────────────────────────────────────────────────

/// Maps a text pair into a shared vector space.
pub trait TextEncoder: Send + Sync {
    fn model(&self) -> SemanticModel;

    fn encode_pair(&self, a: &str, b: &str)
        -> Result<(SparseVector, SparseVector), VectorizerError>;
}

/// TF-IDF over word 1–3-grams. With `FitOnce` the vocabulary learned from the first
/// pair is shared through the cache; terms it never saw contribute nothing.
pub struct TfIdfEncoder {
    cache: Arc<VocabularyCache>,
    params: VectorizerParams,
    policy: VocabularyPolicy,
}

impl TfIdfEncoder {
    pub fn new(cache: Arc<VocabularyCache>, policy: VocabularyPolicy) -> Self {
        Self {
            cache,
            params: VectorizerParams::default(),
            policy,
        }
    }
}

impl TextEncoder for TfIdfEncoder {
    fn model(&self) -> SemanticModel {
        SemanticModel::TfIdf
    }

    fn encode_pair(
        &self,
        a: &str,
        b: &str,
    ) -> Result<(SparseVector, SparseVector), VectorizerError> {
        match self.policy {
            VocabularyPolicy::FitOnce => {
                let vocabulary = self.cache.get_or_fit(&[a, b], &self.params)?;
                Ok((vocabulary.transform(a), vocabulary.transform(b)))
            }
            VocabularyPolicy::PerCall => {
                let vocabulary = Vocabulary::fit(&[a, b], &self.params)?;
                Ok((vocabulary.transform(a), vocabulary.transform(b)))
            }
        }
    }
}

/// Three-feature proxy `[words, unique words, total count]`. Only coarse length signal.
#[derive(Debug, Default, Clone, Copy)]
pub struct CountProxyEncoder;

impl CountProxyEncoder {
    fn encode(text: &str) -> SparseVector {
        let lowered = text.to_lowercase();
        let words: Vec<&str> = lowered.split_whitespace().collect();
        let unique: HashSet<&str> = words.iter().copied().collect();
        let total = words.len() as f64;
        SparseVector::from_dense(&[total, unique.len() as f64, total])
    }
}

impl TextEncoder for CountProxyEncoder {
    fn model(&self) -> SemanticModel {
        SemanticModel::Basic
    }

    fn encode_pair(
        &self,
        a: &str,
        b: &str,
    ) -> Result<(SparseVector, SparseVector), VectorizerError> {
        Ok((Self::encode(a), Self::encode(b)))
    }
}

/// Word-set Jaccard in [0, 1]; the last-resort similarity.
pub fn word_jaccard(a: &str, b: &str) -> f64 {
    let (a, b) = (a.to_lowercase(), b.to_lowercase());
    let left: HashSet<&str> = a.split_whitespace().collect();
    let right: HashSet<&str> = b.split_whitespace().collect();
    match (left.is_empty(), right.is_empty()) {
        (true, true) => 1.0,
        (true, false) | (false, true) => 0.0,
        _ => {
            let intersection = left.intersection(&right).count() as f64;
            let union = left.union(&right).count() as f64;
            intersection / union
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Matcher
// ────────────────────────────────────────────────────────────────────────────

pub struct SemanticMatcher {
    encoder: Box<dyn TextEncoder>,
}

impl SemanticMatcher {
    pub fn new(encoder: Box<dyn TextEncoder>) -> Self {
        Self { encoder }
    }

    pub fn for_backend(
        backend: SemanticBackend,
        cache: Arc<VocabularyCache>,
        policy: VocabularyPolicy,
    ) -> Self {
        match backend {
            SemanticBackend::Tfidf => Self::new(Box::new(TfIdfEncoder::new(cache, policy))),
            SemanticBackend::Basic => Self::new(Box::new(CountProxyEncoder)),
        }
    }

    pub fn primary_model(&self) -> SemanticModel {
        self.encoder.model()
    }

    /// Similarity in [0, 1]. Blank input on either side is 0.
    pub fn similarity(&self, a: &str, b: &str) -> ScoredSimilarity {
        if a.trim().is_empty() || b.trim().is_empty() {
            return ScoredSimilarity {
                value: 0.0,
                model: self.encoder.model(),
            };
        }

        let (vectors, model) = match self.encoder.encode_pair(a, b) {
            Ok(vectors) => (vectors, self.encoder.model()),
            Err(e) => {
                debug!(error = %e, "primary encoder failed; using count proxy");
                let proxy = CountProxyEncoder;
                (
                    (CountProxyEncoder::encode(a), CountProxyEncoder::encode(b)),
                    proxy.model(),
                )
            }
        };

        let (va, vb) = vectors;
        if model != SemanticModel::TfIdf && (va.is_zero() || vb.is_zero()) {
            warn!("count proxy produced a zero vector; using word-set jaccard");
            return ScoredSimilarity {
                value: word_jaccard(a, b).clamp(0.0, 1.0),
                model: SemanticModel::Jaccard,
            };
        }

        ScoredSimilarity {
            value: cosine_similarity(&va, &vb).clamp(0.0, 1.0),
            model,
        }
    }

    /// Full semantic comparison of two normalized texts.
    pub fn semantic_match(&self, resume_text: &str, jd_text: &str) -> SemanticMatchResult {
        let overall = self.similarity(resume_text, jd_text);

        let resume_sections = split_into_sections(resume_text);
        let jd_sections = split_into_sections(jd_text);

        let (section_similarities, best_scores): (Vec<SectionSimilarity>, Vec<f64>) = jd_sections
            .iter()
            .map(|(jd_name, jd_section)| {
                let mut best_score = 0.0;
                let mut best_section = None;
                for (resume_name, resume_section) in &resume_sections {
                    let score = self.similarity(resume_section, jd_section).value;
                    if score > best_score {
                        best_score = score;
                        best_section = Some(resume_name.to_string());
                    }
                }
                let section = SectionSimilarity {
                    jd_section: jd_name.to_string(),
                    best_match_section: best_section,
                    similarity_score: round2(best_score * 100.0),
                    jd_section_text: preview(jd_section),
                };
                (section, best_score)
            })
            .unzip();

        // Averaged on the unrounded [0, 1] scale, then reported as a percentage.
        let average = if best_scores.is_empty() {
            0.0
        } else {
            best_scores.iter().sum::<f64>() / best_scores.len() as f64
        };

        let semantic_score =
            round2((OVERALL_WEIGHT * overall.value + SECTION_WEIGHT * average) * 100.0);
        let confidence = confidence(
            overall.value,
            resume_text.chars().count(),
            jd_text.chars().count(),
        );

        debug!(
            overall = overall.value,
            average_section = average,
            semantic_score,
            model = %overall.model,
            "semantic match computed"
        );

        SemanticMatchResult {
            overall_similarity: round2(overall.value * 100.0),
            section_similarities,
            average_section_similarity: round2(average * 100.0),
            semantic_score,
            model_used: overall.model,
            confidence,
        }
    }
}

/// `general` (the whole text) followed by every keyword section that matched at least
/// one `.`-delimited sentence. Matched sentences are re-joined with `". "`.
pub fn split_into_sections(text: &str) -> Vec<(&'static str, String)> {
    let sentences: Vec<&str> = text
        .split('.')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    let mut sections = vec![(GENERAL_SECTION, text.to_string())];

    for (name, keywords) in SECTION_KEYWORDS {
        let content: Vec<&str> = sentences
            .iter()
            .copied()
            .filter(|sentence| {
                let lowered = sentence.to_lowercase();
                keywords.iter().any(|k| lowered.contains(k))
            })
            .collect();
        if !content.is_empty() {
            sections.push((*name, content.join(". ")));
        }
    }

    sections
}

/// `min(len) / 100 × similarity`, bucketed at 0.7 and 0.4 (both exclusive).
pub fn confidence(similarity: f64, resume_len: usize, jd_len: usize) -> Confidence {
    let length_factor = resume_len.min(jd_len) as f64 / CONFIDENCE_MIN_LENGTH;
    let combined = length_factor * similarity;
    if combined > 0.7 {
        Confidence::High
    } else if combined > 0.4 {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}

fn preview(text: &str) -> String {
    if text.chars().count() > SECTION_PREVIEW_CHARS {
        let head: String = text.chars().take(SECTION_PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tfidf(policy: VocabularyPolicy) -> SemanticMatcher {
        SemanticMatcher::for_backend(
            SemanticBackend::Tfidf,
            Arc::new(VocabularyCache::new()),
            policy,
        )
    }

    const RESUME: &str = "senior python developer. experience building django services on aws. \
                          skills include postgresql and docker. education in computer science";
    const JD: &str = "we need a python developer. required experience with django and aws. \
                      skills in kubernetes are a plus";

    #[test]
    fn test_blank_input_scores_zero() {
        let m = tfidf(VocabularyPolicy::PerCall);
        assert_eq!(m.similarity("", "python").value, 0.0);
        assert_eq!(m.similarity("python", "   ").value, 0.0);
    }

    #[test]
    fn test_identical_texts_score_one() {
        let m = tfidf(VocabularyPolicy::PerCall);
        let s = m.similarity(RESUME, RESUME);
        assert!((s.value - 1.0).abs() < 1e-9);
        assert_eq!(s.model, SemanticModel::TfIdf);
    }

    #[test]
    fn test_disjoint_texts_score_zero() {
        let m = tfidf(VocabularyPolicy::PerCall);
        let s = m.similarity("rust tokio axum", "watercolor landscape painting");
        assert_eq!(s.value, 0.0);
    }

    #[test]
    fn test_stop_word_only_text_falls_back_to_proxy() {
        let m = tfidf(VocabularyPolicy::PerCall);
        let s = m.similarity("the and of", "it is the");
        assert_eq!(s.model, SemanticModel::Basic);
        assert!((s.value - 1.0).abs() < 1e-9, "equal-length proxies are parallel");
    }

    #[test]
    fn test_count_proxy_backend_reports_basic() {
        let m = SemanticMatcher::for_backend(
            SemanticBackend::Basic,
            Arc::new(VocabularyCache::new()),
            VocabularyPolicy::FitOnce,
        );
        let s = m.similarity("one two three", "four five");
        assert_eq!(s.model, SemanticModel::Basic);
        assert!(s.value > 0.9);
    }

    #[test]
    fn test_fit_once_reuses_first_vocabulary() {
        let m = tfidf(VocabularyPolicy::FitOnce);
        m.similarity("rust services", "rust systems");
        // Neither word was seen during the first fit.
        let s = m.similarity("gardening", "gardening");
        assert_eq!(s.model, SemanticModel::TfIdf);
        assert_eq!(s.value, 0.0);
    }

    #[test]
    fn test_per_call_refits_vocabulary() {
        let m = tfidf(VocabularyPolicy::PerCall);
        m.similarity("rust services", "rust systems");
        let s = m.similarity("gardening", "gardening");
        assert!((s.value - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_split_into_sections() {
        let sections = split_into_sections(RESUME);
        let names: Vec<&str> = sections.iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["general", "experience", "skills", "education"]);
        assert_eq!(sections[0].1, RESUME);
        assert_eq!(sections[1].1, "experience building django services on aws");
    }

    #[test]
    fn test_split_joins_multiple_sentences() {
        let sections = split_into_sections("duties include triage. on call. required: rust");
        let (_, text) = sections
            .iter()
            .find(|(n, _)| *n == "responsibilities")
            .unwrap();
        assert_eq!(text, "duties include triage. required: rust");
    }

    #[test]
    fn test_semantic_match_identical_texts() {
        let result = tfidf(VocabularyPolicy::PerCall).semantic_match(JD, JD);
        assert_eq!(result.overall_similarity, 100.0);
        assert_eq!(result.semantic_score, 100.0);
        assert_eq!(result.model_used, SemanticModel::TfIdf);
        assert_eq!(result.confidence, Confidence::High);
        assert_eq!(result.section_similarities[0].jd_section, "general");
    }

    #[test]
    fn test_semantic_match_score_is_bounded_blend() {
        let result = tfidf(VocabularyPolicy::PerCall).semantic_match(RESUME, JD);
        assert!(result.overall_similarity > 0.0 && result.overall_similarity < 100.0);
        assert!((0.0..=100.0).contains(&result.semantic_score));
        let expected = 0.7 * result.overall_similarity + 0.3 * result.average_section_similarity;
        assert!((result.semantic_score - expected).abs() < 0.05);
    }

    #[test]
    fn test_semantic_match_without_overlap_has_no_best_section() {
        let result = tfidf(VocabularyPolicy::PerCall)
            .semantic_match("rust tokio axum", "watercolor landscape painting");
        assert_eq!(result.semantic_score, 0.0);
        assert_eq!(result.section_similarities[0].best_match_section, None);
        assert_eq!(result.confidence, Confidence::Low);
    }

    #[test]
    fn test_section_pairs_with_best_resume_section() {
        let resume = "Led backend teams at a fintech startup. \
                      Skills: rust, tokio, postgres. Education: physics degree";
        let jd = "Join our payments platform group. Skills: rust, tokio, postgres";
        let result = tfidf(VocabularyPolicy::PerCall).semantic_match(resume, jd);

        let skills = result
            .section_similarities
            .iter()
            .find(|s| s.jd_section == "skills")
            .unwrap();
        assert_eq!(skills.best_match_section.as_deref(), Some("skills"));
        assert_eq!(skills.similarity_score, 100.0);
        assert_eq!(skills.jd_section_text, "Skills: rust, tokio, postgres");
    }

    #[test]
    fn test_confidence_buckets() {
        assert_eq!(confidence(0.8, 100, 500), Confidence::High);
        assert_eq!(confidence(0.7, 100, 100), Confidence::Medium);
        assert_eq!(confidence(0.9, 50, 500), Confidence::Medium);
        assert_eq!(confidence(0.4, 100, 100), Confidence::Low);
    }

    #[test]
    fn test_preview_truncates_long_sections() {
        let long = "x".repeat(250);
        let p = preview(&long);
        assert_eq!(p.chars().count(), 203);
        assert!(p.ends_with("..."));
        assert_eq!(preview("short"), "short");
    }

    #[test]
    fn test_word_jaccard() {
        assert_eq!(word_jaccard("", ""), 1.0);
        assert_eq!(word_jaccard("rust", ""), 0.0);
        assert_eq!(word_jaccard("Rust Go", "rust python"), 1.0 / 3.0);
    }
}
