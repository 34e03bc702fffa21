//! Engine configuration and the result records returned by the matching engine.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::matching::hard_matcher::HardMatchResult;
use crate::matching::semantic_matcher::{Confidence, SemanticBackend, SemanticMatchResult};
use crate::matching::similarity::FuzzyBackend;
use crate::matching::vectorizer::VocabularyPolicy;

// ────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be a finite, non-negative number (got {value})")]
    InvalidWeight { name: &'static str, value: f64 },

    #[error("{name} must be between 0 and 100 (got {value})")]
    OutOfRange { name: &'static str, value: f64 },

    #[error("thresholds must satisfy high >= medium >= low (got {high} / {medium} / {low})")]
    ThresholdOrder { high: f64, medium: f64, low: f64 },

    #[error("max_suggestions must be at least 1")]
    NoSuggestions,
}

/// Immutable configuration of one `MatchingEngine`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub semantic_weight: f64,
    pub hard_match_weight: f64,
    pub high_suitability: f64,
    pub medium_suitability: f64,
    /// Lower bound of the "Low" band. Only participates in the ordering check.
    pub low_suitability: f64,
    pub fuzzy_threshold: f64,
    pub max_suggestions: usize,
    pub fuzzy_backend: FuzzyBackend,
    pub semantic_backend: SemanticBackend,
    pub vocabulary_policy: VocabularyPolicy,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            semantic_weight: 0.6,
            hard_match_weight: 0.4,
            high_suitability: 75.0,
            medium_suitability: 50.0,
            low_suitability: 0.0,
            fuzzy_threshold: 85.0,
            max_suggestions: 5,
            fuzzy_backend: FuzzyBackend::default(),
            semantic_backend: SemanticBackend::default(),
            vocabulary_policy: VocabularyPolicy::default(),
        }
    }
}

impl MatchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("semantic_weight", self.semantic_weight),
            ("hard_match_weight", self.hard_match_weight),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight { name, value });
            }
        }

        for (name, value) in [
            ("high_suitability", self.high_suitability),
            ("medium_suitability", self.medium_suitability),
            ("low_suitability", self.low_suitability),
            ("fuzzy_threshold", self.fuzzy_threshold),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(ConfigError::OutOfRange { name, value });
            }
        }

        if !(self.high_suitability >= self.medium_suitability
            && self.medium_suitability >= self.low_suitability)
        {
            return Err(ConfigError::ThresholdOrder {
                high: self.high_suitability,
                medium: self.medium_suitability,
                low: self.low_suitability,
            });
        }

        if self.max_suggestions == 0 {
            return Err(ConfigError::NoSuggestions);
        }

        let total = self.semantic_weight + self.hard_match_weight;
        if (total - 1.0).abs() > 1e-6 {
            warn!(
                semantic_weight = self.semantic_weight,
                hard_match_weight = self.hard_match_weight,
                "engine weights do not sum to 1.0; scores may leave the 0-100 range"
            );
        }

        Ok(())
    }

    pub fn weights(&self) -> Weights {
        Weights {
            semantic_weight: self.semantic_weight,
            hard_match_weight: self.hard_match_weight,
        }
    }
}

/// Partial configuration carried by requests; unset fields keep the base value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfigOverrides {
    pub semantic_weight: Option<f64>,
    pub hard_match_weight: Option<f64>,
    pub high_suitability: Option<f64>,
    pub medium_suitability: Option<f64>,
    pub low_suitability: Option<f64>,
    pub fuzzy_threshold: Option<f64>,
    pub max_suggestions: Option<usize>,
    pub fuzzy_backend: Option<FuzzyBackend>,
    pub semantic_backend: Option<SemanticBackend>,
    pub vocabulary_policy: Option<VocabularyPolicy>,
}

impl MatchConfigOverrides {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(&self, base: &MatchConfig) -> MatchConfig {
        MatchConfig {
            semantic_weight: self.semantic_weight.unwrap_or(base.semantic_weight),
            hard_match_weight: self.hard_match_weight.unwrap_or(base.hard_match_weight),
            high_suitability: self.high_suitability.unwrap_or(base.high_suitability),
            medium_suitability: self.medium_suitability.unwrap_or(base.medium_suitability),
            low_suitability: self.low_suitability.unwrap_or(base.low_suitability),
            fuzzy_threshold: self.fuzzy_threshold.unwrap_or(base.fuzzy_threshold),
            max_suggestions: self.max_suggestions.unwrap_or(base.max_suggestions),
            fuzzy_backend: self.fuzzy_backend.unwrap_or(base.fuzzy_backend),
            semantic_backend: self.semantic_backend.unwrap_or(base.semantic_backend),
            vocabulary_policy: self.vocabulary_policy.unwrap_or(base.vocabulary_policy),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Verdict
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "High Suitability")]
    High,
    #[serde(rename = "Medium Suitability")]
    Medium,
    #[serde(rename = "Low Suitability")]
    Low,
    Error,
}

impl Verdict {
    /// Threshold ladder; each lower bound is inclusive.
    pub fn classify(score: f64, config: &MatchConfig) -> Self {
        if score >= config.high_suitability {
            Verdict::High
        } else if score >= config.medium_suitability {
            Verdict::Medium
        } else {
            Verdict::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Verdict::High => "High Suitability",
            Verdict::Medium => "Medium Suitability",
            Verdict::Low => "Low Suitability",
            Verdict::Error => "Error",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Result records
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    pub semantic_weight: f64,
    pub hard_match_weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub hard_match_score: f64,
    pub semantic_score: f64,
    pub final_score: f64,
    pub weights_used: Weights,
    /// Human-readable trace of the fusion arithmetic.
    pub calculation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchStatistics {
    pub total_jd_skills: usize,
    pub total_resume_skills: usize,
    pub exact_matches: usize,
    pub fuzzy_matches: usize,
    pub missing_skills_count: usize,
    pub keyword_match_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryAnalysis {
    /// Percentage rounded to one decimal.
    pub match_rate: f64,
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub total_required: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedAnalysis {
    pub strengths: Vec<String>,
    pub areas_for_improvement: Vec<String>,
    pub semantic_confidence: Confidence,
    pub top_missing_skills: Vec<String>,
    /// Multi-word job-description phrases that also occur in the résumé.
    pub shared_key_phrases: Vec<String>,
    /// Only categories in which the job description lists at least one skill.
    pub skill_categories_analysis: BTreeMap<String, CategoryAnalysis>,
}

/// Output of one résumé/job-description comparison.
///
/// Failed matches keep the same shape: `success == false`, score 0, verdict `Error`,
/// an `error` message, and every detail section absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub success: bool,
    pub timestamp: DateTime<Utc>,
    pub relevance_score: f64,
    pub verdict: Verdict,
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub suggestions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_breakdown: Option<ScoreBreakdown>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_statistics: Option<MatchStatistics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detailed_analysis: Option<DetailedAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hard_match_details: Option<HardMatchResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_match_details: Option<SemanticMatchResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration_used: Option<MatchConfig>,
    /// Position of the job description in a batch request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_index: Option<usize>,
}

pub const ERROR_SUGGESTION: &str = "Please check the input text and try again";

impl MatchResult {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            timestamp: Utc::now(),
            relevance_score: 0.0,
            verdict: Verdict::Error,
            matched_skills: Vec::new(),
            missing_skills: Vec::new(),
            suggestions: vec![ERROR_SUGGESTION.to_string()],
            error: Some(message.into()),
            score_breakdown: None,
            match_statistics: None,
            detailed_analysis: None,
            hard_match_details: None,
            semantic_match_details: None,
            configuration_used: None,
            job_index: None,
        }
    }
}
