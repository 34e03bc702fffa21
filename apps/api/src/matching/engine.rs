//! Matching engine — orchestrates normalization, lexical and semantic matching, score
//! fusion, verdict classification and suggestion generation.
//!
//!   final = semantic_weight × semantic_score + hard_match_weight × hard_match_score
//!
//! An engine is immutable after construction. Shared, initialize-once resources (skills
//! table, fitted vocabulary) live in a `MatchContext` injected by the hosting process, so
//! engines built from different configurations can share them.

use std::collections::{BTreeMap, BTreeSet};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use chrono::Utc;
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::matching::hard_matcher::{group_by_category, HardMatchResult, HardMatcher};
use crate::matching::models::{
    CategoryAnalysis, ConfigError, DetailedAnalysis, MatchConfig, MatchConfigOverrides,
    MatchResult, MatchStatistics, ScoreBreakdown, Verdict,
};
use crate::matching::preprocess::{extract_key_phrases, Document, Normalizer};
use crate::matching::round2;
use crate::matching::semantic_matcher::{SemanticBackend, SemanticMatchResult, SemanticMatcher};
use crate::matching::similarity::FuzzyBackend;
use crate::matching::skills::{SkillTable, ANALYZED_CATEGORIES, TECHNICAL_CATEGORIES};
use crate::matching::vectorizer::VocabularyCache;

const STRONG_SEMANTIC_SCORE: f64 = 70.0;
const VERY_LOW_SCORE: f64 = 30.0;
const TOP_MISSING_SKILLS: usize = 3;
const MAX_SHARED_PHRASES: usize = 10;

/// Process-wide read-only resources shared by every engine.
#[derive(Debug)]
pub struct MatchContext {
    pub skills: Arc<SkillTable>,
    pub vocabulary: Arc<VocabularyCache>,
}

impl MatchContext {
    pub fn new(skills: Arc<SkillTable>) -> Self {
        let context = Self {
            skills,
            vocabulary: Arc::new(VocabularyCache::new()),
        };
        let missing = context.missing_categories();
        if !missing.is_empty() {
            warn!(?missing, "skills table lacks analyzed categories");
        }
        context
    }

    /// Statistics and breakdown categories the skills table does not define.
    pub fn missing_categories(&self) -> Vec<&'static str> {
        TECHNICAL_CATEGORIES
            .iter()
            .chain(ANALYZED_CATEGORIES)
            .copied()
            .filter(|category| self.skills.skills_in_category(category).is_none())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Context over the built-in skills table with an unfitted vocabulary.
    pub fn standard() -> Self {
        Self::new(SkillTable::standard())
    }
}

/// Reasons a match cannot be computed. Surfaced as a failed `MatchResult`, never as `Err`.
#[derive(Debug, Error, PartialEq)]
pub enum MatchError {
    #[error("Resume text is empty or contains no usable content")]
    EmptyResume,

    #[error("Job description text is empty or contains no usable content")]
    EmptyJobDescription,
}

pub struct MatchingEngine {
    config: MatchConfig,
    context: Arc<MatchContext>,
    normalizer: Normalizer,
    hard_matcher: HardMatcher,
    semantic_matcher: SemanticMatcher,
}

impl MatchingEngine {
    /// Validates `config` and wires the matchers. Fails fast on inconsistent configuration.
    pub fn new(config: MatchConfig, context: Arc<MatchContext>) -> Result<Self, ConfigError> {
        config.validate()?;

        if config.fuzzy_backend == FuzzyBackend::Jaccard {
            warn!("fuzzy matching uses character jaccard; expect lower precision");
        }
        if config.semantic_backend == SemanticBackend::Basic {
            warn!("semantic matching uses the count proxy; expect lower precision");
        }

        let normalizer = Normalizer::new(Arc::clone(&context.skills));
        let hard_matcher = HardMatcher::new(
            Arc::clone(&context.skills),
            config.fuzzy_backend.scorer(),
            config.fuzzy_threshold,
        );
        let semantic_matcher = SemanticMatcher::for_backend(
            config.semantic_backend,
            Arc::clone(&context.vocabulary),
            config.vocabulary_policy,
        );
        debug!(
            fuzzy = hard_matcher.scorer_name(),
            semantic = %semantic_matcher.primary_model(),
            fuzzy_threshold = config.fuzzy_threshold,
            "matching engine configured"
        );

        Ok(Self {
            config,
            context,
            normalizer,
            hard_matcher,
            semantic_matcher,
        })
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// A one-off engine with `overrides` applied, sharing this engine's context.
    pub fn with_overrides(&self, overrides: &MatchConfigOverrides) -> Result<Self, ConfigError> {
        Self::new(overrides.apply(&self.config), Arc::clone(&self.context))
    }

    /// Scores one résumé against one job description. Never fails: invalid input and
    /// internal faults come back as a `success == false` result.
    pub fn match_texts(&self, resume_text: &str, jd_text: &str) -> MatchResult {
        guarded(|| self.run_pipeline(resume_text, jd_text))
    }

    /// Scores one résumé against many job descriptions in parallel. Results are sorted by
    /// `relevance_score` descending; ties keep request order. Each item is isolated.
    pub fn batch_match(&self, resume_text: &str, job_descriptions: &[String]) -> Vec<MatchResult> {
        info!(jobs = job_descriptions.len(), "batch match started");

        let mut results: Vec<MatchResult> = job_descriptions
            .par_iter()
            .enumerate()
            .map(|(job_index, jd_text)| {
                let mut result = self.match_texts(resume_text, jd_text);
                result.job_index = Some(job_index);
                result
            })
            .collect();

        results.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
        results
    }

    fn run_pipeline(&self, resume_text: &str, jd_text: &str) -> Result<MatchResult, MatchError> {
        let resume = self.normalizer.normalize(resume_text);
        let jd = self.normalizer.normalize(jd_text);

        if resume.is_empty() {
            return Err(MatchError::EmptyResume);
        }
        if jd.is_empty() {
            return Err(MatchError::EmptyJobDescription);
        }

        info!(
            resume_tokens = resume.total_tokens,
            jd_tokens = jd.total_tokens,
            "documents normalized"
        );
        debug!(resume_skills = ?resume.skills, jd_skills = ?jd.skills, "skills extracted");

        let (hard, semantic) = rayon::join(
            || self.hard_matcher.hard_match(&resume, &jd),
            || {
                self.semantic_matcher
                    .semantic_match(&resume.semantic_text, &jd.semantic_text)
            },
        );

        let final_score = round2(
            self.config.semantic_weight * semantic.semantic_score
                + self.config.hard_match_weight * hard.hard_match_score,
        );
        let verdict = Verdict::classify(final_score, &self.config);

        info!(
            hard_match_score = hard.hard_match_score,
            semantic_score = semantic.semantic_score,
            final_score,
            model = %semantic.model_used,
            verdict = %verdict,
            "match scored"
        );

        Ok(self.build_result(&resume, &jd, hard, semantic, final_score, verdict))
    }

    fn build_result(
        &self,
        resume: &Document,
        jd: &Document,
        hard: HardMatchResult,
        semantic: SemanticMatchResult,
        final_score: f64,
        verdict: Verdict,
    ) -> MatchResult {
        let skills = &hard.skills_match;
        let missing_skills = skills.missing_skills.clone();
        let matched_skills: Vec<String> = skills
            .exact_skill_matches
            .iter()
            .cloned()
            .chain(skills.fuzzy_skill_matches.iter().map(|m| m.required_skill.clone()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let suggestions = generate_suggestions(
            &missing_skills,
            verdict,
            final_score,
            self.config.max_suggestions,
        );

        let score_breakdown = ScoreBreakdown {
            hard_match_score: hard.hard_match_score,
            semantic_score: semantic.semantic_score,
            final_score,
            weights_used: self.config.weights(),
            calculation: format!(
                "({} × {}) + ({} × {}) = {}",
                self.config.semantic_weight,
                semantic.semantic_score,
                self.config.hard_match_weight,
                hard.hard_match_score,
                final_score
            ),
        };

        let match_statistics = MatchStatistics {
            total_jd_skills: jd.skill_count_in(TECHNICAL_CATEGORIES),
            total_resume_skills: resume.skill_count_in(TECHNICAL_CATEGORIES),
            exact_matches: skills.exact_skill_matches.len(),
            fuzzy_matches: skills.fuzzy_skill_matches.len(),
            missing_skills_count: missing_skills.len(),
            keyword_match_rate: hard.exact_match.exact_match_score,
        };

        let detailed_analysis = DetailedAnalysis {
            strengths: identify_strengths(
                &self.context.skills,
                &matched_skills,
                semantic.semantic_score,
            ),
            areas_for_improvement: missing_skills
                .iter()
                .take(self.config.max_suggestions)
                .cloned()
                .collect(),
            semantic_confidence: semantic.confidence,
            top_missing_skills: missing_skills
                .iter()
                .take(TOP_MISSING_SKILLS)
                .cloned()
                .collect(),
            shared_key_phrases: shared_key_phrases(resume, jd),
            skill_categories_analysis: analyze_skill_categories(resume, jd),
        };

        MatchResult {
            success: true,
            timestamp: Utc::now(),
            relevance_score: final_score,
            verdict,
            matched_skills,
            missing_skills,
            suggestions,
            error: None,
            score_breakdown: Some(score_breakdown),
            match_statistics: Some(match_statistics),
            detailed_analysis: Some(detailed_analysis),
            hard_match_details: Some(hard),
            semantic_match_details: Some(semantic),
            configuration_used: Some(self.config.clone()),
            job_index: None,
        }
    }
}

/// Runs `pipeline`, converting rejections and panics into a failed `MatchResult`.
fn guarded<F>(pipeline: F) -> MatchResult
where
    F: FnOnce() -> Result<MatchResult, MatchError>,
{
    match catch_unwind(AssertUnwindSafe(pipeline)) {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            warn!(error = %e, "match rejected");
            MatchResult::failure(e.to_string())
        }
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            error!(panic = %message, "matching pipeline panicked");
            MatchResult::failure(format!("Error during matching: {message}"))
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Suggestions and analysis
// ────────────────────────────────────────────────────────────────────────────

/// Verdict-specific advice plus cloud/containerization nudges, capped at `max`.
pub fn generate_suggestions(
    missing_skills: &[String],
    verdict: Verdict,
    score: f64,
    max: usize,
) -> Vec<String> {
    let head = |n: usize| {
        missing_skills
            .iter()
            .take(n)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    };
    let mut suggestions = Vec::new();

    match verdict {
        Verdict::Low => {
            if !missing_skills.is_empty() {
                suggestions.push(format!(
                    "Consider gaining experience in key missing skills: {}",
                    head(3)
                ));
            }
            suggestions.push(
                "Focus on building a stronger foundation in the core technologies mentioned in the job description"
                    .to_string(),
            );
            if score < VERY_LOW_SCORE {
                suggestions.push(
                    "This position may require significant skill development - consider targeting more junior roles first"
                        .to_string(),
                );
            }
        }
        Verdict::Medium => {
            if !missing_skills.is_empty() {
                suggestions.push(format!(
                    "Strengthen your profile by learning: {}",
                    head(2)
                ));
            }
            suggestions.push(
                "Highlight transferable skills and relevant projects in your application".to_string(),
            );
            suggestions.push(
                "Consider taking online courses or certifications in the missing technologies"
                    .to_string(),
            );
        }
        Verdict::High => {
            if !missing_skills.is_empty() {
                suggestions.push(format!(
                    "Consider mentioning any exposure to: {}",
                    head(2)
                ));
            }
            suggestions.push(
                "You're a strong match! Emphasize your relevant experience in your application"
                    .to_string(),
            );
            suggestions.push(
                "Prepare to discuss specific projects using the matched technologies".to_string(),
            );
        }
        Verdict::Error => {}
    }

    let top: Vec<String> = missing_skills
        .iter()
        .take(max)
        .map(|s| s.to_lowercase())
        .collect();
    if top.iter().any(|s| s == "aws") {
        suggestions
            .push("Consider getting AWS certification or demonstrating cloud projects".to_string());
    }
    if top.iter().any(|s| s == "docker" || s == "kubernetes") {
        suggestions.push(
            "Containerization skills are valuable - consider learning Docker and Kubernetes"
                .to_string(),
        );
    }

    suggestions.truncate(max);
    suggestions
}

/// Skill-count, semantic and category-cluster strengths.
fn identify_strengths(table: &SkillTable, matched_skills: &[String], semantic_score: f64) -> Vec<String> {
    let mut strengths = Vec::new();

    if !matched_skills.is_empty() {
        strengths.push(format!(
            "Strong technical match with {} relevant skills",
            matched_skills.len()
        ));
    }
    if semantic_score > STRONG_SEMANTIC_SCORE {
        strengths.push("Excellent semantic alignment with job requirements".to_string());
    }

    for (category, skills) in group_by_category(table, matched_skills) {
        if skills.len() >= 2 && ANALYZED_CATEGORIES.contains(&category.as_str()) {
            strengths.push(format!(
                "Strong {} background: {}",
                category_title(&category),
                skills.join(", ")
            ));
        }
    }

    strengths
}

/// Job-description 2–3 word phrases found verbatim among the résumé's phrases.
fn shared_key_phrases(resume: &Document, jd: &Document) -> Vec<String> {
    let resume_phrases = extract_key_phrases(&resume.cleaned_text, 2, 3);
    extract_key_phrases(&jd.cleaned_text, 2, 3)
        .intersection(&resume_phrases)
        .take(MAX_SHARED_PHRASES)
        .cloned()
        .collect()
}

/// Per-category match rates for categories the job description asks for.
fn analyze_skill_categories(resume: &Document, jd: &Document) -> BTreeMap<String, CategoryAnalysis> {
    let empty = BTreeSet::new();
    let mut analysis = BTreeMap::new();

    for category in ANALYZED_CATEGORIES {
        let required = jd.skills.get(*category).unwrap_or(&empty);
        if required.is_empty() {
            continue;
        }
        let present = resume.skills.get(*category).unwrap_or(&empty);

        let matched_skills: Vec<String> = required.intersection(present).cloned().collect();
        let missing_skills: Vec<String> = required.difference(present).cloned().collect();
        let rate = matched_skills.len() as f64 / required.len() as f64 * 100.0;

        analysis.insert(
            category.to_string(),
            CategoryAnalysis {
                match_rate: (rate * 10.0).round() / 10.0,
                matched_skills,
                missing_skills,
                total_required: required.len(),
            },
        );
    }

    analysis
}

fn category_title(category: &str) -> String {
    category
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
