//! Hard Matcher — lexical comparison of a résumé against a job description.
//!
//! Three independent passes, combined with a fixed internal weighting:
//! 1. exact token-set overlap
//! 2. fuzzy token overlap (best résumé token per JD token, thresholded)
//! 3. skills-table overlap, with fuzzy retry for required skills not found exactly
//!
//! Every percentage is measured against the job description, never the résumé.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::matching::preprocess::{Document, SkillsMap};
use crate::matching::round2;
use crate::matching::similarity::{best_match, Similarity};
use crate::matching::skills::SkillTable;

/// Internal weighting of the three lexical signals. Independent of the engine weights.
pub const EXACT_WEIGHT: f64 = 0.4;
pub const FUZZY_WEIGHT: f64 = 0.3;
pub const SKILLS_WEIGHT: f64 = 0.3;

const KEY_MISSING_LIMIT: usize = 5;
const KEY_MATCHED_LIMIT: usize = 10;

// ────────────────────────────────────────────────────────────────────────────
// Result models
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExactMatchResult {
    pub exact_matches: Vec<String>,
    /// In the job description but not the résumé.
    pub missing_keywords: Vec<String>,
    /// In the résumé but not the job description.
    pub extra_keywords: Vec<String>,
    pub matched_count: usize,
    pub total_jd_keywords: usize,
    pub exact_match_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuzzyTermMatch {
    pub jd_term: String,
    pub resume_term: String,
    pub similarity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuzzyMatchResult {
    pub fuzzy_matches: Vec<FuzzyTermMatch>,
    pub fuzzy_matched_count: usize,
    pub total_jd_tokens: usize,
    pub fuzzy_match_score: f64,
    pub scorer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuzzySkillMatch {
    pub required_skill: String,
    pub resume_skill: String,
    pub similarity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillsMatchResult {
    pub required_skills: Vec<String>,
    pub resume_skills: Vec<String>,
    pub exact_skill_matches: Vec<String>,
    pub fuzzy_skill_matches: Vec<FuzzySkillMatch>,
    /// Required skills matched neither exactly nor fuzzily, sorted.
    pub missing_skills: Vec<String>,
    pub extra_skills: Vec<String>,
    pub skill_match_score: f64,
    pub total_required_skills: usize,
    pub total_matched_skills: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSummary {
    pub total_keywords_matched: usize,
    pub total_skills_matched: usize,
    pub key_missing_skills: Vec<String>,
    pub key_matched_skills: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardMatchResult {
    pub exact_match: ExactMatchResult,
    pub fuzzy_match: FuzzyMatchResult,
    pub skills_match: SkillsMatchResult,
    pub hard_match_score: f64,
    pub match_summary: MatchSummary,
}

// ────────────────────────────────────────────────────────────────────────────
// HardMatcher
// ────────────────────────────────────────────────────────────────────────────

/// Lexical matcher. The scorer is chosen once at construction.
pub struct HardMatcher {
    skills: Arc<SkillTable>,
    scorer: Box<dyn Similarity>,
    fuzzy_threshold: f64,
}

impl HardMatcher {
    pub fn new(skills: Arc<SkillTable>, scorer: Box<dyn Similarity>, fuzzy_threshold: f64) -> Self {
        Self {
            skills,
            scorer,
            fuzzy_threshold,
        }
    }

    pub fn scorer_name(&self) -> &'static str {
        self.scorer.name()
    }

    /// Runs all three passes and combines them as `0.4×exact + 0.3×fuzzy + 0.3×skills`.
    pub fn hard_match(&self, resume: &Document, jd: &Document) -> HardMatchResult {
        let exact_match = exact_match(&resume.token_set, &jd.token_set);
        let fuzzy_match = self.fuzzy_match(
            &resume.unique_tokens_ordered(),
            &jd.unique_tokens_ordered(),
        );
        let skills_match = self.skills_match(&resume.skills, &jd.skills);

        let hard_match_score = round2(
            EXACT_WEIGHT * exact_match.exact_match_score
                + FUZZY_WEIGHT * fuzzy_match.fuzzy_match_score
                + SKILLS_WEIGHT * skills_match.skill_match_score,
        );

        let match_summary = MatchSummary {
            total_keywords_matched: exact_match.matched_count + fuzzy_match.fuzzy_matched_count,
            total_skills_matched: skills_match.total_matched_skills,
            key_missing_skills: skills_match
                .missing_skills
                .iter()
                .take(KEY_MISSING_LIMIT)
                .cloned()
                .collect(),
            key_matched_skills: skills_match
                .exact_skill_matches
                .iter()
                .take(KEY_MATCHED_LIMIT)
                .cloned()
                .collect(),
        };

        HardMatchResult {
            exact_match,
            fuzzy_match,
            skills_match,
            hard_match_score,
            match_summary,
        }
    }

    /// For every JD token, the best résumé token at or above the fuzzy threshold.
    pub fn fuzzy_match(&self, resume_tokens: &[&str], jd_tokens: &[&str]) -> FuzzyMatchResult {
        let fuzzy_matches: Vec<FuzzyTermMatch> = jd_tokens
            .iter()
            .filter_map(|jd_token| {
                best_match(
                    self.scorer.as_ref(),
                    jd_token,
                    resume_tokens.iter().copied(),
                    self.fuzzy_threshold,
                )
                .map(|(resume_term, similarity)| FuzzyTermMatch {
                    jd_term: jd_token.to_string(),
                    resume_term: resume_term.to_string(),
                    similarity,
                })
            })
            .collect();

        let fuzzy_matched_count = fuzzy_matches
            .iter()
            .map(|m| m.jd_term.as_str())
            .collect::<BTreeSet<_>>()
            .len();

        FuzzyMatchResult {
            fuzzy_match_score: percentage(fuzzy_matched_count, jd_tokens.len()),
            fuzzy_matched_count,
            total_jd_tokens: jd_tokens.len(),
            fuzzy_matches,
            scorer: self.scorer.name().to_string(),
        }
    }

    /// Skills-table overlap. Required skills missed exactly are retried fuzzily against the
    /// résumé's skill list; anything matched that way is not reported as missing.
    pub fn skills_match(&self, resume_skills: &SkillsMap, jd_skills: &SkillsMap) -> SkillsMatchResult {
        let resume_set = self.verified_skills(resume_skills);
        let required_set = self.verified_skills(jd_skills);

        let exact_skill_matches: Vec<String> =
            required_set.intersection(&resume_set).cloned().collect();
        let unmatched: Vec<&String> = required_set.difference(&resume_set).collect();
        let extra_skills: Vec<String> = resume_set.difference(&required_set).cloned().collect();

        let fuzzy_skill_matches: Vec<FuzzySkillMatch> = unmatched
            .iter()
            .filter_map(|required| {
                best_match(
                    self.scorer.as_ref(),
                    required,
                    resume_set.iter().map(String::as_str),
                    self.fuzzy_threshold,
                )
                .map(|(resume_skill, similarity)| FuzzySkillMatch {
                    required_skill: required.to_string(),
                    resume_skill: resume_skill.to_string(),
                    similarity,
                })
            })
            .collect();

        let fuzzily_matched: BTreeSet<&str> = fuzzy_skill_matches
            .iter()
            .map(|m| m.required_skill.as_str())
            .collect();
        let missing_skills: Vec<String> = unmatched
            .into_iter()
            .filter(|s| !fuzzily_matched.contains(s.as_str()))
            .cloned()
            .collect();

        let total_required_skills = required_set.len();
        let total_matched_skills = exact_skill_matches.len() + fuzzy_skill_matches.len();

        SkillsMatchResult {
            required_skills: required_set.into_iter().collect(),
            resume_skills: resume_set.into_iter().collect(),
            skill_match_score: percentage(total_matched_skills, total_required_skills),
            exact_skill_matches,
            fuzzy_skill_matches,
            missing_skills,
            extra_skills,
            total_required_skills,
            total_matched_skills,
        }
    }

    /// Restricts a document's skills map to entries present in the canonical table.
    fn verified_skills(&self, skills: &SkillsMap) -> BTreeSet<String> {
        skills
            .values()
            .flatten()
            .map(|s| s.to_lowercase())
            .filter(|s| self.skills.contains(s))
            .collect()
    }
}

/// Token-set intersection, scored against the job description's token count.
pub fn exact_match(resume_tokens: &BTreeSet<String>, jd_tokens: &BTreeSet<String>) -> ExactMatchResult {
    let resume_lower: BTreeSet<String> = resume_tokens.iter().map(|t| t.to_lowercase()).collect();
    let jd_lower: BTreeSet<String> = jd_tokens.iter().map(|t| t.to_lowercase()).collect();

    let exact_matches: Vec<String> = jd_lower.intersection(&resume_lower).cloned().collect();
    let missing_keywords: Vec<String> = jd_lower.difference(&resume_lower).cloned().collect();
    let extra_keywords: Vec<String> = resume_lower.difference(&jd_lower).cloned().collect();

    ExactMatchResult {
        matched_count: exact_matches.len(),
        total_jd_keywords: jd_lower.len(),
        exact_match_score: percentage(exact_matches.len(), jd_lower.len()),
        exact_matches,
        missing_keywords,
        extra_keywords,
    }
}

/// Matched skills grouped by table category (a skill may appear in several).
pub fn group_by_category(table: &SkillTable, skills: &[String]) -> BTreeMap<String, Vec<String>> {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for skill in skills {
        for category in table.categorize_skill(skill) {
            grouped.entry(category.clone()).or_default().push(skill.clone());
        }
    }
    grouped
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round2(part as f64 / whole as f64 * 100.0)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
