//! Tokenizer/Normalizer — turns raw résumé or job-description text into a `Document`.
//!
//! Pipeline: lowercase → collapse whitespace → strip characters outside the allow-list →
//! rewrite multi-character tech terms (`c++` → `cplusplus`) → word-regex tokenization →
//! length/numeric/stop-word filtering → skills extraction against the `SkillTable`.
//!
//! Empty or whitespace-only input yields an empty `Document`, never an error.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Serialize;

use crate::matching::skills::{is_multi_token, SkillTable, GENERAL_KEYWORDS};

// ────────────────────────────────────────────────────────────────────────────
// Static lexicons
// ────────────────────────────────────────────────────────────────────────────

/// Standard English stop words for the tokenizer.
const ENGLISH_STOP_WORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "your", "yours",
    "yourself", "yourselves", "he", "him", "his", "himself", "she", "her", "hers", "herself",
    "it", "its", "itself", "they", "them", "their", "theirs", "themselves", "what", "which",
    "who", "whom", "this", "that", "these", "those", "am", "is", "are", "was", "were", "be",
    "been", "being", "have", "has", "had", "having", "do", "does", "did", "doing", "a", "an",
    "the", "and", "but", "if", "or", "because", "as", "until", "while", "of", "at", "by",
    "for", "with", "about", "against", "between", "into", "through", "during", "before",
    "after", "above", "below", "to", "from", "up", "down", "in", "out", "on", "off", "over",
    "under", "again", "further", "then", "once", "here", "there", "when", "where", "why",
    "how", "all", "any", "both", "each", "few", "more", "most", "other", "some", "such", "no",
    "nor", "not", "only", "own", "same", "so", "than", "too", "very", "s", "t", "can", "will",
    "just", "don", "should", "now", "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren",
    "couldn", "didn", "doesn", "hadn", "hasn", "haven", "isn", "ma", "mightn", "mustn",
    "needn", "shan", "shouldn", "wasn", "weren", "won", "wouldn",
];

/// Hiring-document boilerplate that inflates lexical overlap without carrying signal.
const DOMAIN_STOP_WORDS: &[&str] = &[
    "experience", "years", "year", "work", "working", "job", "position", "role",
    "responsibilities", "responsible", "including", "company", "team", "teams", "project",
    "projects", "skills", "skill", "knowledge", "ability", "able", "requirements", "required",
    "preferred", "plus", "nice", "have", "must", "should", "candidate", "candidates",
    "applicant", "applicants",
];

/// Multi-character terms rewritten into single alphanumeric tokens before tokenization.
/// Order matters: `asp.net` must be consumed before `.net`.
const TERM_REWRITES: &[(&str, &str)] = &[
    ("asp.net", "aspnet"),
    ("c++", "cplusplus"),
    ("c#", "csharp"),
    (".net", "dotnet"),
    ("node.js", "nodejs"),
    ("react.js", "reactjs"),
    ("vue.js", "vuejs"),
    ("express.js", "expressjs"),
];

static STOP_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    ENGLISH_STOP_WORDS
        .iter()
        .chain(DOMAIN_STOP_WORDS)
        .copied()
        .collect()
});

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static DISALLOWED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s\-+#.]").unwrap());
static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").unwrap());

// ────────────────────────────────────────────────────────────────────────────
// Document
// ────────────────────────────────────────────────────────────────────────────

/// Category name → sorted, deduplicated skills found in a document.
pub type SkillsMap = BTreeMap<String, BTreeSet<String>>;

/// A normalized input document. Pure function of its source text; never mutated.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Document {
    pub cleaned_text: String,
    /// Whitespace-collapsed text that keeps sentence punctuation, fed to the vectorizer.
    pub semantic_text: String,
    /// Filtered tokens with stop words removed, in document order.
    pub tokens: Vec<String>,
    pub tokens_with_stopwords: Vec<String>,
    pub token_set: BTreeSet<String>,
    pub skills: SkillsMap,
    pub total_tokens: usize,
    pub unique_tokens: usize,
}

impl Document {
    pub fn is_empty(&self) -> bool {
        self.cleaned_text.trim().is_empty()
    }

    /// Tokens deduplicated in first-occurrence order.
    pub fn unique_tokens_ordered(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.tokens
            .iter()
            .map(String::as_str)
            .filter(|t| seen.insert(*t))
            .collect()
    }

    /// Skills found in the given categories, concatenated (duplicates across categories kept).
    pub fn skill_count_in(&self, categories: &[&str]) -> usize {
        categories
            .iter()
            .filter_map(|c| self.skills.get(*c))
            .map(BTreeSet::len)
            .sum()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Normalizer
// ────────────────────────────────────────────────────────────────────────────

/// Stateless text normalizer bound to a shared skills table.
#[derive(Debug, Clone)]
pub struct Normalizer {
    skills: Arc<SkillTable>,
}

impl Normalizer {
    pub fn new(skills: Arc<SkillTable>) -> Self {
        Self { skills }
    }

    /// Runs the full preprocessing pipeline over `text`.
    pub fn normalize(&self, text: &str) -> Document {
        let cleaned_text = clean_text(text);
        if cleaned_text.is_empty() {
            return Document::default();
        }

        let tokens = tokenize(&cleaned_text, true);
        let tokens_with_stopwords = tokenize(&cleaned_text, false);
        let skills = self.extract_skills(&cleaned_text, &tokens);
        let semantic_text = WHITESPACE.replace_all(&cleaned_text, " ").into_owned();
        let token_set: BTreeSet<String> = tokens.iter().cloned().collect();

        Document {
            total_tokens: tokens.len(),
            unique_tokens: token_set.len(),
            cleaned_text,
            semantic_text,
            tokens,
            tokens_with_stopwords,
            token_set,
            skills,
        }
    }

    /// Categorized skills inventory. Every table category is present (possibly empty),
    /// plus the `general_keywords` pseudo-category.
    fn extract_skills(&self, cleaned_text: &str, tokens: &[String]) -> SkillsMap {
        let mut found: SkillsMap = self
            .skills
            .category_names()
            .map(|c| (c.to_string(), BTreeSet::new()))
            .collect();
        let mut general = BTreeSet::new();

        for token in tokens {
            for category in self.skills.categorize_skill(token) {
                if let Some(hits) = found.get_mut(category) {
                    hits.insert(token.clone());
                }
            }
            if token.chars().count() > 2 && token.chars().all(char::is_alphabetic) {
                general.insert(token.clone());
            }
        }

        // Multi-word and punctuated skills were split or merged by tokenization.
        for (category, skills) in self.skills.categories() {
            for skill in skills.iter().filter(|s| is_multi_token(s)) {
                if contains_bounded(cleaned_text, skill) {
                    if let Some(hits) = found.get_mut(category) {
                        hits.insert(skill.clone());
                    }
                }
            }
        }

        found.insert(GENERAL_KEYWORDS.to_string(), general);
        found
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Text primitives
// ────────────────────────────────────────────────────────────────────────────

/// Lowercases, strips disallowed characters, rewrites known tech terms, collapses whitespace.
pub fn clean_text(text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }

    let lowered = text.to_lowercase();
    let collapsed = WHITESPACE.replace_all(&lowered, " ");
    let mut cleaned = DISALLOWED.replace_all(&collapsed, " ").into_owned();

    for (term, replacement) in TERM_REWRITES {
        cleaned = rewrite_term(&cleaned, term, replacement);
    }

    WHITESPACE.replace_all(&cleaned, " ").trim().to_string()
}

/// Word-regex tokenization with length, numeric, and optional stop-word filtering.
pub fn tokenize(text: &str, remove_stopwords: bool) -> Vec<String> {
    WORD.find_iter(text)
        .map(|m| m.as_str())
        .filter(|token| token.chars().count() >= 2)
        // Short pure numbers are page numbers and bullets; 4+ digits may be years.
        .filter(|token| !(token.chars().all(|c| c.is_ascii_digit()) && token.len() < 4))
        .filter(|token| !remove_stopwords || !STOP_WORDS.contains(token.to_lowercase().as_str()))
        .map(str::to_lowercase)
        .collect()
}

/// Distinct 2–4 token phrases (length > 3) built from stop-word-filtered tokens.
pub fn extract_key_phrases(text: &str, min_len: usize, max_len: usize) -> BTreeSet<String> {
    let tokens = tokenize(&clean_text(text), true);
    let mut phrases = BTreeSet::new();

    for n in min_len.max(1)..=max_len {
        for window in tokens.windows(n) {
            let phrase = window.join(" ");
            if phrase.len() > 3 {
                phrases.insert(phrase);
            }
        }
    }

    phrases
}

fn is_term_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '+' | '#')
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Replaces `term` wherever it stands alone (not glued to other term characters).
fn rewrite_term(text: &str, term: &str, replacement: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for (start, _) in text.match_indices(term) {
        let end = start + term.len();
        let before = text[..start].chars().next_back();
        let after = text[end..].chars().next();
        if before.is_some_and(is_term_char) || after.is_some_and(is_term_char) {
            continue;
        }
        out.push_str(&text[last..start]);
        out.push_str(replacement);
        last = end;
    }

    out.push_str(&text[last..]);
    out
}

/// Substring search that only accepts hits bounded by non-word characters.
fn contains_bounded(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(start, _)| {
        let end = start + needle.len();
        let before = haystack[..start].chars().next_back();
        let after = haystack[end..].chars().next();
        !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_JD: &str = r#"
        We are looking for a Senior Python Developer with 5+ years of experience.
        Must have experience with Django, Flask, React.js, and PostgreSQL.
        Knowledge of AWS, Docker, Spring Boot and CI/CD pipelines is preferred.
    "#;

    fn normalizer() -> Normalizer {
        Normalizer::new(SkillTable::standard())
    }

    #[test]
    fn test_clean_text_lowercases_and_collapses() {
        assert_eq!(clean_text("  Hello\n\tWORLD  "), "hello world");
    }

    #[test]
    fn test_clean_text_strips_disallowed_characters() {
        assert_eq!(clean_text("rust, go; (sql)!"), "rust go sql");
    }

    #[test]
    fn test_clean_text_rewrites_tech_terms() {
        let cleaned = clean_text("C++ and C# on .NET with Node.js, React.js");
        assert_eq!(cleaned, "cplusplus and csharp on dotnet with nodejs reactjs");
    }

    #[test]
    fn test_rewrite_respects_boundaries() {
        assert_eq!(clean_text("asp.net"), "aspnet");
        assert_eq!(clean_text("abc++"), "abc++");
        assert_eq!(clean_text("c++."), "cplusplus.");
    }

    #[test]
    fn test_tokenize_filters_short_and_numeric_tokens() {
        let tokens = tokenize("a go 42 2023 python x", false);
        assert_eq!(tokens, vec!["go", "2023", "python"]);
    }

    #[test]
    fn test_tokenize_removes_stop_and_domain_words() {
        let tokens = tokenize("the candidate must have rust experience", true);
        assert_eq!(tokens, vec!["rust"]);
    }

    #[test]
    fn test_tokenize_splits_on_punctuation() {
        let tokens = tokenize("docker/kubernetes-ready", false);
        assert_eq!(tokens, vec!["docker", "kubernetes", "ready"]);
    }

    #[test]
    fn test_empty_input_yields_empty_document() {
        let doc = normalizer().normalize("   \n\t ");
        assert!(doc.is_empty());
        assert!(doc.tokens.is_empty());
        assert!(doc.token_set.is_empty());
        assert!(doc.skills.is_empty());
        assert_eq!(doc.total_tokens, 0);
    }

    #[test]
    fn test_normalize_extracts_categorized_skills() {
        let doc = normalizer().normalize(SAMPLE_JD);
        let langs = &doc.skills["programming_languages"];
        assert!(langs.contains("python"));
        let backend = &doc.skills["backend_frameworks"];
        assert!(backend.contains("django"));
        assert!(backend.contains("flask"));
        assert!(backend.contains("spring boot"), "multi-word skill via substring");
        assert!(doc.skills["web_technologies"].contains("reactjs"));
        assert!(doc.skills["databases"].contains("postgresql"));
        assert!(doc.skills["cloud_platforms"].contains("aws"));
        assert!(doc.skills["devops_tools"].contains("docker"));
    }

    #[test]
    fn test_normalize_token_counts_and_set() {
        let doc = normalizer().normalize("Rust rust RUST tokio");
        assert_eq!(doc.total_tokens, 4);
        assert_eq!(doc.unique_tokens, 2);
        assert_eq!(doc.unique_tokens_ordered(), vec!["rust", "tokio"]);
        assert!(doc.token_set.contains("rust"));
    }

    #[test]
    fn test_general_keywords_are_alphabetic_and_long() {
        let doc = normalizer().normalize("Built go services in 2021 with kafka");
        let general = &doc.skills[GENERAL_KEYWORDS];
        assert!(general.contains("kafka"));
        assert!(general.contains("built"));
        assert!(!general.contains("go"), "two-character tokens excluded");
        assert!(!general.contains("2021"));
    }

    #[test]
    fn test_multi_token_skill_requires_word_boundary() {
        let doc = normalizer().normalize("We use springboot daily");
        assert!(!doc.skills["backend_frameworks"].contains("spring boot"));
    }

    #[test]
    fn test_semantic_text_preserves_sentences() {
        let doc = normalizer().normalize("Led a team.  Shipped   Rust services.");
        assert_eq!(doc.semantic_text, "led a team. shipped rust services.");
    }

    #[test]
    fn test_extract_key_phrases() {
        let phrases = extract_key_phrases("distributed systems engineering in rust", 2, 3);
        assert!(phrases.contains("distributed systems"));
        assert!(phrases.contains("systems engineering rust"));
        assert!(!phrases.iter().any(|p| p.split(' ').count() > 3));
    }
}
