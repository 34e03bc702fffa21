use std::fmt::Display;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};

use crate::matching::MatchConfig;

/// Process configuration loaded from environment variables.
/// Every variable is optional; a present but unparseable value fails startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Defaults for the process-wide matching engine.
    pub matching: MatchConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = MatchConfig::default();
        let matching = MatchConfig {
            semantic_weight: env_or("MATCHING_SEMANTIC_WEIGHT", defaults.semantic_weight)?,
            hard_match_weight: env_or("MATCHING_HARD_WEIGHT", defaults.hard_match_weight)?,
            high_suitability: env_or("MATCHING_HIGH_THRESHOLD", defaults.high_suitability)?,
            medium_suitability: env_or("MATCHING_MEDIUM_THRESHOLD", defaults.medium_suitability)?,
            fuzzy_threshold: env_or("MATCHING_FUZZY_THRESHOLD", defaults.fuzzy_threshold)?,
            max_suggestions: env_or("MATCHING_MAX_SUGGESTIONS", defaults.max_suggestions)?,
            fuzzy_backend: env_or("MATCHING_FUZZY_BACKEND", defaults.fuzzy_backend)?,
            semantic_backend: env_or("MATCHING_SEMANTIC_BACKEND", defaults.semantic_backend)?,
            vocabulary_policy: env_or("MATCHING_VOCABULARY_POLICY", defaults.vocabulary_policy)?,
            ..defaults
        };

        Ok(Config {
            port: env_or("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            matching,
        })
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow!("{e}"))
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::similarity::FuzzyBackend;

    #[test]
    fn test_env_or_falls_back_to_default() {
        let value: f64 = env_or("MATCHER_TEST_UNSET_VARIABLE", 0.25).unwrap();
        assert_eq!(value, 0.25);
    }

    #[test]
    fn test_env_or_parses_present_value() {
        std::env::set_var("MATCHER_TEST_FUZZY_BACKEND", " jaccard ");
        let backend: FuzzyBackend =
            env_or("MATCHER_TEST_FUZZY_BACKEND", FuzzyBackend::Ratio).unwrap();
        assert_eq!(backend, FuzzyBackend::Jaccard);
    }

    #[test]
    fn test_env_or_rejects_garbage() {
        std::env::set_var("MATCHER_TEST_BAD_PORT", "eighty");
        let err = env_or::<u16>("MATCHER_TEST_BAD_PORT", 8080).unwrap_err();
        assert!(format!("{err:#}").contains("MATCHER_TEST_BAD_PORT"));
    }
}
