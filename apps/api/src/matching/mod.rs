// Résumé ↔ job-description matching core.
// Implements: normalization, lexical (exact/fuzzy/skills) matching, TF-IDF semantic matching,
// score fusion and verdicts. Everything here is synchronous and CPU-bound; handlers run it
// inside tokio::task::spawn_blocking.

pub mod engine;
pub mod extraction;
pub mod handlers;
pub mod hard_matcher;
pub mod models;
pub mod preprocess;
pub mod semantic_matcher;
pub mod similarity;
pub mod skills;
pub mod vectorizer;

// Re-export the public API consumed by the binary and routes.
pub use engine::{MatchContext, MatchingEngine};
pub use models::MatchConfig;

/// Rounds to two decimals, the precision of every reported score.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
