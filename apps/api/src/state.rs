use std::sync::Arc;

use crate::matching::MatchingEngine;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Process-wide engine built from `Config::matching`. Requests carrying config overrides
    /// derive one-off engines from it that share its skills table and fitted vocabulary.
    pub engine: Arc<MatchingEngine>,
}
