use std::sync::Arc;

use crate::config::Config;
use crate::extraction::strategy::ExtractionStrategy;

/// Shared application state injected into all route handlers via Axum extractors.
/// Everything here is read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Pluggable extraction strategy. Default: PatternStrategy. Swap via EXTRACTION_STRATEGY.
    pub strategy: Arc<dyn ExtractionStrategy>,
}
