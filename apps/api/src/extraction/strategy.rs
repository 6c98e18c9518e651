//! Extraction strategies — pluggable, trait-based producers of a `ResumeRecord`
//! from plain text.
//!
//! `PatternStrategy` runs the regex extractors; `LlmStrategy` delegates to a
//! completion service. `AppState` holds an `Arc<dyn ExtractionStrategy>`,
//! chosen once at startup from `EXTRACTION_STRATEGY`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use tracing::info;

use crate::config::{Config, StrategyKind};
use crate::errors::AppError;
use crate::extraction::assembler::{assemble, AssemblerOptions};
use crate::extraction::llm_parser::parse_via_model;
use crate::llm_client::{attempt_timeout, CompletionService, LlmClient, LlmError};
use crate::models::resume::ResumeRecord;

/// Implement this to add a new way of turning resume text into a record
/// without touching the upload handler.
#[async_trait]
pub trait ExtractionStrategy: Send + Sync {
    /// Short identifier reported in responses and logs.
    fn name(&self) -> &'static str;

    async fn extract(&self, text: &str) -> Result<ResumeRecord, AppError>;
}

/// Empty text is a failed document, never an empty-but-successful record.
fn ensure_text(text: &str) -> Result<(), AppError> {
    if text.trim().is_empty() {
        return Err(AppError::InvalidDocument("no extractable text".to_string()));
    }
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// PatternStrategy — default
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct PatternStrategy {
    options: AssemblerOptions,
}

impl PatternStrategy {
    pub fn new(options: AssemblerOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl ExtractionStrategy for PatternStrategy {
    fn name(&self) -> &'static str {
        "pattern"
    }

    async fn extract(&self, text: &str) -> Result<ResumeRecord, AppError> {
        ensure_text(text)?;
        Ok(assemble(text, self.options))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// LlmStrategy — completion-service backed
// ────────────────────────────────────────────────────────────────────────────

pub struct LlmStrategy {
    client: Arc<dyn CompletionService>,
    model: String,
    timeout: Duration,
}

impl LlmStrategy {
    pub fn new(client: Arc<dyn CompletionService>, model: String, timeout: Duration) -> Self {
        Self {
            client,
            model,
            timeout,
        }
    }
}

#[async_trait]
impl ExtractionStrategy for LlmStrategy {
    fn name(&self) -> &'static str {
        "llm"
    }

    async fn extract(&self, text: &str) -> Result<ResumeRecord, AppError> {
        ensure_text(text)?;
        tokio::time::timeout(
            self.timeout,
            parse_via_model(text, self.client.as_ref(), &self.model),
        )
        .await
        .map_err(|_| AppError::from(LlmError::Timeout(self.timeout)))?
    }
}

/// Selects and builds the strategy named by the config.
pub fn build_strategy(config: &Config) -> anyhow::Result<Arc<dyn ExtractionStrategy>> {
    match config.strategy {
        StrategyKind::Pattern => {
            info!(
                "Extraction strategy: pattern (education requires school: {})",
                config.education_requires_school
            );
            Ok(Arc::new(PatternStrategy::new(config.assembler_options())))
        }
        StrategyKind::Llm => {
            let api_key = config
                .llm_api_key
                .clone()
                .context("GROQ_API_KEY is required for the llm strategy")?;
            let per_attempt = attempt_timeout(config.llm_timeout, config.llm_max_attempts);
            let client = LlmClient::new(
                api_key,
                config.llm_api_url.clone(),
                per_attempt,
                config.llm_max_attempts,
            )
            .context("Failed to build completion client")?;
            info!(
                "Extraction strategy: llm (model: {}, timeout: {:?}, per attempt: {:?})",
                config.llm_model, config.llm_timeout, per_attempt
            );
            Ok(Arc::new(LlmStrategy::new(
                Arc::new(client),
                config.llm_model.clone(),
                config.llm_timeout,
            )))
        }
    }
}
