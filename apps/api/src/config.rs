use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::extraction::assembler::AssemblerOptions;
use crate::llm_client::{DEFAULT_API_URL, DEFAULT_MAX_ATTEMPTS, DEFAULT_MODEL};

const DEFAULT_LLM_TIMEOUT_SECS: u64 = 30;

/// Which extraction strategy serves uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrategyKind {
    #[default]
    Pattern,
    Llm,
}

impl FromStr for StrategyKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pattern" | "regex" => Ok(StrategyKind::Pattern),
            "llm" | "model" => Ok(StrategyKind::Llm),
            other => bail!("EXTRACTION_STRATEGY must be 'pattern' or 'llm', got '{other}'"),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub rust_log: String,
    pub strategy: StrategyKind,
    /// Required only for the LLM strategy.
    pub llm_api_key: Option<String>,
    pub llm_api_url: String,
    pub llm_model: String,
    pub llm_timeout: Duration,
    pub llm_max_attempts: u32,
    pub education_requires_school: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. `from_env` passes the process
    /// environment; tests pass a fixed map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let strategy = match lookup("EXTRACTION_STRATEGY") {
            Some(value) => value.parse::<StrategyKind>()?,
            None => StrategyKind::default(),
        };

        let llm_api_key = lookup("GROQ_API_KEY").filter(|key| !key.trim().is_empty());
        if strategy == StrategyKind::Llm && llm_api_key.is_none() {
            bail!("Required environment variable 'GROQ_API_KEY' is not set (EXTRACTION_STRATEGY=llm)");
        }

        Ok(Config {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: lookup("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            strategy,
            llm_api_key,
            llm_api_url: lookup("LLM_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            llm_model: lookup("LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            llm_timeout: Duration::from_secs(
                lookup("LLM_TIMEOUT_SECS")
                    .map(|v| v.parse::<u64>())
                    .transpose()
                    .context("LLM_TIMEOUT_SECS must be a whole number of seconds")?
                    .unwrap_or(DEFAULT_LLM_TIMEOUT_SECS),
            ),
            llm_max_attempts: lookup("LLM_MAX_ATTEMPTS")
                .map(|v| v.parse::<u32>())
                .transpose()
                .context("LLM_MAX_ATTEMPTS must be a positive integer")?
                .unwrap_or(DEFAULT_MAX_ATTEMPTS),
            education_requires_school: lookup("EDUCATION_REQUIRES_SCHOOL")
                .map(|v| parse_flag(&v))
                .transpose()?
                .unwrap_or(false),
        })
    }

    pub fn assembler_options(&self) -> AssemblerOptions {
        AssemblerOptions {
            require_school_for_education: self.education_requires_school,
        }
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("expected a boolean flag, got '{other}'"),
    }
}
