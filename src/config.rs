//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (developer token, OAuth access token) are referenced by env-var
//! name in the config and resolved at runtime via `std::env::var`.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs;

use crate::engine::decay::DecayPolicy;
use crate::types::PortfolioStrategy;

/// Default config path when none is given on the command line.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub account: AccountConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub run: RunConfig,
    pub policy: PolicyConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AccountConfig {
    /// Customer id, with or without dashes.
    pub customer_id: String,
    /// Manager account id when operating through an MCC.
    #[serde(default)]
    pub login_customer_id: Option<String>,
    pub developer_token_env: String,
    pub access_token_env: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub version: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://googleads.googleapis.com".to_string(),
            version: "v17".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RunConfig {
    /// Log updates instead of submitting them.
    #[serde(default)]
    pub dry_run: bool,
    /// Restrict the run to strategies with these names. Empty means all.
    #[serde(default)]
    pub strategies: Vec<String>,
}

impl RunConfig {
    /// Keep only the strategies named in the filter (all when it is empty).
    pub fn select(&self, strategies: Vec<PortfolioStrategy>) -> Vec<PortfolioStrategy> {
        if self.strategies.is_empty() {
            return strategies;
        }
        strategies
            .into_iter()
            .filter(|s| self.strategies.iter().any(|name| name == &s.name))
            .collect()
    }
}

/// The adjustment to run, tagged by `action`.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PolicyConfig {
    ClearBidCeiling,
    /// `limit` is in currency units.
    SetBidCeiling { limit: Decimal },
    /// `direction` is "increase" or "decrease"; `percent` is a fraction (0.1 = 10%).
    AdjustBidCeiling { direction: String, percent: Decimal },
    DecayTargetCpa(DecayPolicy),
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Parse configuration from TOML text.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}
