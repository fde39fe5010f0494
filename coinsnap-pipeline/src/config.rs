//! Pipeline configuration: the tracked universe and request shape.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use coinsnap_core::rank::DEFAULT_TOP_K;

/// Errors from loading a config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// What to track and how to ask for it, loadable from TOML.
///
/// Missing keys fall back to the defaults below. Unknown keys are rejected
/// so a typo cannot silently vanish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Coin ids, in request order.
    pub coins: Vec<String>,
    /// Quote currency for prices, caps and volumes.
    pub vs_currency: String,
    /// How many gainers and losers to surface.
    pub top_k: usize,
    /// Page size for the markets endpoint.
    pub per_page: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            coins: ["bitcoin", "ethereum", "solana", "cardano"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            vs_currency: "usd".to_string(),
            top_k: DEFAULT_TOP_K,
            per_page: 250,
        }
    }
}

impl PipelineConfig {
    /// Load and validate a TOML config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.coins.is_empty() {
            return Err(ConfigError::Invalid("`coins` must not be empty".into()));
        }
        if self.coins.iter().any(|c| c.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "`coins` entries must be non-empty".into(),
            ));
        }
        if self.per_page == 0 {
            return Err(ConfigError::Invalid("`per_page` must be at least 1".into()));
        }
        Ok(())
    }
}
